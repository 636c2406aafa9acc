//! Fuzz target for the redaction engine.
//!
//! Besides not panicking, file redaction of a non-excluded path must
//! produce the same content as plain text redaction.

#![no_main]

use arbitrary::Arbitrary;
use drift_redact::RedactionEngine;
use libfuzzer_sys::fuzz_target;
use once_cell::sync::Lazy;

static ENGINE: Lazy<Option<RedactionEngine>> = Lazy::new(|| RedactionEngine::new().ok());

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    path: &'a str,
    content: &'a str,
    diff: Option<&'a str>,
}

fuzz_target!(|input: Input<'_>| {
    let Some(engine) = ENGINE.as_ref() else {
        return;
    };
    let text = engine.redact_text(input.content);
    let file = engine.redact_file(input.path, input.content, input.diff);
    if !file.excluded {
        assert_eq!(file.content, text.text);
    }
});
