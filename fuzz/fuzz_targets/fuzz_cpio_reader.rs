//! Fuzz target for cpio `newc` payload reading.
//!
//! Cached package archives are read from disk as-is, so member lookup and
//! listing must reject malformed streams with an error rather than panic.

#![no_main]

use drift_core::archive::cpio;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = cpio::list_members(data);
    let _ = cpio::extract_member(data, "/etc/fuzz.conf");
});
