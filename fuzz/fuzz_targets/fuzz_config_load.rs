//! Fuzz target for audit configuration parsing.

#![no_main]

use drift_core::config::AuditConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parsing and validation return errors, never panic
    if let Ok(config) = serde_json::from_slice::<AuditConfig>(data) {
        let _ = config.validate();
        let _ = config.config_prefix();
    }
});
