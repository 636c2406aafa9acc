//! Fuzz target for rpm query output parsing.

#![no_main]

use drift_core::package::history::{parse_history_info, parse_history_list};
use drift_core::package::rpm::{parse_file_owners, parse_installed, parse_verify_output};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let _ = parse_verify_output(data);
    let _ = parse_installed(data);
    let _ = parse_file_owners(data);
    let _ = parse_history_list(data);
    let _ = parse_history_info(data);
});
