//! Paths whose content is never captured.

use once_cell::sync::Lazy;
use regex::Regex;

/// Content stored in place of an excluded file.
pub const EXCLUDED_PLACEHOLDER: &str = "# Content excluded (sensitive path). Handle manually.\n";

/// Matched against the host-absolute path.
static EXCLUDED_PATHS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^/etc/g?shadow-?$",
        r"^/etc/ssh/ssh_host_[^/]*$",
        r"^/etc/pki/.*\.key$",
        r"\.key$",
        r"keytab$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Whether `path` (host-absolute, e.g. `/etc/shadow`) must be withheld.
pub fn is_excluded_path(path: &str) -> bool {
    EXCLUDED_PATHS.iter().any(|re| re.is_match(path))
}
