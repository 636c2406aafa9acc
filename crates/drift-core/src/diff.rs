//! Unified diffs between pristine package content and the file on disk.

use similar::TextDiff;

/// Lines of context around each hunk.
pub const DIFF_CONTEXT_LINES: usize = 3;

/// Header label for the packaged side.
pub const ORIGINAL_LABEL: &str = "original";

/// Header label for the on-disk side.
pub const CURRENT_LABEL: &str = "current";

/// Unified diff from `pristine` to `current`.
///
/// Empty input is treated as a single empty line. Identical inputs give an
/// empty string.
pub fn unified_diff(pristine: &str, current: &str) -> String {
    let pristine = if pristine.is_empty() { "\n" } else { pristine };
    let current = if current.is_empty() { "\n" } else { current };
    if pristine == current {
        return String::new();
    }
    TextDiff::from_lines(pristine, current)
        .unified_diff()
        .context_radius(DIFF_CONTEXT_LINES)
        .header(ORIGINAL_LABEL, CURRENT_LABEL)
        .to_string()
}

/// [`unified_diff`] over raw pristine bytes, decoded lossily.
pub fn unified_diff_bytes(pristine: &[u8], current: &str) -> String {
    unified_diff(&String::from_utf8_lossy(pristine), current)
}
