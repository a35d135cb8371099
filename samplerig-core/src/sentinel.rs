//! Success detection from captured builder output.
//!
//! Used only for whole-solution builds, where the builder reports a single
//! exit status for many projects. The builder prints a fixed line just before
//! its final newline when everything compiled.

/// Line printed by the builder after a clean whole-solution build.
pub const DEFAULT_SENTINEL: &str = ". Done";

/// Second-to-last `'\n'`-separated segment of `stdout`, trimmed.
///
/// For output terminated by a newline this is the last printed line.
pub fn sentinel_line(stdout: &str) -> Option<&str> {
    stdout.rsplit('\n').nth(1).map(str::trim)
}

/// Whether `stdout` ends with the `sentinel` line.
pub fn matches_sentinel(stdout: &str, sentinel: &str) -> bool {
    sentinel_line(stdout) == Some(sentinel.trim())
}
