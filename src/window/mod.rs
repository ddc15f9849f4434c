//! Longest-valid-window search and the minimum-length policy.

use crate::domain::{SkipReason, Window};

/// Minimum window length used by the course data sets.
pub const DEFAULT_MIN_LENGTH: usize = 10;

/// Find the longest run of `true` in `mask`.
///
/// The mask is treated as if bounded by missing periods on both sides, so
/// runs touching either end count. When several runs share the maximum
/// length the earliest one wins. An all-`false` (or empty) mask gives
/// `Window::empty()`.
pub fn find_longest_window(mask: &[bool]) -> Window {
    let mut best = Window::empty();
    let mut run_start: Option<usize> = None;

    // Index `mask.len()` acts as the trailing sentinel.
    for idx in 0..=mask.len() {
        let observed = mask.get(idx).copied().unwrap_or(false);
        match (observed, run_start) {
            (true, None) => run_start = Some(idx),
            (false, Some(start)) => {
                // Strictly longer only: ties keep the earlier run.
                if idx - start > best.len() {
                    best = Window::new(start, idx).unwrap_or(best);
                }
                run_start = None;
            }
            _ => {}
        }
    }

    best
}

/// Accept `window` if it spans at least `min_length` periods.
///
/// Looks only at the window's length, never at the data behind it.
pub fn validate_window(window: Window, min_length: usize) -> Result<Window, SkipReason> {
    if window.is_empty() || window.len() < min_length {
        return Err(SkipReason::InsufficientWindow {
            length: window.len(),
            required: min_length,
        });
    }
    Ok(window)
}
