//! Message content preview for log lines
//!
//! Counts characters rather than bytes so multibyte content is never split.

/// Maximum preview length in characters
pub const PREVIEW_LEN: usize = 50;

/// First [`PREVIEW_LEN`] characters of the content on a single line
pub fn preview_content(content: &str) -> String {
    content
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .take(PREVIEW_LEN)
        .collect()
}
