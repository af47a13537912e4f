//! Utilities for sanitizing error messages and bounding captured text.

/// Removes control characters (0x00-0x1F except tab, newline, carriage
/// return) from an error message.
pub fn sanitize_error_message(message: &str) -> String {
    message
        .chars()
        .filter(|c| {
            let code = *c as u32;
            code >= 0x20 || code == 0x09 || code == 0x0A || code == 0x0D
        })
        .collect()
}

/// Cuts `text` to at most `max_bytes` bytes without splitting a UTF-8 char.
pub fn truncate_to_char_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Sanitizes an error message and truncates it to `MAX_ERROR_MESSAGE_LENGTH`,
/// noting the original length when it was cut.
pub fn truncate_error(message: &str) -> String {
    let sanitized = sanitize_error_message(message);

    if sanitized.len() > crate::config::MAX_ERROR_MESSAGE_LENGTH {
        let truncate_len = crate::config::MAX_ERROR_MESSAGE_LENGTH.saturating_sub(50);
        format!(
            "{}... (truncated, original length: {} chars)",
            truncate_to_char_boundary(&sanitized, truncate_len),
            sanitized.len()
        )
    } else {
        sanitized
    }
}
