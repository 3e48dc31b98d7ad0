//! Utility functions and helpers for OnTop

/// Convert a Rust string to a nul-terminated wide string for Windows API
pub fn to_wide_string(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Decode a wide string buffer up to its first nul
pub fn from_wide_buffer(buffer: &[u16]) -> String {
    let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
    String::from_utf16_lossy(&buffer[..len])
}

/// Keep at most `max_units` UTF-16 units of `s`, never splitting a character
pub fn truncate_units(s: &str, max_units: usize) -> String {
    let mut units = 0;
    s.chars()
        .take_while(|c| {
            units += c.len_utf16();
            units <= max_units
        })
        .collect()
}
