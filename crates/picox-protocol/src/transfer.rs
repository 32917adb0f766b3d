//! File transfer codec.
//!
//! Uploads travel as hex so arbitrary bytes (quotes, backslashes, control
//! characters, NUL) survive a text console without any escaping. Downloads
//! come back as printed text and only need their line endings normalised.

/// Hex-encode a payload for upload.
pub fn encode_upload(data: &[u8]) -> String {
    hex::encode(data)
}

/// Decode a hex payload, the inverse of [`encode_upload`].
pub fn decode_upload(encoded: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(encoded)
}

/// Normalise the line endings of downloaded text to `\n`.
pub fn normalize_download(text: &str) -> String {
    text.replace("\r\r\n", "\n").replace("\r\n", "\n")
}

/// Check whether a remote path can be substituted into a command template.
///
/// Templates quote paths with both quote styles and are evaluated twice on
/// the board, so quotes, backslashes and control characters are refused.
pub fn is_safe_remote_path(path: &str) -> bool {
    !path.is_empty()
        && !path
            .chars()
            .any(|c| c == '\'' || c == '"' || c == '\\' || c.is_control())
}

/// Split a remote path into its parent directory and final component.
///
/// Bare names have no parent and live in the current directory.
pub fn split_remote_path(path: &str) -> (Option<&str>, &str) {
    let trimmed = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };
    match trimmed.rfind('/') {
        Some(0) => (Some("/"), &trimmed[1..]),
        Some(idx) => (Some(&trimmed[..idx]), &trimmed[idx + 1..]),
        None => (None, trimmed),
    }
}
