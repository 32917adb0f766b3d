//! Response extraction and cleaning.
//!
//! A raw response holds everything the board sent back for one command: the
//! echo of the framed command (trailer included), the command's output, the
//! marker printed by the trailer and the next prompt. The payload is what
//! lies between the last trailer and the marker.

use crate::error::{ProtocolError, RemoteError, ResponseError};
use crate::markers::{
    BLOCK_PROMPT, EOM_TRAILER, EOR_MARKER, FAILURE_MARKER, PRIMARY_PROMPT, TERMINATOR,
    TRACEBACK_HEADER,
};

/// Number of trailing characters of a raw response quoted in error messages.
const ERROR_CONTEXT_CHARS: usize = 80;

/// Locate the payload inside a raw response.
///
/// The payload starts right after the last [`EOM_TRAILER`] and stops at the
/// last [`EOR_MARKER`] after that point. If there is no marker but the text
/// ends with the primary prompt, everything after the trailer is taken.
///
/// Returns `None` if the payload could not be located.
pub fn extract_payload(text: &str) -> Option<&str> {
    // The last trailer is the one in the echo, even when the output itself
    // happens to contain the trailer text.
    let start = text.rfind(EOM_TRAILER)? + EOM_TRAILER.len();
    let rest = &text[start..];

    match rest.rfind(EOR_MARKER) {
        Some(end) => Some(&rest[..end]),
        None if text.ends_with(PRIMARY_PROMPT) => {
            log::trace!("end-of-response marker missing, falling back to prompt");
            Some(rest)
        }
        None => None,
    }
}

/// Normalise an extracted payload.
///
/// Strips leading whitespace, collapses `\r\r\n`, removes a leading block
/// continuation prompt and drops exactly one trailing `\r\n`.
pub fn clean_payload(payload: &str) -> Result<String, ProtocolError> {
    // Some serial stacks double the carriage return.
    let collapsed = payload.trim_start().replace("\r\r\n", "\n");

    let mut text = collapsed.as_str();
    if text.starts_with(BLOCK_PROMPT) {
        text = strip_block_prompt(text)?;
    }
    let text = text.strip_suffix(TERMINATOR).unwrap_or(text);

    Ok(text.to_string())
}

/// Remove the `...` continuation prompt and its alignment characters.
///
/// Observed prompt spacing is either five or six characters wide, told apart
/// by whether the sixth character is whitespace.
fn strip_block_prompt(text: &str) -> Result<&str, ProtocolError> {
    let width = match text.as_bytes().get(5) {
        Some(b) if b.is_ascii_whitespace() => 6,
        Some(_) => 5,
        None => return Err(ProtocolError::BlockPrompt(text.to_string())),
    };
    text.get(width..)
        .ok_or_else(|| ProtocolError::BlockPrompt(text.to_string()))
}

/// Turn a raw response into the command's output.
///
/// Fails with [`RemoteError`] when the output ends with [`FAILURE_MARKER`],
/// and with [`ProtocolError::MalformedResponse`] when no payload can be
/// located.
pub fn clean_response(raw: &str) -> Result<String, ResponseError> {
    let raw = raw.trim();

    let Some(payload) = extract_payload(raw) else {
        // A read cut short by the failure threshold never sees the marker.
        if let Some(exception) = failure_in_raw(raw) {
            return Err(RemoteError::new(exception).into());
        }
        return Err(ProtocolError::MalformedResponse(format!(
            "no payload found in response ending {:?}",
            tail(raw)
        ))
        .into());
    };

    let cleaned = clean_payload(payload)?;
    if let Some(exception) = cleaned.strip_suffix(FAILURE_MARKER) {
        return Err(RemoteError::new(exception).into());
    }
    Ok(cleaned)
}

/// Extract the exception text from a raw response that ends with the failure
/// marker but has no end-of-response marker.
fn failure_in_raw(raw: &str) -> Option<String> {
    let before = raw.strip_suffix(FAILURE_MARKER)?;
    let region = match before.rfind(EOM_TRAILER) {
        Some(idx) => &before[idx + EOM_TRAILER.len()..],
        None => before,
    };
    Some(region.trim_matches(['\r', '\n']).to_string())
}

/// Check a cleaned payload for an uncaught exception traceback.
///
/// Unwrapped commands that raise in the REPL print a traceback instead of the
/// failure marker.
pub fn check_traceback(cleaned: &str) -> Result<(), RemoteError> {
    if cleaned.starts_with(TRACEBACK_HEADER) {
        Err(RemoteError::new(cleaned))
    } else {
        Ok(())
    }
}

/// Last few characters of a string, for error messages.
fn tail(text: &str) -> &str {
    match text.char_indices().rev().nth(ERROR_CONTEXT_CHARS - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framer::frame;
    use crate::markers::EOR_TOKEN;
    use proptest::prelude::*;

    /// What the board sends back for a command that printed `output`.
    fn board_reply(command: &str, is_block: bool, output: &str) -> String {
        let mut reply = String::from(">>> ");
        reply.push_str(command);
        reply.push_str(EOM_TRAILER);
        reply.push_str("\r\n");
        if is_block {
            reply.push_str("... \r\n");
        }
        reply.push_str(output);
        reply.push_str(EOR_TOKEN);
        reply
    }

    #[test]
    fn test_clean_simple_response() {
        let raw = board_reply("x = 1 + 1; print(x)", false, "2\r\n");
        assert_eq!(clean_response(&raw).unwrap(), "2");
    }

    #[test]
    fn test_clean_empty_output() {
        let raw = board_reply("x = 1", false, "");
        assert_eq!(clean_response(&raw).unwrap(), "");
    }

    #[test]
    fn test_clean_block_response_six_wide() {
        let raw = board_reply("for i in range(2): print(i)", true, "0\r\n1\r\n");
        assert_eq!(clean_response(&raw).unwrap(), "0\r\n1");
    }

    #[test]
    fn test_block_prompt_five_wide() {
        assert_eq!(clean_payload("...\r\nabc\r\n").unwrap(), "abc");
        assert_eq!(clean_payload("... ab\r\n").unwrap(), "b");
    }

    #[test]
    fn test_block_prompt_too_short() {
        let err = clean_payload("...").unwrap_err();
        assert!(matches!(err, ProtocolError::BlockPrompt(_)));
    }

    #[test]
    fn test_only_one_trailing_terminator_dropped() {
        assert_eq!(clean_payload("a\r\n\r\n").unwrap(), "a\r\n");
    }

    #[test]
    fn test_doubled_carriage_return_collapsed() {
        assert_eq!(clean_payload("a\r\r\nb").unwrap(), "a\nb");
    }

    #[test]
    fn test_last_trailer_wins() {
        // The command prints the trailer text itself.
        let output = format!("{}\r\nreal\r\n", EOM_TRAILER);
        let raw = board_reply("print(t)", false, &output);
        assert_eq!(clean_response(&raw).unwrap(), "real");
    }

    #[test]
    fn test_prompt_fallback_without_marker() {
        let raw = format!("print(1){}\r\n1\r\n>>>", EOM_TRAILER);
        let payload = extract_payload(&raw).unwrap();
        assert_eq!(payload, "\r\n1\r\n>>>");
    }

    #[test]
    fn test_missing_trailer_is_malformed() {
        let err = clean_response("garbage\r\n>>>").unwrap_err();
        assert!(matches!(err, ResponseError::Protocol(ProtocolError::MalformedResponse(_))));
    }

    #[test]
    fn test_missing_end_is_malformed() {
        let raw = format!("print(1){}\r\n1\r\n", EOM_TRAILER);
        let err = clean_response(&raw).unwrap_err();
        assert!(matches!(err, ResponseError::Protocol(_)));
    }

    #[test]
    fn test_failure_marker_in_payload() {
        let output = format!("division by zero{}\r\n", FAILURE_MARKER);
        let raw = board_reply("exec('...')", false, &output);
        match clean_response(&raw) {
            Err(ResponseError::Remote(e)) => assert_eq!(e.exception, "division by zero"),
            other => panic!("expected remote error, got {:?}", other),
        }
    }

    #[test]
    fn test_failure_exception_text_kept_verbatim() {
        let output = format!("bad  value {}\r\n", FAILURE_MARKER);
        let raw = board_reply("exec('...')", false, &output);
        match clean_response(&raw) {
            Err(ResponseError::Remote(e)) => assert_eq!(e.exception, "bad  value "),
            other => panic!("expected remote error, got {:?}", other),
        }
    }

    #[test]
    fn test_failure_marker_in_truncated_raw() {
        let raw = format!(
            "exec('print(f\\\"{{str(e)}}{}\\\")'){}\r\nno such file{}",
            FAILURE_MARKER, EOM_TRAILER, FAILURE_MARKER
        );
        match clean_response(&raw) {
            Err(ResponseError::Remote(e)) => assert_eq!(e.exception, "no such file"),
            other => panic!("expected remote error, got {:?}", other),
        }
    }

    #[test]
    fn test_check_traceback() {
        let tb = "Traceback (most recent call last):\r\n  File \"<stdin>\", line 1\r\nZeroDivisionError: divide by zero";
        let err = check_traceback(tb).unwrap_err();
        assert!(err.exception.contains("divide by zero"));
        assert!(check_traceback("fine").is_ok());
    }

    #[test]
    fn test_tail_is_char_safe() {
        let text = "é".repeat(200);
        assert_eq!(tail(&text).chars().count(), ERROR_CONTEXT_CHARS);
        assert_eq!(tail("short"), "short");
    }

    proptest! {
        #[test]
        fn prop_extract_recovers_printed_text(
            command in "[a-z0-9 =+()]{1,40}",
            printed in "[A-Za-z0-9 ,:]{0,60}",
        ) {
            let framed = frame(&command, false);
            let echo = framed.trim_end_matches(TERMINATOR);
            let output = if printed.is_empty() { String::new() } else { format!("{}\r\n", printed) };
            let raw = format!("{}\r\n{}{}", echo, output, EOR_TOKEN);
            let cleaned = clean_response(&raw).unwrap();
            prop_assert_eq!(cleaned, printed.trim_start().to_string());
        }
    }
}
