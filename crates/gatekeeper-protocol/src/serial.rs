//! Token/reply exchange with a companion device over a UART.
//!
//! On arrival the controller writes [`SERIAL_DETECTION_TOKEN`]. The companion
//! answers with a newline-terminated line whose first two bytes decide:
//!
//! ```text
//! -> CAR_DETECTED\n
//! <- OK\n            granted
//! <- NO\n            denied
//! <- anything else   ignored, keep waiting
//! ```
//!
//! Bytes arrive in arbitrary chunks, so classification is done by a small
//! incremental scanner rather than by reading fixed two-byte blocks.

use gatekeeper_core::constants::{SERIAL_DENY_PREFIX, SERIAL_DETECTION_TOKEN, SERIAL_GRANT_PREFIX};

/// Bytes written to announce a vehicle.
#[must_use]
pub fn detection_token() -> &'static [u8] {
    SERIAL_DETECTION_TOKEN.as_bytes()
}

/// Classify a two-byte reply prefix: `Some(true)` grant, `Some(false)` deny,
/// `None` for anything else.
#[must_use]
pub fn classify_prefix(prefix: &[u8; 2]) -> Option<bool> {
    if prefix == SERIAL_GRANT_PREFIX {
        Some(true)
    } else if prefix == SERIAL_DENY_PREFIX {
        Some(false)
    } else {
        None
    }
}

/// Incremental reply classifier.
///
/// Collects the first two bytes of each inbound line. A decisive prefix is
/// reported immediately, without waiting for the rest of the line. A
/// non-decisive line is skipped up to its newline. Stray `\r`/`\n` between
/// lines are ignored.
///
/// # Examples
///
/// ```
/// use gatekeeper_protocol::ReplyScanner;
///
/// let mut scanner = ReplyScanner::new();
/// assert_eq!(scanner.feed(b"BUSY\r\n"), None);
/// assert_eq!(scanner.feed(b"N"), None);
/// assert_eq!(scanner.feed(b"Oxx"), Some(false));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReplyScanner {
    prefix: [u8; 2],
    len: usize,
    discarding: bool,
    ignored: usize,
}

impl ReplyScanner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed received bytes. Returns the decision as soon as one is complete;
    /// bytes after a decisive prefix in the same chunk are dropped.
    pub fn feed(&mut self, bytes: &[u8]) -> Option<bool> {
        for &b in bytes {
            if self.discarding {
                if b == b'\n' {
                    self.discarding = false;
                }
                continue;
            }

            if b == b'\r' || b == b'\n' {
                // Line ended before two bytes were collected.
                if self.len > 0 {
                    self.ignored += 1;
                }
                self.len = 0;
                continue;
            }

            self.prefix[self.len] = b;
            self.len += 1;
            if self.len < self.prefix.len() {
                continue;
            }

            self.len = 0;
            match classify_prefix(&self.prefix) {
                Some(decision) => {
                    self.discarding = false;
                    return Some(decision);
                }
                None => {
                    self.ignored += 1;
                    self.discarding = true;
                }
            }
        }
        None
    }

    /// Number of non-decisive lines skipped so far.
    #[must_use]
    pub fn ignored(&self) -> usize {
        self.ignored
    }

    /// Forget any partial line.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_detection_token_is_newline_terminated() {
        assert_eq!(detection_token(), b"CAR_DETECTED\n");
    }

    #[rstest]
    #[case(b"OK", Some(true))]
    #[case(b"NO", Some(false))]
    #[case(b"ok", None)]
    #[case(b"ON", None)]
    #[case(b"\0\0", None)]
    fn test_classify_prefix(#[case] prefix: &[u8; 2], #[case] expected: Option<bool>) {
        assert_eq!(classify_prefix(prefix), expected);
    }

    #[rstest]
    #[case::grant(b"OK\n", Some(true))]
    #[case::deny(b"NO\n", Some(false))]
    #[case::deny_with_suffix(b"NOxx", Some(false))]
    #[case::grant_crlf(b"\r\nOK\r\n", Some(true))]
    #[case::noise_then_deny(b"XX\nNO\n", Some(false))]
    #[case::noise_containing_prefix(b"XXOK", None)]
    #[case::short_line(b"O\nK\n", None)]
    #[case::empty(b"", None)]
    fn test_feed_single_chunk(#[case] input: &[u8], #[case] expected: Option<bool>) {
        let mut scanner = ReplyScanner::new();
        assert_eq!(scanner.feed(input), expected);
    }

    #[test]
    fn test_feed_split_across_chunks() {
        let mut scanner = ReplyScanner::new();
        assert_eq!(scanner.feed(b"O"), None);
        assert_eq!(scanner.feed(b"K"), Some(true));
    }

    #[test]
    fn test_discard_spans_chunks() {
        let mut scanner = ReplyScanner::new();
        assert_eq!(scanner.feed(b"GARB"), None);
        assert_eq!(scanner.feed(b"AGE OK"), None);
        assert_eq!(scanner.feed(b"\nOK"), Some(true));
        assert_eq!(scanner.ignored(), 1);
    }

    #[test]
    fn test_reset_drops_partial_line() {
        let mut scanner = ReplyScanner::new();
        assert_eq!(scanner.feed(b"N"), None);
        scanner.reset();
        assert_eq!(scanner.feed(b"K"), None);
        assert_eq!(scanner.feed(b"\nOK"), Some(true));
    }
}
