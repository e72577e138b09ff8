//! Marker scanning over the rolling window.
//!
//! A [`Marker`] is one or more byte tokens that must all be present, in order.
//! [`scan`] walks a marker list in priority order and reports the first marker
//! present, so success markers listed ahead of failure or event markers win
//! when several are in the window at once.
//!
//! The modem echoes every command by default, and an echoed SSID, password
//! or host may well contain `OK` or `FAIL`. Final result codes are therefore
//! only accepted at the start of a line; the echo always starts with `AT`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MarkerKind {
    Success,
    Failure,
    Event,
}

#[derive(Debug, Clone, Copy)]
pub struct Marker {
    pub kind: MarkerKind,
    pub tokens: &'static [&'static [u8]],
    /// First token must open a line (or the window)
    pub line_start: bool,
}

impl Marker {
    const fn new(kind: MarkerKind, tokens: &'static [&'static [u8]]) -> Self {
        Self {
            kind,
            tokens,
            line_start: false,
        }
    }

    pub const fn success(tokens: &'static [&'static [u8]]) -> Self {
        Self::new(MarkerKind::Success, tokens)
    }

    pub const fn failure(tokens: &'static [&'static [u8]]) -> Self {
        Self::new(MarkerKind::Failure, tokens)
    }

    pub const fn event(tokens: &'static [&'static [u8]]) -> Self {
        Self::new(MarkerKind::Event, tokens)
    }

    pub const fn at_line_start(mut self) -> Self {
        self.line_start = true;
        self
    }
}

/// Reply to an ordinary AT command.
pub const COMMAND_MARKERS: &[Marker] = &[
    Marker::success(&[b"OK"]).at_line_start(),
    Marker::failure(&[b"ERROR"]).at_line_start(),
    Marker::failure(&[b"FAIL"]).at_line_start(),
];

/// Outcome of the payload written after the `>` prompt.
pub const PAYLOAD_MARKERS: &[Marker] = &[
    Marker::success(&[b"SEND OK"]).at_line_start(),
    Marker::failure(&[b"SEND FAIL"]).at_line_start(),
    Marker::failure(&[b"ERROR"]).at_line_start(),
];

/// `AT+CIPSEND` is ready for the payload once it prints `>`.
pub const PROMPT_MARKERS: &[Marker] = &[
    Marker::success(&[b">"]),
    Marker::failure(&[b"ERROR"]),
    Marker::failure(&[b"link is not valid"]),
];

/// The remote side closed an outbound connection.
pub const CLOSED_MARKERS: &[Marker] = &[
    Marker::success(&[b"CLOSED"]),
    Marker::failure(&[b"ERROR"]),
];

/// Unsolicited inbound data carrying an HTTP request line.
pub const REQUEST_MARKERS: &[Marker] = &[Marker::event(&[b"+IPD", b" HTTP/"])];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Match {
    /// Position of the marker in the list that was scanned
    pub index: usize,
    pub kind: MarkerKind,
    /// Offset of the first token
    pub offset: usize,
    /// One past the last byte of the last token
    pub end: usize,
}

/// First occurrence of `needle` in `haystack`.
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// First occurrence of `needle` that opens a line, at or after `from`.
fn find_line_start(haystack: &[u8], needle: &[u8], mut from: usize) -> Option<usize> {
    loop {
        let at = from + find(&haystack[from..], needle)?;
        if at == 0 || haystack[at - 1] == b'\n' {
            return Some(at);
        }
        from = at + 1;
    }
}

fn locate(haystack: &[u8], marker: &Marker) -> Option<(usize, usize)> {
    let mut cursor = 0;
    let mut first = None;
    for (position, token) in marker.tokens.iter().enumerate() {
        let at = if position == 0 && marker.line_start {
            find_line_start(haystack, token, 0)?
        } else {
            cursor + find(&haystack[cursor..], token)?
        };
        first.get_or_insert(at);
        cursor = at + token.len();
    }
    first.map(|offset| (offset, cursor))
}

pub fn scan(haystack: &[u8], markers: &[Marker]) -> Option<Match> {
    markers.iter().enumerate().find_map(|(index, marker)| {
        locate(haystack, marker).map(|(offset, end)| Match {
            index,
            kind: marker.kind,
            offset,
            end,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_ok_anywhere_in_the_stream() {
        let found = scan(b"AT+CWMODE=3\r\n\r\nOK\r\n", COMMAND_MARKERS).unwrap();
        assert_eq!(found.kind, MarkerKind::Success);
        assert_eq!(found.offset, 15);
        assert_eq!(found.end, 17);
    }

    #[test]
    fn reports_failure_markers() {
        let found = scan(b"+CWJAP:1\r\n\r\nFAIL\r\n", COMMAND_MARKERS).unwrap();
        assert_eq!(found.kind, MarkerKind::Failure);
        assert_eq!(found.index, 2);
    }

    #[test]
    fn priority_list_breaks_ties() {
        // ERROR shows up first in the stream but OK is checked first
        let found = scan(b"ERROR\r\nOK\r\n", COMMAND_MARKERS).unwrap();
        assert_eq!(found.kind, MarkerKind::Success);
    }

    #[test]
    fn success_checked_before_events() {
        let markers = [Marker::success(&[b"OK"]), REQUEST_MARKERS[0]];
        let found = scan(b"+IPD,0,18:GET / HTTP/1.1\r\nOK", &markers).unwrap();
        assert_eq!(found.kind, MarkerKind::Success);
    }

    #[test]
    fn event_tokens_must_appear_in_order() {
        assert!(scan(b"HTTP/1.1\r\n0,CONNECT\r\n+IPD,0,", REQUEST_MARKERS).is_none());

        let window = b"junk+IPD,0,42:GET /LED1 HTTP/1.1\r\n";
        let found = scan(window, REQUEST_MARKERS).unwrap();
        assert_eq!(found.kind, MarkerKind::Event);
        assert_eq!(found.offset, 4);
        assert_eq!(&window[found.end - 6..found.end], b" HTTP/");
    }

    #[test]
    fn path_text_is_not_the_version_token() {
        assert!(scan(b"+IPD,0,20:GET /HTTPS", REQUEST_MARKERS).is_none());
        let window = b"+IPD,0,30:GET /HTTPS HTTP/1.1\r\n";
        let found = scan(window, REQUEST_MARKERS).unwrap();
        assert_eq!(&window[..found.end], b"+IPD,0,30:GET /HTTPS HTTP/");
    }

    #[test]
    fn result_codes_inside_an_echo_are_ignored() {
        let echo = b"AT+CWJAP=\"OK-net\",\"BOOKSHELF\"\r\n";
        assert_eq!(scan(echo, COMMAND_MARKERS), None);

        let mut window = echo.to_vec();
        window.extend_from_slice(b"+CWJAP:1\r\n\r\nFAIL\r\n");
        let found = scan(&window, COMMAND_MARKERS).unwrap();
        assert_eq!(found.kind, MarkerKind::Failure);
        assert_eq!(found.offset, echo.len() + 12);
    }

    #[test]
    fn payload_needs_send_ok() {
        assert_eq!(scan(b"HTTP/1.1 200 OK\r\nRecv 20 bytes\r\n", PAYLOAD_MARKERS), None);
        let found = scan(b"Recv 20 bytes\r\n\r\nSEND OK\r\n", PAYLOAD_MARKERS).unwrap();
        assert_eq!(found.kind, MarkerKind::Success);
        let found = scan(b"Recv 20 bytes\r\n\r\nSEND FAIL\r\n", PAYLOAD_MARKERS).unwrap();
        assert_eq!(found.kind, MarkerKind::Failure);
    }

    #[test]
    fn nothing_present() {
        assert_eq!(scan(b"busy p...\r\n", COMMAND_MARKERS), None);
        assert_eq!(find(b"ab", b"abc"), None);
    }
}
