// Copyright 2022 Ryan Seipp
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Incremental HTTP/1.1 request-head parser.
//!
//! The parser walks whatever bytes have been received so far and reports one
//! of three outcomes: the head is complete, more bytes are needed, or the
//! input can never become a valid request. Callers re-run it after each read;
//! parsing is cheap enough that no state is carried between attempts.

use core::fmt::Display;
use core::str::from_utf8_unchecked;

use super::cursor::Cursor;

/// Hard cap on the number of headers accepted in one request.
pub const MAX_HEADERS: usize = 100;

/// Represents possible failures while parsing
#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    /// Invalid byte in method.
    Method,
    /// Invalid byte in target.
    Target,
    /// Invalid HTTP version.
    Version,
    /// Invalid byte in header name.
    HeaderName,
    /// Invalid byte in header value.
    HeaderValue,
    /// Invalid or missing new line.
    NewLine,
    /// More headers than [`MAX_HEADERS`].
    TooManyHeaders,
}

impl ParseError {
    fn description_str(&self) -> &'static str {
        match *self {
            ParseError::Method => "Invalid token in method",
            ParseError::Target => "Invalid token in target",
            ParseError::Version => "Invalid version",
            ParseError::HeaderName => "Invalid token in header name",
            ParseError::HeaderValue => "Invalid token in header value",
            ParseError::NewLine => "Invalid or missing new line",
            ParseError::TooManyHeaders => "Too many headers",
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description_str())
    }
}

impl std::error::Error for ParseError {}

/// Outcome of a parse attempt over a possibly-incomplete buffer.
#[derive(Debug, PartialEq, Eq)]
pub enum Status<T> {
    /// The input parsed fully.
    Complete(T),
    /// The input is a valid prefix; more bytes are required.
    Partial,
}

/// Result whose Err variant is `ParseError`
pub type ParseResult<T> = std::result::Result<Status<T>, ParseError>;

/// A single `name: value` pair borrowed from the request buffer.
#[derive(Debug, PartialEq, Eq)]
pub struct Header<'a> {
    /// Field name, unnormalized.
    pub name: &'a str,
    /// Field value with leading whitespace stripped. Kept as bytes, as
    /// obs-text values are not guaranteed to be UTF-8.
    pub value: &'a [u8],
}

/// A fully parsed request head, borrowing from the receive buffer.
#[derive(Debug)]
pub struct RequestHead<'a> {
    /// Request method, verbatim.
    pub method: &'a str,
    /// Request target, verbatim (path plus optional query).
    pub target: &'a str,
    /// Minor HTTP version; only `HTTP/1.0` and `HTTP/1.1` are accepted.
    pub minor_version: u8,
    /// Header fields in arrival order.
    pub headers: Vec<Header<'a>>,
    /// Length of the head in bytes, including the terminating blank line.
    /// Any bytes past this offset belong to the body.
    pub header_len: usize,
}

/// Tokens as defined by RFC 9110 Section 5.6.2.
#[inline]
fn is_token(b: u8) -> bool {
    matches!(b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.'
        | b'^' | b'_' | b'`' | b'|' | b'~' | b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z')
}

/// Request targets are any visible ASCII; RFC 9112 Section 3.2.
#[inline]
fn is_target_token(b: u8) -> bool {
    b > b' ' && b < 0x7f
}

#[inline]
fn is_header_name_token(b: u8) -> bool {
    is_token(b)
}

/// Field values admit HTAB, SP, visible ASCII and obs-text.
#[inline]
fn is_header_value_token(b: u8) -> bool {
    b == b'\t' || (b >= b' ' && b != 0x7f)
}

/// Parses a request head from the bytes received so far.
///
/// # Example
/// ```
/// # use emberd::http::parser::{parse_request_head, ParseError, Status};
/// # fn main() -> Result<(), ParseError> {
/// let head = match parse_request_head(b"GET /index.html HTTP/1.1\r\n\r\n")? {
///     Status::Complete(head) => head,
///     Status::Partial => unreachable!(),
/// };
/// assert_eq!("GET", head.method);
/// assert_eq!("/index.html", head.target);
/// assert_eq!(1, head.minor_version);
/// # Ok(())
/// # }
/// ```
pub fn parse_request_head(buf: &[u8]) -> ParseResult<RequestHead<'_>> {
    let mut cur = Cursor::new(buf);

    let method = match parse_method(&mut cur)? {
        Status::Complete(method) => method,
        Status::Partial => return Ok(Status::Partial),
    };
    let target = match parse_target(&mut cur)? {
        Status::Complete(target) => target,
        Status::Partial => return Ok(Status::Partial),
    };
    let minor_version = match parse_version(&mut cur)? {
        Status::Complete(minor) => minor,
        Status::Partial => return Ok(Status::Partial),
    };
    let headers = match parse_headers(&mut cur)? {
        Status::Complete(headers) => headers,
        Status::Partial => return Ok(Status::Partial),
    };

    Ok(Status::Complete(RequestHead {
        method,
        target,
        minor_version,
        headers,
        header_len: cur.consumed(),
    }))
}

fn parse_method<'a>(cur: &mut Cursor<'a>) -> ParseResult<&'a str> {
    let token = cur.take_while(is_token);
    match cur.peek() {
        None => Ok(Status::Partial),
        Some(b' ') if !token.is_empty() => {
            cur.bump();
            // SAFETY: is_token admits only ASCII bytes, which are valid UTF-8.
            Ok(Status::Complete(unsafe { from_utf8_unchecked(token) }))
        }
        Some(_) => Err(ParseError::Method),
    }
}

fn parse_target<'a>(cur: &mut Cursor<'a>) -> ParseResult<&'a str> {
    let token = cur.take_while(is_target_token);
    match cur.peek() {
        None => Ok(Status::Partial),
        Some(b' ') if !token.is_empty() => {
            cur.bump();
            // SAFETY: is_target_token admits only ASCII bytes.
            Ok(Status::Complete(unsafe { from_utf8_unchecked(token) }))
        }
        Some(_) => Err(ParseError::Target),
    }
}

fn parse_version(cur: &mut Cursor<'_>) -> ParseResult<u8> {
    for expected in *b"HTTP/1." {
        match cur.bump() {
            None => return Ok(Status::Partial),
            Some(b) if b == expected => {}
            Some(_) => return Err(ParseError::Version),
        }
    }

    let minor = match cur.bump() {
        None => return Ok(Status::Partial),
        Some(b'0') => 0,
        Some(b'1') => 1,
        Some(_) => return Err(ParseError::Version),
    };

    match expect_crlf(cur)? {
        Status::Complete(()) => Ok(Status::Complete(minor)),
        Status::Partial => Ok(Status::Partial),
    }
}

fn parse_headers<'a>(cur: &mut Cursor<'a>) -> ParseResult<Vec<Header<'a>>> {
    let mut headers = Vec::new();

    loop {
        match cur.peek() {
            None => return Ok(Status::Partial),
            // A bare CRLF terminates the head.
            Some(b'\r') => {
                cur.bump();
                return match cur.bump() {
                    None => Ok(Status::Partial),
                    Some(b'\n') => Ok(Status::Complete(headers)),
                    Some(_) => Err(ParseError::NewLine),
                };
            }
            Some(_) => {}
        }

        if headers.len() == MAX_HEADERS {
            return Err(ParseError::TooManyHeaders);
        }

        let name = cur.take_while(is_header_name_token);
        match cur.peek() {
            None => return Ok(Status::Partial),
            Some(b':') if !name.is_empty() => {
                cur.bump();
            }
            Some(_) => return Err(ParseError::HeaderName),
        }

        cur.take_while(|b| b == b' ' || b == b'\t');
        let value = cur.take_while(is_header_value_token);
        match cur.peek() {
            None => return Ok(Status::Partial),
            Some(b'\r') => {}
            Some(_) => return Err(ParseError::HeaderValue),
        }
        match expect_crlf(cur)? {
            Status::Complete(()) => {}
            Status::Partial => return Ok(Status::Partial),
        }

        headers.push(Header {
            // SAFETY: is_header_name_token admits only ASCII bytes.
            name: unsafe { from_utf8_unchecked(name) },
            value,
        });
    }
}

fn expect_crlf(cur: &mut Cursor<'_>) -> ParseResult<()> {
    match cur.bump() {
        None => return Ok(Status::Partial),
        Some(b'\r') => {}
        Some(_) => return Err(ParseError::NewLine),
    }
    match cur.bump() {
        None => Ok(Status::Partial),
        Some(b'\n') => Ok(Status::Complete(())),
        Some(_) => Err(ParseError::NewLine),
    }
}

#[cfg(test)]
mod test {
    use super::{parse_request_head, ParseError, Status, MAX_HEADERS};

    fn complete(buf: &[u8]) -> super::RequestHead<'_> {
        match parse_request_head(buf) {
            Ok(Status::Complete(head)) => head,
            other => panic!("expected complete head, got {other:?}"),
        }
    }

    #[test]
    fn parses_request_line_and_headers() {
        let head = complete(b"GET /index.html HTTP/1.1\r\nHost: x\r\nAccept: */*\r\n\r\n");
        assert_eq!("GET", head.method);
        assert_eq!("/index.html", head.target);
        assert_eq!(1, head.minor_version);
        assert_eq!(2, head.headers.len());
        assert_eq!("Host", head.headers[0].name);
        assert_eq!(b"x", head.headers[0].value);
        assert_eq!("Accept", head.headers[1].name);
        assert_eq!(b"*/*", head.headers[1].value);
    }

    #[test]
    fn every_proper_prefix_is_partial() {
        let req = b"POST /submit HTTP/1.0\r\nHost: example.org\r\nContent-Length: 2\r\n\r\n";
        for end in 0..req.len() {
            assert_eq!(
                Ok(Status::Partial),
                parse_request_head(&req[..end]).map(|s| match s {
                    Status::Partial => Status::Partial,
                    Status::Complete(_) => Status::Complete(()),
                }),
                "prefix of {end} bytes"
            );
        }
        assert_eq!(req.len(), complete(req).header_len);
    }

    #[test]
    fn header_len_marks_start_of_body() {
        let head = complete(b"POST /x.py HTTP/1.1\r\nHost: x\r\n\r\nhello");
        assert_eq!(b"POST /x.py HTTP/1.1\r\nHost: x\r\n\r\n".len(), head.header_len);
    }

    #[test]
    fn accepts_asterisk_form_target() {
        let head = complete(b"OPTIONS * HTTP/1.1\r\n\r\n");
        assert_eq!("OPTIONS", head.method);
        assert_eq!("*", head.target);
    }

    #[test]
    fn accepts_minor_version_zero() {
        let head = complete(b"GET / HTTP/1.0\r\n\r\n");
        assert_eq!(0, head.minor_version);
    }

    #[test]
    fn rejects_invalid_method_byte() {
        assert_eq!(Err(ParseError::Method), parse_request_head(b"G=T / HTTP/1.1\r\n\r\n").map(|_| ()));
        assert_eq!(Err(ParseError::Method), parse_request_head(b"\rGET / HTTP/1.1\r\n\r\n").map(|_| ()));
    }

    #[test]
    fn rejects_unsupported_versions() {
        assert_eq!(Err(ParseError::Version), parse_request_head(b"GET / HTTP/2.0\r\n\r\n").map(|_| ()));
        assert_eq!(Err(ParseError::Version), parse_request_head(b"GET / HTTP/1.2\r\n\r\n").map(|_| ()));
        assert_eq!(Err(ParseError::Version), parse_request_head(b"GET / FTP/1.1\r\n\r\n").map(|_| ()));
    }

    #[test]
    fn rejects_bare_lf_line_ending() {
        assert_eq!(
            Err(ParseError::NewLine),
            parse_request_head(b"GET / HTTP/1.1\nHost: x\r\n\r\n").map(|_| ())
        );
    }

    #[test]
    fn rejects_empty_header_name() {
        assert_eq!(
            Err(ParseError::HeaderName),
            parse_request_head(b"GET / HTTP/1.1\r\n: v\r\n\r\n").map(|_| ())
        );
    }

    #[test]
    fn rejects_control_byte_in_header_value() {
        assert_eq!(
            Err(ParseError::HeaderValue),
            parse_request_head(b"GET / HTTP/1.1\r\nHost: a\x01b\r\n\r\n").map(|_| ())
        );
    }

    #[test]
    fn keeps_internal_whitespace_in_header_value() {
        let head = complete(b"GET / HTTP/1.1\r\nX-Pad:  a b\tc\r\n\r\n");
        assert_eq!(b"a b\tc", head.headers[0].value);
    }

    #[test]
    fn parses_exactly_max_headers() {
        let mut req = String::from("GET / HTTP/1.1\r\n");
        for i in 0..MAX_HEADERS {
            req.push_str(&format!("X-{i}: {i}\r\n"));
        }
        req.push_str("\r\n");
        assert_eq!(MAX_HEADERS, complete(req.as_bytes()).headers.len());
    }

    #[test]
    fn rejects_more_than_max_headers() {
        let mut req = String::from("GET / HTTP/1.1\r\n");
        for i in 0..=MAX_HEADERS {
            req.push_str(&format!("X-{i}: {i}\r\n"));
        }
        req.push_str("\r\n");
        assert_eq!(
            Err(ParseError::TooManyHeaders),
            parse_request_head(req.as_bytes()).map(|_| ())
        );
    }

    #[test]
    fn canonical_serialization_round_trips() {
        let original = complete(b"GET /a/b?q=1 HTTP/1.1\r\nHost: h\r\nAccept: */*\r\n\r\n");

        let mut canonical = format!(
            "{} {} HTTP/1.{}\r\n",
            original.method, original.target, original.minor_version
        );
        for header in &original.headers {
            canonical.push_str(header.name);
            canonical.push_str(": ");
            canonical.push_str(std::str::from_utf8(header.value).unwrap());
            canonical.push_str("\r\n");
        }
        canonical.push_str("\r\n");

        let reparsed = complete(canonical.as_bytes());
        assert_eq!(original.method, reparsed.method);
        assert_eq!(original.target, reparsed.target);
        assert_eq!(original.minor_version, reparsed.minor_version);
        assert_eq!(original.headers, reparsed.headers);
    }
}
