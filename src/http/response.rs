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

//! Response header construction.
//!
//! Header layouts are fixed templates. Success responses echo the request's
//! minor HTTP version; error responses are always `HTTP/1.1` and carry an
//! empty body.

use std::io::Write;
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use super::HttpError;

/// RFC 1123 date layout, always rendered in GMT.
const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Formats a timestamp for the `Date` and `Last-Modified` headers.
pub fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(DATE_FORMAT).to_string()
}

/// Formats the current time for the `Date` header.
pub fn http_date_now() -> String {
    Utc::now().format(DATE_FORMAT).to_string()
}

/// Builds the header block for a 200 response carrying a body.
pub fn ok_header(
    minor_version: u8,
    date: &str,
    signature: &str,
    last_modified: &str,
    content_length: usize,
    content_type: &str,
) -> String {
    format!(
        "HTTP/1.{minor_version} 200 OK\r\nDate: {date}\r\nServer: {signature}\r\n\
         Last-Modified: {last_modified}\r\nContent-Length: {content_length}\r\n\
         Content-Type: {content_type}\r\n\r\n"
    )
}

/// Builds the header block for an OPTIONS response.
pub fn options_header(minor_version: u8, date: &str, signature: &str) -> String {
    format!(
        "HTTP/1.{minor_version} 200 OK\r\nDate: {date}\r\nConnection: close\r\n\
         Server: {signature}\r\nContent-Length: 0\r\nAllow: GET, POST, OPTIONS\r\n\r\n"
    )
}

/// Builds the header block for an error response. The body is always empty.
pub fn error_header(error: HttpError, date: &str, signature: &str) -> String {
    format!(
        "HTTP/1.1 {} {}\r\nDate: {date}\r\nConnection: close\r\nServer: {signature}\r\n\
         Content-Length: 0\r\nContent-Type:text/html\r\n\r\n",
        error.status_code(),
        error.reason()
    )
}

/// Resolves a resource path to the content type for its extension.
///
/// The extension is whatever follows the rightmost `.` in the full path, so
/// a path with no dot anywhere has no type. Unknown extensions are reported
/// by the caller as an unsupported media type.
pub fn content_type(path: &str) -> Option<&'static str> {
    let extension = &path[path.rfind('.')? + 1..];

    match extension {
        "txt" => Some("text/plain"),
        "htm" | "html" | "py" | "php" => Some("text/html"),
        "gif" => Some("image/gif"),
        "jpg" | "jpeg" | "ico" => Some("image/jpeg"),
        "mpg" | "mpeg" | "mkv" => Some("video/mpeg"),
        "doc" | "docx" => Some("application/msword"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

/// Writes a full response, header then body, until every byte is out.
pub(crate) fn send_response<S: Write>(
    stream: &mut S,
    header: &[u8],
    body: &[u8],
) -> Result<(), HttpError> {
    stream
        .write_all(header)
        .and_then(|_| stream.write_all(body))
        .map_err(|_| HttpError::InternalServerError)
}
