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

//! Owned request model and the socket read loop that produces it.

use std::io::Read;

use super::parser::{parse_request_head, RequestHead, Status};
use super::HttpError;

/// Maximum size of a request head plus any body bytes received with it.
pub const MAX_REQUEST_SIZE: usize = 4096;

/// A parsed request with owned storage, valid for one iteration of the
/// connection loop.
#[derive(Debug)]
pub struct Request {
    /// Request method, verbatim.
    pub method: String,
    /// Request target (path plus optional query string).
    pub path: String,
    /// Minor HTTP version (0 or 1).
    pub minor_version: u8,
    /// Header pairs in arrival order.
    pub headers: Vec<(String, String)>,
    /// Body bytes that arrived in the same buffer as the head, if any.
    pub body: Option<Vec<u8>>,
}

impl Request {
    fn from_head(head: RequestHead<'_>, body: Option<Vec<u8>>) -> Self {
        Request {
            method: head.method.to_owned(),
            path: head.target.to_owned(),
            minor_version: head.minor_version,
            headers: head
                .headers
                .iter()
                .map(|h| (h.name.to_owned(), String::from_utf8_lossy(h.value).into_owned()))
                .collect(),
            body,
        }
    }
}

/// What the read loop produced.
#[derive(Debug)]
pub enum ReadOutcome {
    /// A complete request arrived.
    Request(Request),
    /// The peer closed the connection, the receive timed out, or the read
    /// failed. No response is owed.
    Closed,
}

/// Reads from `stream` until a complete request head is buffered.
///
/// The buffer is a fixed [`MAX_REQUEST_SIZE`] bytes; a request that fills it
/// without completing is rejected as a bad request. Bytes past the head are
/// returned as the request body.
pub fn read_request<R: Read>(stream: &mut R) -> Result<ReadOutcome, HttpError> {
    let mut buf = [0u8; MAX_REQUEST_SIZE];
    let mut filled = 0;

    loop {
        let n = match stream.read(&mut buf[filled..]) {
            Ok(0) => return Ok(ReadOutcome::Closed),
            Ok(n) => n,
            Err(_) => return Ok(ReadOutcome::Closed),
        };
        filled += n;

        match parse_request_head(&buf[..filled]) {
            Ok(Status::Complete(head)) => {
                let body = (filled > head.header_len).then(|| buf[head.header_len..filled].to_vec());
                return Ok(ReadOutcome::Request(Request::from_head(head, body)));
            }
            Ok(Status::Partial) => {
                // Head still incomplete with a full buffer: request too large.
                if filled == buf.len() {
                    return Err(HttpError::BadRequest);
                }
            }
            Err(_) => return Err(HttpError::BadRequest),
        }
    }
}
