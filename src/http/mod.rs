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

//! HTTP/1.1 implementation: request parsing, method handlers, response
//! construction and the per-connection state machine.

mod cgi;
mod connection;
mod cursor;
pub mod parser;
pub mod request;
pub mod response;

pub use connection::handle_connection;

use thiserror::Error;

/// Request-handling failures, mapped 1:1 to HTTP status codes on egress.
///
/// Every fallible handler reports one of these; the connection loop turns it
/// into exactly one error response and closes the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HttpError {
    /// 400 — the request could not be parsed or asked for CGI on a
    /// non-script resource.
    #[error("bad request")]
    BadRequest,
    /// 404 — the resource is missing or the interpreter could not be run.
    #[error("not found")]
    NotFound,
    /// 501 — the method is not one of GET, POST, OPTIONS.
    #[error("not implemented")]
    NotImplemented,
    /// 415 — the resource extension has no known content type.
    #[error("unsupported media type")]
    UnsupportedMediaType,
    /// 500 — the response could not be written out.
    #[error("internal server error")]
    InternalServerError,
}

impl HttpError {
    /// Numeric status code for the response status line.
    pub fn status_code(&self) -> u16 {
        match self {
            HttpError::BadRequest => 400,
            HttpError::NotFound => 404,
            HttpError::NotImplemented => 501,
            HttpError::UnsupportedMediaType => 415,
            HttpError::InternalServerError => 500,
        }
    }

    /// Reason phrase for the response status line.
    pub fn reason(&self) -> &'static str {
        match self {
            HttpError::BadRequest => "Bad Request",
            HttpError::NotFound => "Not Found",
            HttpError::NotImplemented => "Not Implemented",
            HttpError::UnsupportedMediaType => "Unsupported Media Type",
            HttpError::InternalServerError => "Internal Server Error",
        }
    }
}

/// Immutable per-server values every connection handler needs.
#[derive(Debug, Clone)]
pub struct ServerContext {
    /// Filesystem prefix prepended to every request path.
    pub document_root: String,
    /// Literal placed in the `Server:` response header.
    pub server_signature: String,
}
