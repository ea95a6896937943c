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

//! Per-connection request/response state machine.

use std::fs;
use std::io::{Read, Write};
use std::time::SystemTime;

use log::error;

use super::cgi::{self, Interpreter};
use super::request::{read_request, ReadOutcome, Request};
use super::response::{
    content_type, error_header, http_date, http_date_now, ok_header, options_header, send_response,
};
use super::{HttpError, ServerContext};

/// Drives one accepted connection to completion.
///
/// Requests are answered in sequence on the same connection until the peer
/// goes away, the receive timeout fires, or a request fails; any failure is
/// answered with exactly one error response and ends the connection. The
/// stream is generic so the state machine can be exercised without sockets.
pub fn handle_connection<S: Read + Write>(mut stream: S, ctx: &ServerContext) {
    loop {
        let request = match read_request(&mut stream) {
            Ok(ReadOutcome::Request(request)) => request,
            Ok(ReadOutcome::Closed) => break,
            Err(error) => {
                error!("Request rejected: {error}");
                send_error(&mut stream, ctx, error);
                break;
            }
        };

        let outcome = match request.method.as_str() {
            "GET" => handle_get(&request, &mut stream, ctx),
            "POST" => handle_post(&request, &mut stream, ctx),
            "OPTIONS" => handle_options(&request, &mut stream, ctx),
            _ => Err(HttpError::NotImplemented),
        };

        if let Err(error) = outcome {
            error!("{} {} failed: {error}", request.method, request.path);
            send_error(&mut stream, ctx, error);
            break;
        }
        // The request's owned strings and body drop here, before the next
        // parse.
    }
}

/// Splits a request target at the rightmost `?` into path and query string.
fn split_query(target: &str) -> (&str, Option<&str>) {
    match target.rfind('?') {
        Some(pos) => (&target[..pos], Some(&target[pos + 1..])),
        None => (target, None),
    }
}

fn handle_get<S: Write>(
    request: &Request,
    stream: &mut S,
    ctx: &ServerContext,
) -> Result<(), HttpError> {
    let (path, query) = split_query(&request.path);
    let resource = format!("{}{}", ctx.document_root, path);

    let body = match (query, Interpreter::for_path(&resource)) {
        // A query string on a script resource selects CGI execution.
        (Some(query), Some(interpreter)) => cgi::run(interpreter, &resource, Some(query))?,
        (Some(_), None) => return Err(HttpError::BadRequest),
        (None, _) => read_file(&resource)?,
    };

    send_ok(stream, ctx, request.minor_version, &resource, body)
}

fn handle_post<S: Write>(
    request: &Request,
    stream: &mut S,
    ctx: &ServerContext,
) -> Result<(), HttpError> {
    let (path, _) = split_query(&request.path);
    let resource = format!("{}{}", ctx.document_root, path);
    let interpreter = Interpreter::for_path(&resource).ok_or(HttpError::BadRequest)?;

    let argument = request.body.as_deref().map(String::from_utf8_lossy);
    let body = cgi::run(interpreter, &resource, argument.as_deref())?;

    send_ok(stream, ctx, request.minor_version, &resource, body)
}

fn handle_options<S: Write>(
    request: &Request,
    stream: &mut S,
    ctx: &ServerContext,
) -> Result<(), HttpError> {
    let header = options_header(
        request.minor_version,
        &http_date_now(),
        &ctx.server_signature,
    );
    stream
        .write_all(header.as_bytes())
        .map_err(|_| HttpError::InternalServerError)
}

fn send_ok<S: Write>(
    stream: &mut S,
    ctx: &ServerContext,
    minor_version: u8,
    resource: &str,
    body: Vec<u8>,
) -> Result<(), HttpError> {
    let last_modified = http_date(modified_time(resource));
    let content_type = content_type(resource).ok_or(HttpError::UnsupportedMediaType)?;
    let header = ok_header(
        minor_version,
        &http_date_now(),
        &ctx.server_signature,
        &last_modified,
        body.len(),
        content_type,
    );
    send_response(stream, header.as_bytes(), &body)
}

fn send_error<S: Write>(stream: &mut S, ctx: &ServerContext, error: HttpError) {
    let header = error_header(error, &http_date_now(), &ctx.server_signature);
    // The connection is closing either way; a failed write changes nothing.
    let _ = stream.write_all(header.as_bytes());
}

fn read_file(path: &str) -> Result<Vec<u8>, HttpError> {
    let metadata = fs::metadata(path).map_err(|_| HttpError::NotFound)?;
    if metadata.is_dir() {
        return Err(HttpError::NotFound);
    }
    fs::read(path).map_err(|_| HttpError::NotFound)
}

fn modified_time(path: &str) -> SystemTime {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}
