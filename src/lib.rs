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

#![deny(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unused_imports
)]
// Disallow warnings in examples.
#![doc(test(attr(deny(warnings))))]

//! emberd is a small multi-threaded HTTP/1.1 origin server. It serves static
//! files from a configurable document root and runs Python/PHP scripts as
//! CGI-style handlers for dynamic requests.
//!
//! Accepted connections are handed off to a fixed pool of worker threads
//! through a bounded queue; each worker drives a blocking per-connection
//! request/response loop until the client goes away or an error ends it.

pub mod config;
pub mod daemon;
pub mod error;
pub mod http;
pub mod listener;
pub mod logger;
pub mod pool;
pub mod server;
