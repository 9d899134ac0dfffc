// Copyright 2025 Google LLC
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
//! # Response Module
//!
//! The capability surface of an outbound HTTP response as seen by pipeline
//! stages.
//!
//! ## Overview
//!
//! Stages receive a [`SharedResponse`] and drive it through the [`Response`]
//! trait. The host supplies the concrete implementation
//! ([`crate::connector::ConnectorResponse`]); decorators such as
//! [`crate::wrapped::WrappedResponse`] implement the same trait and forward
//! to the response they wrap.
//!
//! All operations take `&self`: a response is handed around as an `Arc` and
//! keeps its mutable state behind a lock.

use crate::cookie::Cookie;
use std::any::Any;
use std::io;
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;

/// A response shared between the host and the pipeline stages of one request.
pub type SharedResponse = Arc<dyn Response>;

#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("Response has already been committed")]
    Committed,
    #[error("Response I/O failed: {0}")]
    Io(#[from] io::Error),
}

pub trait Response: Send + Sync + 'static {
    /// Queues a cookie. `None` mirrors a null cookie handed in by application
    /// code and is ignored by the host.
    fn add_cookie(&self, cookie: Option<Cookie>);

    /// Queues a cookie on behalf of the container. The cookie is always sent
    /// http-only.
    fn add_cookie_internal(&self, cookie: Option<Cookie>) {
        self.add_cookie_internal_with_http_only(cookie, true);
    }

    /// Queues a cookie on behalf of the container with an explicit http-only flag.
    fn add_cookie_internal_with_http_only(&self, cookie: Option<Cookie>, http_only: bool);

    /// Queues a session cookie, replacing any previously queued cookie for the
    /// same slot.
    fn add_session_cookie_internal(&self, cookie: Option<Cookie>, http_only: bool);

    /// Cookies queued so far, in insertion order.
    fn cookies(&self) -> Vec<Cookie>;

    fn generate_cookie_string(&self, cookie: &Cookie, http_only: bool) -> String;

    fn add_header(&self, name: &str, value: &str);
    fn set_header(&self, name: &str, value: &str);
    fn add_int_header(&self, name: &str, value: i64);
    fn set_int_header(&self, name: &str, value: i64);
    fn add_date_header(&self, name: &str, value: SystemTime);
    fn set_date_header(&self, name: &str, value: SystemTime);
    fn contains_header(&self, name: &str) -> bool;
    /// First value of the named header.
    fn header(&self, name: &str) -> Option<String>;
    fn header_values(&self, name: &str) -> Vec<String>;
    fn header_names(&self) -> Vec<String>;

    fn status(&self) -> u16;
    fn set_status(&self, status: u16);
    fn set_status_with_message(&self, status: u16, message: &str);
    /// Reason phrase set alongside the status, if any.
    fn message(&self) -> Option<String>;

    fn send_error(&self, status: u16, message: Option<&str>) -> Result<(), ResponseError>;
    fn send_redirect(&self, location: &str) -> Result<(), ResponseError>;
    fn is_error(&self) -> bool;
    fn set_error(&self);

    fn content_type(&self) -> Option<String>;
    fn set_content_type(&self, content_type: &str);
    fn content_length(&self) -> Option<u64>;
    fn set_content_length(&self, length: u64);
    fn character_encoding(&self) -> String;
    fn set_character_encoding(&self, charset: &str);
    /// Language tag sent as `Content-Language`.
    fn locale(&self) -> Option<String>;
    fn set_locale(&self, locale: &str);

    /// Appends bytes to the response body.
    fn write_body(&self, bytes: &[u8]) -> Result<usize, ResponseError>;
    /// Number of body bytes written so far.
    fn content_count(&self) -> u64;
    fn buffer_size(&self) -> usize;
    fn set_buffer_size(&self, size: usize);
    fn flush_buffer(&self) -> Result<(), ResponseError>;
    fn reset(&self) -> Result<(), ResponseError>;
    fn reset_buffer(&self) -> Result<(), ResponseError>;
    fn is_committed(&self) -> bool;
    fn is_app_committed(&self) -> bool;
    fn set_app_committed(&self, committed: bool);
    fn is_suspended(&self) -> bool;
    fn set_suspended(&self, suspended: bool);
    fn finish_response(&self) -> Result<(), ResponseError>;

    fn encode_url(&self, url: &str) -> String;
    fn encode_redirect_url(&self, url: &str) -> String;

    /// Concrete type access, used to detect decorators already in place.
    fn as_any(&self) -> &dyn Any;
}
