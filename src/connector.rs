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
//! # Connector Response Module
//!
//! The response implementation owned by the host server. It buffers
//! everything a pipeline produces and is turned into a `hyper` response once
//! the pipeline returns.
//!
//! ## Overview
//!
//! `ConnectorResponse` follows the usual servlet response rules:
//!
//! - Headers and cookies added after the response is committed are dropped
//! - Writing past the buffer size commits the response
//! - `send_error`, `send_redirect`, `reset` and `reset_buffer` fail once committed
//! - `send_error` and `send_redirect` suspend the response, so later body
//!   writes are discarded

use crate::cookie::{self, Cookie};
use crate::response::{Response, ResponseError};
use hyper::header::{CONTENT_LANGUAGE, CONTENT_LENGTH, CONTENT_TYPE, LOCATION, SET_COOKIE};
use hyper::Body;
use log::debug;
use std::any::Any;
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

/// Default output buffer size in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// Character encoding reported until one is set explicitly.
pub const DEFAULT_CHARACTER_ENCODING: &str = "ISO-8859-1";

#[derive(Debug)]
struct QueuedCookie {
    cookie: Cookie,
    http_only: bool,
}

#[derive(Debug)]
struct ResponseState {
    status: u16,
    message: Option<String>,
    headers: Vec<(String, String)>,
    cookies: Vec<QueuedCookie>,
    body: Vec<u8>,
    content_count: u64,
    content_type: Option<String>,
    content_length: Option<u64>,
    character_encoding: Option<String>,
    locale: Option<String>,
    buffer_size: usize,
    committed: bool,
    app_committed: bool,
    suspended: bool,
    error: bool,
}

impl Default for ResponseState {
    fn default() -> Self {
        Self {
            status: 200,
            message: None,
            headers: Vec::new(),
            cookies: Vec::new(),
            body: Vec::new(),
            content_count: 0,
            content_type: None,
            content_length: None,
            character_encoding: None,
            locale: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            committed: false,
            app_committed: false,
            suspended: false,
            error: false,
        }
    }
}

impl ResponseState {
    /// Routes headers that have a dedicated field. Returns `true` when handled.
    fn set_special_header(&mut self, name: &str, value: &str) -> bool {
        if name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
            self.content_type = Some(value.to_string());
            true
        } else if name.eq_ignore_ascii_case(CONTENT_LENGTH.as_str()) {
            // Unparseable lengths are dropped rather than forwarded.
            self.content_length = value.trim().parse().ok();
            true
        } else {
            false
        }
    }

    fn queue_cookie(&mut self, cookie: Option<Cookie>, http_only: bool) {
        if self.committed {
            debug!("Ignoring cookie added after commit");
            return;
        }
        if let Some(cookie) = cookie {
            self.cookies.push(QueuedCookie { cookie, http_only });
        }
    }

    fn full_content_type(&self) -> Option<String> {
        let content_type = self.content_type.as_ref()?;
        match &self.character_encoding {
            Some(charset) if !content_type.to_ascii_lowercase().contains("charset=") => {
                Some(format!("{};charset={}", content_type, charset))
            }
            _ => Some(content_type.clone()),
        }
    }

    fn clear_buffer(&mut self) {
        self.body.clear();
        self.content_count = 0;
    }
}

/// The host's own response for one request.
#[derive(Debug, Default)]
pub struct ConnectorResponse {
    state: Mutex<ResponseState>,
}

impl ConnectorResponse {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ResponseState> {
        // Poisoning is ignored; the state stays usable after a stage panics.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Commits the response and converts it into a `hyper` response.
    ///
    /// Each queued cookie becomes its own `Set-Cookie` header. Calling this
    /// twice yields an empty body the second time.
    pub fn commit(&self) -> Result<hyper::Response<Body>, hyper::http::Error> {
        let mut state = self.state();
        state.committed = true;
        state.app_committed = true;

        let mut builder = hyper::Response::builder().status(state.status);
        for (name, value) in &state.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(content_type) = state.full_content_type() {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(locale) = &state.locale {
            builder = builder.header(CONTENT_LANGUAGE, locale.as_str());
        }
        for queued in &state.cookies {
            builder = builder.header(
                SET_COOKIE,
                queued.cookie.to_set_cookie_header(queued.http_only),
            );
        }

        let body = std::mem::take(&mut state.body);
        // Content-Length always reflects the buffered body.
        builder = builder.header(CONTENT_LENGTH, body.len());
        builder.body(Body::from(body))
    }
}

impl Response for ConnectorResponse {
    fn add_cookie(&self, cookie: Option<Cookie>) {
        let http_only = cookie.as_ref().map(|c| c.http_only).unwrap_or(false);
        self.state().queue_cookie(cookie, http_only);
    }

    fn add_cookie_internal_with_http_only(&self, cookie: Option<Cookie>, http_only: bool) {
        self.state().queue_cookie(cookie, http_only);
    }

    fn add_session_cookie_internal(&self, cookie: Option<Cookie>, http_only: bool) {
        let mut state = self.state();
        if state.committed {
            debug!("Ignoring session cookie added after commit");
            return;
        }
        if let Some(cookie) = cookie {
            state.cookies.retain(|queued| !queued.cookie.same_slot(&cookie));
            state.cookies.push(QueuedCookie { cookie, http_only });
        }
    }

    fn cookies(&self) -> Vec<Cookie> {
        self.state().cookies.iter().map(|q| q.cookie.clone()).collect()
    }

    fn generate_cookie_string(&self, cookie: &Cookie, http_only: bool) -> String {
        cookie.to_set_cookie_header(http_only)
    }

    fn add_header(&self, name: &str, value: &str) {
        let mut state = self.state();
        if state.committed || state.set_special_header(name, value) {
            return;
        }
        state.headers.push((name.to_string(), value.to_string()));
    }

    fn set_header(&self, name: &str, value: &str) {
        let mut state = self.state();
        if state.committed || state.set_special_header(name, value) {
            return;
        }
        state.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        state.headers.push((name.to_string(), value.to_string()));
    }

    fn add_int_header(&self, name: &str, value: i64) {
        self.add_header(name, &value.to_string());
    }

    fn set_int_header(&self, name: &str, value: i64) {
        self.set_header(name, &value.to_string());
    }

    fn add_date_header(&self, name: &str, value: SystemTime) {
        match cookie::fmt_http_date(value) {
            Some(date) => self.add_header(name, &date),
            None => debug!("Ignoring out-of-range date for header {}", name),
        }
    }

    fn set_date_header(&self, name: &str, value: SystemTime) {
        match cookie::fmt_http_date(value) {
            Some(date) => self.set_header(name, &date),
            None => debug!("Ignoring out-of-range date for header {}", name),
        }
    }

    fn contains_header(&self, name: &str) -> bool {
        let state = self.state();
        if name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
            return state.content_type.is_some();
        }
        if name.eq_ignore_ascii_case(CONTENT_LENGTH.as_str()) {
            return state.content_length.is_some();
        }
        state.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    fn header(&self, name: &str) -> Option<String> {
        self.header_values(name).into_iter().next()
    }

    fn header_values(&self, name: &str) -> Vec<String> {
        let state = self.state();
        if name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
            return state.full_content_type().into_iter().collect();
        }
        if name.eq_ignore_ascii_case(CONTENT_LENGTH.as_str()) {
            return state.content_length.map(|l| l.to_string()).into_iter().collect();
        }
        state
            .headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
            .collect()
    }

    fn header_names(&self) -> Vec<String> {
        let state = self.state();
        let mut names: Vec<String> = Vec::new();
        for (name, _) in &state.headers {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                names.push(name.clone());
            }
        }
        names
    }

    fn status(&self) -> u16 {
        self.state().status
    }

    fn set_status(&self, status: u16) {
        let mut state = self.state();
        if !state.committed {
            state.status = status;
            state.message = None;
        }
    }

    fn set_status_with_message(&self, status: u16, message: &str) {
        let mut state = self.state();
        if !state.committed {
            state.status = status;
            state.message = Some(message.to_string());
        }
    }

    fn message(&self) -> Option<String> {
        self.state().message.clone()
    }

    fn send_error(&self, status: u16, message: Option<&str>) -> Result<(), ResponseError> {
        let mut state = self.state();
        if state.committed {
            return Err(ResponseError::Committed);
        }
        state.error = true;
        state.status = status;
        state.message = message.map(str::to_string);
        state.clear_buffer();
        state.suspended = true;
        Ok(())
    }

    fn send_redirect(&self, location: &str) -> Result<(), ResponseError> {
        let mut state = self.state();
        if state.committed {
            return Err(ResponseError::Committed);
        }
        state.clear_buffer();
        state.status = 302;
        state.message = None;
        state
            .headers
            .retain(|(n, _)| !n.eq_ignore_ascii_case(LOCATION.as_str()));
        state
            .headers
            .push((LOCATION.as_str().to_string(), location.to_string()));
        state.suspended = true;
        Ok(())
    }

    fn is_error(&self) -> bool {
        self.state().error
    }

    fn set_error(&self) {
        self.state().error = true;
    }

    fn content_type(&self) -> Option<String> {
        self.state().full_content_type()
    }

    fn set_content_type(&self, content_type: &str) {
        let mut state = self.state();
        if !state.committed {
            state.content_type = Some(content_type.to_string());
        }
    }

    fn content_length(&self) -> Option<u64> {
        self.state().content_length
    }

    fn set_content_length(&self, length: u64) {
        let mut state = self.state();
        if !state.committed {
            state.content_length = Some(length);
        }
    }

    fn character_encoding(&self) -> String {
        self.state()
            .character_encoding
            .clone()
            .unwrap_or_else(|| DEFAULT_CHARACTER_ENCODING.to_string())
    }

    fn set_character_encoding(&self, charset: &str) {
        let mut state = self.state();
        if !state.committed {
            state.character_encoding = Some(charset.to_string());
        }
    }

    fn locale(&self) -> Option<String> {
        self.state().locale.clone()
    }

    fn set_locale(&self, locale: &str) {
        let mut state = self.state();
        if !state.committed {
            state.locale = Some(locale.to_string());
        }
    }

    fn write_body(&self, bytes: &[u8]) -> Result<usize, ResponseError> {
        let mut state = self.state();
        if state.suspended {
            return Ok(0);
        }
        state.body.extend_from_slice(bytes);
        state.content_count += bytes.len() as u64;
        if state.body.len() > state.buffer_size {
            state.committed = true;
        }
        Ok(bytes.len())
    }

    fn content_count(&self) -> u64 {
        self.state().content_count
    }

    fn buffer_size(&self) -> usize {
        self.state().buffer_size
    }

    fn set_buffer_size(&self, size: usize) {
        let mut state = self.state();
        if state.committed || !state.body.is_empty() {
            debug!("Ignoring buffer resize after content was written");
            return;
        }
        state.buffer_size = size;
    }

    fn flush_buffer(&self) -> Result<(), ResponseError> {
        self.state().committed = true;
        Ok(())
    }

    fn reset(&self) -> Result<(), ResponseError> {
        let mut state = self.state();
        if state.committed {
            return Err(ResponseError::Committed);
        }
        let buffer_size = state.buffer_size;
        *state = ResponseState {
            buffer_size,
            ..ResponseState::default()
        };
        Ok(())
    }

    fn reset_buffer(&self) -> Result<(), ResponseError> {
        let mut state = self.state();
        if state.committed {
            return Err(ResponseError::Committed);
        }
        state.clear_buffer();
        Ok(())
    }

    fn is_committed(&self) -> bool {
        self.state().committed
    }

    fn is_app_committed(&self) -> bool {
        let state = self.state();
        state.app_committed || state.committed
    }

    fn set_app_committed(&self, committed: bool) {
        self.state().app_committed = committed;
    }

    fn is_suspended(&self) -> bool {
        self.state().suspended
    }

    fn set_suspended(&self, suspended: bool) {
        self.state().suspended = suspended;
    }

    fn finish_response(&self) -> Result<(), ResponseError> {
        let mut state = self.state();
        state.committed = true;
        state.app_committed = true;
        state.suspended = true;
        Ok(())
    }

    fn encode_url(&self, url: &str) -> String {
        url.to_string()
    }

    fn encode_redirect_url(&self, url: &str) -> String {
        url.to_string()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
