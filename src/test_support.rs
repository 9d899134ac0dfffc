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
//! Shared helpers for unit tests: a call-recording [`Response`] and a logger
//! that keeps every formatted record in memory.

use crate::connector::ConnectorResponse;
use crate::cookie::Cookie;
use crate::response::{Response, ResponseError};
use log::{LevelFilter, Log, Metadata, Record};
use std::any::Any;
use std::sync::{Mutex, Once};
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    AddCookie(Option<Cookie>),
    AddCookieInternalWithHttpOnly(Option<Cookie>, bool),
    AddSessionCookieInternal(Option<Cookie>, bool),
    Op(&'static str),
}

/// Records every call and answers from a real [`ConnectorResponse`].
#[derive(Default)]
pub struct RecordingResponse {
    inner: ConnectorResponse,
    calls: Mutex<Vec<Call>>,
}

impl RecordingResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// The backing response, for inspection without recording.
    pub fn inner(&self) -> &ConnectorResponse {
        &self.inner
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn op(&self, name: &'static str) {
        self.record(Call::Op(name));
    }
}

impl Response for RecordingResponse {
    fn add_cookie(&self, cookie: Option<Cookie>) {
        self.record(Call::AddCookie(cookie.clone()));
        self.inner.add_cookie(cookie)
    }

    fn add_cookie_internal(&self, cookie: Option<Cookie>) {
        self.op("add_cookie_internal");
        self.inner.add_cookie_internal(cookie)
    }

    fn add_cookie_internal_with_http_only(&self, cookie: Option<Cookie>, http_only: bool) {
        self.record(Call::AddCookieInternalWithHttpOnly(cookie.clone(), http_only));
        self.inner.add_cookie_internal_with_http_only(cookie, http_only)
    }

    fn add_session_cookie_internal(&self, cookie: Option<Cookie>, http_only: bool) {
        self.record(Call::AddSessionCookieInternal(cookie.clone(), http_only));
        self.inner.add_session_cookie_internal(cookie, http_only)
    }

    fn cookies(&self) -> Vec<Cookie> {
        self.op("cookies");
        self.inner.cookies()
    }

    fn generate_cookie_string(&self, cookie: &Cookie, http_only: bool) -> String {
        self.op("generate_cookie_string");
        self.inner.generate_cookie_string(cookie, http_only)
    }

    fn add_header(&self, name: &str, value: &str) {
        self.op("add_header");
        self.inner.add_header(name, value)
    }

    fn set_header(&self, name: &str, value: &str) {
        self.op("set_header");
        self.inner.set_header(name, value)
    }

    fn add_int_header(&self, name: &str, value: i64) {
        self.op("add_int_header");
        self.inner.add_int_header(name, value)
    }

    fn set_int_header(&self, name: &str, value: i64) {
        self.op("set_int_header");
        self.inner.set_int_header(name, value)
    }

    fn add_date_header(&self, name: &str, value: SystemTime) {
        self.op("add_date_header");
        self.inner.add_date_header(name, value)
    }

    fn set_date_header(&self, name: &str, value: SystemTime) {
        self.op("set_date_header");
        self.inner.set_date_header(name, value)
    }

    fn contains_header(&self, name: &str) -> bool {
        self.op("contains_header");
        self.inner.contains_header(name)
    }

    fn header(&self, name: &str) -> Option<String> {
        self.op("header");
        self.inner.header(name)
    }

    fn header_values(&self, name: &str) -> Vec<String> {
        self.op("header_values");
        self.inner.header_values(name)
    }

    fn header_names(&self) -> Vec<String> {
        self.op("header_names");
        self.inner.header_names()
    }

    fn status(&self) -> u16 {
        self.op("status");
        self.inner.status()
    }

    fn set_status(&self, status: u16) {
        self.op("set_status");
        self.inner.set_status(status)
    }

    fn set_status_with_message(&self, status: u16, message: &str) {
        self.op("set_status_with_message");
        self.inner.set_status_with_message(status, message)
    }

    fn message(&self) -> Option<String> {
        self.op("message");
        self.inner.message()
    }

    fn send_error(&self, status: u16, message: Option<&str>) -> Result<(), ResponseError> {
        self.op("send_error");
        self.inner.send_error(status, message)
    }

    fn send_redirect(&self, location: &str) -> Result<(), ResponseError> {
        self.op("send_redirect");
        self.inner.send_redirect(location)
    }

    fn is_error(&self) -> bool {
        self.op("is_error");
        self.inner.is_error()
    }

    fn set_error(&self) {
        self.op("set_error");
        self.inner.set_error()
    }

    fn content_type(&self) -> Option<String> {
        self.op("content_type");
        self.inner.content_type()
    }

    fn set_content_type(&self, content_type: &str) {
        self.op("set_content_type");
        self.inner.set_content_type(content_type)
    }

    fn content_length(&self) -> Option<u64> {
        self.op("content_length");
        self.inner.content_length()
    }

    fn set_content_length(&self, length: u64) {
        self.op("set_content_length");
        self.inner.set_content_length(length)
    }

    fn character_encoding(&self) -> String {
        self.op("character_encoding");
        self.inner.character_encoding()
    }

    fn set_character_encoding(&self, charset: &str) {
        self.op("set_character_encoding");
        self.inner.set_character_encoding(charset)
    }

    fn locale(&self) -> Option<String> {
        self.op("locale");
        self.inner.locale()
    }

    fn set_locale(&self, locale: &str) {
        self.op("set_locale");
        self.inner.set_locale(locale)
    }

    fn write_body(&self, bytes: &[u8]) -> Result<usize, ResponseError> {
        self.op("write_body");
        self.inner.write_body(bytes)
    }

    fn content_count(&self) -> u64 {
        self.op("content_count");
        self.inner.content_count()
    }

    fn buffer_size(&self) -> usize {
        self.op("buffer_size");
        self.inner.buffer_size()
    }

    fn set_buffer_size(&self, size: usize) {
        self.op("set_buffer_size");
        self.inner.set_buffer_size(size)
    }

    fn flush_buffer(&self) -> Result<(), ResponseError> {
        self.op("flush_buffer");
        self.inner.flush_buffer()
    }

    fn reset(&self) -> Result<(), ResponseError> {
        self.op("reset");
        self.inner.reset()
    }

    fn reset_buffer(&self) -> Result<(), ResponseError> {
        self.op("reset_buffer");
        self.inner.reset_buffer()
    }

    fn is_committed(&self) -> bool {
        self.op("is_committed");
        self.inner.is_committed()
    }

    fn is_app_committed(&self) -> bool {
        self.op("is_app_committed");
        self.inner.is_app_committed()
    }

    fn set_app_committed(&self, committed: bool) {
        self.op("set_app_committed");
        self.inner.set_app_committed(committed)
    }

    fn is_suspended(&self) -> bool {
        self.op("is_suspended");
        self.inner.is_suspended()
    }

    fn set_suspended(&self, suspended: bool) {
        self.op("set_suspended");
        self.inner.set_suspended(suspended)
    }

    fn finish_response(&self) -> Result<(), ResponseError> {
        self.op("finish_response");
        self.inner.finish_response()
    }

    fn encode_url(&self, url: &str) -> String {
        self.op("encode_url");
        self.inner.encode_url(url)
    }

    fn encode_redirect_url(&self, url: &str) -> String {
        self.op("encode_redirect_url");
        self.inner.encode_redirect_url(url)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct CapturingLogger;

static LOGGER: CapturingLogger = CapturingLogger;
static RECORDS: Mutex<Vec<String>> = Mutex::new(Vec::new());
static INIT: Once = Once::new();

impl Log for CapturingLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let line = format!("{} {}", record.level(), record.args());
        RECORDS
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line);
    }

    fn flush(&self) {}
}

/// Installs the capturing logger for the whole test binary.
///
/// Tests run in parallel and share the captured lines, so assertions should
/// look for values unique to the test.
pub fn install_logger() {
    INIT.call_once(|| {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(LevelFilter::Debug);
    });
}

pub fn logged_lines_containing(needle: &str) -> Vec<String> {
    RECORDS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .iter()
        .filter(|line| line.contains(needle))
        .cloned()
        .collect()
}
