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
//! # Wrapped Response Module
//!
//! A [`Response`] decorator that logs every cookie added to the response it
//! wraps.
//!
//! ## Overview
//!
//! The four cookie-adding operations log a rendering of the cookie and then
//! make the same call on the wrapped response. The cookie itself is never
//! touched, so the wrapped response ends up with exactly the cookies it would
//! have had without the decorator. Every other operation forwards unchanged.
//!
//! Use [`WrappedResponse::wrap`] rather than [`WrappedResponse::new`] so that a
//! response is never wrapped twice.

use crate::cookie::Cookie;
use crate::response::{Response, ResponseError, SharedResponse};
use log::info;
use std::any::Any;
use std::fmt::Write;
use std::sync::Arc;
use std::time::SystemTime;

/// Rendering of a missing cookie.
pub const NULL_COOKIE: &str = "Cookie: [null]";

/// Renders the audited fields of a cookie for the log.
///
/// Comment, domain and path only appear when set.
pub fn render(cookie: Option<&Cookie>) -> String {
    let cookie = match cookie {
        Some(cookie) => cookie,
        None => return NULL_COOKIE.to_string(),
    };

    let mut b = String::from("Cookie: [");
    // Writing into a String cannot fail.
    let _ = write!(b, "\n\tName:{}", cookie.name);
    let _ = write!(b, "\n\tMaxAge:{}", cookie.max_age);
    let _ = write!(b, "\n\tSecure:{}", cookie.secure);
    if let Some(comment) = &cookie.comment {
        let _ = write!(b, "\n\tComment:{}", comment);
    }
    if let Some(domain) = &cookie.domain {
        let _ = write!(b, "\n\tDomain:{}", domain);
    }
    if let Some(path) = &cookie.path {
        let _ = write!(b, "\n\tPath:{}", path);
    }
    b.push_str("\n]");
    b
}

/// Cookie-auditing decorator around the response of one request.
pub struct WrappedResponse {
    delegate: SharedResponse,
}

impl WrappedResponse {
    pub fn new(delegate: SharedResponse) -> Self {
        Self { delegate }
    }

    /// Wraps `response`, or returns it unchanged if it already is a
    /// `WrappedResponse`.
    pub fn wrap(response: SharedResponse) -> SharedResponse {
        if response.as_any().is::<WrappedResponse>() {
            return response;
        }
        Arc::new(WrappedResponse::new(response))
    }

    /// The response this decorator forwards to.
    pub fn delegate(&self) -> &SharedResponse {
        &self.delegate
    }
}

impl Response for WrappedResponse {
    fn add_cookie(&self, cookie: Option<Cookie>) {
        info!("Adding: {}", render(cookie.as_ref()));
        self.delegate.add_cookie(cookie);
    }

    fn add_cookie_internal(&self, cookie: Option<Cookie>) {
        info!("Adding Internal: {}", render(cookie.as_ref()));
        self.delegate.add_cookie_internal_with_http_only(cookie, true);
    }

    fn add_cookie_internal_with_http_only(&self, cookie: Option<Cookie>, http_only: bool) {
        info!(
            "Adding Internal: httpOnly [{}], {}",
            http_only,
            render(cookie.as_ref())
        );
        self.delegate.add_cookie_internal_with_http_only(cookie, http_only);
    }

    fn add_session_cookie_internal(&self, cookie: Option<Cookie>, http_only: bool) {
        // Logs the flag actually passed rather than a constant `true`.
        info!(
            "Adding Session Internal: httpOnly [{}], {}",
            http_only,
            render(cookie.as_ref())
        );
        self.delegate.add_session_cookie_internal(cookie, http_only);
    }

    fn cookies(&self) -> Vec<Cookie> {
        self.delegate.cookies()
    }

    fn generate_cookie_string(&self, cookie: &Cookie, http_only: bool) -> String {
        self.delegate.generate_cookie_string(cookie, http_only)
    }

    fn add_header(&self, name: &str, value: &str) {
        self.delegate.add_header(name, value)
    }

    fn set_header(&self, name: &str, value: &str) {
        self.delegate.set_header(name, value)
    }

    fn add_int_header(&self, name: &str, value: i64) {
        self.delegate.add_int_header(name, value)
    }

    fn set_int_header(&self, name: &str, value: i64) {
        self.delegate.set_int_header(name, value)
    }

    fn add_date_header(&self, name: &str, value: SystemTime) {
        self.delegate.add_date_header(name, value)
    }

    fn set_date_header(&self, name: &str, value: SystemTime) {
        self.delegate.set_date_header(name, value)
    }

    fn contains_header(&self, name: &str) -> bool {
        self.delegate.contains_header(name)
    }

    fn header(&self, name: &str) -> Option<String> {
        self.delegate.header(name)
    }

    fn header_values(&self, name: &str) -> Vec<String> {
        self.delegate.header_values(name)
    }

    fn header_names(&self) -> Vec<String> {
        self.delegate.header_names()
    }

    fn status(&self) -> u16 {
        self.delegate.status()
    }

    fn set_status(&self, status: u16) {
        self.delegate.set_status(status)
    }

    fn set_status_with_message(&self, status: u16, message: &str) {
        self.delegate.set_status_with_message(status, message)
    }

    fn message(&self) -> Option<String> {
        self.delegate.message()
    }

    fn send_error(&self, status: u16, message: Option<&str>) -> Result<(), ResponseError> {
        self.delegate.send_error(status, message)
    }

    fn send_redirect(&self, location: &str) -> Result<(), ResponseError> {
        self.delegate.send_redirect(location)
    }

    fn is_error(&self) -> bool {
        self.delegate.is_error()
    }

    fn set_error(&self) {
        self.delegate.set_error()
    }

    fn content_type(&self) -> Option<String> {
        self.delegate.content_type()
    }

    fn set_content_type(&self, content_type: &str) {
        self.delegate.set_content_type(content_type)
    }

    fn content_length(&self) -> Option<u64> {
        self.delegate.content_length()
    }

    fn set_content_length(&self, length: u64) {
        self.delegate.set_content_length(length)
    }

    fn character_encoding(&self) -> String {
        self.delegate.character_encoding()
    }

    fn set_character_encoding(&self, charset: &str) {
        self.delegate.set_character_encoding(charset)
    }

    fn locale(&self) -> Option<String> {
        self.delegate.locale()
    }

    fn set_locale(&self, locale: &str) {
        self.delegate.set_locale(locale)
    }

    fn write_body(&self, bytes: &[u8]) -> Result<usize, ResponseError> {
        self.delegate.write_body(bytes)
    }

    fn content_count(&self) -> u64 {
        self.delegate.content_count()
    }

    fn buffer_size(&self) -> usize {
        self.delegate.buffer_size()
    }

    fn set_buffer_size(&self, size: usize) {
        self.delegate.set_buffer_size(size)
    }

    fn flush_buffer(&self) -> Result<(), ResponseError> {
        self.delegate.flush_buffer()
    }

    fn reset(&self) -> Result<(), ResponseError> {
        self.delegate.reset()
    }

    fn reset_buffer(&self) -> Result<(), ResponseError> {
        self.delegate.reset_buffer()
    }

    fn is_committed(&self) -> bool {
        self.delegate.is_committed()
    }

    fn is_app_committed(&self) -> bool {
        self.delegate.is_app_committed()
    }

    fn set_app_committed(&self, committed: bool) {
        self.delegate.set_app_committed(committed)
    }

    fn is_suspended(&self) -> bool {
        self.delegate.is_suspended()
    }

    fn set_suspended(&self, suspended: bool) {
        self.delegate.set_suspended(suspended)
    }

    fn finish_response(&self) -> Result<(), ResponseError> {
        self.delegate.finish_response()
    }

    fn encode_url(&self, url: &str) -> String {
        self.delegate.encode_url(url)
    }

    fn encode_redirect_url(&self, url: &str) -> String {
        self.delegate.encode_redirect_url(url)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{install_logger, logged_lines_containing, Call, RecordingResponse};

    fn wrapped(recording: &Arc<RecordingResponse>) -> SharedResponse {
        let shared: SharedResponse = recording.clone();
        WrappedResponse::wrap(shared)
    }

    #[test]
    fn test_render_all_fields() {
        let cookie = Cookie::new("SESSION", "v")
            .with_max_age(3600)
            .with_secure(true)
            .with_comment("audit")
            .with_domain("example.com")
            .with_path("/app");

        assert_eq!(
            render(Some(&cookie)),
            "Cookie: [\n\tName:SESSION\n\tMaxAge:3600\n\tSecure:true\n\tComment:audit\
             \n\tDomain:example.com\n\tPath:/app\n]"
        );
    }

    #[test]
    fn test_render_skips_missing_fields() {
        let rendered = render(Some(&Cookie::new("plain", "v")));
        assert_eq!(rendered, "Cookie: [\n\tName:plain\n\tMaxAge:-1\n\tSecure:false\n]");
    }

    #[test]
    fn test_render_null() {
        assert_eq!(render(None), NULL_COOKIE);
    }

    #[test]
    fn test_wrap_is_idempotent() {
        let recording = Arc::new(RecordingResponse::new());
        let once = wrapped(&recording);
        let twice = WrappedResponse::wrap(once.clone());
        assert!(Arc::ptr_eq(&once, &twice));

        let inner = once
            .as_any()
            .downcast_ref::<WrappedResponse>()
            .expect("wrapper");
        assert!(inner.delegate().as_any().is::<RecordingResponse>());
    }

    /// Tests that an intercepted cookie is logged and forwarded as-is.
    ///
    /// Verifies that:
    /// - The delegate receives exactly one `add_cookie` call with the same cookie
    /// - The logged rendering carries max-age, secure flag and path
    #[test]
    fn test_cookie_fields_reach_delegate_unchanged() {
        install_logger();
        let recording = Arc::new(RecordingResponse::new());
        let response = wrapped(&recording);
        let cookie = Cookie::new("SESSION", "token")
            .with_max_age(3600)
            .with_secure(true)
            .with_path("/app");

        response.add_cookie(Some(cookie.clone()));

        assert_eq!(recording.calls(), vec![Call::AddCookie(Some(cookie.clone()))]);
        assert_eq!(recording.inner().cookies(), vec![cookie]);

        let lines = logged_lines_containing("Name:SESSION");
        assert!(lines.iter().any(|line| line.contains("Adding: Cookie: [")
            && line.contains("MaxAge:3600")
            && line.contains("Secure:true")
            && line.contains("Path:/app")));
    }

    #[test]
    fn test_internal_variants_forward_http_only() {
        install_logger();
        let recording = Arc::new(RecordingResponse::new());
        let response = wrapped(&recording);
        let a = Cookie::new("wrapped-internal-a", "1");
        let b = Cookie::new("wrapped-internal-b", "2");
        let c = Cookie::new("wrapped-internal-c", "3");

        response.add_cookie_internal(Some(a.clone()));
        response.add_cookie_internal_with_http_only(Some(b.clone()), false);
        response.add_session_cookie_internal(Some(c.clone()), false);

        assert_eq!(
            recording.calls(),
            vec![
                Call::AddCookieInternalWithHttpOnly(Some(a), true),
                Call::AddCookieInternalWithHttpOnly(Some(b), false),
                Call::AddSessionCookieInternal(Some(c), false),
            ]
        );
        assert!(logged_lines_containing("Name:wrapped-internal-a")
            .iter()
            .any(|line| line.starts_with("INFO Adding Internal: Cookie: [")));
        assert!(logged_lines_containing("Name:wrapped-internal-b")
            .iter()
            .any(|line| line.starts_with("INFO Adding Internal: httpOnly [false], ")));
        assert!(logged_lines_containing("Name:wrapped-internal-c")
            .iter()
            .any(|line| line.starts_with("INFO Adding Session Internal: httpOnly [false], ")));
    }

    #[test]
    fn test_null_cookie_is_logged_and_forwarded() {
        install_logger();
        let recording = Arc::new(RecordingResponse::new());
        let response = wrapped(&recording);

        response.add_cookie(None);
        response.add_cookie_internal(None);
        response.add_cookie_internal_with_http_only(None, false);
        response.add_session_cookie_internal(None, true);

        assert_eq!(
            recording.calls(),
            vec![
                Call::AddCookie(None),
                Call::AddCookieInternalWithHttpOnly(None, true),
                Call::AddCookieInternalWithHttpOnly(None, false),
                Call::AddSessionCookieInternal(None, true),
            ]
        );
        assert!(!logged_lines_containing("Adding: Cookie: [null]").is_empty());
    }

    /// Tests that non-cookie operations reach the delegate one call each and
    /// return what the delegate returns.
    #[test]
    fn test_headers_and_status_pass_through() {
        let recording = Arc::new(RecordingResponse::new());
        let response = wrapped(&recording);

        response.set_status(418);
        response.add_header("X-Request-Id", "42");
        response.set_content_type("text/plain");

        assert_eq!(response.status(), recording.inner().status());
        assert_eq!(response.status(), 418);
        assert_eq!(response.header("X-Request-Id").as_deref(), Some("42"));
        assert!(response.contains_header("x-request-id"));
        assert_eq!(response.header_names(), recording.inner().header_names());
        assert_eq!(response.content_type(), recording.inner().content_type());
        assert_eq!(
            recording.calls(),
            vec![
                Call::Op("set_status"),
                Call::Op("add_header"),
                Call::Op("set_content_type"),
                Call::Op("status"),
                Call::Op("status"),
                Call::Op("header"),
                Call::Op("contains_header"),
                Call::Op("header_names"),
                Call::Op("content_type"),
            ]
        );
    }

    #[test]
    fn test_stream_operations_pass_through() {
        let recording = Arc::new(RecordingResponse::new());
        let response = wrapped(&recording);

        assert_eq!(response.write_body(b"abc").unwrap(), 3);
        response.flush_buffer().unwrap();
        assert_eq!(response.content_count(), 3);
        assert!(response.is_committed());
        assert!(matches!(response.reset_buffer(), Err(ResponseError::Committed)));

        assert_eq!(
            recording.calls(),
            vec![
                Call::Op("write_body"),
                Call::Op("flush_buffer"),
                Call::Op("content_count"),
                Call::Op("is_committed"),
                Call::Op("reset_buffer"),
            ]
        );
    }

    #[test]
    fn test_pass_through_does_not_log() {
        install_logger();
        let recording = Arc::new(RecordingResponse::new());
        let response = wrapped(&recording);

        response.add_header("X-Pass-Through-Only", "yes");
        let _ = response.generate_cookie_string(&Cookie::new("pass-through-only", "v"), true);

        assert!(logged_lines_containing("pass-through-only").is_empty());
        assert!(logged_lines_containing("X-Pass-Through-Only").is_empty());
    }
}
