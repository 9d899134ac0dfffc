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
//! # Cookie Module
//!
//! The cookie value queued on a response and its `Set-Cookie` rendering.

use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Max-age of a cookie that lives until the browser session ends.
pub const SESSION_MAX_AGE: i64 = -1;

/// Expiry sent alongside `Max-Age=0` so that old user agents drop the cookie too.
const EXPIRED_DATE: &str = "Thu, 01 Jan 1970 00:00:10 GMT";

/// Last instant an HTTP date can express (`Fri, 31 Dec 9999 23:59:59 GMT`).
const MAX_HTTP_DATE_SECS: u64 = 253_402_300_799;

/// Formats `time` as an HTTP date, or `None` when it falls before 1970 or
/// after year 9999.
pub(crate) fn fmt_http_date(time: SystemTime) -> Option<String> {
    let secs = time.duration_since(UNIX_EPOCH).ok()?.as_secs();
    if secs > MAX_HTTP_DATE_SECS {
        return None;
    }
    Some(httpdate::fmt_http_date(time))
}

fn session_max_age() -> i64 {
    SESSION_MAX_AGE
}

/// An HTTP cookie as handed to a response.
///
/// Responses and pipeline stages only ever read a `Cookie`; the type is
/// cloned when it needs to be kept around.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Cookie {
    /// Cookie name
    pub name: String,

    /// Cookie value, sent verbatim
    #[serde(default)]
    pub value: String,

    /// Lifetime in seconds; `-1` keeps the cookie for the browser session
    #[serde(default = "session_max_age")]
    pub max_age: i64,

    /// Whether the cookie is restricted to secure transports
    #[serde(default)]
    pub secure: bool,

    /// Whether the cookie is hidden from client-side scripts
    #[serde(default)]
    pub http_only: bool,

    /// Optional human-readable comment
    #[serde(default)]
    pub comment: Option<String>,

    /// Optional domain scope
    #[serde(default)]
    pub domain: Option<String>,

    /// Optional path scope
    #[serde(default)]
    pub path: Option<String>,
}

impl Cookie {
    /// Creates a session-scoped cookie with no attributes.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: SESSION_MAX_AGE,
            secure: false,
            http_only: false,
            comment: None,
            domain: None,
            path: None,
        }
    }

    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Whether `other` addresses the same cookie slot in the user agent.
    ///
    /// Two cookies with the same name, domain and path overwrite each other.
    pub fn same_slot(&self, other: &Cookie) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }

    /// Builds the `Set-Cookie` header value for this cookie.
    ///
    /// `http_only` is the effective flag chosen by the response, which may
    /// differ from the cookie's own `http_only` field.
    pub fn to_set_cookie_header(&self, http_only: bool) -> String {
        self.to_set_cookie_header_at(http_only, SystemTime::now())
    }

    /// Same as [`Cookie::to_set_cookie_header`] with an explicit clock, used to
    /// compute `Expires`.
    pub fn to_set_cookie_header_at(&self, http_only: bool, now: SystemTime) -> String {
        let mut parts = vec![format!("{}={}", self.name, self.value)];

        if self.max_age >= 0 {
            parts.push(format!("Max-Age={}", self.max_age));
            if self.max_age == 0 {
                parts.push(format!("Expires={}", EXPIRED_DATE));
            } else {
                // Expiry past year 9999 is clamped to the last expressible date.
                let latest = UNIX_EPOCH + Duration::from_secs(MAX_HTTP_DATE_SECS);
                let expires = now
                    .checked_add(Duration::from_secs(self.max_age as u64))
                    .map_or(latest, |t| t.min(latest));
                if let Some(date) = fmt_http_date(expires) {
                    parts.push(format!("Expires={}", date));
                }
            }
        }

        if let Some(domain) = &self.domain {
            parts.push(format!("Domain={}", domain));
        }
        if let Some(path) = &self.path {
            parts.push(format!("Path={}", path));
        }
        if self.secure {
            parts.push("Secure".to_string());
        }
        if http_only {
            parts.push("HttpOnly".to_string());
        }

        parts.join("; ")
    }
}
