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
//! Request pipeline valve that audits cookies added to outgoing responses.
//!
//! [`SecureCookies`] sits in a [`Pipeline`] and, while enabled, hands later
//! stages a [`WrappedResponse`] that logs every cookie before passing it on to
//! the real response. [`ValveServer`] hosts such a pipeline over HTTP.

pub mod app;
pub mod config;
pub mod connector;
pub mod cookie;
pub mod lifecycle;
pub mod request;
pub mod response;
pub mod secure_cookies;
pub mod server;
pub mod valve;
pub mod wrapped;

#[cfg(test)]
mod test_support;

pub use cookie::Cookie;
pub use request::Request;
pub use response::{Response, ResponseError, SharedResponse};
pub use secure_cookies::{InterceptionSwitch, SecureCookies};
pub use server::ValveServer;
pub use valve::{Next, Pipeline, Valve, ValveError};
pub use wrapped::WrappedResponse;
