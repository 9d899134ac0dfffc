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
use crate::response::SharedResponse;
use hyper::{HeaderMap, Method, Uri};

/// Placeholder used in descriptors for request parts that are absent.
const ABSENT: &str = "null";

/// Whether `path` lies under `context_path`.
///
/// The empty context path and `/` are the root context and match everything.
pub fn within_context(context_path: &str, path: &str) -> bool {
    let context_path = context_path.trim_end_matches('/');
    if context_path.is_empty() {
        return true;
    }
    match path.strip_prefix(context_path) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// An inbound request travelling down the pipeline.
///
/// Besides the request line and headers it carries the response that later
/// pipeline stages observe; a stage may rebind it with
/// [`Request::set_response`].
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    context_path: String,
    path_info: Option<String>,
    query_string: Option<String>,
    response: SharedResponse,
}

impl Request {
    pub fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        context_path: &str,
        response: SharedResponse,
    ) -> Self {
        let context_path = context_path.trim_end_matches('/').to_string();
        let path = uri.path();
        let remainder = if within_context(&context_path, path) {
            &path[context_path.len()..]
        } else {
            path
        };
        let path_info = if remainder.is_empty() {
            None
        } else {
            Some(remainder.to_string())
        };
        let query_string = uri.query().map(str::to_string);

        Self {
            method,
            uri,
            headers,
            context_path,
            path_info,
            query_string,
            response,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of the named header, if it is valid visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Context path without a trailing slash; empty for the root context.
    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// Path below the context path, starting with `/`.
    pub fn path_info(&self) -> Option<&str> {
        self.path_info.as_deref()
    }

    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    /// Short description of the request for log lines:
    /// `<pathInfo>/<contextPath>/<queryString>`, with `null` for absent parts.
    pub fn descriptor(&self) -> String {
        format!(
            "{}/{}/{}",
            self.path_info().unwrap_or(ABSENT),
            self.context_path,
            self.query_string().unwrap_or(ABSENT)
        )
    }

    /// The response later pipeline stages observe.
    pub fn response(&self) -> &SharedResponse {
        &self.response
    }

    pub fn set_response(&mut self, response: SharedResponse) {
        self.response = response;
    }
}
