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
use crate::cookie::Cookie;
use crate::request::Request;
use crate::response::SharedResponse;
use crate::valve::{Next, Valve, ValveError};
use async_trait::async_trait;
use log::debug;

/// Basic valve that sets a fixed list of cookies and answers with a short
/// plain-text body.
pub struct CookieIssuer {
    cookies: Vec<Cookie>,
}

impl CookieIssuer {
    pub fn new(cookies: Vec<Cookie>) -> Self {
        Self { cookies }
    }
}

#[async_trait]
impl Valve for CookieIssuer {
    fn name(&self) -> &str {
        "CookieIssuer"
    }

    async fn invoke(
        &self,
        request: &mut Request,
        response: SharedResponse,
        _next: Next<'_>,
    ) -> Result<(), ValveError> {
        debug!("Issuing {} cookies for {}", self.cookies.len(), request.uri());
        for cookie in &self.cookies {
            response.add_cookie(Some(cookie.clone()));
        }

        response.set_content_type("text/plain");
        response.set_character_encoding("UTF-8");
        let body = format!("{} cookie(s) issued\n", self.cookies.len());
        response.write_body(body.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::ConnectorResponse;
    use crate::response::Response;
    use crate::secure_cookies::{InterceptionSwitch, SecureCookies};
    use crate::valve::Pipeline;
    use hyper::header::SET_COOKIE;
    use hyper::{HeaderMap, Method};
    use std::sync::Arc;

    fn cookies() -> Vec<Cookie> {
        vec![
            Cookie::new("theme", "dark").with_path("/"),
            Cookie::new("SESSION", "abc")
                .with_secure(true)
                .with_http_only(true)
                .with_domain("example.com")
                .with_path("/app")
                .with_comment("login"),
        ]
    }

    async fn serve(enabled: bool) -> (Vec<Cookie>, Vec<String>, Vec<u8>) {
        let pipeline = Pipeline::new(CookieIssuer::new(cookies()))
            .with_valve(SecureCookies::new(InterceptionSwitch::new(enabled)));
        let response = Arc::new(ConnectorResponse::new());
        let mut request = Request::new(
            Method::GET,
            "/app/".parse().unwrap(),
            HeaderMap::new(),
            "/app",
            response.clone(),
        );
        pipeline.invoke(&mut request).await.unwrap();

        let queued = response.cookies();
        let committed = response.commit().unwrap();
        let set_cookie = committed
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        let body = hyper::body::to_bytes(committed.into_body()).await.unwrap();
        (queued, set_cookie, body.to_vec())
    }

    #[tokio::test]
    async fn test_interception_does_not_change_emitted_cookies() {
        let (with_cookies, with_headers, with_body) = serve(true).await;
        let (without_cookies, without_headers, without_body) = serve(false).await;

        assert_eq!(with_cookies, cookies());
        assert_eq!(with_cookies, without_cookies);
        assert_eq!(with_headers, without_headers);
        assert_eq!(
            with_headers,
            vec![
                "theme=dark; Path=/",
                "SESSION=abc; Domain=example.com; Path=/app; Secure; HttpOnly",
            ]
        );
        assert_eq!(with_body, b"2 cookie(s) issued\n".to_vec());
        assert_eq!(with_body, without_body);
    }
}
