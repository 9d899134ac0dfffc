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
//! # ValveServer Module
//!
//! This module hosts a valve [`Pipeline`] behind a plain HTTP server and runs a
//! small admin server next to it.
//!
//! ## Overview
//!
//! The `ValveServer` is responsible for:
//!
//! - Turning each inbound HTTP request into a [`Request`] bound to a fresh
//!   [`ConnectorResponse`], running the pipeline and committing the response
//! - Answering `500` when the pipeline fails and `404` outside the context path
//! - Running the admin server: a health check plus the endpoint that toggles
//!   cookie interception
//! - Starting and stopping the pipeline's valves

use crate::config::ServerConfig;
use crate::connector::ConnectorResponse;
use crate::lifecycle::LifecycleError;
use crate::request::{within_context, Request};
use crate::secure_cookies::InterceptionSwitch;
use crate::valve::Pipeline;
use futures::Stream;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Method, Response, Server as HyperServer, StatusCode};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::error;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::net::TcpListener;

/// Admin path reporting and toggling cookie interception.
pub const ENABLED_PATH: &str = "/enabled";

/// Admin path answering health checks.
pub const HEALTH_PATH: &str = "/health";

/// Body of the admin interception endpoint, both ways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnabledState {
    pub enabled: bool,
}

/// Custom stream adapter for the TcpListener used by both servers.
///
/// This adapter implements the `Stream` trait to make the TcpListener compatible
/// with hyper's `accept::from_stream` function.
struct TcpListenerStream {
    /// The underlying TCP listener
    listener: TcpListener,
}

impl Stream for TcpListenerStream {
    type Item = Result<tokio::net::TcpStream, std::io::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.listener.poll_accept(cx) {
            Poll::Ready(Ok((socket, _addr))) => Poll::Ready(Some(Ok(socket))),
            Poll::Ready(Err(err)) => Poll::Ready(Some(Err(err))),
            Poll::Pending => Poll::Pending,
        }
    }
}

fn plain_response(status: StatusCode, body: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
}

fn json_response(status: StatusCode, state: EnabledState) -> Response<Body> {
    match serde_json::to_vec(&state) {
        Ok(body) => {
            let mut response = Response::new(Body::from(body));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(e) => {
            error!("Failed to encode admin response: {}", e);
            plain_response(StatusCode::INTERNAL_SERVER_ERROR, "")
        }
    }
}

/// Runs one HTTP request through `pipeline`.
///
/// # Arguments
///
/// * `pipeline` - The pipeline to run
/// * `context_path` - Path prefix the application is mounted under
/// * `req` - The inbound request
///
/// # Returns
///
/// The committed response, `404` for paths outside the context path, or `500`
/// if the pipeline fails
pub async fn handle_request(
    pipeline: &Pipeline,
    context_path: &str,
    req: hyper::Request<Body>,
) -> Response<Body> {
    if !within_context(context_path, req.uri().path()) {
        return plain_response(StatusCode::NOT_FOUND, "");
    }

    let (parts, _body) = req.into_parts();
    let response = Arc::new(ConnectorResponse::new());
    let mut request = Request::new(
        parts.method,
        parts.uri,
        parts.headers,
        context_path,
        response.clone(),
    );

    if let Err(e) = pipeline.invoke(&mut request).await {
        error!("Pipeline failed for {}: {}", request.uri(), e);
        return plain_response(StatusCode::INTERNAL_SERVER_ERROR, "");
    }

    match response.commit() {
        Ok(committed) => committed,
        Err(e) => {
            error!("Failed to commit response for {}: {}", request.uri(), e);
            plain_response(StatusCode::INTERNAL_SERVER_ERROR, "")
        }
    }
}

/// Serves the admin endpoints.
///
/// - `GET /health` answers `200` with an empty body
/// - `GET /enabled` answers `{"enabled": <bool>}`
/// - `PUT` or `POST /enabled` with `{"enabled": <bool>}` sets the flag and
///   answers with the new state
///
/// # Arguments
///
/// * `switch` - The interception flag to report and toggle
/// * `req` - The inbound admin request
pub async fn handle_admin(switch: &InterceptionSwitch, req: hyper::Request<Body>) -> Response<Body> {
    let path = req.uri().path().to_string();
    match (req.method().clone(), path.as_str()) {
        (Method::GET, HEALTH_PATH) => plain_response(StatusCode::OK, ""),
        (Method::GET, ENABLED_PATH) => json_response(
            StatusCode::OK,
            EnabledState {
                enabled: switch.is_enabled(),
            },
        ),
        (Method::PUT, ENABLED_PATH) | (Method::POST, ENABLED_PATH) => {
            let body = match hyper::body::to_bytes(req.into_body()).await {
                Ok(body) => body,
                Err(e) => {
                    error!("Failed to read admin request body: {}", e);
                    return plain_response(StatusCode::BAD_REQUEST, "");
                }
            };
            match serde_json::from_slice::<EnabledState>(&body) {
                Ok(state) => {
                    switch.set_enabled(state.enabled);
                    info!("Cookie interception {}", if state.enabled { "enabled" } else { "disabled" });
                    json_response(StatusCode::OK, state)
                }
                Err(e) => {
                    error!("Invalid admin request body: {}", e);
                    plain_response(StatusCode::BAD_REQUEST, "")
                }
            }
        }
        (_, HEALTH_PATH) | (_, ENABLED_PATH) => plain_response(StatusCode::METHOD_NOT_ALLOWED, ""),
        _ => plain_response(StatusCode::NOT_FOUND, ""),
    }
}

/// Server hosting a valve pipeline.
///
/// The `ValveServer` manages two separate servers:
/// 1. The application server running every request through the pipeline
/// 2. An optional admin server for health checks and the interception toggle
///
/// Each server runs in its own task and can be spawned separately.
#[derive(Clone)]
pub struct ValveServer {
    /// Configuration for the server
    config: ServerConfig,

    /// The pipeline every application request runs through
    pipeline: Arc<Pipeline>,

    /// Interception flag exposed on the admin server
    switch: InterceptionSwitch,
}

impl ValveServer {
    /// Creates a new `ValveServer`.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the server
    /// * `pipeline` - The pipeline to host
    /// * `switch` - The interception flag shared with the pipeline's valve
    pub fn new(config: ServerConfig, pipeline: Pipeline, switch: InterceptionSwitch) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
            switch,
        }
    }

    /// Starts the lifecycle of every valve in the pipeline.
    pub fn start(&self) -> Result<(), LifecycleError> {
        self.pipeline.start()
    }

    /// Stops the lifecycle of every valve in the pipeline.
    pub fn stop(&self) -> Result<(), LifecycleError> {
        self.pipeline.stop()
    }

    /// Spawns the application server in a new task.
    ///
    /// # Returns
    ///
    /// A `JoinHandle` for the spawned task
    pub async fn spawn_http(&self) -> tokio::task::JoinHandle<()> {
        let server = self.clone();
        tokio::spawn(async move {
            if let Err(e) = server.start_http().await {
                error!("Failed to start application server: {}", e);
            }
        })
    }

    /// Spawns the admin server in a new task.
    ///
    /// # Returns
    ///
    /// A `JoinHandle` for the spawned task
    pub async fn spawn_admin(&self) -> tokio::task::JoinHandle<()> {
        let server = self.clone();
        tokio::spawn(async move {
            if let Err(e) = server.start_admin().await {
                error!("Failed to start admin server: {}", e);
            }
        })
    }

    /// Starts the application server.
    ///
    /// Every request is handled by [`handle_request`] against the hosted
    /// pipeline.
    async fn start_http(&self) -> Result<(), Box<dyn error::Error + Send + Sync>> {
        let listener = TcpListener::bind(&self.config.address).await?;
        info!("Starting application server on {}", self.config.address);

        let pipeline = self.pipeline.clone();
        let context_path = self.config.context_path.clone();
        let make_service = hyper::service::make_service_fn(move |_| {
            let pipeline = pipeline.clone();
            let context_path = context_path.clone();
            async move {
                Ok::<_, Infallible>(hyper::service::service_fn(move |req| {
                    let pipeline = pipeline.clone();
                    let context_path = context_path.clone();
                    async move {
                        Ok::<_, Infallible>(handle_request(&pipeline, &context_path, req).await)
                    }
                }))
            }
        });

        let tcp_listener_stream = TcpListenerStream { listener };
        HyperServer::builder(hyper::server::accept::from_stream(tcp_listener_stream))
            .serve(make_service)
            .await?;
        Ok(())
    }

    /// Starts the admin server.
    ///
    /// If no admin address is configured, this method returns immediately
    /// without starting a server.
    async fn start_admin(&self) -> Result<(), Box<dyn error::Error + Send + Sync>> {
        let address = match &self.config.admin_address {
            Some(address) => address.clone(),
            None => {
                info!("Admin server is disabled");
                return Ok(());
            }
        };

        let listener = TcpListener::bind(&address).await?;
        info!("Starting admin server on {}", address);

        let switch = self.switch.clone();
        let make_service = hyper::service::make_service_fn(move |_| {
            let switch = switch.clone();
            async move {
                Ok::<_, Infallible>(hyper::service::service_fn(move |req| {
                    let switch = switch.clone();
                    async move { Ok::<_, Infallible>(handle_admin(&switch, req).await) }
                }))
            }
        });

        let tcp_listener_stream = TcpListenerStream { listener };
        HyperServer::builder(hyper::server::accept::from_stream(tcp_listener_stream))
            .serve(make_service)
            .await?;
        Ok(())
    }
}
