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
//! # SecureCookies Valve
//!
//! The pipeline stage that puts a [`WrappedResponse`] in front of the real
//! response so that every cookie added downstream is logged.
//!
//! ## Overview
//!
//! - When interception is enabled, the response is wrapped, rebound on the
//!   request and handed to the next stage.
//! - When it is disabled, the original response is handed on untouched.
//! - Failures from downstream are logged with the request descriptor and
//!   returned; anything that is neither an I/O nor a protocol failure comes
//!   back as [`ValveError::Unexpected`].
//!
//! Interception is toggled through an [`InterceptionSwitch`], which can be
//! cloned and handed to the admin endpoint.

use crate::lifecycle::{Lifecycle, LifecycleError, LifecycleListener, LifecycleSupport};
use crate::request::Request;
use crate::response::SharedResponse;
use crate::valve::{Next, Valve, ValveError};
use crate::wrapped::WrappedResponse;
use async_trait::async_trait;
use log::{error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const VALVE_NAME: &str = "SecureCookies";

/// Shared on/off flag for cookie interception.
///
/// Clones share the same flag. Reads and writes are relaxed: a request that
/// races a toggle may still see the old value.
#[derive(Debug, Clone)]
pub struct InterceptionSwitch {
    enabled: Arc<AtomicBool>,
}

impl InterceptionSwitch {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

impl Default for InterceptionSwitch {
    fn default() -> Self {
        Self::new(true)
    }
}

pub struct SecureCookies {
    switch: InterceptionSwitch,
    lifecycle: LifecycleSupport,
}

impl SecureCookies {
    pub fn new(switch: InterceptionSwitch) -> Self {
        info!("Created {} Valve", VALVE_NAME);
        Self {
            switch,
            lifecycle: LifecycleSupport::new(VALVE_NAME),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.switch.is_enabled()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.switch.set_enabled(enabled);
    }

    pub fn switch(&self) -> &InterceptionSwitch {
        &self.switch
    }
}

impl Default for SecureCookies {
    fn default() -> Self {
        Self::new(InterceptionSwitch::default())
    }
}

#[async_trait]
impl Valve for SecureCookies {
    fn name(&self) -> &str {
        VALVE_NAME
    }

    async fn invoke(
        &self,
        request: &mut Request,
        response: SharedResponse,
        next: Next<'_>,
    ) -> Result<(), ValveError> {
        let req = request.descriptor();

        let result = if self.switch.is_enabled() {
            info!("Executing [{}]", req);
            let wrapped = WrappedResponse::wrap(response);
            request.set_response(wrapped.clone());
            next.invoke(request, wrapped).await
        } else {
            info!("{} disabled. Skipping.", VALVE_NAME);
            next.invoke(request, response).await
        };

        result.map_err(|err| match err {
            ValveError::Io(e) => {
                error!("Valve I/O failure on [{}]: {}", req, e);
                ValveError::Io(e)
            }
            ValveError::Protocol(msg) => {
                error!("Valve protocol failure on [{}]: {}", req, msg);
                ValveError::Protocol(msg)
            }
            ValveError::Other(e) => {
                error!("Valve unexpected failure on [{}]: {:#}", req, e);
                ValveError::Unexpected(e.into())
            }
            ValveError::Unexpected(e) => {
                error!("Valve unexpected failure on [{}]: {}", req, e);
                ValveError::Unexpected(e)
            }
        })
    }

    fn lifecycle(&self) -> Option<&dyn Lifecycle> {
        Some(self)
    }
}

impl Lifecycle for SecureCookies {
    fn start(&self) -> Result<(), LifecycleError> {
        self.lifecycle.start_with(|| {
            info!(">>>>> Starting {} Valve.....", VALVE_NAME);
            info!("<<<<< Started {} Valve", VALVE_NAME);
        })
    }

    fn stop(&self) -> Result<(), LifecycleError> {
        self.lifecycle.stop_with(|| {
            info!(">>>>> Stopping {} Valve.....", VALVE_NAME);
            info!("<<<<< Stopped {} Valve", VALVE_NAME);
        })
    }

    fn add_lifecycle_listener(&self, listener: Arc<dyn LifecycleListener>) {
        self.lifecycle.add(listener);
    }

    fn remove_lifecycle_listener(&self, listener: &Arc<dyn LifecycleListener>) {
        self.lifecycle.remove(listener);
    }

    fn find_lifecycle_listeners(&self) -> Vec<Arc<dyn LifecycleListener>> {
        self.lifecycle.listeners()
    }
}
