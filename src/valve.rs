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
//! # Valve Module
//!
//! Pipeline stages ("valves") and the pipeline that chains them.
//!
//! ## Overview
//!
//! A [`Pipeline`] holds an ordered list of valves followed by a basic valve
//! that produces the actual response. Each valve receives the request, the
//! response it should hand on, and a [`Next`] handle for the rest of the
//! chain. A valve is expected to call `next` exactly once unless it answers
//! the request itself.

use crate::lifecycle::{Lifecycle, LifecycleError};
use crate::request::Request;
use crate::response::{ResponseError, SharedResponse};
use async_trait::async_trait;
use log::debug;
use std::io;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValveError {
    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),
    #[error("Request processing failed: {0}")]
    Protocol(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
    #[error("Unexpected failure: {0}")]
    Unexpected(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl From<ResponseError> for ValveError {
    fn from(err: ResponseError) -> Self {
        match err {
            ResponseError::Io(e) => ValveError::Io(e),
            ResponseError::Committed => ValveError::Protocol(ResponseError::Committed.to_string()),
        }
    }
}

#[async_trait]
pub trait Valve: Send + Sync + 'static {
    /// Name used in log lines.
    fn name(&self) -> &str;

    async fn invoke(
        &self,
        request: &mut Request,
        response: SharedResponse,
        next: Next<'_>,
    ) -> Result<(), ValveError>;

    /// Lifecycle hooks of this valve, if it has any.
    fn lifecycle(&self) -> Option<&dyn Lifecycle> {
        None
    }
}

/// The remainder of a pipeline after the current valve.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    valves: &'a [Arc<dyn Valve>],
}

impl<'a> Next<'a> {
    pub fn new(valves: &'a [Arc<dyn Valve>]) -> Self {
        Self { valves }
    }

    /// Hands the request to the next valve. At the end of the chain this is
    /// a no-op.
    pub async fn invoke(
        self,
        request: &mut Request,
        response: SharedResponse,
    ) -> Result<(), ValveError> {
        match self.valves.split_first() {
            Some((valve, rest)) => valve.invoke(request, response, Next::new(rest)).await,
            None => {
                debug!("End of pipeline reached");
                Ok(())
            }
        }
    }

    pub fn is_end(&self) -> bool {
        self.valves.is_empty()
    }
}

/// An ordered chain of valves ending in a basic valve.
pub struct Pipeline {
    /// Added valves in order, with the basic valve always last.
    stages: Vec<Arc<dyn Valve>>,
}

impl Pipeline {
    pub fn new<B: Valve>(basic: B) -> Self {
        Self {
            stages: vec![Arc::new(basic)],
        }
    }

    /// Inserts `valve` after the previously added valves, ahead of the basic
    /// valve.
    pub fn add_valve<V: Valve>(&mut self, valve: V) {
        let basic = self.stages.len() - 1;
        self.stages.insert(basic, Arc::new(valve));
    }

    pub fn with_valve<V: Valve>(mut self, valve: V) -> Self {
        self.add_valve(valve);
        self
    }

    /// All stages, basic valve last.
    pub fn stages(&self) -> &[Arc<dyn Valve>] {
        &self.stages
    }

    /// Runs the request through every stage, starting with the response
    /// currently bound to the request.
    pub async fn invoke(&self, request: &mut Request) -> Result<(), ValveError> {
        let response = request.response().clone();
        Next::new(&self.stages).invoke(request, response).await
    }

    /// Starts every stage that has lifecycle hooks, in pipeline order.
    pub fn start(&self) -> Result<(), LifecycleError> {
        for stage in &self.stages {
            if let Some(lifecycle) = stage.lifecycle() {
                lifecycle.start()?;
            }
        }
        Ok(())
    }

    /// Stops every stage that has lifecycle hooks, in reverse pipeline order.
    pub fn stop(&self) -> Result<(), LifecycleError> {
        for stage in self.stages.iter().rev() {
            if let Some(lifecycle) = stage.lifecycle() {
                lifecycle.stop()?;
            }
        }
        Ok(())
    }
}
