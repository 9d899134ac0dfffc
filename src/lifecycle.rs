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
//! # Lifecycle Module
//!
//! Start/stop hooks for pipeline components and a listener registry that
//! components embed to notify interested parties.

use std::fmt;
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("{0} has already been started")]
    AlreadyStarted(String),
    #[error("{0} has not been started")]
    NotStarted(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    BeforeStart,
    Start,
    AfterStart,
    BeforeStop,
    Stop,
    AfterStop,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleEvent::BeforeStart => "before_start",
            LifecycleEvent::Start => "start",
            LifecycleEvent::AfterStart => "after_start",
            LifecycleEvent::BeforeStop => "before_stop",
            LifecycleEvent::Stop => "stop",
            LifecycleEvent::AfterStop => "after_stop",
        };
        f.write_str(name)
    }
}

pub trait LifecycleListener: Send + Sync {
    /// Called for every event fired by the component named `source`.
    fn lifecycle_event(&self, source: &str, event: LifecycleEvent);
}

pub trait Lifecycle: Send + Sync {
    fn start(&self) -> Result<(), LifecycleError>;
    fn stop(&self) -> Result<(), LifecycleError>;
    fn add_lifecycle_listener(&self, listener: Arc<dyn LifecycleListener>);
    fn remove_lifecycle_listener(&self, listener: &Arc<dyn LifecycleListener>);
    fn find_lifecycle_listeners(&self) -> Vec<Arc<dyn LifecycleListener>>;
}

fn same_listener(a: &Arc<dyn LifecycleListener>, b: &Arc<dyn LifecycleListener>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Listener registry and started flag shared by lifecycle implementations.
pub struct LifecycleSupport {
    source: String,
    listeners: RwLock<Vec<Arc<dyn LifecycleListener>>>,
    started: Mutex<bool>,
}

impl LifecycleSupport {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            listeners: RwLock::new(Vec::new()),
            started: Mutex::new(false),
        }
    }

    /// Registers `listener` unless the same instance is already registered.
    pub fn add(&self, listener: Arc<dyn LifecycleListener>) {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        if !listeners.iter().any(|l| same_listener(l, &listener)) {
            listeners.push(listener);
        }
    }

    pub fn remove(&self, listener: &Arc<dyn LifecycleListener>) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|l| !same_listener(l, listener));
    }

    pub fn listeners(&self) -> Vec<Arc<dyn LifecycleListener>> {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn fire(&self, event: LifecycleEvent) {
        // Snapshot so listeners may (un)register from inside the callback.
        for listener in self.listeners() {
            listener.lifecycle_event(&self.source, event);
        }
    }

    pub fn is_started(&self) -> bool {
        *self.started.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fires the three start events around `body`.
    pub fn start_with<F: FnOnce()>(&self, body: F) -> Result<(), LifecycleError> {
        {
            let mut started = self.started.lock().unwrap_or_else(|e| e.into_inner());
            if *started {
                return Err(LifecycleError::AlreadyStarted(self.source.clone()));
            }
            *started = true;
        }
        self.fire(LifecycleEvent::BeforeStart);
        self.fire(LifecycleEvent::Start);
        body();
        self.fire(LifecycleEvent::AfterStart);
        Ok(())
    }

    /// Fires the three stop events around `body`.
    pub fn stop_with<F: FnOnce()>(&self, body: F) -> Result<(), LifecycleError> {
        {
            let mut started = self.started.lock().unwrap_or_else(|e| e.into_inner());
            if !*started {
                return Err(LifecycleError::NotStarted(self.source.clone()));
            }
            *started = false;
        }
        self.fire(LifecycleEvent::BeforeStop);
        self.fire(LifecycleEvent::Stop);
        body();
        self.fire(LifecycleEvent::AfterStop);
        Ok(())
    }
}
