/*
 *   Copyright (c) 2026 The quotecore Authors
 *   All rights reserved.
 *
 *   Licensed under the Apache License, Version 2.0 (the "License");
 *   you may not use this file except in compliance with the License.
 *   You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 *   Unless required by applicable law or agreed to in writing, software
 *   distributed under the License is distributed on an "AS IS" BASIS,
 *   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *   See the License for the specific language governing permissions and
 *   limitations under the License.
 */

//! Stores a result code plus an optional error payload, with a ready flag.

use crate::error::AppError;

/// The outcome of a unit of work: it hasn't run yet, or it ran and
/// succeeded, or it ran and failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkResult {
    #[default]
    Unknown,
    Success,
    Failure,
}

/// Holds a `(code, error, ready)` triple. Not internally synchronized: the
/// enclosing [`crate::task::Task`] serializes access under its own mutex.
#[derive(Debug, Clone)]
pub struct ResultSlot<E> {
    code: WorkResult,
    error: Option<E>,
    ready: bool,
}

impl<E> ResultSlot<E> {
    pub fn new(initial: WorkResult) -> Self { ResultSlot { code: initial, error: None, ready: false } }

    /// Sets the code and marks the slot ready, with no error payload.
    pub fn set(&mut self, code: WorkResult) {
        self.code = code;
        self.error = None;
        self.ready = true;
    }

    /// Sets the code and an error payload, and marks the slot ready.
    pub fn set_with_error(&mut self, code: WorkResult, error: E) {
        self.code = code;
        self.error = Some(error);
        self.ready = true;
    }

    pub fn is_ready(&self) -> bool { self.ready }

    /// The stored code. Fails with `NotReady` unless [`Self::is_ready`].
    pub fn result(&self) -> Result<WorkResult, AppError> {
        if self.ready { Ok(self.code) } else { Err(AppError::NotReady) }
    }

    /// The stored error, if any was set on the last `set_with_error`.
    pub fn error(&self) -> Option<&E> { self.error.as_ref() }

    /// Unsets ready and restores `initial`, discarding any stored error.
    pub fn clear(&mut self, initial: WorkResult) {
        self.code = initial;
        self.error = None;
        self.ready = false;
    }
}
