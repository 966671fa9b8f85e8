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

//! Unified error type for the task core and the registry built on top of it.

use thiserror::Error;

/// Every failure mode the crate can surface, as a typed result rather than a
/// panic. Misuse of the state machine / task / registry API all land here
/// alongside genuine computation failures (`AbortError`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("registry must be initialized before use")]
    NotInitialized,

    #[error("registry is already initialized")]
    AlreadyInitialized,

    #[error("handle is invalid or unknown to the registry")]
    InvalidHandle,

    #[error("cannot dispose of this handle: a request is still in progress")]
    InProgress,

    #[error("result or output queried before the task was ready")]
    NotReady,

    #[error("no transition registered for ({from:?}, {action:?})")]
    InvalidTransition { from: String, action: String },

    #[error("no transition ever registered for ({from:?}, {action:?})")]
    UndefinedTransition { from: String, action: String },

    #[error("problem aborted: {message}")]
    AbortError { message: String },

    #[error("operation timed out")]
    Timeout,
}

impl AppError {
    pub fn invalid_transition(from: impl Into<String>, action: impl Into<String>) -> Self {
        AppError::InvalidTransition { from: from.into(), action: action.into() }
    }

    pub fn undefined_transition(from: impl Into<String>, action: impl Into<String>) -> Self {
        AppError::UndefinedTransition { from: from.into(), action: action.into() }
    }

    pub fn abort(message: impl Into<String>) -> Self { AppError::AbortError { message: message.into() } }
}

pub type AppResult<T> = Result<T, AppError>;
