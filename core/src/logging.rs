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

//! Global tracing setup for library consumers. Installs once; later calls
//! are no-ops rather than panics, since both the demo CLI and a consuming
//! test suite may try to install their own subscriber.

use tracing_subscriber::EnvFilter;

/// Installs a `tracing_subscriber::fmt` global subscriber reading its level
/// from `RUST_LOG`, defaulting to `info` when unset. Safe to call more than
/// once per process; only the first call has any effect.
pub fn init_default() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
