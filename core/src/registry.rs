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

//! The process-wide handle table: opaque [`Handle`]s to live [`Task`]s,
//! plus the ticker name cache and the option-pricing pass-throughs.

use std::{collections::HashMap, sync::Arc, sync::OnceLock};

use parking_lot::Mutex;
use tracing::{debug, instrument};

use crate::{
    black_scholes,
    buffer::{FixedBuffer, SharedBuffer},
    config::Config,
    error::AppError,
    problem::Problem,
    result_slot::WorkResult,
    task::Task,
    ticker::{TestBehavior, TickerProblem},
    transport::{HttpTransport, ResponseDecoder, Transport, YahooQuoteDecoder},
};

/// An opaque reference to a registered [`Task`]. Handles are never reused
/// within a process lifetime; a disposed handle simply becomes invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

impl Handle {
    /// The bit pattern handed across the [`crate::ffi`] boundary. Not
    /// meaningful on its own; validity is always decided by registry
    /// membership, never by the value itself.
    pub fn into_raw(self) -> u64 { self.0 }

    pub fn from_raw(raw: u64) -> Self { Handle(raw) }
}

type QuoteTask = Task<(), HashMap<String, String>>;

struct RegistryState {
    initialized: bool,
    test_mode: bool,
    test_behavior: TestBehavior,
    config: Config,
    transport: Arc<dyn Transport>,
    decoder: Arc<dyn ResponseDecoder>,
    tasks: HashMap<Handle, Arc<QuoteTask>>,
    next_handle: u64,
    namecache: HashMap<String, String>,
}

impl RegistryState {
    fn new() -> Self {
        let config = Config::default();
        RegistryState {
            initialized: false,
            test_mode: false,
            test_behavior: TestBehavior::None,
            transport: Arc::new(NullTransport),
            decoder: Arc::new(YahooQuoteDecoder),
            config,
            tasks: HashMap::new(),
            next_handle: 0,
            namecache: HashMap::new(),
        }
    }
}

/// Stands in as the transport before `init()` has built a real one; any use
/// of it is itself a `NotInitialized` bug, since every entry point checks
/// `initialized` first.
struct NullTransport;
impl Transport for NullTransport {
    fn fetch(&self, _url: &str) -> Result<String, AppError> { Err(AppError::NotInitialized) }
}

static STATE: OnceLock<Mutex<RegistryState>> = OnceLock::new();

fn state() -> &'static Mutex<RegistryState> { STATE.get_or_init(|| Mutex::new(RegistryState::new())) }

/// Brings the registry up with a fresh [`Config`] read from the environment.
/// Fails with `AlreadyInitialized` if called twice without an intervening
/// [`reset`].
#[instrument]
pub fn init() -> Result<(), AppError> {
    let mut guard = state().lock();
    if guard.initialized {
        return Err(AppError::AlreadyInitialized);
    }
    let config = Config::from_env();
    let transport = HttpTransport::new(&config)?;
    guard.config = config;
    guard.transport = Arc::new(transport);
    guard.initialized = true;
    debug!("registry initialized");
    Ok(())
}

/// Test-only: wipes all state back to pristine, including `initialized`.
pub fn reset() { *state().lock() = RegistryState::new(); }

pub fn set_test_mode(enabled: bool) { state().lock().test_mode = enabled; }

pub fn set_test_behavior(behavior: TestBehavior) { state().lock().test_behavior = behavior; }

pub fn open_handle_count() -> usize { state().lock().tasks.len() }

fn effective_behavior(guard: &RegistryState) -> TestBehavior {
    if guard.test_mode { guard.test_behavior } else { TestBehavior::None }
}

/// Starts a quote fetch on a worker thread and returns a handle to it
/// immediately. A completion hook, set here, copies the decoded response
/// into `out_buffer` and updates the name cache as soon as the fetch
/// succeeds; callers add their own callback with [`register_callback`] if
/// they need to observe completion themselves. `out_buffer` must outlive
/// the request.
#[instrument(skip(out_buffer))]
pub fn fetch_async(ticker: &str, out_buffer: SharedBuffer) -> Result<Handle, AppError> {
    let mut guard = state().lock();
    if !guard.initialized {
        return Err(AppError::NotInitialized);
    }

    let ticker_problem = TickerProblem::new(
        ticker,
        effective_behavior(&guard),
        guard.config.url_template.clone(),
        guard.transport.clone(),
        guard.decoder.clone(),
    );
    let task = Arc::new(Task::new(Problem::contained(ticker_problem, ())));

    let handle = Handle(guard.next_handle);
    guard.next_handle += 1;
    guard.tasks.insert(handle, task.clone());

    let ticker_owned = ticker.to_string();
    let namecache_task = task.clone();
    task.set_completion_callback(move || {
        if let Ok(result) = namecache_task.output() {
            if let Some(price) = result.get("response") {
                out_buffer.lock().fill_truncated(price.as_bytes());
            }
            if let Some(name) = result.get("companyname") {
                state().lock().namecache.insert(ticker_owned.clone(), name.clone());
            }
        }
    });

    drop(guard);
    task.perform_async()?;
    Ok(handle)
}

/// Builds a [`TickerProblem`] on the stack and runs it on the calling
/// thread, start to finish. On `Success`, copies the decoded `response`
/// field into `out`, truncated to fit, and writes `companyname` into the
/// ticker→name cache; on `Failure`, `out` is left untouched.
#[instrument(skip(out))]
pub fn fetch_sync(ticker: &str, out: &mut [u8]) -> Result<WorkResult, AppError> {
    let guard = state().lock();
    if !guard.initialized {
        return Err(AppError::NotInitialized);
    }
    let ticker_problem = TickerProblem::new(
        ticker,
        effective_behavior(&guard),
        guard.config.url_template.clone(),
        guard.transport.clone(),
        guard.decoder.clone(),
    );
    drop(guard);

    let task = Task::new(Problem::contained(ticker_problem, ()));
    let result = task.perform_sync()?;

    if result == WorkResult::Success {
        if let Ok(map) = task.output() {
            if let Some(price) = map.get("response") {
                let mut staged = FixedBuffer::new(out.len());
                staged.fill_truncated(price.as_bytes());
                out[..staged.contents().len()].copy_from_slice(staged.contents());
            }
            if let Some(name) = map.get("companyname") {
                state().lock().namecache.insert(ticker.to_string(), name.clone());
            }
        }
    }
    Ok(result)
}

fn lookup(handle: Handle) -> Result<Arc<QuoteTask>, AppError> {
    state().lock().tasks.get(&handle).cloned().ok_or(AppError::InvalidHandle)
}

pub fn is_complete(handle: Handle) -> Result<bool, AppError> { Ok(lookup(handle)?.is_complete()) }

pub fn wait(handle: Handle) -> Result<(), AppError> {
    lookup(handle)?.wait()?;
    Ok(())
}

/// Blocks until `handle` finishes, or `timeout_ms` elapses. `0` means wait
/// forever. On timeout the task is left running and `handle` stays valid.
pub fn async_wait(handle: Handle, timeout_ms: u64) -> Result<WorkResult, AppError> {
    lookup(handle)?.wait_timeout(std::time::Duration::from_millis(timeout_ms))
}

pub fn async_result(handle: Handle) -> Result<WorkResult, AppError> { lookup(handle)?.result() }

/// Forwards to the task's completion callback. The original's `(fn, data)`
/// pair is, in this safe Rust API, a single `Send + 'static` closure — the
/// caller folds whatever "data" it needs into the closure's captures
/// instead of threading an opaque pointer through the registry (see
/// `SPEC_FULL.md` §3's Rust realization note; the `extern "C"` shim still
/// carries a raw `*mut c_void` for parity with the original).
pub fn register_callback(handle: Handle, f: impl FnOnce() + Send + 'static) -> Result<(), AppError> {
    lookup(handle)?.set_completion_callback(f);
    Ok(())
}

/// Removes a finished handle from the table. Fails with `InProgress` rather
/// than disposing of a task that hasn't finished; unlike the behavior this
/// replaces, the readiness check and the removal happen under one unbroken
/// lock, so a concurrent disposer can never observe (or act on) a handle
/// between the check and the removal.
#[instrument]
pub fn dispose(handle: Handle) -> Result<(), AppError> {
    let mut guard = state().lock();
    let task = guard.tasks.get(&handle).ok_or(AppError::InvalidHandle)?;
    if !task.is_complete() {
        return Err(AppError::InProgress);
    }
    guard.tasks.remove(&handle);
    Ok(())
}

/// Blocks until every currently-registered task has finished.
pub fn wait_all() -> Result<(), AppError> {
    let tasks: Vec<_> = state().lock().tasks.values().cloned().collect();
    for task in tasks {
        task.wait()?;
    }
    Ok(())
}

/// Disposes of every task, but only if all of them are finished; if any one
/// task is still running, nothing is disposed and `InProgress` is returned.
#[instrument]
pub fn cleanup() -> Result<(), AppError> {
    let mut guard = state().lock();
    if guard.tasks.values().any(|t| !t.is_complete()) {
        return Err(AppError::InProgress);
    }
    guard.tasks.clear();
    Ok(())
}

pub fn namecache_has_ticker(ticker: &str) -> bool { state().lock().namecache.contains_key(ticker) }

pub fn namecache_count() -> usize { state().lock().namecache.len() }

pub fn namecache_resolve(ticker: &str) -> Option<String> { state().lock().namecache.get(ticker).cloned() }

/// Resolves a ticker to a company name, consulting the cache first and
/// falling back to a synchronous fetch (which populates the cache) on a
/// miss. `None` if the cache misses and the fetch fails for any reason.
pub fn ticker_to_name(ticker: &str) -> Option<String> {
    if let Some(name) = namecache_resolve(ticker) {
        return Some(name);
    }

    let mut scratch = [0u8; 256];
    match fetch_sync(ticker, &mut scratch) {
        Ok(WorkResult::Success) => namecache_resolve(ticker),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Call,
    Put,
}

pub fn option_price(kind: OptionKind, asset_price: f64, strike_price: f64, expiry: f64, rate: f64, vol: f64) -> f64 {
    match kind {
        OptionKind::Call => black_scholes::call_price(asset_price, strike_price, expiry, rate, vol),
        OptionKind::Put => black_scholes::put_price(asset_price, strike_price, expiry, rate, vol),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionGreek {
    CallDelta,
    PutDelta,
    Vega,
    CallTheta,
    PutTheta,
}

pub fn option_greek(greek: OptionGreek, asset_price: f64, strike_price: f64, expiry: f64, rate: f64, vol: f64) -> f64 {
    match greek {
        OptionGreek::CallDelta => black_scholes::call_delta(asset_price, strike_price, expiry, rate, vol),
        OptionGreek::PutDelta => black_scholes::put_delta(asset_price, strike_price, expiry, rate, vol),
        OptionGreek::Vega => black_scholes::vega(asset_price, strike_price, expiry, rate, vol),
        OptionGreek::CallTheta => black_scholes::theta(asset_price, strike_price, expiry, rate, vol, true),
        OptionGreek::PutTheta => black_scholes::theta(asset_price, strike_price, expiry, rate, vol, false),
    }
}
