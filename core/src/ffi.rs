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

//! `extern "C"` shim over [`crate::registry`], matching `stocklib.h`'s
//! declarations in name and shape. This is a thin, mechanical translation
//! layer for embedders that can't link the safe Rust API directly; it is
//! not where the interesting behavior lives, and it is not the primary
//! tested surface (see `crate::registry` for that).
//!
//! A handle crossing this boundary is a bit pattern, not a pointer: nothing
//! on the C side dereferences it, and nothing here reads through it.
//! Validity is always decided by registry membership.

use std::{
    ffi::{CStr, c_char, c_void},
    os::raw::c_int,
    slice,
    sync::Arc,
};

use parking_lot::Mutex;

use crate::{
    buffer::{FixedBuffer, SharedBuffer},
    error::AppError,
    registry,
    registry::Handle,
    result_slot::WorkResult,
};

/// Mirrors `SL_MAX_BUFFER` from `stocklib.h`: the buffer size assumed for an
/// asynchronous fetch's output, since `stocklib_fetch_asynch` (unlike the
/// synchronous call) takes no explicit length for the caller's buffer.
const SL_MAX_BUFFER: usize = 32;

/// Mirrors `sl_result_t` from `stocklib.h`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlResult {
    Ok = 0,
    Fail = 1,
    Pending = 2,
    Timeout = 3,
}

impl From<Result<WorkResult, AppError>> for SlResult {
    fn from(result: Result<WorkResult, AppError>) -> Self {
        match result {
            Ok(WorkResult::Success) => SlResult::Ok,
            Ok(WorkResult::Failure) => SlResult::Fail,
            Ok(WorkResult::Unknown) => SlResult::Pending,
            Err(AppError::Timeout) => SlResult::Timeout,
            Err(_) => SlResult::Fail,
        }
    }
}

fn unit_result(result: Result<(), AppError>) -> SlResult {
    match result {
        Ok(()) => SlResult::Ok,
        Err(AppError::Timeout) => SlResult::Timeout,
        Err(_) => SlResult::Fail,
    }
}

/// # Safety
/// `ptr` must be either null or point to a valid, NUL-terminated C string
/// that stays valid for the duration of this call.
unsafe fn read_c_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok().map(str::to_string)
}

/// Copies `text`'s bytes (truncated to fit) into `out[..out_len]`,
/// NUL-terminating the final byte actually written, mirroring the
/// Transport contract's "zero-terminate the final byte" rule. Assembled in a
/// [`FixedBuffer`] first so the truncate-then-terminate bookkeeping goes
/// through the same bounded-append path the rest of the crate uses, rather
/// than being re-derived here.
///
/// # Safety
/// `out` must point to at least `out_len` writable bytes.
unsafe fn write_c_str(out: *mut u8, out_len: usize, text: &str) {
    if out.is_null() || out_len == 0 {
        return;
    }
    let bytes = text.as_bytes();
    let copy_len = bytes.len().min(out_len - 1);

    let mut staged = FixedBuffer::new(out_len);
    staged.append(&bytes[..copy_len]);
    staged.append(&[0u8]);

    let dest = unsafe { slice::from_raw_parts_mut(out, out_len) };
    dest[..staged.contents().len()].copy_from_slice(staged.contents());
}

/// A caller-supplied `(fn, data)` pair plumbed through to `registry`'s
/// `Send`-bound callback. `data` is never dereferenced on this side; its
/// lifetime is the caller's problem, per the collaborator contract.
struct RawCallback {
    callback: extern "C" fn(u64, *mut c_void),
    handle: u64,
    data: *mut c_void,
}

// SAFETY: the core never reads through `data`; it is only ever handed back
// to `callback` on whichever thread completes the task.
unsafe impl Send for RawCallback {}

impl RawCallback {
    fn fire(self) { (self.callback)(self.handle, self.data); }
}

#[unsafe(no_mangle)]
pub extern "C" fn stocklib_init() -> SlResult { unit_result(registry::init()) }

/// # Safety
/// `ticker` must be a valid NUL-terminated C string. `out` must point to at
/// least `out_len` writable bytes. On `Fail`, `out` is left untouched; on
/// `Ok`, the whole `out_len` bytes are written (price, then zero padding),
/// so a short price is still NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn stocklib_fetch_synch(ticker: *const c_char, out: *mut u8, out_len: usize) -> SlResult {
    let Some(ticker) = (unsafe { read_c_str(ticker) }) else { return SlResult::Fail };
    if out.is_null() || out_len == 0 {
        return SlResult::Fail;
    }
    let mut staged = vec![0u8; out_len];
    match registry::fetch_sync(&ticker, &mut staged) {
        Ok(WorkResult::Success) => {
            let dest = unsafe { slice::from_raw_parts_mut(out, out_len) };
            dest.copy_from_slice(&staged);
            SlResult::Ok
        }
        Ok(_) => SlResult::Fail,
        Err(e) => SlResult::from(Err(e)),
    }
}

/// A caller-supplied raw output pointer plumbed through to the registry's
/// `Send`-bound callback. Never dereferenced on this side except to write
/// the decoded price into it once, after the fetch completes; its lifetime
/// for that long is the caller's responsibility, per the collaborator
/// contract (mirrors `RawCallback` below).
struct RawOutput {
    ptr: *mut u8,
    len: usize,
}

// SAFETY: the core only writes through `ptr` once, from whichever thread
// completes the task, and never reads through it.
unsafe impl Send for RawOutput {}

/// Returns `u64::MAX` on failure, since there is no handle to report.
///
/// # Safety
/// `ticker` must be a valid NUL-terminated C string. `output`, if non-null,
/// must point to at least `SL_MAX_BUFFER` writable bytes that stay valid
/// until the fetch completes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn stocklib_fetch_asynch(ticker: *const c_char, output: *mut u8) -> u64 {
    let Some(ticker) = (unsafe { read_c_str(ticker) }) else { return u64::MAX };
    let buffer: SharedBuffer = Arc::new(Mutex::new(FixedBuffer::new(SL_MAX_BUFFER)));
    let Ok(handle) = registry::fetch_async(&ticker, buffer.clone()) else { return u64::MAX };

    if !output.is_null() {
        let raw = RawOutput { ptr: output, len: SL_MAX_BUFFER };
        let _ = registry::register_callback(handle, move || {
            let contents = buffer.lock().contents().to_vec();
            let text = String::from_utf8_lossy(&contents).into_owned();
            unsafe { write_c_str(raw.ptr, raw.len, &text) };
        });
    }

    handle.into_raw()
}

#[unsafe(no_mangle)]
pub extern "C" fn stocklib_asynch_dispose(handle: u64) -> SlResult {
    unit_result(registry::dispose(Handle::from_raw(handle)))
}

#[unsafe(no_mangle)]
pub extern "C" fn stocklib_is_complete(handle: u64) -> c_int {
    c_int::from(registry::is_complete(Handle::from_raw(handle)).unwrap_or(false))
}

#[unsafe(no_mangle)]
pub extern "C" fn stocklib_asynch_result(handle: u64) -> SlResult {
    SlResult::from(registry::async_result(Handle::from_raw(handle)))
}

#[unsafe(no_mangle)]
pub extern "C" fn stocklib_asynch_wait(handle: u64, timeout_ms: u64) -> SlResult {
    SlResult::from(registry::async_wait(Handle::from_raw(handle), timeout_ms))
}

/// # Safety
/// `data` is passed back to `callback` unexamined; it must remain valid for
/// as long as the caller intends to use it once `callback` fires.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn stocklib_asynch_register_callback(
    handle: u64,
    callback: extern "C" fn(u64, *mut c_void),
    data: *mut c_void,
) -> SlResult {
    let raw = RawCallback { callback, handle, data };
    unit_result(registry::register_callback(Handle::from_raw(handle), move || raw.fire()))
}

#[unsafe(no_mangle)]
pub extern "C" fn stocklib_wait_all() -> SlResult { unit_result(registry::wait_all()) }

#[unsafe(no_mangle)]
pub extern "C" fn stocklib_cleanup() -> SlResult { unit_result(registry::cleanup()) }

/// # Safety
/// `ticker` must be a valid NUL-terminated C string. `out` must point to at
/// least `out_len` writable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn stocklib_ticker_to_name(ticker: *const c_char, out: *mut u8, out_len: usize) -> SlResult {
    let Some(ticker) = (unsafe { read_c_str(ticker) }) else { return SlResult::Fail };
    match registry::ticker_to_name(&ticker) {
        Some(name) => {
            unsafe { write_c_str(out, out_len, &name) };
            SlResult::Ok
        }
        None => SlResult::Fail,
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn stocklib_option_price(kind: c_int, spot: f64, strike: f64, rate: f64, vol: f64, time: f64) -> f64 {
    let kind = if kind == 0 { registry::OptionKind::Call } else { registry::OptionKind::Put };
    registry::option_price(kind, spot, strike, time, rate, vol)
}

#[unsafe(no_mangle)]
pub extern "C" fn stocklib_option_greek(greek: c_int, spot: f64, strike: f64, rate: f64, vol: f64, time: f64) -> f64 {
    let greek = match greek {
        0 => registry::OptionGreek::CallDelta,
        1 => registry::OptionGreek::PutDelta,
        2 => registry::OptionGreek::Vega,
        3 => registry::OptionGreek::CallTheta,
        _ => registry::OptionGreek::PutTheta,
    };
    registry::option_greek(greek, spot, strike, time, rate, vol)
}

#[cfg(test)]
mod tests {
    use std::{ffi::CString, sync::mpsc};

    use serial_test::serial;

    use super::*;

    fn fresh_registry_in_test_mode(behavior: crate::ticker::TestBehavior) {
        registry::reset();
        registry::init().unwrap();
        registry::set_test_mode(true);
        registry::set_test_behavior(behavior);
    }

    #[test]
    #[serial]
    fn fetch_synch_writes_the_price_into_the_output_buffer() {
        fresh_registry_in_test_mode(crate::ticker::TestBehavior::NormalRequest);
        let ticker = CString::new("AAPL").unwrap();
        let mut out = [0u8; 32];
        let result = unsafe { stocklib_fetch_synch(ticker.as_ptr(), out.as_mut_ptr(), out.len()) };
        assert_eq!(result, SlResult::Ok);
        let nul = out.iter().position(|&b| b == 0).unwrap();
        assert_eq!(&out[..nul], b"99.99");
    }

    #[test]
    #[serial]
    fn fetch_synch_fails_on_gibberish() {
        fresh_registry_in_test_mode(crate::ticker::TestBehavior::GibberishRequest);
        let ticker = CString::new("ZZZZ").unwrap();
        let mut out = [0u8; 32];
        let result = unsafe { stocklib_fetch_synch(ticker.as_ptr(), out.as_mut_ptr(), out.len()) };
        assert_eq!(result, SlResult::Fail);
    }

    #[test]
    #[serial]
    fn asynch_round_trip_with_callback() {
        fresh_registry_in_test_mode(crate::ticker::TestBehavior::NormalRequest);
        let ticker = CString::new("AAPL").unwrap();
        let mut out = [0u8; 32];
        let handle = unsafe { stocklib_fetch_asynch(ticker.as_ptr(), out.as_mut_ptr()) };
        assert_ne!(handle, u64::MAX);

        let (tx, rx) = mpsc::channel::<()>();
        let boxed = Box::into_raw(Box::new(tx)).cast::<c_void>();

        extern "C" fn on_done(_handle: u64, data: *mut c_void) {
            let tx = unsafe { Box::from_raw(data.cast::<mpsc::Sender<()>>()) };
            let _ = tx.send(());
        }

        let registered = unsafe { stocklib_asynch_register_callback(handle, on_done, boxed) };
        assert_eq!(registered, SlResult::Ok);
        rx.recv_timeout(std::time::Duration::from_secs(2)).expect("callback should have fired");

        assert_eq!(stocklib_asynch_wait(handle, 0), SlResult::Ok);
        assert_eq!(stocklib_is_complete(handle), 1);
        assert_eq!(stocklib_asynch_result(handle), SlResult::Ok);
        let nul = out.iter().position(|&b| b == 0).unwrap();
        assert_eq!(&out[..nul], b"99.99");
        assert_eq!(stocklib_asynch_dispose(handle), SlResult::Ok);
    }

    #[test]
    #[serial]
    fn asynch_wait_times_out_on_a_hanging_request() {
        fresh_registry_in_test_mode(crate::ticker::TestBehavior::HangingRequest);
        let ticker = CString::new("AAPL").unwrap();
        let handle = unsafe { stocklib_fetch_asynch(ticker.as_ptr(), std::ptr::null_mut()) };
        assert_eq!(stocklib_asynch_wait(handle, 20), SlResult::Timeout);
    }

    #[test]
    fn write_c_str_truncates_and_nul_terminates_when_text_overflows() {
        let mut out = [0xAAu8; 4];
        unsafe { write_c_str(out.as_mut_ptr(), out.len(), "hello") };
        assert_eq!(out, *b"hel\0");
    }

    #[test]
    fn option_price_and_greek_dispatch_by_integer_code() {
        let call = stocklib_option_price(0, 100.0, 100.0, 0.05, 0.2, 1.0);
        let put = stocklib_option_price(1, 100.0, 100.0, 0.05, 0.2, 1.0);
        assert!(call > 0.0 && put > 0.0);

        let call_delta = stocklib_option_greek(0, 100.0, 100.0, 0.05, 0.2, 1.0);
        assert!((0.0..=1.0).contains(&call_delta));
    }
}
