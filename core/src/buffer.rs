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

//! Fixed-capacity, append-only byte buffer with move-only ownership.

use std::sync::Arc;

use parking_lot::Mutex;

/// A pre-sized buffer that only grows by appending, and only up to its fixed
/// capacity. There is no resize: once full, further appends fail without
/// touching the buffer's contents.
#[derive(Debug)]
pub struct FixedBuffer {
    storage: Vec<u8>,
    len: usize,
}

impl FixedBuffer {
    /// Allocates a new buffer with the given capacity, empty.
    pub fn new(capacity: usize) -> Self { FixedBuffer { storage: vec![0u8; capacity], len: 0 } }

    /// Bytes available for further appends.
    pub fn remaining_bytes(&self) -> usize { self.storage.len() - self.len }

    /// Appends `data` if it fits; otherwise leaves the buffer unchanged and
    /// returns `false`.
    pub fn append(&mut self, data: &[u8]) -> bool {
        if data.len() > self.remaining_bytes() {
            return false;
        }
        self.storage[self.len..self.len + data.len()].copy_from_slice(data);
        self.len += data.len();
        true
    }

    /// Discards everything written since construction or the last reset.
    pub fn reset(&mut self) { self.len = 0; }

    /// The bytes written since the last reset.
    pub fn contents(&self) -> &[u8] { &self.storage[..self.len] }

    /// Resets the buffer, then appends as much of `data` as fits, silently
    /// truncating the remainder. Used where a producer writes into a
    /// caller-owned buffer of unknown size relative to the payload (the
    /// registry's quote responses, the FFI shim's C strings).
    pub fn fill_truncated(&mut self, data: &[u8]) {
        self.reset();
        let len = data.len().min(self.remaining_bytes());
        self.append(&data[..len]);
    }
}

/// A [`FixedBuffer`] shared between a registry caller and the completion
/// callback that writes an async fetch's decoded response into it. The
/// caller must keep this alive for as long as the async request it was
/// passed to is outstanding.
pub type SharedBuffer = Arc<Mutex<FixedBuffer>>;

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn bounded_append() {
        let mut b = FixedBuffer::new(1024);
        assert_eq!(b.remaining_bytes(), 1024);
        assert!(b.append(b"Hello"));
        assert_eq!(b.remaining_bytes(), 1019);
        assert!(!b.append(&[0u8; 1024]));
        assert_eq!(b.remaining_bytes(), 1019);
    }

    #[test]
    fn contents_reflects_writes_since_reset() {
        let mut b = FixedBuffer::new(1024);
        b.append(b"Hello\0").then_some(()).unwrap();
        assert_eq!(b.contents(), b"Hello\0");
        assert_eq!(b.remaining_bytes(), 1024 - 6);
    }

    #[test]
    fn reset_restores_full_capacity() {
        let mut b = FixedBuffer::new(1024);
        b.append(&[0u8; 10]);
        assert_eq!(b.remaining_bytes(), 1014);
        b.reset();
        assert_eq!(b.remaining_bytes(), 1024);
        assert!(b.contents().is_empty());
    }

    #[test]
    fn fill_truncated_replaces_prior_contents_and_truncates_to_capacity() {
        let mut b = FixedBuffer::new(4);
        b.append(b"ab");
        b.fill_truncated(b"hello");
        assert_eq!(b.contents(), b"hell");
    }

    #[test]
    fn overflowing_append_is_rejected_wholesale() {
        let mut b = FixedBuffer::new(1024);
        assert!(b.append(&[0u8; 1024]));
        assert_eq!(b.remaining_bytes(), 0);
        assert!(!b.append(&[0u8; 1]));
        assert_eq!(b.remaining_bytes(), 0);

        let mut c = FixedBuffer::new(1024);
        assert!(!c.append(&[0u8; 1025]));
        assert_eq!(c.remaining_bytes(), 1024);
    }
}
