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

//! Collects references and disposes of all of them together, on scope exit.

/// Holds a list of `T`, collected via [`SweepList::add`], and passes each one
/// (in insertion order) to the disposer closure given to the constructor when
/// the `SweepList` itself is dropped.
///
/// Useful for releasing a pile of temporary handles that may have been
/// acquired along successful or exceptional control paths.
pub struct SweepList<T, F: FnMut(&mut T)> {
    items: Vec<T>,
    action: F,
}

impl<T, F: FnMut(&mut T)> SweepList<T, F> {
    pub fn new(action: F) -> Self { SweepList { items: Vec::new(), action } }

    /// Records `item`; it is swept on drop.
    pub fn add(&mut self, item: T) { self.items.push(item); }
}

impl<T, F: FnMut(&mut T)> Drop for SweepList<T, F> {
    fn drop(&mut self) {
        for item in &mut self.items {
            (self.action)(item);
        }
    }
}
