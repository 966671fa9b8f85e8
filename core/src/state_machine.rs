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

//! A thread-safe, dynamically configurable finite state machine.
//!
//! The set of states/actions/transitions/hooks is built at runtime rather
//! than encoded in types, because a [`crate::task::Task`] registers its
//! completion hook after construction, in response to external signals
//! (callback registration from the registry).

use std::{
    cell::RefCell,
    collections::HashMap,
    fmt::Debug,
    hash::Hash,
    time::Duration,
};

use parking_lot::{Condvar, Mutex, ReentrantMutex};

use crate::error::AppError;

type Hook = Box<dyn FnMut() + Send>;

struct Inner<S, A> {
    states: std::collections::HashSet<S>,
    actions: std::collections::HashSet<A>,
    transitions: HashMap<S, HashMap<A, S>>,
    entry_hooks: HashMap<S, Hook>,
    exit_hooks: HashMap<S, Hook>,
    current: Option<S>,
}

/// One re-entrant "main" lock guards all structure (states, actions,
/// transitions, hooks, current state); entry/exit hooks run with it held,
/// so a hook may call back into the machine without deadlocking. A second,
/// non-reentrant "change" lock pairs with a condition variable so a waiter
/// can atomically observe "no pending change" before committing to sleep —
/// see [`StateMachine::wait_for_entry`].
pub struct StateMachine<S, A>
where
    S: Copy + Eq + Hash + Debug + Send + 'static,
    A: Copy + Eq + Hash + Debug + Send + 'static,
{
    main: ReentrantMutex<RefCell<Inner<S, A>>>,
    change: Mutex<()>,
    condvar: Condvar,
}

impl<S, A> StateMachine<S, A>
where
    S: Copy + Eq + Hash + Debug + Send + 'static,
    A: Copy + Eq + Hash + Debug + Send + 'static,
{
    pub fn new() -> Self {
        StateMachine {
            main: ReentrantMutex::new(RefCell::new(Inner {
                states: Default::default(),
                actions: Default::default(),
                transitions: HashMap::new(),
                entry_hooks: HashMap::new(),
                exit_hooks: HashMap::new(),
                current: None,
            })),
            change: Mutex::new(()),
            condvar: Condvar::new(),
        }
    }

    pub fn add_state(&self, s: S) {
        let guard = self.main.lock();
        guard.borrow_mut().states.insert(s);
    }

    pub fn add_states(&self, states: impl IntoIterator<Item = S>) {
        let guard = self.main.lock();
        let mut inner = guard.borrow_mut();
        for s in states {
            inner.states.insert(s);
        }
    }

    pub fn has_state(&self, s: S) -> bool {
        let guard = self.main.lock();
        guard.borrow().states.contains(&s)
    }

    pub fn add_action(&self, a: A) {
        let guard = self.main.lock();
        guard.borrow_mut().actions.insert(a);
    }

    pub fn add_actions(&self, actions: impl IntoIterator<Item = A>) {
        let guard = self.main.lock();
        let mut inner = guard.borrow_mut();
        for a in actions {
            inner.actions.insert(a);
        }
    }

    pub fn has_action(&self, a: A) -> bool {
        let guard = self.main.lock();
        guard.borrow().actions.contains(&a)
    }

    /// Overwrites any previous destination registered for `(from, action)`.
    pub fn add_transition(&self, from: S, action: A, to: S) {
        let guard = self.main.lock();
        guard.borrow_mut().transitions.entry(from).or_default().insert(action, to);
    }

    pub fn get_transition(&self, from: S, action: A) -> Result<S, AppError> {
        let guard = self.main.lock();
        let inner = guard.borrow();
        inner
            .transitions
            .get(&from)
            .and_then(|table| table.get(&action))
            .copied()
            .ok_or_else(|| AppError::undefined_transition(format!("{from:?}"), format!("{action:?}")))
    }

    pub fn set_entry_hook<F: FnMut() + Send + 'static>(&self, s: S, f: F) {
        let guard = self.main.lock();
        guard.borrow_mut().entry_hooks.insert(s, Box::new(f));
    }

    pub fn set_exit_hook<F: FnMut() + Send + 'static>(&self, s: S, f: F) {
        let guard = self.main.lock();
        guard.borrow_mut().exit_hooks.insert(s, Box::new(f));
    }

    /// Sets the current state and fires its entry hook, if any. Must be
    /// called before any `dispatch`. The main lock stays held across the
    /// hook, same as `dispatch`, so a hook set before `initialize` sees a
    /// consistent machine rather than racing a concurrent `dispatch`.
    pub fn initialize(&self, initial: S) {
        let guard = self.main.lock();
        guard.borrow_mut().current = Some(initial);
        self.run_entry_hook(initial);
        drop(guard);
    }

    pub fn get_state(&self) -> S {
        let guard = self.main.lock();
        guard.borrow().current.expect("state machine used before initialize()")
    }

    /// Runs the exit hook of the current state, transitions, notifies
    /// waiters, then runs the entry hook of the destination — all while
    /// holding both the main lock and the change lock, so no wakeup is
    /// lost and no waiter observes a torn transition.
    pub fn dispatch(&self, action: A) -> Result<(), AppError> {
        let main_guard = self.main.lock();
        let change_guard = self.change.lock();

        let current = main_guard.borrow().current.expect("state machine used before initialize()");
        let destination = main_guard
            .borrow()
            .transitions
            .get(&current)
            .and_then(|table| table.get(&action))
            .copied();

        let Some(destination) = destination else {
            return Err(AppError::invalid_transition(format!("{current:?}"), format!("{action:?}")));
        };

        // Both locks stay held for the whole transition: the re-entrant main
        // lock so hooks may call back into the machine, the change lock so a
        // waiter can never observe the change-lock released with a pending
        // transition un-notified.
        self.run_exit_hook(current);
        main_guard.borrow_mut().current = Some(destination);
        self.condvar.notify_all();
        self.run_entry_hook(destination);

        drop(change_guard);
        drop(main_guard);
        Ok(())
    }

    /// Blocks until the current state equals `s`; returns immediately if
    /// already there.
    pub fn wait_for_entry(&self, s: S) {
        let main_guard = self.main.lock();

        if main_guard.borrow().current == Some(s) {
            return;
        }

        let mut change_guard = self.change.lock();
        drop(main_guard);

        loop {
            if self.current_under_change_lock() == Some(s) {
                return;
            }
            self.condvar.wait(&mut change_guard);
        }
    }

    /// Like [`Self::wait_for_entry`], but gives up and returns `false` once
    /// `timeout` has elapsed without the state being reached. A `timeout` of
    /// zero still performs one check before giving up.
    pub fn wait_for_entry_timeout(&self, s: S, timeout: Duration) -> bool {
        let main_guard = self.main.lock();

        if main_guard.borrow().current == Some(s) {
            return true;
        }

        let mut change_guard = self.change.lock();
        drop(main_guard);

        let mut remaining = timeout;
        loop {
            if self.current_under_change_lock() == Some(s) {
                return true;
            }
            let before = std::time::Instant::now();
            let timed_out = self.condvar.wait_for(&mut change_guard, remaining).timed_out();
            if self.current_under_change_lock() == Some(s) {
                return true;
            }
            if timed_out {
                return false;
            }
            remaining = remaining.saturating_sub(before.elapsed());
        }
    }

    fn current_under_change_lock(&self) -> Option<S> {
        let main_guard = self.main.lock();
        main_guard.borrow().current
    }

    /// Returns a scoped acquisition of the main lock that the caller may
    /// hold across multiple operations, preventing state changes from
    /// other threads until released.
    pub fn obtain_lock(&self) -> StateLock<'_, S, A> { StateLock { _guard: self.main.lock() } }

    fn run_entry_hook(&self, s: S) {
        let extracted = {
            let guard = self.main.lock();
            guard.borrow_mut().entry_hooks.remove(&s)
        };
        if let Some(mut hook) = extracted {
            hook();
            let guard = self.main.lock();
            guard.borrow_mut().entry_hooks.entry(s).or_insert(hook);
        }
    }

    fn run_exit_hook(&self, s: S) {
        let extracted = {
            let guard = self.main.lock();
            guard.borrow_mut().exit_hooks.remove(&s)
        };
        if let Some(mut hook) = extracted {
            hook();
            let guard = self.main.lock();
            guard.borrow_mut().exit_hooks.entry(s).or_insert(hook);
        }
    }
}

/// An opaque, scoped acquisition of a [`StateMachine`]'s main lock. Dropping
/// it releases the lock.
pub struct StateLock<'a, S, A>
where
    S: Copy + Eq + Hash + Debug + Send + 'static,
    A: Copy + Eq + Hash + Debug + Send + 'static,
{
    _guard: parking_lot::ReentrantMutexGuard<'a, RefCell<Inner<S, A>>>,
}

impl<S, A> Default for StateMachine<S, A>
where
    S: Copy + Eq + Hash + Debug + Send + 'static,
    A: Copy + Eq + Hash + Debug + Send + 'static,
{
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, atomic::{AtomicBool, Ordering}},
        thread,
        time::Duration,
    };

    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum TestState {
        Idle,
        Running,
        Died,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum TestAction {
        Start,
        Stop,
    }

    fn loaded_machine() -> StateMachine<TestState, TestAction> {
        let m = StateMachine::new();
        m.add_states([TestState::Idle, TestState::Running, TestState::Died]);
        m.add_actions([TestAction::Start, TestAction::Stop]);
        m.add_transition(TestState::Idle, TestAction::Start, TestState::Running);
        m.add_transition(TestState::Running, TestAction::Stop, TestState::Died);
        m
    }

    #[test]
    fn add_and_query_state() {
        let m: StateMachine<TestState, TestAction> = StateMachine::new();
        m.add_state(TestState::Idle);
        assert!(m.has_state(TestState::Idle));
        assert!(!m.has_state(TestState::Running));
    }

    #[test]
    fn add_and_query_action() {
        let m: StateMachine<TestState, TestAction> = StateMachine::new();
        m.add_action(TestAction::Stop);
        assert!(m.has_action(TestAction::Stop));
        assert!(!m.has_action(TestAction::Start));
    }

    #[test]
    fn add_and_retrieve_transition() {
        let m = loaded_machine();
        assert_eq!(m.get_transition(TestState::Idle, TestAction::Start).unwrap(), TestState::Running);
    }

    #[test]
    fn querying_an_undefined_transition_fails() {
        let m = loaded_machine();
        assert!(m.get_transition(TestState::Idle, TestAction::Stop).is_err());
    }

    #[test]
    fn dispatching_an_invalid_transition_fails() {
        let m = loaded_machine();
        m.initialize(TestState::Idle);
        assert!(m.dispatch(TestAction::Stop).is_err());
    }

    #[test]
    fn entry_and_exit_hooks_fire_around_the_transition() {
        let m = loaded_machine();
        m.initialize(TestState::Idle);

        let entry_done = Arc::new(AtomicBool::new(false));
        let exit_done = Arc::new(AtomicBool::new(false));
        {
            let flag = entry_done.clone();
            m.set_entry_hook(TestState::Running, move || flag.store(true, Ordering::SeqCst));
        }
        {
            let flag = exit_done.clone();
            m.set_exit_hook(TestState::Running, move || flag.store(true, Ordering::SeqCst));
        }

        assert!(!entry_done.load(Ordering::SeqCst));
        assert!(!exit_done.load(Ordering::SeqCst));

        m.dispatch(TestAction::Start).unwrap();
        assert!(entry_done.load(Ordering::SeqCst));
        assert!(!exit_done.load(Ordering::SeqCst));

        m.dispatch(TestAction::Stop).unwrap();
        assert!(exit_done.load(Ordering::SeqCst));
    }

    #[test]
    fn initialize_fires_entry_hook_and_sets_state() {
        let m = loaded_machine();
        let called = Arc::new(AtomicBool::new(false));
        {
            let flag = called.clone();
            m.set_entry_hook(TestState::Idle, move || flag.store(true, Ordering::SeqCst));
        }
        m.initialize(TestState::Idle);
        assert_eq!(m.get_state(), TestState::Idle);
        assert!(called.load(Ordering::SeqCst));
    }

    #[test]
    fn wait_for_state_entry_blocks_until_dispatched() {
        let m = Arc::new(loaded_machine());
        m.initialize(TestState::Idle);

        let called = Arc::new(AtomicBool::new(false));
        let waiter_machine = m.clone();
        let waiter_flag = called.clone();
        let t = thread::spawn(move || {
            waiter_machine.wait_for_entry(TestState::Running);
            waiter_flag.store(true, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(20));
        m.dispatch(TestAction::Start).unwrap();
        t.join().unwrap();

        assert!(called.load(Ordering::SeqCst));
    }

    #[test]
    fn wait_for_entry_timeout_returns_true_when_already_there() {
        let m = loaded_machine();
        m.initialize(TestState::Idle);
        assert!(m.wait_for_entry_timeout(TestState::Idle, Duration::from_millis(0)));
    }

    #[test]
    fn wait_for_entry_timeout_gives_up_when_the_deadline_passes() {
        let m = loaded_machine();
        m.initialize(TestState::Idle);
        assert!(!m.wait_for_entry_timeout(TestState::Running, Duration::from_millis(20)));
        assert_eq!(m.get_state(), TestState::Idle);
    }

    #[test]
    fn wait_for_entry_timeout_succeeds_when_dispatched_in_time() {
        let m = Arc::new(loaded_machine());
        m.initialize(TestState::Idle);

        let waiter_machine = m.clone();
        let t = thread::spawn(move || waiter_machine.wait_for_entry_timeout(TestState::Running, Duration::from_secs(2)));

        thread::sleep(Duration::from_millis(20));
        m.dispatch(TestAction::Start).unwrap();

        assert!(t.join().unwrap());
    }

    #[test]
    fn holding_the_explicit_lock_blocks_other_dispatchers() {
        let m = Arc::new(loaded_machine());
        m.initialize(TestState::Idle);

        let lock = m.obtain_lock();

        let other = m.clone();
        let t = thread::spawn(move || {
            other.dispatch(TestAction::Start).unwrap();
            other.dispatch(TestAction::Stop).unwrap();
        });

        thread::sleep(Duration::from_millis(50));
        assert_eq!(m.get_state(), TestState::Idle);

        drop(lock);
        m.wait_for_entry(TestState::Died);
        t.join().unwrap();

        assert_eq!(m.get_state(), TestState::Died);
    }
}
