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

//! Drives a [`Problem`] through `Idle -> Running -> Finished` on either the
//! calling thread or a detached worker thread.

use std::{sync::Arc, thread};

use parking_lot::Mutex;
use tracing::{instrument, trace};

use crate::{
    error::AppError,
    problem::Problem,
    result_slot::{ResultSlot, WorkResult},
    state_machine::StateMachine,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TaskState {
    Idle,
    Running,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TaskAction {
    Begin,
    Finish,
    Abort,
    Reset,
}

struct TaskInner<O> {
    output: Option<O>,
    slot: ResultSlot<AppError>,
}

type Completion = Box<dyn FnOnce() + Send>;

/// A unit of work built from a [`Problem`], runnable once per `Idle` visit
/// and rearmable with [`Task::reset`]. Completion callbacks queue up in
/// `callbacks` and are drained by a single entry hook installed once, at
/// construction, on the state machine's `Finished` state (see
/// [`Task::set_completion_callback`]), so every queued callback runs
/// atomically inside whichever thread's [`StateMachine::dispatch`] drives
/// the Running→Finished transition — never lost, never double-fired. A
/// queue rather than a single slot lets the registry wire its own
/// buffer/namecache bookkeeping onto the same task a caller later attaches
/// a `register_callback` to, without one clobbering the other.
pub struct Task<I, O> {
    state: StateMachine<TaskState, TaskAction>,
    problem: Mutex<Option<Problem<I, O>>>,
    inner: Mutex<TaskInner<O>>,
    callbacks: Arc<Mutex<Vec<Completion>>>,
}

impl<I, O> Task<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn new(problem: Problem<I, O>) -> Self {
        let state = StateMachine::new();
        state.add_states([TaskState::Idle, TaskState::Running, TaskState::Finished]);
        state.add_actions([TaskAction::Begin, TaskAction::Finish, TaskAction::Abort, TaskAction::Reset]);
        state.add_transition(TaskState::Idle, TaskAction::Begin, TaskState::Running);
        state.add_transition(TaskState::Running, TaskAction::Finish, TaskState::Finished);
        state.add_transition(TaskState::Running, TaskAction::Abort, TaskState::Idle);
        state.add_transition(TaskState::Finished, TaskAction::Reset, TaskState::Idle);

        let callbacks: Arc<Mutex<Vec<Completion>>> = Arc::new(Mutex::new(Vec::new()));
        let hook_callbacks = callbacks.clone();
        state.set_entry_hook(TaskState::Finished, move || {
            let pending: Vec<_> = std::mem::take(&mut *hook_callbacks.lock());
            for f in pending {
                f();
            }
        });

        state.initialize(TaskState::Idle);

        Task {
            state,
            problem: Mutex::new(Some(problem)),
            inner: Mutex::new(TaskInner { output: None, slot: ResultSlot::new(WorkResult::Unknown) }),
            callbacks,
        }
    }

    /// Runs the problem on the calling thread and returns its outcome.
    #[instrument(skip_all)]
    pub fn perform_sync(&self) -> Result<WorkResult, AppError> {
        self.state.dispatch(TaskAction::Begin)?;
        let problem = self.problem.lock().take().expect("problem missing while Idle");
        self.finish_with(problem);
        self.inner.lock().slot.result()
    }

    /// Hands the problem to a detached worker thread and returns once the
    /// transition into `Running` has been made; the caller does not block
    /// on completion. Use [`Task::wait`] or a completion callback to observe
    /// the outcome.
    #[instrument(skip_all)]
    pub fn perform_async(self: &Arc<Self>) -> Result<(), AppError> {
        self.state.dispatch(TaskAction::Begin)?;
        let problem = self.problem.lock().take().expect("problem missing while Idle");
        let this = Arc::clone(self);
        thread::spawn(move || this.finish_with(problem));
        Ok(())
    }

    fn finish_with(&self, problem: Problem<I, O>) {
        let outcome = problem.solve();
        {
            let mut inner = self.inner.lock();
            match outcome {
                Ok(value) => {
                    inner.output = Some(value);
                    inner.slot.set(WorkResult::Success);
                }
                Err(e) => {
                    trace!(error = %e, "task finished with an error");
                    inner.slot.set_with_error(WorkResult::Failure, e);
                }
            }
        }
        // The completion callback, if any, is wired as the Finished entry
        // hook and fires here, inside dispatch, on this thread.
        self.state.dispatch(TaskAction::Finish).expect("Running -> Finished is always defined");
    }

    /// Cancels a task that has started running but not yet finished,
    /// returning it to `Idle`. Does not interrupt a computation already in
    /// flight on a worker thread; it only releases the state machine so a
    /// new problem can be armed once the worker eventually calls back.
    pub fn abort(&self) -> Result<(), AppError> { self.state.dispatch(TaskAction::Abort) }

    /// Blocks the calling thread until the task reaches `Finished`.
    pub fn wait(&self) -> Result<WorkResult, AppError> {
        self.state.wait_for_entry(TaskState::Finished);
        self.inner.lock().slot.result()
    }

    /// Like [`Self::wait`], bounded by `timeout`. A `timeout` of zero means
    /// wait forever, matching the registry's `async_wait(handle, 0)`
    /// convention. Returns `AppError::Timeout` if the deadline passes before
    /// the task finishes; the task is left running.
    pub fn wait_timeout(&self, timeout: std::time::Duration) -> Result<WorkResult, AppError> {
        if timeout.is_zero() {
            return self.wait();
        }
        if !self.state.wait_for_entry_timeout(TaskState::Finished, timeout) {
            return Err(AppError::Timeout);
        }
        self.inner.lock().slot.result()
    }

    /// True once the result slot has been filled in, slightly ahead of the
    /// state machine's own `Finished` entry (the two settle within the same
    /// uninterrupted critical section in [`Task::finish_with`]).
    pub fn is_complete(&self) -> bool { self.inner.lock().slot.is_ready() }

    /// The stored result code, without blocking. Fails with `NotReady`
    /// until the task finishes.
    pub fn result(&self) -> Result<WorkResult, AppError> { self.inner.lock().slot.result() }

    /// The stored output. Fails with `NotReady` until the task finishes, and
    /// with the task's own error (wrapped by [`Problem::solve`]) if it failed.
    pub fn output(&self) -> Result<O, AppError>
    where
        O: Clone,
    {
        let inner = self.inner.lock();
        inner.slot.result()?;
        match inner.slot.error() {
            Some(e) => Err(e.clone()),
            None => inner.output.clone().ok_or(AppError::NotReady),
        }
    }

    /// Queues a callback to run exactly once, when the task finishes.
    /// Holding the machine's own lock for the whole check-then-enqueue means
    /// a concurrent `dispatch` can't run between the `Finished` check below
    /// and the enqueue: either this thread observes `Finished` and fires `f`
    /// itself, or the dispatching thread enqueues it and the Finished entry
    /// hook runs it — never both. Multiple callbacks may be queued (by the
    /// registry's own bookkeeping and by a caller's `register_callback`
    /// alike); each fires exactly once, in the order queued.
    ///
    /// If the task has already finished by the time this is called, `f`
    /// runs immediately, on the calling thread.
    pub fn set_completion_callback<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let lock = self.state.obtain_lock();
        if self.state.get_state() == TaskState::Finished {
            drop(lock);
            f();
            return;
        }
        self.callbacks.lock().push(Box::new(f));
    }

    /// Rearms the task with a new problem. Fails with `InProgress` if a
    /// worker is still running; otherwise returns the task to `Idle` with a
    /// clean result slot and no leftover callback.
    pub fn reset(&self, problem: Problem<I, O>) -> Result<(), AppError> {
        match self.state.get_state() {
            TaskState::Running => return Err(AppError::InProgress),
            TaskState::Finished => self.state.dispatch(TaskAction::Reset)?,
            TaskState::Idle => {}
        }
        self.callbacks.lock().clear();
        {
            let mut inner = self.inner.lock();
            inner.output = None;
            inner.slot.clear(WorkResult::Unknown);
        }
        *self.problem.lock() = Some(problem);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicBool, Ordering},
        time::Duration,
    };

    use pretty_assertions::assert_eq;

    use super::*;

    fn succeeding_problem() -> Problem<i64, i64> {
        Problem::new(|n: &i64| Ok::<_, String>(n * 2), 21)
    }

    fn failing_problem() -> Problem<i64, i64> {
        Problem::new(|_n: &i64| Err::<i64, _>("there is a bug in fct()".to_string()), 21)
    }

    #[test]
    fn perform_sync_success_stores_output() {
        let task = Task::new(succeeding_problem());
        assert_eq!(task.perform_sync().unwrap(), WorkResult::Success);
        assert_eq!(task.output().unwrap(), 42);
    }

    #[test]
    fn perform_sync_failure_surfaces_the_abort_error() {
        let task = Task::new(failing_problem());
        assert_eq!(task.perform_sync().unwrap(), WorkResult::Failure);
        assert!(task.output().is_err());
    }

    #[test]
    fn cannot_begin_twice_without_a_reset() {
        let task = Arc::new(Task::new(succeeding_problem()));
        task.perform_sync().unwrap();
        assert!(task.perform_sync().is_err());
    }

    #[test]
    fn perform_async_then_wait_observes_the_result() {
        let task = Arc::new(Task::new(succeeding_problem()));
        task.perform_async().unwrap();
        assert_eq!(task.wait().unwrap(), WorkResult::Success);
        assert_eq!(task.output().unwrap(), 42);
        assert!(task.is_complete());
    }

    #[test]
    fn completion_callback_fires_once_when_registered_before_finish() {
        let task = Arc::new(Task::new(succeeding_problem()));
        let fired = Arc::new(AtomicBool::new(false));
        {
            let flag = fired.clone();
            task.set_completion_callback(move || flag.store(true, Ordering::SeqCst));
        }
        task.perform_async().unwrap();
        task.wait().unwrap();
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn completion_callback_fires_immediately_when_registered_after_finish() {
        let task = Task::new(succeeding_problem());
        task.perform_sync().unwrap();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        task.set_completion_callback(move || flag.store(true, Ordering::SeqCst));
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn reset_rearms_the_task_for_another_run() {
        let task = Task::new(succeeding_problem());
        task.perform_sync().unwrap();
        task.reset(Problem::new(|n: &i64| Ok::<_, String>(n + 1), 41)).unwrap();
        assert_eq!(task.perform_sync().unwrap(), WorkResult::Success);
        assert_eq!(task.output().unwrap(), 42);
    }

    #[test]
    fn reset_while_running_is_rejected() {
        let task = Arc::new(Task::new(Problem::new(
            |n: &i64| {
                std::thread::sleep(Duration::from_millis(50));
                Ok::<_, String>(*n)
            },
            1,
        )));
        task.perform_async().unwrap();
        assert!(matches!(task.reset(succeeding_problem()), Err(AppError::InProgress)));
        task.wait().unwrap();
    }

    #[test]
    fn wait_timeout_returns_timeout_while_still_running() {
        let task = Arc::new(Task::new(Problem::new(
            |n: &i64| {
                std::thread::sleep(Duration::from_millis(200));
                Ok::<_, String>(*n)
            },
            1,
        )));
        task.perform_async().unwrap();
        assert!(matches!(task.wait_timeout(Duration::from_millis(20)), Err(AppError::Timeout)));
        task.wait().unwrap();
    }

    #[test]
    fn wait_timeout_zero_means_wait_forever() {
        let task = Arc::new(Task::new(succeeding_problem()));
        task.perform_async().unwrap();
        assert_eq!(task.wait_timeout(Duration::from_millis(0)).unwrap(), WorkResult::Success);
    }

    #[test]
    fn many_concurrent_async_successes_all_complete() {
        for _ in 0..100 {
            let task = Arc::new(Task::new(succeeding_problem()));
            task.perform_async().unwrap();
            assert_eq!(task.wait().unwrap(), WorkResult::Success);
        }
    }
}
