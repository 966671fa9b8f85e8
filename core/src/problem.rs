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

//! A pure `I -> O` computation, with uniform error wrapping.

use std::sync::Arc;

use crate::error::AppError;

/// A subclass-like way of defining a problem: the computation has access to
/// the implementing type's own data, instead of being a bare closure.
///
/// Mirrors the original's `contained_problem`, which gives the algorithm
/// object context (its own fields) rather than just the input parameter.
pub trait ContainedProblem<I, O>: Send + Sync {
    fn do_work(&self, input: &I) -> Result<O, String>;
}

/// Bundles an input value and a computation. Immutable once constructed:
/// there is no way to mutate `input` or replace the computation after the
/// fact. Not `Clone` — a Problem owns its closure and closure identity
/// matters for correctness (see the design notes on why this port forbids
/// copying a Problem, unlike some early variants of the source).
pub struct Problem<I, O> {
    computation: Box<dyn Fn(&I) -> Result<O, String> + Send + Sync>,
    input: I,
}

impl<I, O> Problem<I, O> {
    /// The functional form: an explicit closure plus an input.
    pub fn new<F>(computation: F, input: I) -> Self
    where
        F: Fn(&I) -> Result<O, String> + Send + Sync + 'static,
    {
        Problem { computation: Box::new(computation), input }
    }

    /// The contained form: the computation is supplied by a
    /// [`ContainedProblem`] implementation rather than a bare closure.
    pub fn contained<T>(target: T, input: I) -> Self
    where
        T: ContainedProblem<I, O> + 'static,
    {
        let target = Arc::new(target);
        Problem::new(move |i: &I| target.do_work(i), input)
    }

    /// Runs the computation and returns its output. Any failure reported by
    /// the computation is rewrapped as [`AppError::AbortError`].
    pub fn solve(&self) -> Result<O, AppError> {
        (self.computation)(&self.input).map_err(AppError::abort)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn factorial(n: i64) -> i64 {
        if n <= 1 { 1 } else { n * factorial(n - 1) }
    }

    #[test]
    fn solve_runs_the_computation() {
        let p = Problem::new(|n: &i64| Ok::<_, String>(factorial(*n)), 6i64);
        assert_eq!(p.solve().unwrap(), 720);
    }

    #[test]
    fn solve_wraps_failures_as_abort_errors() {
        let p = Problem::new(|_n: &i64| Err::<i64, _>("there is a bug in fct()".to_string()), 6i64);
        let err = p.solve().unwrap_err();
        match err {
            AppError::AbortError { message } => assert!(message.contains("bug")),
            other => panic!("expected AbortError, got {other:?}"),
        }
    }

    struct DoublingProblem;
    impl ContainedProblem<i64, i64> for DoublingProblem {
        fn do_work(&self, input: &i64) -> Result<i64, String> { Ok(input * 2) }
    }

    #[test]
    fn contained_problem_has_access_to_its_own_behavior() {
        let p = Problem::contained(DoublingProblem, 21i64);
        assert_eq!(p.solve().unwrap(), 42);
    }
}
