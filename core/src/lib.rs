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

//! A generic asynchronous-task core (state machine, problem, task, handle
//! registry) underneath a stock-quote fetching and option-pricing client.
//!
//! The task core ([`state_machine`], [`problem`], [`task`]) has no idea what
//! a stock quote is; [`ticker`] and [`registry`] are the one concrete thing
//! built on top of it.

pub mod black_scholes;
pub mod buffer;
pub mod config;
pub mod error;
pub mod ffi;
pub mod logging;
pub mod problem;
pub mod registry;
pub mod result_slot;
pub mod scoped_action;
pub mod state_machine;
pub mod sweep_list;
pub mod task;
pub mod ticker;
pub mod transport;

pub use buffer::FixedBuffer;
pub use error::{AppError, AppResult};
pub use problem::{ContainedProblem, Problem};
pub use registry::{Handle, OptionGreek, OptionKind};
pub use result_slot::{ResultSlot, WorkResult};
pub use scoped_action::ScopedAction;
pub use state_machine::StateMachine;
pub use sweep_list::SweepList;
pub use task::Task;
pub use ticker::TestBehavior;
