//   Copyright 2026 Egor Larionov
//
//   Licensed under the Apache License, Version 2.0 (the "License");
//   you may not use this file except in compliance with the License.
//   You may obtain a copy of the License at
//
//       http://www.apache.org/licenses/LICENSE-2.0
//
//   Unless required by applicable law or agreed to in writing, software
//   distributed under the License is distributed on an "AS IS" BASIS,
//   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//   See the License for the specific language governing permissions and
//   limitations under the License.

use std::collections::BTreeMap;

use crate::options::Value;
use crate::status::SolveStatus;
use crate::{Int, Number};

/// Diagnostics key holding the raw solver return code.
pub const RAW_STATUS: &str = "raw_status";
/// Diagnostics key holding the solver's description of the outcome.
pub const INTERNAL_MSG: &str = "internal_msg";
/// Diagnostics key holding the wall-clock solve time in seconds.
pub const REAL_TIME: &str = "real_time";
/// Diagnostics key holding the time measured around the blocking solve call in seconds.
pub const MEASURED_TIME: &str = "measured_time";

/// Normalized result of a solve.
#[derive(Clone, Debug, PartialEq)]
pub struct SolutionReport {
    pub status: SolveStatus,
    /// Final point.
    pub solution: Vec<Number>,
    /// Objective value at `solution`.
    pub objective: Number,
    /// Multipliers of the general constraints.
    pub constraint_multipliers: Vec<Number>,
    /// Multipliers of the variable bounds.
    pub bound_multipliers: Vec<Number>,
    /// Absolute primal feasibility error.
    pub primal_feasibility: Number,
    /// Absolute optimality (dual feasibility) error.
    pub dual_feasibility: Number,
    pub iterations: usize,
    /// CPU time of the solve in seconds.
    pub elapsed_time: Number,
    /// Wall-clock time of the solve in seconds.
    pub real_time: Number,
    /// Solver specific diagnostics.
    pub solver_specific: BTreeMap<String, Value>,
}

impl SolutionReport {
    /// Raw return code of the solver.
    pub fn raw_status(&self) -> Option<Int> {
        self.solver_specific
            .get(RAW_STATUS)
            .and_then(Value::as_int)
            .map(|code| code as Int)
    }
}
