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

//! The contract between the adapter and a callback-driven solver.
//!
//! A [`Backend`] creates one [`Session`] per solve. The adapter registers dimensions, bounds,
//! starting values, sparsity structure and evaluation callbacks on the session, runs a single
//! blocking [`Session::solve`] and reads the result back. Dropping the session releases it.
//!
//! The session speaks in raw integer codes: evaluation requests carry a code from [`request`]
//! and the solve returns a code from [`rc`].

use crate::error::{CallbackError, SessionError};
use crate::model::Triangle;
use crate::options::{IterationCallback, Value};
use crate::{Int, Index, Number};

/// Evaluation request codes.
pub mod request {
    use crate::Int;

    /// Objective and constraint values.
    pub const EVAL_FC: Int = 1;
    /// Objective gradient and constraint Jacobian.
    pub const EVAL_GA: Int = 2;
    /// Lagrangian Hessian including the objective weighted by `sigma`.
    pub const EVAL_H: Int = 3;
    /// Lagrangian Hessian-vector product including the objective weighted by `sigma`.
    pub const EVAL_HV: Int = 7;
    /// Lagrangian Hessian without the objective term.
    pub const EVAL_H_NO_F: Int = 8;
    /// Lagrangian Hessian-vector product without the objective term.
    pub const EVAL_HV_NO_F: Int = 9;
    /// Residual values.
    pub const EVAL_R: Int = 10;
    /// Residual Jacobian.
    pub const EVAL_RJ: Int = 11;
}

/// Solver return codes.
pub mod rc {
    use crate::Int;

    pub const OPTIMAL: Int = 0;
    pub const NEAR_OPT: Int = -100;
    pub const FEAS_XTOL: Int = -101;
    pub const FEAS_NO_IMPROVE: Int = -102;
    pub const FEAS_FTOL: Int = -103;
    pub const INFEASIBLE: Int = -200;
    pub const INFEAS_VAR_BOUNDS: Int = -206;
    pub const INFEAS_CON_BOUNDS: Int = -207;
    pub const UNBOUNDED: Int = -300;
    pub const ITER_LIMIT_FEAS: Int = -400;
    pub const TIME_LIMIT_FEAS: Int = -401;
    pub const FEVAL_LIMIT_FEAS: Int = -402;
    pub const ITER_LIMIT_INFEAS: Int = -410;
    pub const TIME_LIMIT_INFEAS: Int = -411;
    pub const FEVAL_LIMIT_INFEAS: Int = -412;
    pub const CALLBACK_ERR: Int = -500;
    pub const EVAL_ERR: Int = -502;
    pub const USER_TERMINATION: Int = -504;
    pub const ILLEGAL_CALL: Int = -515;
    pub const BAD_PARAMINPUT: Int = -520;
    pub const LINEAR_SOLVER_ERR: Int = -521;
    pub const INTERNAL_ERROR: Int = -600;

    /// Human readable description of a return code.
    pub fn describe(code: Int) -> &'static str {
        match code {
            OPTIMAL => "locally optimal solution found",
            NEAR_OPT => "primal feasible solution estimate cannot be improved; near optimal",
            FEAS_XTOL => "primal feasible solution; terminated because the step is too small",
            FEAS_NO_IMPROVE => "primal feasible solution estimate cannot be improved",
            FEAS_FTOL => "primal feasible solution; relative change in objective is too small",
            INFEAS_VAR_BOUNDS => "variable bounds are inconsistent",
            INFEAS_CON_BOUNDS => "constraint bounds are inconsistent",
            -299..=INFEASIBLE => "convergence to an infeasible point",
            -301..=UNBOUNDED => "problem appears to be unbounded",
            ITER_LIMIT_FEAS => "iteration limit reached; current point is feasible",
            TIME_LIMIT_FEAS => "time limit reached; current point is feasible",
            FEVAL_LIMIT_FEAS => "evaluation limit reached; current point is feasible",
            ITER_LIMIT_INFEAS => "iteration limit reached; current point is infeasible",
            TIME_LIMIT_INFEAS => "time limit reached; current point is infeasible",
            FEVAL_LIMIT_INFEAS => "evaluation limit reached; current point is infeasible",
            CALLBACK_ERR => "callback function error",
            EVAL_ERR => "evaluation error",
            USER_TERMINATION => "user requested termination",
            ILLEGAL_CALL => "illegal call to the solver",
            BAD_PARAMINPUT => "invalid parameter input",
            LINEAR_SOLVER_ERR => "linear solver error",
            -600..=-500 => "solver error",
            _ => "unknown return code",
        }
    }
}

/// Optimization direction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Goal {
    Minimize,
    Maximize,
}

/// Data describing the current point, handed to an evaluation callback.
#[derive(Copy, Clone, Debug)]
pub struct EvalRequest<'r> {
    /// One of the codes in [`request`].
    pub code: Int,
    pub x: &'r [Number],
    /// Constraint multipliers. Empty if there are no constraints or the request does not need
    /// them.
    pub lambda: &'r [Number],
    /// Objective weight of Hessian requests.
    pub sigma: Number,
    /// Vector multiplied by the Hessian in product requests.
    pub vec: &'r [Number],
}

/// Output buffers of an evaluation callback. Buffers unrelated to the request are empty.
#[derive(Debug)]
pub struct EvalResult<'r> {
    pub obj: &'r mut Number,
    pub c: &'r mut [Number],
    pub obj_grad: &'r mut [Number],
    pub jac: &'r mut [Number],
    pub hess: &'r mut [Number],
    pub hess_vec: &'r mut [Number],
    pub rsd: &'r mut [Number],
    pub rsd_jac: &'r mut [Number],
}

impl<'r> EvalResult<'r> {
    /// A result with only the objective slot; the caller attaches the buffers it needs.
    pub fn new(obj: &'r mut Number) -> Self {
        EvalResult {
            obj,
            c: &mut [],
            obj_grad: &mut [],
            jac: &mut [],
            hess: &mut [],
            hess_vec: &mut [],
            rsd: &mut [],
            rsd_jac: &mut [],
        }
    }
}

/// Evaluation callback registered with a session.
pub type EvalCallback<'a> =
    Box<dyn FnMut(&EvalRequest, &mut EvalResult) -> Result<(), CallbackError> + 'a>;

/// Zero-based sparsity structure of the general evaluation callback.
///
/// The Hessian is expressed in the triangle the session reports through
/// [`Session::hessian_triangle`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvalStructure {
    pub jac_rows: Vec<Index>,
    pub jac_cols: Vec<Index>,
    pub hess_rows: Vec<Index>,
    pub hess_cols: Vec<Index>,
}

/// Zero-based sparsity structure of the residual Jacobian.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResidualStructure {
    pub jac_rows: Vec<Index>,
    pub jac_cols: Vec<Index>,
}

/// Data passed to the per-iteration callback.
#[derive(Copy, Clone, Debug)]
pub struct IterationData<'r> {
    pub iteration: usize,
    pub x: &'r [Number],
    /// Constraint multipliers followed by bound multipliers.
    pub lambda: &'r [Number],
}

/// Final state read back from a session.
#[derive(Clone, Debug, PartialEq)]
pub struct RawSolution {
    /// Raw return code, see [`rc`].
    pub status: Int,
    pub objective: Number,
    pub x: Vec<Number>,
    /// `m` constraint multipliers followed by `n` bound multipliers.
    pub lambda: Vec<Number>,
}

/// An opaque solver session, configured and solved exactly once.
///
/// Sessions own everything registered with them, including the callbacks, which may borrow the
/// model for `'a`.
pub trait Session<'a> {
    /// Value used in place of infinite bounds.
    fn infinity(&self) -> Number;

    /// Triangle in which the session expects the Lagrangian Hessian structure.
    fn hessian_triangle(&self) -> Triangle;

    fn set_objective_goal(&mut self, goal: Goal) -> Result<(), SessionError>;

    fn add_vars(&mut self, n: usize) -> Result<(), SessionError>;
    fn set_var_lower_bounds(&mut self, lb: &[Number]) -> Result<(), SessionError>;
    fn set_var_upper_bounds(&mut self, ub: &[Number]) -> Result<(), SessionError>;

    fn add_cons(&mut self, m: usize) -> Result<(), SessionError>;
    fn set_con_lower_bounds(&mut self, lb: &[Number]) -> Result<(), SessionError>;
    fn set_con_upper_bounds(&mut self, ub: &[Number]) -> Result<(), SessionError>;

    fn add_residuals(&mut self, ne: usize) -> Result<(), SessionError>;

    fn set_var_primal_init_values(&mut self, x0: &[Number]) -> Result<(), SessionError>;
    fn set_con_dual_init_values(&mut self, y0: &[Number]) -> Result<(), SessionError>;
    fn set_var_dual_init_values(&mut self, z0: &[Number]) -> Result<(), SessionError>;

    /// Register the callback answering `EVAL_FC`, `EVAL_GA` and all Hessian requests.
    fn set_eval_callback(
        &mut self,
        structure: EvalStructure,
        callback: EvalCallback<'a>,
    ) -> Result<(), SessionError>;

    /// Register the residual (`EVAL_R`) and residual Jacobian (`EVAL_RJ`) callbacks.
    fn set_lsq_callbacks(
        &mut self,
        structure: ResidualStructure,
        residual: EvalCallback<'a>,
        jacobian: EvalCallback<'a>,
    ) -> Result<(), SessionError>;

    /// Set a named parameter. Sessions may defer rejecting unknown names or bad values until
    /// `solve`.
    fn set_param(&mut self, name: &str, value: &Value) -> Result<(), SessionError>;

    fn set_iteration_callback(&mut self, callback: IterationCallback<'a>)
        -> Result<(), SessionError>;

    /// Run the solver to completion and return its raw status code.
    fn solve(&mut self) -> Int;

    fn solution(&self) -> RawSolution;
    fn abs_feas_error(&self) -> Number;
    fn abs_opt_error(&self) -> Number;
    fn number_iters(&self) -> usize;

    /// CPU time of the last solve in seconds, if the session measures it.
    fn solve_time_cpu(&self) -> Option<Number>;
    /// Wall-clock time of the last solve in seconds, if the session measures it.
    fn solve_time_real(&self) -> Option<Number>;

    fn reset_params_to_defaults(&mut self) -> Result<(), SessionError>;
}

/// Creates solver sessions.
pub trait Backend {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Create a fresh session.
    fn create<'a>(&self) -> Result<Box<dyn Session<'a> + 'a>, SessionError>;
}
