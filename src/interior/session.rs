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

use std::time::Instant;

use super::eval::{Callbacks, Evaluator};
use super::ipm::{self, Outcome, Problem};
use super::settings::{ParamError, Settings};
use crate::error::SessionError;
use crate::model::Triangle;
use crate::options::{IterationCallback, Value};
use crate::session::{
    rc, EvalCallback, EvalStructure, Goal, RawSolution, ResidualStructure, Session,
};
use crate::{Index, Int, Number};

/// Session of the in-process interior point solver.
pub struct InteriorSession<'a> {
    goal: Goal,
    problem: Problem,
    nequ: usize,
    callbacks: Option<Callbacks<'a>>,
    newpt: Option<IterationCallback<'a>>,
    settings: Settings,
    /// First rejected parameter, reported when solving.
    param_error: Option<ParamError>,
    outcome: Option<Outcome>,
    solve_time: Option<Number>,
}

impl<'a> InteriorSession<'a> {
    pub fn new() -> Self {
        InteriorSession {
            goal: Goal::Minimize,
            problem: Problem::default(),
            nequ: 0,
            callbacks: None,
            newpt: None,
            settings: Settings::default(),
            param_error: None,
            outcome: None,
            solve_time: None,
        }
    }

    fn open(&self, call: &'static str) -> Result<(), SessionError> {
        if self.outcome.is_some() {
            Err(SessionError::new(call, rc::ILLEGAL_CALL))
        } else {
            Ok(())
        }
    }

    fn sized(call: &'static str, expected: usize, v: &[Number]) -> Result<Vec<Number>, SessionError> {
        if v.len() == expected {
            Ok(v.to_vec())
        } else {
            log::error!("{}: expected {} values, got {}", call, expected, v.len());
            Err(SessionError::new(call, rc::ILLEGAL_CALL))
        }
    }

    fn in_range(call: &'static str, indices: &[Index], len: usize) -> Result<(), SessionError> {
        if indices.iter().all(|&i| i >= 0 && (i as usize) < len) {
            Ok(())
        } else {
            log::error!("{}: index out of range 0..{}", call, len);
            Err(SessionError::new(call, rc::ILLEGAL_CALL))
        }
    }
}

impl Default for InteriorSession<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Session<'a> for InteriorSession<'a> {
    fn infinity(&self) -> Number {
        ipm::INFINITY
    }

    fn hessian_triangle(&self) -> Triangle {
        Triangle::Upper
    }

    fn set_objective_goal(&mut self, goal: Goal) -> Result<(), SessionError> {
        self.open("set_objective_goal")?;
        self.goal = goal;
        Ok(())
    }

    fn add_vars(&mut self, n: usize) -> Result<(), SessionError> {
        self.open("add_vars")?;
        let p = &mut self.problem;
        p.n += n;
        p.x_lower.resize(p.n, -ipm::INFINITY);
        p.x_upper.resize(p.n, ipm::INFINITY);
        p.x0.resize(p.n, 0.0);
        Ok(())
    }

    fn set_var_lower_bounds(&mut self, lb: &[Number]) -> Result<(), SessionError> {
        self.open("set_var_lower_bounds")?;
        self.problem.x_lower = Self::sized("set_var_lower_bounds", self.problem.n, lb)?;
        Ok(())
    }

    fn set_var_upper_bounds(&mut self, ub: &[Number]) -> Result<(), SessionError> {
        self.open("set_var_upper_bounds")?;
        self.problem.x_upper = Self::sized("set_var_upper_bounds", self.problem.n, ub)?;
        Ok(())
    }

    fn add_cons(&mut self, m: usize) -> Result<(), SessionError> {
        self.open("add_cons")?;
        let p = &mut self.problem;
        p.m += m;
        p.c_lower.resize(p.m, -ipm::INFINITY);
        p.c_upper.resize(p.m, ipm::INFINITY);
        Ok(())
    }

    fn set_con_lower_bounds(&mut self, lb: &[Number]) -> Result<(), SessionError> {
        self.open("set_con_lower_bounds")?;
        self.problem.c_lower = Self::sized("set_con_lower_bounds", self.problem.m, lb)?;
        Ok(())
    }

    fn set_con_upper_bounds(&mut self, ub: &[Number]) -> Result<(), SessionError> {
        self.open("set_con_upper_bounds")?;
        self.problem.c_upper = Self::sized("set_con_upper_bounds", self.problem.m, ub)?;
        Ok(())
    }

    fn add_residuals(&mut self, ne: usize) -> Result<(), SessionError> {
        self.open("add_residuals")?;
        self.nequ += ne;
        Ok(())
    }

    fn set_var_primal_init_values(&mut self, x0: &[Number]) -> Result<(), SessionError> {
        self.open("set_var_primal_init_values")?;
        self.problem.x0 = Self::sized("set_var_primal_init_values", self.problem.n, x0)?;
        Ok(())
    }

    fn set_con_dual_init_values(&mut self, y0: &[Number]) -> Result<(), SessionError> {
        self.open("set_con_dual_init_values")?;
        self.problem.y0 = Some(Self::sized("set_con_dual_init_values", self.problem.m, y0)?);
        Ok(())
    }

    fn set_var_dual_init_values(&mut self, z0: &[Number]) -> Result<(), SessionError> {
        self.open("set_var_dual_init_values")?;
        self.problem.z0 = Some(Self::sized("set_var_dual_init_values", self.problem.n, z0)?);
        Ok(())
    }

    fn set_eval_callback(
        &mut self,
        structure: EvalStructure,
        callback: EvalCallback<'a>,
    ) -> Result<(), SessionError> {
        const CALL: &str = "set_eval_callback";
        self.open(CALL)?;
        let (n, m) = (self.problem.n, self.problem.m);
        Self::in_range(CALL, &structure.jac_rows, m)?;
        Self::in_range(CALL, &structure.jac_cols, n)?;
        Self::in_range(CALL, &structure.hess_rows, n)?;
        Self::in_range(CALL, &structure.hess_cols, n)?;
        let upper = structure
            .hess_rows
            .iter()
            .zip(structure.hess_cols.iter())
            .all(|(r, c)| r <= c);
        if !upper {
            log::error!("{}: Hessian structure is not in the upper triangle", CALL);
            return Err(SessionError::new(CALL, rc::ILLEGAL_CALL));
        }
        self.callbacks = Some(Callbacks::General {
            structure,
            callback,
        });
        Ok(())
    }

    fn set_lsq_callbacks(
        &mut self,
        structure: ResidualStructure,
        residual: EvalCallback<'a>,
        jacobian: EvalCallback<'a>,
    ) -> Result<(), SessionError> {
        const CALL: &str = "set_lsq_callbacks";
        self.open(CALL)?;
        Self::in_range(CALL, &structure.jac_rows, self.nequ)?;
        Self::in_range(CALL, &structure.jac_cols, self.problem.n)?;
        self.callbacks = Some(Callbacks::LeastSquares {
            structure,
            residual,
            jacobian,
        });
        Ok(())
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<(), SessionError> {
        self.open("set_param")?;
        if let Err(err) = self.settings.set(name, value) {
            log::warn!("{}", err);
            self.param_error.get_or_insert(err);
        }
        Ok(())
    }

    fn set_iteration_callback(
        &mut self,
        callback: IterationCallback<'a>,
    ) -> Result<(), SessionError> {
        self.open("set_iteration_callback")?;
        self.newpt = Some(callback);
        Ok(())
    }

    fn solve(&mut self) -> Int {
        if self.outcome.is_some() {
            return rc::ILLEGAL_CALL;
        }

        let start = Instant::now();
        let outcome = if let Some(err) = &self.param_error {
            log::error!("not solving: {}", err);
            Outcome::at_start(&self.problem, rc::BAD_PARAMINPUT)
        } else if let Some(callbacks) = self.callbacks.as_mut() {
            let sign = match self.goal {
                Goal::Minimize => 1.0,
                Goal::Maximize => -1.0,
            };
            let mut eval = Evaluator::new(
                callbacks,
                self.problem.n,
                self.problem.m,
                self.nequ,
                sign,
                self.settings.hessopt,
            );
            let outcome = ipm::solve(
                &self.problem,
                &self.settings,
                &mut eval,
                self.newpt.as_mut(),
                start,
            );
            log::trace!("evaluations: {:?}", eval.counts);
            outcome
        } else {
            log::error!("no evaluation callback registered");
            Outcome::at_start(&self.problem, rc::ILLEGAL_CALL)
        };
        let elapsed = start.elapsed().as_secs_f64();

        if self.settings.outlev >= 1 {
            log::info!(
                "{} ({}): objective {:e} after {} iterations in {:.3}s",
                rc::describe(outcome.status),
                outcome.status,
                outcome.objective,
                outcome.iterations,
                elapsed
            );
        }

        let status = outcome.status;
        self.outcome = Some(outcome);
        self.solve_time = Some(elapsed);
        status
    }

    fn solution(&self) -> RawSolution {
        match &self.outcome {
            Some(outcome) => RawSolution {
                status: outcome.status,
                objective: outcome.objective,
                x: outcome.x.clone(),
                lambda: outcome.lambda.clone(),
            },
            None => RawSolution {
                status: rc::ILLEGAL_CALL,
                objective: Number::NAN,
                x: self.problem.x0.clone(),
                lambda: vec![0.0; self.problem.m + self.problem.n],
            },
        }
    }

    fn abs_feas_error(&self) -> Number {
        self.outcome.as_ref().map_or(Number::NAN, |o| o.feas_error)
    }

    fn abs_opt_error(&self) -> Number {
        self.outcome.as_ref().map_or(Number::NAN, |o| o.opt_error)
    }

    fn number_iters(&self) -> usize {
        self.outcome.as_ref().map_or(0, |o| o.iterations)
    }

    fn solve_time_cpu(&self) -> Option<Number> {
        None
    }

    fn solve_time_real(&self) -> Option<Number> {
        self.solve_time
    }

    fn reset_params_to_defaults(&mut self) -> Result<(), SessionError> {
        self.settings = Settings::default();
        self.param_error = None;
        Ok(())
    }
}
