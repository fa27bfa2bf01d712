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

//! Wiring of a model into a solver session and translation of the result.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::time::Instant;

use crate::error::{CallbackError, Error};
use crate::feasibility::FeasibilityForm;
use crate::model::{IndexingStyle, ModelMeta, NlpModel, NlsModel, Triangle};
use crate::options::{SolveOptions, Value};
use crate::report::{self, SolutionReport};
use crate::session::{
    rc, request, Backend, EvalCallback, EvalRequest, EvalResult, EvalStructure, Goal,
    RawSolution, ResidualStructure, Session,
};
use crate::status::SolveStatus;
use crate::{Index, Number};

/// Solve a general nonlinear program.
///
/// A fresh session is created from `backend`, configured from `model` and `options`, solved once
/// and released before returning. The only errors raised here are dimension mismatches detected
/// before the session is created and failures to configure the session; everything the solver
/// reports is returned through the status of the report.
pub fn solve<'m, B, M>(
    backend: &B,
    model: &'m M,
    options: SolveOptions<'m>,
) -> Result<SolutionReport, Error>
where
    B: Backend + ?Sized,
    M: NlpModel,
{
    let meta = model.meta();
    validate(meta, &options)?;

    log::debug!(
        "{}: solving `{}` with {} variables and {} constraints",
        backend.name(),
        meta.name,
        meta.nvar,
        meta.ncon
    );

    let mut session = ScopedSession::new(backend.create()?);
    let infinity = session.infinity();

    session.set_objective_goal(goal(meta))?;
    register_variables(&mut **session, meta, infinity)?;

    session.add_cons(meta.ncon)?;
    if let Some(lcon) = sanitize_bounds(&meta.lcon, infinity) {
        session.set_con_lower_bounds(&lcon)?;
    }
    if let Some(ucon) = sanitize_bounds(&meta.ucon, infinity) {
        session.set_con_upper_bounds(&ucon)?;
    }

    let SolveOptions {
        x0,
        y0,
        z0,
        callback,
        params,
    } = options;

    session.set_var_primal_init_values(x0.as_deref().unwrap_or(&meta.x0))?;
    if let Some(y0) = &y0 {
        session.set_con_dual_init_values(y0)?;
    }
    if let Some(z0) = &z0 {
        session.set_var_dual_init_values(z0)?;
    }

    let structure = eval_structure(model, session.hessian_triangle());
    session.set_eval_callback(structure, general_callback(model))?;

    for (name, value) in params.iter() {
        log::trace!("forwarding parameter {} = {}", name, value);
        session.set_param(name, value)?;
    }

    if let Some(callback) = callback {
        session.set_iteration_callback(callback)?;
    }

    Ok(run(&mut **session, meta))
}

/// Solve a nonlinear least-squares problem.
///
/// Models with general constraints are not handed to the solver's least-squares interface.
/// They are reformulated into [`FeasibilityForm`] and solved as general programs. In that case
/// the report covers the variables of the feasibility form: the original variables come first,
/// followed by one variable per residual.
pub fn solve_least_squares<'m, B, L>(
    backend: &B,
    model: &'m L,
    options: SolveOptions<'m>,
) -> Result<SolutionReport, Error>
where
    B: Backend + ?Sized,
    L: NlsModel,
{
    match Route::new(model) {
        Route::Residuals(model) => solve_residuals(backend, model, options),
        Route::Feasibility(form) => {
            log::debug!(
                "`{}` has {} general constraints; solving its feasibility form instead",
                model.meta().name,
                model.meta().ncon
            );
            let options = form.lift_options(options);
            solve(backend, &form, options)
        }
    }
}

/// How a least-squares model is presented to the solver.
enum Route<'m, L: NlsModel> {
    /// Bound constrained; residuals go to the least-squares interface directly.
    Residuals(&'m L),
    /// General constraints present; solved as a general program.
    Feasibility(FeasibilityForm<'m, L>),
}

impl<'m, L: NlsModel> Route<'m, L> {
    fn new(model: &'m L) -> Self {
        if model.meta().ncon > 0 {
            Route::Feasibility(FeasibilityForm::new(model))
        } else {
            Route::Residuals(model)
        }
    }
}

fn solve_residuals<'m, B, L>(
    backend: &B,
    model: &'m L,
    options: SolveOptions<'m>,
) -> Result<SolutionReport, Error>
where
    B: Backend + ?Sized,
    L: NlsModel,
{
    let meta = model.meta();
    let nls_meta = model.nls_meta();
    validate(meta, &options)?;

    log::debug!(
        "{}: solving least-squares model `{}` with {} variables and {} residuals",
        backend.name(),
        meta.name,
        meta.nvar,
        nls_meta.nequ
    );

    let mut session = ScopedSession::new(backend.create()?);
    let infinity = session.infinity();

    session.set_objective_goal(goal(meta))?;
    register_variables(&mut **session, meta, infinity)?;
    session.add_residuals(nls_meta.nequ)?;

    let SolveOptions {
        x0,
        y0,
        z0,
        callback,
        params,
    } = options;

    session.set_var_primal_init_values(x0.as_deref().unwrap_or(&meta.x0))?;
    if y0.is_some() {
        log::debug!("ignoring constraint multipliers of a model without constraints");
    }
    if let Some(z0) = &z0 {
        session.set_var_dual_init_values(z0)?;
    }

    let mut rows = vec![0; nls_meta.nnzj];
    let mut cols = vec![0; nls_meta.nnzj];
    model.jac_structure_residual(&mut rows, &mut cols);
    let style = model.indexing_style();
    let structure = ResidualStructure {
        jac_rows: to_zero_based(&rows, style),
        jac_cols: to_zero_based(&cols, style),
    };

    let (residual, jacobian) = residual_callbacks(model);
    session.set_lsq_callbacks(structure, residual, jacobian)?;

    for (name, value) in params.iter() {
        log::trace!("forwarding parameter {} = {}", name, value);
        session.set_param(name, value)?;
    }

    if let Some(callback) = callback {
        session.set_iteration_callback(callback)?;
    }

    Ok(run(&mut **session, meta))
}

/// Check caller supplied vectors against the model before any solver resource is allocated.
fn validate(meta: &ModelMeta, options: &SolveOptions) -> Result<(), Error> {
    meta.check()?;
    let checks = [
        ("x0", meta.nvar, options.x0.as_ref()),
        ("y0", meta.ncon, options.y0.as_ref()),
        ("z0", meta.nvar, options.z0.as_ref()),
    ];
    for (what, expected, v) in checks {
        if let Some(v) = v {
            if v.len() != expected {
                return Err(Error::DimensionMismatch {
                    what,
                    expected,
                    found: v.len(),
                });
            }
        }
    }
    Ok(())
}

fn goal(meta: &ModelMeta) -> Goal {
    if meta.minimize {
        Goal::Minimize
    } else {
        Goal::Maximize
    }
}

fn register_variables<'m>(
    session: &mut (dyn Session<'m> + 'm),
    meta: &ModelMeta,
    infinity: Number,
) -> Result<(), Error> {
    session.add_vars(meta.nvar)?;
    if let Some(lvar) = sanitize_bounds(&meta.lvar, infinity) {
        session.set_var_lower_bounds(&lvar)?;
    }
    if let Some(uvar) = sanitize_bounds(&meta.uvar, infinity) {
        session.set_var_upper_bounds(&uvar)?;
    }
    Ok(())
}

/// Replace infinite entries of a bound vector with the solver's `infinity`.
///
/// Returns `None` if every entry is infinite, in which case nothing needs to be registered since
/// solvers treat unregistered bounds as absent.
pub fn sanitize_bounds(bounds: &[Number], infinity: Number) -> Option<Vec<Number>> {
    if bounds.iter().all(|b| b.is_infinite()) {
        return None;
    }
    Some(
        bounds
            .iter()
            .map(|&b| {
                if b == Number::INFINITY {
                    infinity
                } else if b == Number::NEG_INFINITY {
                    -infinity
                } else {
                    b
                }
            })
            .collect(),
    )
}

/// Shift indices given in `style` to zero-based indices.
pub fn to_zero_based(indices: &[Index], style: IndexingStyle) -> Vec<Index> {
    let base = style.base();
    indices.iter().map(|&i| i - base).collect()
}

/// Express a symmetric structure given in the `model` triangle in the `solver` triangle.
///
/// Returns the `(rows, cols)` pair to register.
pub fn hessian_coordinates(
    rows: Vec<Index>,
    cols: Vec<Index>,
    model: Triangle,
    solver: Triangle,
) -> (Vec<Index>, Vec<Index>) {
    if model == solver {
        (rows, cols)
    } else {
        (cols, rows)
    }
}

fn eval_structure<M: NlpModel>(model: &M, solver_triangle: Triangle) -> EvalStructure {
    let meta = model.meta();
    let style = model.indexing_style();

    let (jac_rows, jac_cols) = if meta.ncon > 0 {
        let mut rows = vec![0; meta.nnzj];
        let mut cols = vec![0; meta.nnzj];
        model.jac_structure(&mut rows, &mut cols);
        (to_zero_based(&rows, style), to_zero_based(&cols, style))
    } else {
        (Vec::new(), Vec::new())
    };

    let mut rows = vec![0; meta.nnzh];
    let mut cols = vec![0; meta.nnzh];
    model.hess_structure(&mut rows, &mut cols);
    let (hess_rows, hess_cols) = hessian_coordinates(
        to_zero_based(&rows, style),
        to_zero_based(&cols, style),
        model.hessian_triangle(),
        solver_triangle,
    );

    EvalStructure {
        jac_rows,
        jac_cols,
        hess_rows,
        hess_cols,
    }
}

fn evaluated(ok: bool) -> Result<(), CallbackError> {
    if ok {
        Ok(())
    } else {
        Err(CallbackError::EvalFailed)
    }
}

/// Build the single callback answering every request of a general model.
fn general_callback<'m, M: NlpModel>(model: &'m M) -> EvalCallback<'m> {
    let ncon = model.meta().ncon;
    Box::new(move |req: &EvalRequest, res: &mut EvalResult| {
        // Sessions may append bound multipliers after the constraint multipliers.
        let y: &[Number] = if ncon > 0 {
            req.lambda.get(..ncon).unwrap_or(req.lambda)
        } else {
            &[]
        };
        let ok = match req.code {
            request::EVAL_FC => model.obj(req.x, res.obj) && (ncon == 0 || model.cons(req.x, res.c)),
            request::EVAL_GA => {
                model.grad(req.x, res.obj_grad) && (ncon == 0 || model.jac_coord(req.x, res.jac))
            }
            request::EVAL_H => model.hess_coord(req.x, y, req.sigma, res.hess),
            request::EVAL_H_NO_F => model.hess_coord(req.x, y, 0.0, res.hess),
            request::EVAL_HV => model.hprod(req.x, y, req.vec, req.sigma, res.hess_vec),
            request::EVAL_HV_NO_F => model.hprod(req.x, y, req.vec, 0.0, res.hess_vec),
            code => return Err(CallbackError::UnknownRequest(code)),
        };
        evaluated(ok)
    })
}

fn residual_callbacks<'m, L: NlsModel>(model: &'m L) -> (EvalCallback<'m>, EvalCallback<'m>) {
    let residual: EvalCallback<'m> = Box::new(move |req: &EvalRequest, res: &mut EvalResult| {
        if req.code != request::EVAL_R {
            return Err(CallbackError::UnknownRequest(req.code));
        }
        evaluated(model.residual(req.x, res.rsd))
    });
    let jacobian: EvalCallback<'m> = Box::new(move |req: &EvalRequest, res: &mut EvalResult| {
        if req.code != request::EVAL_RJ {
            return Err(CallbackError::UnknownRequest(req.code));
        }
        evaluated(model.jac_coord_residual(req.x, res.rsd_jac))
    });
    (residual, jacobian)
}

/// Run the blocking solve and translate the session state into a report.
fn run<'m>(session: &mut (dyn Session<'m> + 'm), meta: &ModelMeta) -> SolutionReport {
    let start = Instant::now();
    let code = session.solve();
    let measured = start.elapsed().as_secs_f64();

    let RawSolution {
        status: raw_status,
        objective,
        x,
        lambda,
    } = session.solution();
    if raw_status != code {
        log::warn!(
            "solve returned {} but the solution reports status {}",
            code,
            raw_status
        );
    }

    let (constraint_multipliers, bound_multipliers) =
        split_multipliers(&lambda, meta.ncon, meta.nvar);
    let elapsed_time = session.solve_time_cpu().unwrap_or(measured);
    let real_time = session.solve_time_real().unwrap_or(measured);
    let status = SolveStatus::from_code(raw_status);

    let mut solver_specific = BTreeMap::new();
    solver_specific.insert(report::RAW_STATUS.to_string(), Value::Int(raw_status as i64));
    solver_specific.insert(
        report::INTERNAL_MSG.to_string(),
        Value::Str(rc::describe(raw_status).to_string()),
    );
    solver_specific.insert(report::REAL_TIME.to_string(), Value::Num(real_time));
    solver_specific.insert(report::MEASURED_TIME.to_string(), Value::Num(measured));

    let report = SolutionReport {
        status,
        solution: x,
        objective,
        constraint_multipliers,
        bound_multipliers,
        primal_feasibility: session.abs_feas_error(),
        dual_feasibility: session.abs_opt_error(),
        iterations: session.number_iters(),
        elapsed_time,
        real_time,
        solver_specific,
    };

    log::info!(
        "`{}`: {} (code {}) after {} iterations, objective {:e}",
        meta.name,
        report.status,
        raw_status,
        report.iterations,
        report.objective
    );

    report
}

/// Split the combined multiplier vector into its constraint (first `m` entries) and bound (next
/// `n` entries) parts.
fn split_multipliers(lambda: &[Number], m: usize, n: usize) -> (Vec<Number>, Vec<Number>) {
    if lambda.len() < m + n {
        log::warn!(
            "expected {} multipliers, solver returned {}; missing entries are zero",
            m + n,
            lambda.len()
        );
    }
    let entry = |i: usize| lambda.get(i).copied().unwrap_or(0.0);
    ((0..m).map(entry).collect(), (m..m + n).map(entry).collect())
}

/// Session that is reset and released on every exit path.
struct ScopedSession<'a> {
    inner: Box<dyn Session<'a> + 'a>,
}

impl<'a> ScopedSession<'a> {
    fn new(inner: Box<dyn Session<'a> + 'a>) -> Self {
        ScopedSession { inner }
    }
}

impl<'a> Deref for ScopedSession<'a> {
    type Target = Box<dyn Session<'a> + 'a>;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<'a> DerefMut for ScopedSession<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl Drop for ScopedSession<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.inner.reset_params_to_defaults() {
            log::warn!("failed to reset solver parameters: {}", err);
        }
        // The session itself is released when `inner` is dropped.
    }
}
