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

//! Primal-dual interior point iteration.
//!
//! Inequality rows `cl <= c(x) <= cu` are turned into equalities `c(x) - s = 0` with a slack
//! `cl <= s <= cu`, so the problem solved is
//!
//! ```text
//! min f(x)  s.t.  h(w) = 0,  l <= w <= u,    w = (x, s).
//! ```
//!
//! Bounds are handled by a logarithmic barrier with a monotonically decreasing barrier
//! parameter. Each iteration takes a Newton step on the primal-dual barrier equations followed
//! by a backtracking line search on the l1 penalty merit function.

use std::time::Instant;

use nalgebra::{DMatrix, DVector};

use super::eval::Evaluator;
use super::kkt::Regularization;
use super::settings::Settings;
use crate::error::CallbackError;
use crate::options::IterationCallback;
use crate::session::{rc, IterationData};
use crate::{Int, Number};

/// Bounds at or beyond this magnitude are absent.
pub const INFINITY: Number = 1e20;

/// Relative push of the starting point into the interior of its bounds.
const KAPPA_1: Number = 1e-2;
const KAPPA_2: Number = 1e-2;
const MU_INIT: Number = 0.1;
const KAPPA_EPS: Number = 10.0;
const KAPPA_MU: Number = 0.2;
const THETA_MU: Number = 1.5;
const TAU_MIN: Number = 0.99;
const KAPPA_SIGMA: Number = 1e10;
/// Armijo constant.
const ETA: Number = 1e-4;
const ALPHA_MIN: Number = 1e-12;
/// Fixed variables are relaxed by this relative amount to keep an interior.
const FIXED_RELAX: Number = 1e-8;
/// A stalled iterate within this factor of the tolerance is reported as near optimal.
const NEAR_OPT_FACTOR: Number = 1e3;

/// Problem data collected by a session.
#[derive(Clone, Debug, Default)]
pub struct Problem {
    pub n: usize,
    pub m: usize,
    pub x_lower: Vec<Number>,
    pub x_upper: Vec<Number>,
    pub c_lower: Vec<Number>,
    pub c_upper: Vec<Number>,
    pub x0: Vec<Number>,
    pub y0: Option<Vec<Number>>,
    pub z0: Option<Vec<Number>>,
}

/// Final state of a solve.
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    pub status: Int,
    pub x: Vec<Number>,
    /// Objective in the direction requested by the caller.
    pub objective: Number,
    /// Constraint multipliers followed by bound multipliers.
    pub lambda: Vec<Number>,
    pub iterations: usize,
    pub feas_error: Number,
    pub opt_error: Number,
}

impl Outcome {
    /// Outcome of a solve that ended before the first iterate was available.
    pub fn at_start(problem: &Problem, status: Int) -> Self {
        Outcome {
            status,
            x: problem.x0.clone(),
            objective: Number::NAN,
            lambda: vec![0.0; problem.m + problem.n],
            iterations: 0,
            feas_error: Number::NAN,
            opt_error: Number::NAN,
        }
    }
}

fn finite(b: Number) -> Option<Number> {
    if b.abs() < INFINITY {
        Some(b)
    } else {
        None
    }
}

fn inf_norm(v: &DVector<Number>) -> Number {
    v.iter().fold(0.0, |acc, x| acc.max(x.abs()))
}

fn l1_norm(v: &DVector<Number>) -> Number {
    v.iter().map(|x| x.abs()).sum()
}

fn failure_code(err: CallbackError) -> Int {
    match err {
        CallbackError::EvalFailed => rc::EVAL_ERR,
        CallbackError::UnknownRequest(code) => {
            log::warn!("evaluation callback rejected request {}", code);
            rc::CALLBACK_ERR
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Row {
    /// Equality row with its right-hand side.
    Equality(Number),
    /// Inequality row with the index of its slack in `w`.
    Slack(usize),
}

/// Variable layout and bounds of the slack reformulation.
struct Layout {
    n: usize,
    rows: Vec<Row>,
    lower: Vec<Option<Number>>,
    upper: Vec<Option<Number>>,
}

impl Layout {
    fn new(problem: &Problem) -> Result<Self, Int> {
        let mut lower = Vec::with_capacity(problem.n + problem.m);
        let mut upper = Vec::with_capacity(problem.n + problem.m);

        for (&l, &u) in problem.x_lower.iter().zip(problem.x_upper.iter()) {
            let (mut l, mut u) = (finite(l), finite(u));
            if let (Some(lo), Some(up)) = (l, u) {
                if lo > up {
                    return Err(rc::INFEAS_VAR_BOUNDS);
                }
                if lo == up {
                    l = Some(lo - FIXED_RELAX * lo.abs().max(1.0));
                    u = Some(up + FIXED_RELAX * up.abs().max(1.0));
                }
            }
            lower.push(l);
            upper.push(u);
        }

        let mut rows = Vec::with_capacity(problem.m);
        for (&l, &u) in problem.c_lower.iter().zip(problem.c_upper.iter()) {
            match (finite(l), finite(u)) {
                (Some(l), Some(u)) if l > u => return Err(rc::INFEAS_CON_BOUNDS),
                (Some(l), Some(u)) if l == u => rows.push(Row::Equality(l)),
                (l, u) => {
                    rows.push(Row::Slack(lower.len()));
                    lower.push(l);
                    upper.push(u);
                }
            }
        }

        Ok(Layout {
            n: problem.n,
            rows,
            lower,
            upper,
        })
    }

    fn nw(&self) -> usize {
        self.lower.len()
    }

    fn m(&self) -> usize {
        self.rows.len()
    }

    fn has_bounds(&self) -> bool {
        self.lower.iter().chain(self.upper.iter()).any(Option::is_some)
    }

    fn primal(&self, w: &DVector<Number>) -> DVector<Number> {
        w.rows(0, self.n).into_owned()
    }

    /// Move `v` strictly inside the bounds of component `j`.
    fn push_inside(&self, j: usize, v: Number) -> Number {
        match (self.lower[j], self.upper[j]) {
            (Some(l), Some(u)) => {
                let pl = (KAPPA_1 * l.abs().max(1.0)).min(KAPPA_2 * (u - l));
                let pu = (KAPPA_1 * u.abs().max(1.0)).min(KAPPA_2 * (u - l));
                v.max(l + pl).min(u - pu)
            }
            (Some(l), None) => v.max(l + KAPPA_1 * l.abs().max(1.0)),
            (None, Some(u)) => v.min(u - KAPPA_1 * u.abs().max(1.0)),
            (None, None) => v,
        }
    }

    /// Constraint residual `h(w)`.
    fn residual(&self, c: &DVector<Number>, w: &DVector<Number>) -> DVector<Number> {
        DVector::from_iterator(
            self.m(),
            self.rows.iter().enumerate().map(|(i, row)| match *row {
                Row::Equality(b) => c[i] - b,
                Row::Slack(k) => c[i] - w[k],
            }),
        )
    }

    /// Jacobian of `h` with respect to `w`.
    fn jacobian(&self, jac: &DMatrix<Number>) -> DMatrix<Number> {
        let mut a = DMatrix::zeros(self.m(), self.nw());
        for i in 0..self.m() {
            for j in 0..self.n {
                a[(i, j)] = jac[(i, j)];
            }
            if let Row::Slack(k) = self.rows[i] {
                a[(i, k)] = -1.0;
            }
        }
        a
    }

    fn gradient(&self, g: &DVector<Number>) -> DVector<Number> {
        let mut gw = DVector::zeros(self.nw());
        gw.rows_mut(0, self.n).copy_from(g);
        gw
    }

    fn hessian(&self, h: &DMatrix<Number>) -> DMatrix<Number> {
        let mut hw = DMatrix::zeros(self.nw(), self.nw());
        hw.view_mut((0, 0), (self.n, self.n)).copy_from(h);
        hw
    }

    fn barrier(&self, w: &DVector<Number>, mu: Number) -> Number {
        if mu == 0.0 {
            return 0.0;
        }
        let mut b = 0.0;
        for j in 0..self.nw() {
            if let Some(l) = self.lower[j] {
                b -= mu * (w[j] - l).ln();
            }
            if let Some(u) = self.upper[j] {
                b -= mu * (u - w[j]).ln();
            }
        }
        b
    }

    fn barrier_gradient(&self, w: &DVector<Number>, mu: Number) -> DVector<Number> {
        DVector::from_iterator(
            self.nw(),
            (0..self.nw()).map(|j| {
                let lo = self.lower[j].map_or(0.0, |l| -mu / (w[j] - l));
                let up = self.upper[j].map_or(0.0, |u| mu / (u - w[j]));
                lo + up
            }),
        )
    }

    /// Diagonal of the primal-dual barrier Hessian.
    fn sigma(&self, w: &DVector<Number>, zl: &DVector<Number>, zu: &DVector<Number>) -> DVector<Number> {
        DVector::from_iterator(
            self.nw(),
            (0..self.nw()).map(|j| {
                let lo = self.lower[j].map_or(0.0, |l| zl[j] / (w[j] - l));
                let up = self.upper[j].map_or(0.0, |u| zu[j] / (u - w[j]));
                lo + up
            }),
        )
    }

    fn dual_step(
        &self,
        it: &Iterate,
        dw: &DVector<Number>,
        mu: Number,
    ) -> (DVector<Number>, DVector<Number>) {
        let mut dzl = DVector::zeros(self.nw());
        let mut dzu = DVector::zeros(self.nw());
        for j in 0..self.nw() {
            if let Some(l) = self.lower[j] {
                let d = it.w[j] - l;
                dzl[j] = (mu - it.zl[j] * d - it.zl[j] * dw[j]) / d;
            }
            if let Some(u) = self.upper[j] {
                let d = u - it.w[j];
                dzu[j] = (mu - it.zu[j] * d + it.zu[j] * dw[j]) / d;
            }
        }
        (dzl, dzu)
    }

    /// Largest step keeping `w` a fraction `tau` away from its bounds.
    fn max_primal_step(&self, w: &DVector<Number>, dw: &DVector<Number>, tau: Number) -> Number {
        let mut alpha: Number = 1.0;
        for j in 0..self.nw() {
            if let Some(l) = self.lower[j] {
                if dw[j] < 0.0 {
                    alpha = alpha.min(-tau * (w[j] - l) / dw[j]);
                }
            }
            if let Some(u) = self.upper[j] {
                if dw[j] > 0.0 {
                    alpha = alpha.min(tau * (u - w[j]) / dw[j]);
                }
            }
        }
        alpha
    }

    /// Keep bound multipliers within a factor of their primal-dual estimates.
    fn safeguard_duals(&self, it: &mut Iterate, mu: Number) {
        for j in 0..self.nw() {
            if let Some(l) = self.lower[j] {
                let est = mu / (it.w[j] - l);
                it.zl[j] = it.zl[j].max(est / KAPPA_SIGMA).min(est * KAPPA_SIGMA);
            }
            if let Some(u) = self.upper[j] {
                let est = mu / (u - it.w[j]);
                it.zu[j] = it.zu[j].max(est / KAPPA_SIGMA).min(est * KAPPA_SIGMA);
            }
        }
    }
}

fn max_dual_step(z: &DVector<Number>, dz: &DVector<Number>, tau: Number) -> Number {
    z.iter()
        .zip(dz.iter())
        .filter(|&(_, &d)| d < 0.0)
        .fold(1.0, |alpha: Number, (&z, &d)| alpha.min(-tau * z / d))
}

/// Current primal-dual point with the model values at it.
struct Iterate {
    w: DVector<Number>,
    y: DVector<Number>,
    zl: DVector<Number>,
    zu: DVector<Number>,
    f: Number,
    c: DVector<Number>,
    g: DVector<Number>,
    jac: DMatrix<Number>,
}

impl Iterate {
    fn initial(
        problem: &Problem,
        layout: &Layout,
        eval: &mut Evaluator,
        mu: Number,
    ) -> Result<Self, Int> {
        let n = problem.n;
        let m = problem.m;
        let nw = layout.nw();

        let x = DVector::from_iterator(n, (0..n).map(|j| layout.push_inside(j, problem.x0[j])));
        let (f, c) = eval.obj_cons(&x).map_err(failure_code)?;
        let (g, jac) = eval.grad_jac(&x).map_err(failure_code)?;

        let mut w = DVector::zeros(nw);
        w.rows_mut(0, n).copy_from(&x);
        for (i, row) in layout.rows.iter().enumerate() {
            if let Row::Slack(k) = *row {
                w[k] = layout.push_inside(k, c[i]);
            }
        }

        let y = match &problem.y0 {
            Some(y0) => DVector::from_column_slice(y0),
            None => DVector::zeros(m),
        };

        // Bound multipliers satisfy zu - zl = z0 on x and zu - zl = y on the slacks.
        let floor = mu.max(1e-8);
        let mut warm = DVector::zeros(nw);
        let mut has_warm = vec![false; nw];
        if let Some(z0) = &problem.z0 {
            for j in 0..n {
                warm[j] = z0[j];
                has_warm[j] = true;
            }
        }
        if problem.y0.is_some() {
            for (i, row) in layout.rows.iter().enumerate() {
                if let Row::Slack(k) = *row {
                    warm[k] = y[i];
                    has_warm[k] = true;
                }
            }
        }

        let mut zl = DVector::zeros(nw);
        let mut zu = DVector::zeros(nw);
        for j in 0..nw {
            if layout.lower[j].is_some() {
                zl[j] = if has_warm[j] { (-warm[j]).max(floor) } else { 1.0 };
            }
            if layout.upper[j].is_some() {
                zu[j] = if has_warm[j] { warm[j].max(floor) } else { 1.0 };
            }
        }

        Ok(Iterate {
            w,
            y,
            zl,
            zu,
            f,
            c,
            g,
            jac,
        })
    }

    /// Constraint multipliers followed by bound multipliers on `x`.
    fn multipliers(&self, n: usize) -> Vec<Number> {
        self.y
            .iter()
            .copied()
            .chain((0..n).map(|j| self.zu[j] - self.zl[j]))
            .collect()
    }
}

/// Scaled-free optimality measures of the barrier problem.
#[derive(Copy, Clone, Debug)]
struct Errors {
    primal: Number,
    dual: Number,
    compl: Number,
}

impl Errors {
    fn at(layout: &Layout, it: &Iterate, mu: Number) -> Self {
        let a = layout.jacobian(&it.jac);
        let grad_lag = layout.gradient(&it.g) + a.tr_mul(&it.y) - &it.zl + &it.zu;
        let mut compl: Number = 0.0;
        for j in 0..layout.nw() {
            if let Some(l) = layout.lower[j] {
                compl = compl.max(((it.w[j] - l) * it.zl[j] - mu).abs());
            }
            if let Some(u) = layout.upper[j] {
                compl = compl.max(((u - it.w[j]) * it.zu[j] - mu).abs());
            }
        }
        Errors {
            primal: inf_norm(&layout.residual(&it.c, &it.w)),
            dual: inf_norm(&grad_lag),
            compl,
        }
    }

    fn max(&self) -> Number {
        self.primal.max(self.dual).max(self.compl)
    }
}

/// Violation of the original bounds and constraints.
fn infeasibility(problem: &Problem, x: &DVector<Number>, c: &DVector<Number>) -> Number {
    let violation = |v: Number, l: Number, u: Number| {
        let below = finite(l).map_or(0.0, |l| l - v);
        let above = finite(u).map_or(0.0, |u| v - u);
        below.max(above).max(0.0)
    };
    let vars = (0..problem.n).map(|j| violation(x[j], problem.x_lower[j], problem.x_upper[j]));
    let cons = (0..problem.m).map(|i| violation(c[i], problem.c_lower[i], problem.c_upper[i]));
    vars.chain(cons).fold(0.0, Number::max)
}

struct Trial {
    w: DVector<Number>,
    f: Number,
    c: DVector<Number>,
    alpha: Number,
}

/// Merit function `φμ(w) + ν ‖h(w)‖₁`.
struct Merit<'l> {
    layout: &'l Layout,
    mu: Number,
    nu: Number,
}

impl Merit<'_> {
    fn value(&self, f: Number, c: &DVector<Number>, w: &DVector<Number>) -> Number {
        f + self.layout.barrier(w, self.mu) + self.nu * l1_norm(&self.layout.residual(c, w))
    }
}

/// Backtrack from `alpha_max` until the Armijo condition holds.
fn line_search(
    merit: &Merit,
    eval: &mut Evaluator,
    it: &Iterate,
    dw: &DVector<Number>,
    alpha_max: Number,
    slope: Number,
) -> Result<Option<Trial>, Int> {
    let phi = merit.value(it.f, &it.c, &it.w);
    let mut alpha = alpha_max;
    while alpha >= ALPHA_MIN {
        let w = &it.w + dw * alpha;
        match eval.obj_cons(&merit.layout.primal(&w)) {
            Ok((f, c)) => {
                let trial = merit.value(f, &c, &w);
                let allowed = ETA * alpha * slope.min(0.0) + 10.0 * Number::EPSILON * phi.abs();
                if trial.is_finite() && trial - phi <= allowed {
                    return Ok(Some(Trial { w, f, c, alpha }));
                }
            }
            Err(CallbackError::EvalFailed) => {
                log::trace!("evaluation failed at step length {:e}", alpha);
            }
            Err(err) => return Err(failure_code(err)),
        }
        alpha *= 0.5;
    }
    Ok(None)
}

/// Run the interior point method.
pub fn solve(
    problem: &Problem,
    settings: &Settings,
    eval: &mut Evaluator,
    mut newpt: Option<&mut IterationCallback>,
    start: Instant,
) -> Outcome {
    let layout = match Layout::new(problem) {
        Ok(layout) => layout,
        Err(status) => return Outcome::at_start(problem, status),
    };

    let mu_min = settings.opttol.min(settings.feastol) / 10.0;
    let mut mu = if layout.has_bounds() {
        settings.bar_initmu.unwrap_or(MU_INIT).max(mu_min)
    } else {
        0.0
    };

    let mut it = match Iterate::initial(problem, &layout, eval, mu) {
        Ok(it) => it,
        Err(status) => return Outcome::at_start(problem, status),
    };

    let mut reg = Regularization::default();
    let mut nu: Number = 1.0;
    let mut iteration = 0;
    let mut alpha_pr: Number = 0.0;

    if settings.outlev >= 2 {
        log::debug!(
            "{:>5} {:>15} {:>10} {:>10} {:>10} {:>9} {:>9}",
            "iter",
            "objective",
            "inf_pr",
            "inf_du",
            "compl",
            "mu",
            "alpha"
        );
    }

    let status = loop {
        let e0 = Errors::at(&layout, &it, 0.0);
        let infeas = infeasibility(problem, &layout.primal(&it.w), &it.c);
        let feasible = infeas <= settings.feastol;

        if settings.outlev >= 2 {
            log::debug!(
                "{:>5} {:>15.8e} {:>10.3e} {:>10.3e} {:>10.3e} {:>9.2e} {:>9.2e}",
                iteration,
                eval.sign() * it.f,
                e0.primal,
                e0.dual,
                e0.compl,
                mu,
                alpha_pr
            );
        }

        if e0.dual <= settings.opttol && e0.compl <= settings.opttol && e0.primal <= settings.feastol {
            break rc::OPTIMAL;
        }

        while mu > mu_min && Errors::at(&layout, &it, mu).max() <= KAPPA_EPS * mu {
            mu = mu_min.max((KAPPA_MU * mu).min(mu.powf(THETA_MU)));
        }

        if feasible && it.f < -settings.objrange {
            break rc::UNBOUNDED;
        }
        if iteration >= settings.maxit {
            break if feasible {
                rc::ITER_LIMIT_FEAS
            } else {
                rc::ITER_LIMIT_INFEAS
            };
        }
        if start.elapsed().as_secs_f64() >= settings.maxtime() {
            break if feasible {
                rc::TIME_LIMIT_FEAS
            } else {
                rc::TIME_LIMIT_INFEAS
            };
        }
        if settings.maxfevals.map_or(false, |max| eval.counts.fc >= max) {
            break if feasible {
                rc::FEVAL_LIMIT_FEAS
            } else {
                rc::FEVAL_LIMIT_INFEAS
            };
        }

        let x = layout.primal(&it.w);
        let hess = match eval.hessian(&x, &it.y) {
            Ok(h) => layout.hessian(&h),
            Err(err) => break failure_code(err),
        };
        let a = layout.jacobian(&it.jac);
        let grad_phi = layout.gradient(&it.g) + layout.barrier_gradient(&it.w, mu);
        let h = layout.residual(&it.c, &it.w);
        let sigma = layout.sigma(&it.w, &it.zl, &it.zu);

        let rw = -(&grad_phi + a.tr_mul(&it.y));
        let ry = -&h;
        let step = match reg.solve(&hess, &sigma, &a, &rw, &ry) {
            Ok(step) => step,
            Err(err) => {
                log::debug!("{}", err);
                break rc::LINEAR_SOLVER_ERR;
            }
        };
        let (dzl, dzu) = layout.dual_step(&it, &step.dw, mu);

        let tau = TAU_MIN.max(1.0 - mu);
        let alpha_max = layout.max_primal_step(&it.w, &step.dw, tau);
        let alpha_z = max_dual_step(&it.zl, &dzl, tau).min(max_dual_step(&it.zu, &dzu, tau));

        nu = nu.max(inf_norm(&(&it.y + &step.dy)) + 1.0);
        let merit = Merit {
            layout: &layout,
            mu,
            nu,
        };
        let slope = grad_phi.dot(&step.dw) - nu * l1_norm(&h);

        let trial = match line_search(&merit, eval, &it, &step.dw, alpha_max, slope) {
            Ok(Some(trial)) => trial,
            Ok(None) => {
                log::debug!("line search failed at iteration {}", iteration);
                break if e0.max() <= NEAR_OPT_FACTOR * settings.opttol.min(settings.feastol) {
                    rc::NEAR_OPT
                } else if feasible {
                    rc::FEAS_NO_IMPROVE
                } else {
                    rc::INFEASIBLE
                };
            }
            Err(status) => break status,
        };

        it.w = trial.w;
        it.f = trial.f;
        it.c = trial.c;
        it.y += &step.dy * trial.alpha;
        it.zl += &dzl * alpha_z;
        it.zu += &dzu * alpha_z;
        layout.safeguard_duals(&mut it, mu);
        alpha_pr = trial.alpha;

        let x = layout.primal(&it.w);
        match eval.grad_jac(&x) {
            Ok((g, jac)) => {
                it.g = g;
                it.jac = jac;
            }
            Err(err) => break failure_code(err),
        }
        iteration += 1;

        if let Some(callback) = newpt.as_deref_mut() {
            let lambda = it.multipliers(problem.n);
            let data = IterationData {
                iteration,
                x: x.as_slice(),
                lambda: &lambda,
            };
            if !callback(&data) {
                break rc::USER_TERMINATION;
            }
        }
    };

    let x = layout.primal(&it.w);
    let e0 = Errors::at(&layout, &it, 0.0);
    Outcome {
        status,
        objective: eval.sign() * it.f,
        lambda: it.multipliers(problem.n),
        iterations: iteration,
        feas_error: infeasibility(problem, &x, &it.c),
        opt_error: e0.dual.max(e0.compl),
        x: x.as_slice().to_vec(),
    }
}
