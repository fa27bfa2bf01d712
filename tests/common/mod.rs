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

//! Models and a recording session shared by the integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use nlp_adapter::session::{
    Backend, EvalCallback, EvalRequest, EvalResult, EvalStructure, Goal, IterationData,
    RawSolution, ResidualStructure, Session,
};
use nlp_adapter::*;

/*
 * Models
 */

/// Rosenbrock function `(1 - x1)² + 100 (x2 - x1²)²`, one-based, lower triangle.
pub struct Rosenbrock {
    meta: ModelMeta,
}

impl Rosenbrock {
    pub fn new() -> Self {
        Rosenbrock {
            meta: ModelMeta::new(vec![-1.2, 1.0]).with_nnzh(3).named("rosenbrock"),
        }
    }
}

impl NlpModel for Rosenbrock {
    fn meta(&self) -> &ModelMeta {
        &self.meta
    }
    fn obj(&self, x: &[Number], f: &mut Number) -> bool {
        *f = (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
        true
    }
    fn grad(&self, x: &[Number], g: &mut [Number]) -> bool {
        g[0] = -2.0 * (1.0 - x[0]) - 400.0 * x[0] * (x[1] - x[0] * x[0]);
        g[1] = 200.0 * (x[1] - x[0] * x[0]);
        true
    }
    fn hess_structure(&self, rows: &mut [Index], cols: &mut [Index]) {
        rows.copy_from_slice(&[1, 2, 2]);
        cols.copy_from_slice(&[1, 1, 2]);
    }
    fn hess_coord(&self, x: &[Number], _y: &[Number], w: Number, vals: &mut [Number]) -> bool {
        vals[0] = w * (2.0 - 400.0 * x[1] + 1200.0 * x[0] * x[0]);
        vals[1] = w * (-400.0 * x[0]);
        vals[2] = w * 200.0;
        true
    }
}

/// `min (x - 2)²  s.t.  0 <= x <= 1`.
pub struct BoundedQuadratic {
    meta: ModelMeta,
}

impl BoundedQuadratic {
    pub fn new() -> Self {
        BoundedQuadratic {
            meta: ModelMeta::new(vec![0.5])
                .with_bounds(vec![0.0], vec![1.0])
                .with_nnzh(1)
                .named("bounded-quadratic"),
        }
    }
}

impl NlpModel for BoundedQuadratic {
    fn meta(&self) -> &ModelMeta {
        &self.meta
    }
    fn obj(&self, x: &[Number], f: &mut Number) -> bool {
        *f = (x[0] - 2.0).powi(2);
        true
    }
    fn grad(&self, x: &[Number], g: &mut [Number]) -> bool {
        g[0] = 2.0 * (x[0] - 2.0);
        true
    }
    fn hess_structure(&self, rows: &mut [Index], cols: &mut [Index]) {
        rows[0] = 1;
        cols[0] = 1;
    }
    fn hess_coord(&self, _x: &[Number], _y: &[Number], w: Number, vals: &mut [Number]) -> bool {
        vals[0] = 2.0 * w;
        true
    }
}

/// `min (x1 - 1)² + (x2 - 2)²  s.t.  x1 + x2 = 1`, solved by `(0, 1)` with multiplier `2`.
pub struct EqualityQp {
    meta: ModelMeta,
}

impl EqualityQp {
    pub fn new() -> Self {
        EqualityQp {
            meta: ModelMeta::new(vec![0.0, 0.0])
                .with_constraints(vec![1.0], vec![1.0])
                .with_nnzj(2)
                .with_nnzh(2)
                .named("equality-qp"),
        }
    }
}

impl NlpModel for EqualityQp {
    fn meta(&self) -> &ModelMeta {
        &self.meta
    }
    fn obj(&self, x: &[Number], f: &mut Number) -> bool {
        *f = (x[0] - 1.0).powi(2) + (x[1] - 2.0).powi(2);
        true
    }
    fn grad(&self, x: &[Number], g: &mut [Number]) -> bool {
        g[0] = 2.0 * (x[0] - 1.0);
        g[1] = 2.0 * (x[1] - 2.0);
        true
    }
    fn cons(&self, x: &[Number], c: &mut [Number]) -> bool {
        c[0] = x[0] + x[1];
        true
    }
    fn jac_structure(&self, rows: &mut [Index], cols: &mut [Index]) {
        rows.copy_from_slice(&[1, 1]);
        cols.copy_from_slice(&[1, 2]);
    }
    fn jac_coord(&self, _x: &[Number], vals: &mut [Number]) -> bool {
        vals.copy_from_slice(&[1.0, 1.0]);
        true
    }
    fn hess_structure(&self, rows: &mut [Index], cols: &mut [Index]) {
        rows.copy_from_slice(&[1, 2]);
        cols.copy_from_slice(&[1, 2]);
    }
    fn hess_coord(&self, _x: &[Number], _y: &[Number], w: Number, vals: &mut [Number]) -> bool {
        vals.copy_from_slice(&[2.0 * w, 2.0 * w]);
        true
    }
}

/// `min x1² + x2²  s.t.  x1 + x2 >= 1`, zero-based.
pub struct HalfPlane {
    meta: ModelMeta,
}

impl HalfPlane {
    pub fn new() -> Self {
        HalfPlane {
            meta: ModelMeta::new(vec![0.0, 0.0])
                .with_constraints(vec![1.0], vec![Number::INFINITY])
                .with_nnzj(2)
                .with_nnzh(2)
                .named("half-plane"),
        }
    }
}

impl NlpModel for HalfPlane {
    fn meta(&self) -> &ModelMeta {
        &self.meta
    }
    fn indexing_style(&self) -> IndexingStyle {
        IndexingStyle::CStyle
    }
    fn obj(&self, x: &[Number], f: &mut Number) -> bool {
        *f = x[0] * x[0] + x[1] * x[1];
        true
    }
    fn grad(&self, x: &[Number], g: &mut [Number]) -> bool {
        g[0] = 2.0 * x[0];
        g[1] = 2.0 * x[1];
        true
    }
    fn cons(&self, x: &[Number], c: &mut [Number]) -> bool {
        c[0] = x[0] + x[1];
        true
    }
    fn jac_structure(&self, rows: &mut [Index], cols: &mut [Index]) {
        rows.copy_from_slice(&[0, 0]);
        cols.copy_from_slice(&[0, 1]);
    }
    fn jac_coord(&self, _x: &[Number], vals: &mut [Number]) -> bool {
        vals.copy_from_slice(&[1.0, 1.0]);
        true
    }
    fn hess_structure(&self, rows: &mut [Index], cols: &mut [Index]) {
        rows.copy_from_slice(&[0, 1]);
        cols.copy_from_slice(&[0, 1]);
    }
    fn hess_coord(&self, _x: &[Number], _y: &[Number], w: Number, vals: &mut [Number]) -> bool {
        vals.copy_from_slice(&[2.0 * w, 2.0 * w]);
        true
    }
}

/// `max 1 - (x - 3)²`.
pub struct Peak {
    meta: ModelMeta,
}

impl Peak {
    pub fn new() -> Self {
        Peak {
            meta: ModelMeta::new(vec![0.0]).with_nnzh(1).maximize().named("peak"),
        }
    }
}

impl NlpModel for Peak {
    fn meta(&self) -> &ModelMeta {
        &self.meta
    }
    fn obj(&self, x: &[Number], f: &mut Number) -> bool {
        *f = 1.0 - (x[0] - 3.0).powi(2);
        true
    }
    fn grad(&self, x: &[Number], g: &mut [Number]) -> bool {
        g[0] = -2.0 * (x[0] - 3.0);
        true
    }
    fn hess_structure(&self, rows: &mut [Index], cols: &mut [Index]) {
        rows[0] = 1;
        cols[0] = 1;
    }
    fn hess_coord(&self, _x: &[Number], _y: &[Number], w: Number, vals: &mut [Number]) -> bool {
        vals[0] = -2.0 * w;
        true
    }
}

/// Rosenbrock written as the residuals `F(x) = (10 (x2 - x1²), 1 - x1)`.
pub struct RosenbrockResiduals {
    meta: ModelMeta,
    nls_meta: NlsMeta,
}

impl RosenbrockResiduals {
    pub fn new() -> Self {
        RosenbrockResiduals {
            meta: ModelMeta::new(vec![-1.2, 1.0]).with_nnzh(3).named("rosenbrock-nls"),
            nls_meta: NlsMeta {
                nequ: 2,
                nnzj: 3,
                nnzh: 1,
            },
        }
    }

    fn residuals(x: &[Number]) -> [Number; 2] {
        [10.0 * (x[1] - x[0] * x[0]), 1.0 - x[0]]
    }
}

impl NlpModel for RosenbrockResiduals {
    fn meta(&self) -> &ModelMeta {
        &self.meta
    }
    fn obj(&self, x: &[Number], f: &mut Number) -> bool {
        let r = Self::residuals(x);
        *f = 0.5 * (r[0] * r[0] + r[1] * r[1]);
        true
    }
    fn grad(&self, x: &[Number], g: &mut [Number]) -> bool {
        let r = Self::residuals(x);
        g[0] = -20.0 * x[0] * r[0] - r[1];
        g[1] = 10.0 * r[0];
        true
    }
    fn hess_structure(&self, rows: &mut [Index], cols: &mut [Index]) {
        rows.copy_from_slice(&[1, 2, 2]);
        cols.copy_from_slice(&[1, 1, 2]);
    }
    fn hess_coord(&self, x: &[Number], _y: &[Number], w: Number, vals: &mut [Number]) -> bool {
        vals[0] = w * (600.0 * x[0] * x[0] - 200.0 * x[1] + 1.0);
        vals[1] = w * (-200.0 * x[0]);
        vals[2] = w * 100.0;
        true
    }
}

impl NlsModel for RosenbrockResiduals {
    fn nls_meta(&self) -> &NlsMeta {
        &self.nls_meta
    }
    fn residual(&self, x: &[Number], r: &mut [Number]) -> bool {
        r.copy_from_slice(&Self::residuals(x));
        true
    }
    fn jac_structure_residual(&self, rows: &mut [Index], cols: &mut [Index]) {
        rows.copy_from_slice(&[1, 1, 2]);
        cols.copy_from_slice(&[1, 2, 1]);
    }
    fn jac_coord_residual(&self, x: &[Number], vals: &mut [Number]) -> bool {
        vals.copy_from_slice(&[-20.0 * x[0], 10.0, -1.0]);
        true
    }
    fn hess_structure_residual(&self, rows: &mut [Index], cols: &mut [Index]) {
        rows[0] = 1;
        cols[0] = 1;
    }
    fn hess_coord_residual(&self, _x: &[Number], v: &[Number], vals: &mut [Number]) -> bool {
        vals[0] = -20.0 * v[0];
        true
    }
}

/// `min ½‖x - 1‖²  s.t.  x1 + x2 = 1`, a least-squares model with a general constraint.
pub struct ConstrainedShift {
    meta: ModelMeta,
    nls_meta: NlsMeta,
}

impl ConstrainedShift {
    pub fn new() -> Self {
        ConstrainedShift {
            meta: ModelMeta::new(vec![0.0, 0.0])
                .with_constraints(vec![1.0], vec![1.0])
                .with_nnzj(2)
                .with_nnzh(2)
                .named("constrained-shift"),
            nls_meta: NlsMeta {
                nequ: 2,
                nnzj: 2,
                nnzh: 0,
            },
        }
    }
}

impl NlpModel for ConstrainedShift {
    fn meta(&self) -> &ModelMeta {
        &self.meta
    }
    fn obj(&self, x: &[Number], f: &mut Number) -> bool {
        *f = 0.5 * ((x[0] - 1.0).powi(2) + (x[1] - 1.0).powi(2));
        true
    }
    fn grad(&self, x: &[Number], g: &mut [Number]) -> bool {
        g[0] = x[0] - 1.0;
        g[1] = x[1] - 1.0;
        true
    }
    fn cons(&self, x: &[Number], c: &mut [Number]) -> bool {
        c[0] = x[0] + x[1];
        true
    }
    fn jac_structure(&self, rows: &mut [Index], cols: &mut [Index]) {
        rows.copy_from_slice(&[1, 1]);
        cols.copy_from_slice(&[1, 2]);
    }
    fn jac_coord(&self, _x: &[Number], vals: &mut [Number]) -> bool {
        vals.copy_from_slice(&[1.0, 1.0]);
        true
    }
    fn hess_structure(&self, rows: &mut [Index], cols: &mut [Index]) {
        rows.copy_from_slice(&[1, 2]);
        cols.copy_from_slice(&[1, 2]);
    }
    fn hess_coord(&self, _x: &[Number], _y: &[Number], w: Number, vals: &mut [Number]) -> bool {
        vals.copy_from_slice(&[w, w]);
        true
    }
}

impl NlsModel for ConstrainedShift {
    fn nls_meta(&self) -> &NlsMeta {
        &self.nls_meta
    }
    fn residual(&self, x: &[Number], r: &mut [Number]) -> bool {
        r[0] = x[0] - 1.0;
        r[1] = x[1] - 1.0;
        true
    }
    fn jac_structure_residual(&self, rows: &mut [Index], cols: &mut [Index]) {
        rows.copy_from_slice(&[1, 2]);
        cols.copy_from_slice(&[1, 2]);
    }
    fn jac_coord_residual(&self, _x: &[Number], vals: &mut [Number]) -> bool {
        vals.copy_from_slice(&[1.0, 1.0]);
        true
    }
    fn hess_structure_residual(&self, _rows: &mut [Index], _cols: &mut [Index]) {}
    fn hess_coord_residual(&self, _x: &[Number], _v: &[Number], _vals: &mut [Number]) -> bool {
        true
    }
}

/// Three variables, two constraints and configurable index conventions:
///
/// ```text
/// f(x) = x1² + x2 x3,   c(x) = (x1 + x2 + x3, x1 x3).
/// ```
///
/// Objective evaluations are counted, and evaluations fail while `fail` is set.
pub struct Toy {
    pub meta: ModelMeta,
    pub style: IndexingStyle,
    pub triangle: Triangle,
    pub obj_evals: Cell<usize>,
    pub fail: Cell<bool>,
}

impl Toy {
    pub fn new(style: IndexingStyle, triangle: Triangle) -> Self {
        let inf = Number::INFINITY;
        Toy {
            meta: ModelMeta::new(vec![1.0, 1.0, 1.0])
                .with_bounds(vec![-inf, 0.0, -inf], vec![inf, inf, inf])
                .with_constraints(vec![1.0, -inf], vec![1.0, inf])
                .with_nnzj(5)
                .with_nnzh(3)
                .named("toy"),
            style,
            triangle,
            obj_evals: Cell::new(0),
            fail: Cell::new(false),
        }
    }
}

impl NlpModel for Toy {
    fn meta(&self) -> &ModelMeta {
        &self.meta
    }
    fn indexing_style(&self) -> IndexingStyle {
        self.style
    }
    fn hessian_triangle(&self) -> Triangle {
        self.triangle
    }
    fn obj(&self, x: &[Number], f: &mut Number) -> bool {
        self.obj_evals.set(self.obj_evals.get() + 1);
        *f = x[0] * x[0] + x[1] * x[2];
        !self.fail.get()
    }
    fn grad(&self, x: &[Number], g: &mut [Number]) -> bool {
        g.copy_from_slice(&[2.0 * x[0], x[2], x[1]]);
        !self.fail.get()
    }
    fn cons(&self, x: &[Number], c: &mut [Number]) -> bool {
        c[0] = x[0] + x[1] + x[2];
        c[1] = x[0] * x[2];
        true
    }
    fn jac_structure(&self, rows: &mut [Index], cols: &mut [Index]) {
        let base = self.style.base();
        for (k, (r, c)) in [(0, 0), (0, 1), (0, 2), (1, 0), (1, 2)].iter().enumerate() {
            rows[k] = r + base;
            cols[k] = c + base;
        }
    }
    fn jac_coord(&self, x: &[Number], vals: &mut [Number]) -> bool {
        vals.copy_from_slice(&[1.0, 1.0, 1.0, x[2], x[0]]);
        true
    }
    fn hess_structure(&self, rows: &mut [Index], cols: &mut [Index]) {
        let base = self.style.base();
        for (k, (r, c)) in [(0, 0), (2, 0), (2, 1)].iter().enumerate() {
            let (r, c) = match self.triangle {
                Triangle::Lower => (*r, *c),
                Triangle::Upper => (*c, *r),
            };
            rows[k] = r + base;
            cols[k] = c + base;
        }
    }
    fn hess_coord(&self, _x: &[Number], y: &[Number], w: Number, vals: &mut [Number]) -> bool {
        vals.copy_from_slice(&[2.0 * w, y[1], w]);
        true
    }
}

/// Bound constrained residuals `F(x) = (x1 - 1, 2 x2)`, zero-based.
pub struct Line {
    meta: ModelMeta,
    nls_meta: NlsMeta,
}

impl Line {
    pub fn new() -> Self {
        Line {
            meta: ModelMeta::new(vec![0.0, 0.0]).with_nnzh(2).named("line"),
            nls_meta: NlsMeta {
                nequ: 2,
                nnzj: 2,
                nnzh: 0,
            },
        }
    }
}

impl NlpModel for Line {
    fn meta(&self) -> &ModelMeta {
        &self.meta
    }
    fn indexing_style(&self) -> IndexingStyle {
        IndexingStyle::CStyle
    }
    fn obj(&self, x: &[Number], f: &mut Number) -> bool {
        *f = 0.5 * ((x[0] - 1.0).powi(2) + 4.0 * x[1] * x[1]);
        true
    }
    fn grad(&self, x: &[Number], g: &mut [Number]) -> bool {
        g[0] = x[0] - 1.0;
        g[1] = 4.0 * x[1];
        true
    }
    fn hess_structure(&self, rows: &mut [Index], cols: &mut [Index]) {
        rows.copy_from_slice(&[0, 1]);
        cols.copy_from_slice(&[0, 1]);
    }
    fn hess_coord(&self, _x: &[Number], _y: &[Number], w: Number, vals: &mut [Number]) -> bool {
        vals.copy_from_slice(&[w, 4.0 * w]);
        true
    }
}

impl NlsModel for Line {
    fn nls_meta(&self) -> &NlsMeta {
        &self.nls_meta
    }
    fn residual(&self, x: &[Number], r: &mut [Number]) -> bool {
        r[0] = x[0] - 1.0;
        r[1] = 2.0 * x[1];
        true
    }
    fn jac_structure_residual(&self, rows: &mut [Index], cols: &mut [Index]) {
        rows.copy_from_slice(&[0, 1]);
        cols.copy_from_slice(&[0, 1]);
    }
    fn jac_coord_residual(&self, _x: &[Number], vals: &mut [Number]) -> bool {
        vals.copy_from_slice(&[1.0, 2.0]);
        true
    }
    fn hess_structure_residual(&self, _rows: &mut [Index], _cols: &mut [Index]) {}
    fn hess_coord_residual(&self, _x: &[Number], _v: &[Number], _vals: &mut [Number]) -> bool {
        true
    }
}

/*
 * Recording session
 */

/// Callback a probe is sent to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Eval,
    Residual,
    Jacobian,
}

/// Evaluation request sent by a [`RecordingSession`] during `solve`.
#[derive(Clone, Debug)]
pub struct Probe {
    pub target: Target,
    pub code: Int,
    pub x: Vec<Number>,
    pub lambda: Vec<Number>,
    pub sigma: Number,
    pub vec: Vec<Number>,
}

impl Probe {
    pub fn new(target: Target, code: Int, x: &[Number]) -> Self {
        Probe {
            target,
            code,
            x: x.to_vec(),
            lambda: Vec::new(),
            sigma: 1.0,
            vec: Vec::new(),
        }
    }

    pub fn lambda(mut self, lambda: &[Number]) -> Self {
        self.lambda = lambda.to_vec();
        self
    }

    pub fn sigma(mut self, sigma: Number) -> Self {
        self.sigma = sigma;
        self
    }

    pub fn vec(mut self, vec: &[Number]) -> Self {
        self.vec = vec.to_vec();
        self
    }
}

/// Answer of a callback to a [`Probe`].
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub code: Int,
    pub result: Result<(), CallbackError>,
    pub obj: Number,
    /// Contents of the output buffers associated with the request code, concatenated.
    pub values: Vec<Number>,
}

/// Everything a [`RecordingSession`] was asked to do.
#[derive(Debug, Default)]
pub struct Log {
    pub calls: Vec<&'static str>,
    pub goal: Option<Goal>,
    pub nvar: usize,
    pub ncon: usize,
    pub nequ: usize,
    pub var_lower: Option<Vec<Number>>,
    pub var_upper: Option<Vec<Number>>,
    pub con_lower: Option<Vec<Number>>,
    pub con_upper: Option<Vec<Number>>,
    pub x0: Option<Vec<Number>>,
    pub y0: Option<Vec<Number>>,
    pub z0: Option<Vec<Number>>,
    pub structure: Option<EvalStructure>,
    pub residual_structure: Option<ResidualStructure>,
    pub params: Vec<(String, Value)>,
    pub replies: Vec<Reply>,
    pub continue_flags: Vec<bool>,
    pub resets: usize,
    pub released: usize,
}

/// Backend handing out [`RecordingSession`]s that share one [`Log`].
#[derive(Clone, Debug)]
pub struct RecordingBackend {
    pub log: Rc<RefCell<Log>>,
    pub infinity: Number,
    pub triangle: Triangle,
    pub probes: Vec<Probe>,
    pub status: Int,
    /// Multipliers returned by `solution`. Zeros of the expected length if `None`.
    pub lambda: Option<Vec<Number>>,
    pub cpu_time: Option<Number>,
    pub real_time: Option<Number>,
    /// Session call that fails.
    pub fail_on: Option<&'static str>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        RecordingBackend {
            log: Rc::new(RefCell::new(Log::default())),
            infinity: 1e30,
            triangle: Triangle::Upper,
            probes: Vec::new(),
            status: 0,
            lambda: None,
            cpu_time: None,
            real_time: None,
            fail_on: None,
        }
    }
}

impl Backend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn create<'a>(&self) -> Result<Box<dyn Session<'a> + 'a>, SessionError> {
        self.log.borrow_mut().calls.push("create");
        Ok(Box::new(RecordingSession {
            config: self.clone(),
            eval: None,
            residual: None,
            jacobian: None,
            newpt: None,
        }))
    }
}

pub struct RecordingSession<'a> {
    config: RecordingBackend,
    eval: Option<EvalCallback<'a>>,
    residual: Option<EvalCallback<'a>>,
    jacobian: Option<EvalCallback<'a>>,
    newpt: Option<IterationCallback<'a>>,
}

impl RecordingSession<'_> {
    fn record(&self, call: &'static str) -> Result<(), SessionError> {
        self.config.log.borrow_mut().calls.push(call);
        if self.config.fail_on == Some(call) {
            Err(SessionError::new(call, -515))
        } else {
            Ok(())
        }
    }

    fn answer(&mut self, probe: &Probe) -> Reply {
        use nlp_adapter::session::request::*;

        let (n, m, nequ, nnzj, nnzh, rsd_nnzj) = {
            let log = self.config.log.borrow();
            let (nnzj, nnzh) = log
                .structure
                .as_ref()
                .map_or((0, 0), |s| (s.jac_rows.len(), s.hess_rows.len()));
            let rsd_nnzj = log.residual_structure.as_ref().map_or(0, |s| s.jac_rows.len());
            (log.nvar, log.ncon, log.nequ, nnzj, nnzh, rsd_nnzj)
        };

        let mut obj = 0.0;
        let mut c = vec![0.0; m];
        let mut grad = vec![0.0; n];
        let mut jac = vec![0.0; nnzj];
        let mut hess = vec![0.0; nnzh];
        let mut hv = vec![0.0; n];
        let mut rsd = vec![0.0; nequ];
        let mut rsd_jac = vec![0.0; rsd_nnzj];

        let callback = match probe.target {
            Target::Eval => self.eval.as_mut(),
            Target::Residual => self.residual.as_mut(),
            Target::Jacobian => self.jacobian.as_mut(),
        };
        let Some(callback) = callback else {
            panic!("no callback registered for {:?}", probe.target);
        };

        let req = EvalRequest {
            code: probe.code,
            x: &probe.x,
            lambda: &probe.lambda,
            sigma: probe.sigma,
            vec: &probe.vec,
        };
        let mut res = EvalResult::new(&mut obj);
        match probe.code {
            EVAL_FC => res.c = c.as_mut_slice(),
            EVAL_GA => {
                res.obj_grad = grad.as_mut_slice();
                res.jac = jac.as_mut_slice();
            }
            EVAL_H | EVAL_H_NO_F => res.hess = hess.as_mut_slice(),
            EVAL_HV | EVAL_HV_NO_F => res.hess_vec = hv.as_mut_slice(),
            EVAL_R => res.rsd = rsd.as_mut_slice(),
            EVAL_RJ => res.rsd_jac = rsd_jac.as_mut_slice(),
            _ => {}
        }
        let result = callback(&req, &mut res);
        drop(res);

        let values = match probe.code {
            EVAL_FC => c,
            EVAL_GA => grad.into_iter().chain(jac).collect(),
            EVAL_H | EVAL_H_NO_F => hess,
            EVAL_HV | EVAL_HV_NO_F => hv,
            EVAL_R => rsd,
            EVAL_RJ => rsd_jac,
            _ => Vec::new(),
        };
        Reply {
            code: probe.code,
            result,
            obj,
            values,
        }
    }
}

impl<'a> Session<'a> for RecordingSession<'a> {
    fn infinity(&self) -> Number {
        self.config.infinity
    }

    fn hessian_triangle(&self) -> Triangle {
        self.config.triangle
    }

    fn set_objective_goal(&mut self, goal: Goal) -> Result<(), SessionError> {
        self.record("set_objective_goal")?;
        self.config.log.borrow_mut().goal = Some(goal);
        Ok(())
    }

    fn add_vars(&mut self, n: usize) -> Result<(), SessionError> {
        self.record("add_vars")?;
        self.config.log.borrow_mut().nvar += n;
        Ok(())
    }

    fn set_var_lower_bounds(&mut self, lb: &[Number]) -> Result<(), SessionError> {
        self.record("set_var_lower_bounds")?;
        self.config.log.borrow_mut().var_lower = Some(lb.to_vec());
        Ok(())
    }

    fn set_var_upper_bounds(&mut self, ub: &[Number]) -> Result<(), SessionError> {
        self.record("set_var_upper_bounds")?;
        self.config.log.borrow_mut().var_upper = Some(ub.to_vec());
        Ok(())
    }

    fn add_cons(&mut self, m: usize) -> Result<(), SessionError> {
        self.record("add_cons")?;
        self.config.log.borrow_mut().ncon += m;
        Ok(())
    }

    fn set_con_lower_bounds(&mut self, lb: &[Number]) -> Result<(), SessionError> {
        self.record("set_con_lower_bounds")?;
        self.config.log.borrow_mut().con_lower = Some(lb.to_vec());
        Ok(())
    }

    fn set_con_upper_bounds(&mut self, ub: &[Number]) -> Result<(), SessionError> {
        self.record("set_con_upper_bounds")?;
        self.config.log.borrow_mut().con_upper = Some(ub.to_vec());
        Ok(())
    }

    fn add_residuals(&mut self, ne: usize) -> Result<(), SessionError> {
        self.record("add_residuals")?;
        self.config.log.borrow_mut().nequ += ne;
        Ok(())
    }

    fn set_var_primal_init_values(&mut self, x0: &[Number]) -> Result<(), SessionError> {
        self.record("set_var_primal_init_values")?;
        self.config.log.borrow_mut().x0 = Some(x0.to_vec());
        Ok(())
    }

    fn set_con_dual_init_values(&mut self, y0: &[Number]) -> Result<(), SessionError> {
        self.record("set_con_dual_init_values")?;
        self.config.log.borrow_mut().y0 = Some(y0.to_vec());
        Ok(())
    }

    fn set_var_dual_init_values(&mut self, z0: &[Number]) -> Result<(), SessionError> {
        self.record("set_var_dual_init_values")?;
        self.config.log.borrow_mut().z0 = Some(z0.to_vec());
        Ok(())
    }

    fn set_eval_callback(
        &mut self,
        structure: EvalStructure,
        callback: EvalCallback<'a>,
    ) -> Result<(), SessionError> {
        self.record("set_eval_callback")?;
        self.config.log.borrow_mut().structure = Some(structure);
        self.eval = Some(callback);
        Ok(())
    }

    fn set_lsq_callbacks(
        &mut self,
        structure: ResidualStructure,
        residual: EvalCallback<'a>,
        jacobian: EvalCallback<'a>,
    ) -> Result<(), SessionError> {
        self.record("set_lsq_callbacks")?;
        self.config.log.borrow_mut().residual_structure = Some(structure);
        self.residual = Some(residual);
        self.jacobian = Some(jacobian);
        Ok(())
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<(), SessionError> {
        self.record("set_param")?;
        self.config
            .log
            .borrow_mut()
            .params
            .push((name.to_string(), value.clone()));
        Ok(())
    }

    fn set_iteration_callback(
        &mut self,
        callback: IterationCallback<'a>,
    ) -> Result<(), SessionError> {
        self.record("set_iteration_callback")?;
        self.newpt = Some(callback);
        Ok(())
    }

    fn solve(&mut self) -> Int {
        self.config.log.borrow_mut().calls.push("solve");
        let probes = self.config.probes.clone();
        for probe in &probes {
            let reply = self.answer(probe);
            self.config.log.borrow_mut().replies.push(reply);
        }

        let x = self.config.log.borrow().x0.clone().unwrap_or_default();
        if let Some(newpt) = self.newpt.as_mut() {
            let data = IterationData {
                iteration: 1,
                x: &x,
                lambda: &[],
            };
            let flag = newpt(&data);
            self.config.log.borrow_mut().continue_flags.push(flag);
        }
        self.config.status
    }

    fn solution(&self) -> RawSolution {
        let log = self.config.log.borrow();
        RawSolution {
            status: self.config.status,
            objective: 1.5,
            x: log.x0.clone().unwrap_or_else(|| vec![0.0; log.nvar]),
            lambda: self
                .config
                .lambda
                .clone()
                .unwrap_or_else(|| vec![0.0; log.ncon + log.nvar]),
        }
    }

    fn abs_feas_error(&self) -> Number {
        1e-9
    }

    fn abs_opt_error(&self) -> Number {
        2e-9
    }

    fn number_iters(&self) -> usize {
        4
    }

    fn solve_time_cpu(&self) -> Option<Number> {
        self.config.cpu_time
    }

    fn solve_time_real(&self) -> Option<Number> {
        self.config.real_time
    }

    fn reset_params_to_defaults(&mut self) -> Result<(), SessionError> {
        self.config.log.borrow_mut().resets += 1;
        Ok(())
    }
}

impl Drop for RecordingSession<'_> {
    fn drop(&mut self) {
        self.config.log.borrow_mut().released += 1;
    }
}
