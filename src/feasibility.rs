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

//! Feasibility form of a constrained least-squares model.
//!
//! A model `min ½‖F(x)‖²  s.t.  lcon <= c(x) <= ucon` is rewritten over the variables `(x, r)` as
//!
//! ```text
//! min ½‖r‖²  s.t.  F(x) - r = 0,  lcon <= c(x) <= ucon,
//! ```
//!
//! with `r` free. The residual equations come first in the constraint vector.

use crate::model::{IndexingStyle, ModelMeta, NlpModel, NlsModel, Triangle};
use crate::options::SolveOptions;
use crate::{Index, Number};

/// General nonlinear program equivalent to a constrained least-squares model.
pub struct FeasibilityForm<'m, L: NlsModel> {
    nls: &'m L,
    meta: ModelMeta,
}

impl<'m, L: NlsModel> FeasibilityForm<'m, L> {
    pub fn new(nls: &'m L) -> Self {
        let inner = nls.meta();
        let nequ = nls.nls_meta().nequ;

        let x0 = inner.x0.iter().copied().chain(std::iter::repeat(0.0).take(nequ));
        let y0 = std::iter::repeat(0.0).take(nequ).chain(inner.y0.iter().copied());
        let lvar = inner
            .lvar
            .iter()
            .copied()
            .chain(std::iter::repeat(Number::NEG_INFINITY).take(nequ));
        let uvar = inner
            .uvar
            .iter()
            .copied()
            .chain(std::iter::repeat(Number::INFINITY).take(nequ));
        let lcon = std::iter::repeat(0.0).take(nequ).chain(inner.lcon.iter().copied());
        let ucon = std::iter::repeat(0.0).take(nequ).chain(inner.ucon.iter().copied());

        let meta = ModelMeta {
            nvar: inner.nvar + nequ,
            ncon: nequ + inner.ncon,
            x0: x0.collect(),
            y0: y0.collect(),
            lvar: lvar.collect(),
            uvar: uvar.collect(),
            lcon: lcon.collect(),
            ucon: ucon.collect(),
            nnzj: nls.nls_meta().nnzj + nequ + inner.nnzj,
            nnzh: nls.nls_meta().nnzh + inner.nnzh + nequ,
            minimize: true,
            name: format!("{}-feasibility", inner.name),
        };

        FeasibilityForm { nls, meta }
    }

    /// The wrapped least-squares model.
    pub fn inner(&self) -> &'m L {
        self.nls
    }

    /// Split a point of the feasibility form into its original variables and residuals.
    pub fn split<'s>(&self, z: &'s [Number]) -> (&'s [Number], &'s [Number]) {
        z.split_at(self.nls.meta().nvar.min(z.len()))
    }

    /// Extend options given for the wrapped model to the feasibility form.
    ///
    /// A primal start for `x` only is padded with zero residuals, constraint multipliers for
    /// `c` only are preceded by zero multipliers for the residual equations and bound multipliers
    /// for `x` only are padded with zeros. Vectors of any other length are left untouched.
    pub fn lift_options<'a>(&self, mut options: SolveOptions<'a>) -> SolveOptions<'a> {
        let inner = self.nls.meta();
        let nequ = self.nequ();
        let pad = |v: &mut Vec<Number>| v.extend(std::iter::repeat(0.0).take(nequ));

        if let Some(x0) = options.x0.as_mut().filter(|x0| x0.len() == inner.nvar) {
            pad(x0);
        }
        if let Some(y0) = options.y0.as_mut().filter(|y0| y0.len() == inner.ncon) {
            y0.splice(0..0, std::iter::repeat(0.0).take(nequ));
        }
        if let Some(z0) = options.z0.as_mut().filter(|z0| z0.len() == inner.nvar) {
            pad(z0);
        }
        options
    }

    fn nequ(&self) -> usize {
        self.nls.nls_meta().nequ
    }

    fn nvar(&self) -> usize {
        self.nls.meta().nvar
    }
}

impl<L: NlsModel> NlpModel for FeasibilityForm<'_, L> {
    fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    fn indexing_style(&self) -> IndexingStyle {
        self.nls.indexing_style()
    }

    fn hessian_triangle(&self) -> Triangle {
        self.nls.hessian_triangle()
    }

    fn obj(&self, z: &[Number], f: &mut Number) -> bool {
        let (_, r) = self.split(z);
        *f = 0.5 * r.iter().map(|ri| ri * ri).sum::<Number>();
        true
    }

    fn grad(&self, z: &[Number], g: &mut [Number]) -> bool {
        let (_, r) = self.split(z);
        let (gx, gr) = g.split_at_mut(self.nvar());
        gx.iter_mut().for_each(|g| *g = 0.0);
        gr.copy_from_slice(r);
        true
    }

    fn cons(&self, z: &[Number], c: &mut [Number]) -> bool {
        let (x, r) = self.split(z);
        let (cf, cc) = c.split_at_mut(self.nequ());
        if !self.nls.residual(x, cf) {
            return false;
        }
        for (ci, ri) in cf.iter_mut().zip(r.iter()) {
            *ci -= ri;
        }
        self.nls.cons(x, cc)
    }

    fn jac_structure(&self, rows: &mut [Index], cols: &mut [Index]) {
        let nnzf = self.nls.nls_meta().nnzj;
        let nequ = self.nequ();
        let base = self.indexing_style().base();

        let (rows_f, rest_rows) = rows.split_at_mut(nnzf);
        let (cols_f, rest_cols) = cols.split_at_mut(nnzf);
        self.nls.jac_structure_residual(rows_f, cols_f);

        // -I block coupling each residual equation with its residual variable.
        let (rows_r, rows_c) = rest_rows.split_at_mut(nequ);
        let (cols_r, cols_c) = rest_cols.split_at_mut(nequ);
        for i in 0..nequ {
            rows_r[i] = base + i as Index;
            cols_r[i] = base + (self.nvar() + i) as Index;
        }

        self.nls.jac_structure(rows_c, cols_c);
        rows_c.iter_mut().for_each(|r| *r += nequ as Index);
    }

    fn jac_coord(&self, z: &[Number], vals: &mut [Number]) -> bool {
        let (x, _) = self.split(z);
        let nnzf = self.nls.nls_meta().nnzj;
        let (vals_f, rest) = vals.split_at_mut(nnzf);
        let (vals_r, vals_c) = rest.split_at_mut(self.nequ());
        if !self.nls.jac_coord_residual(x, vals_f) {
            return false;
        }
        vals_r.iter_mut().for_each(|v| *v = -1.0);
        self.nls.jac_coord(x, vals_c)
    }

    fn hess_structure(&self, rows: &mut [Index], cols: &mut [Index]) {
        let nnzf = self.nls.nls_meta().nnzh;
        let nnzc = self.nls.meta().nnzh;
        let base = self.indexing_style().base();

        let (rows_f, rest_rows) = rows.split_at_mut(nnzf);
        let (cols_f, rest_cols) = cols.split_at_mut(nnzf);
        self.nls.hess_structure_residual(rows_f, cols_f);

        let (rows_c, rows_r) = rest_rows.split_at_mut(nnzc);
        let (cols_c, cols_r) = rest_cols.split_at_mut(nnzc);
        self.nls.hess_structure(rows_c, cols_c);

        for (i, (r, c)) in rows_r.iter_mut().zip(cols_r.iter_mut()).enumerate() {
            *r = base + (self.nvar() + i) as Index;
            *c = *r;
        }
    }

    fn hess_coord(&self, z: &[Number], y: &[Number], obj_weight: Number, vals: &mut [Number])
        -> bool
    {
        let (x, _) = self.split(z);
        let nequ = self.nequ();
        let nnzf = self.nls.nls_meta().nnzh;
        let nnzc = self.nls.meta().nnzh;

        let zeros;
        let y = if y.len() >= nequ {
            y
        } else {
            zeros = vec![0.0; self.meta.ncon];
            &zeros[..]
        };
        let (y_f, y_c) = y.split_at(nequ);

        let (vals_f, rest) = vals.split_at_mut(nnzf);
        let (vals_c, vals_r) = rest.split_at_mut(nnzc);
        if !self.nls.hess_coord_residual(x, y_f, vals_f) {
            return false;
        }
        if !self.nls.hess_coord(x, y_c, 0.0, vals_c) {
            return false;
        }
        vals_r.iter_mut().for_each(|v| *v = obj_weight);
        true
    }
}
