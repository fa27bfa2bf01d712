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

//! Abstract differentiable models consumed by the adapter.

use crate::{Error, Index, Number};

/// Zero-based indexing (C Style) or one-based indexing (Fortran style).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IndexingStyle {
    CStyle = 0,
    FortranStyle = 1,
}

impl IndexingStyle {
    /// Index of the first entry in this style.
    pub fn base(self) -> Index {
        self as Index
    }
}

/// Half of a symmetric matrix in which its sparsity pattern is expressed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Triangle {
    /// Entries with `row >= col`.
    Lower,
    /// Entries with `row <= col`.
    Upper,
}

/// Problem metadata: dimensions, bounds, starting point and derivative structure sizes.
///
/// Infinite bounds are expressed with `Number::INFINITY` and `Number::NEG_INFINITY`.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelMeta {
    /// Number of variables.
    pub nvar: usize,
    /// Number of general constraints (bounds on variables excluded).
    pub ncon: usize,
    /// Initial point.
    pub x0: Vec<Number>,
    /// Initial constraint multipliers.
    pub y0: Vec<Number>,
    pub lvar: Vec<Number>,
    pub uvar: Vec<Number>,
    pub lcon: Vec<Number>,
    pub ucon: Vec<Number>,
    /// Number of non-zeros in the constraint Jacobian.
    pub nnzj: usize,
    /// Number of non-zeros in one triangle of the Lagrangian Hessian.
    pub nnzh: usize,
    /// `false` if the objective is to be maximized.
    pub minimize: bool,
    pub name: String,
}

impl ModelMeta {
    /// Metadata for an unbounded, unconstrained model starting at `x0`.
    pub fn new(x0: Vec<Number>) -> Self {
        let nvar = x0.len();
        ModelMeta {
            nvar,
            ncon: 0,
            x0,
            y0: Vec::new(),
            lvar: vec![Number::NEG_INFINITY; nvar],
            uvar: vec![Number::INFINITY; nvar],
            lcon: Vec::new(),
            ucon: Vec::new(),
            nnzj: 0,
            nnzh: 0,
            minimize: true,
            name: String::from("Generic"),
        }
    }

    pub fn with_bounds(mut self, lvar: Vec<Number>, uvar: Vec<Number>) -> Self {
        self.lvar = lvar;
        self.uvar = uvar;
        self
    }

    /// Add general constraints `lcon <= c(x) <= ucon`. Equality constraints have equal bounds.
    /// The initial multipliers are reset to zero.
    pub fn with_constraints(mut self, lcon: Vec<Number>, ucon: Vec<Number>) -> Self {
        self.ncon = lcon.len();
        self.y0 = vec![0.0; self.ncon];
        self.lcon = lcon;
        self.ucon = ucon;
        self
    }

    pub fn with_y0(mut self, y0: Vec<Number>) -> Self {
        self.y0 = y0;
        self
    }

    pub fn with_nnzj(mut self, nnzj: usize) -> Self {
        self.nnzj = nnzj;
        self
    }

    pub fn with_nnzh(mut self, nnzh: usize) -> Self {
        self.nnzh = nnzh;
        self
    }

    pub fn maximize(mut self) -> Self {
        self.minimize = false;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Verify that every vector agrees with `nvar` and `ncon`.
    pub fn check(&self) -> Result<(), Error> {
        let checks: [(&'static str, usize, usize); 6] = [
            ("x0", self.nvar, self.x0.len()),
            ("lvar", self.nvar, self.lvar.len()),
            ("uvar", self.nvar, self.uvar.len()),
            ("y0", self.ncon, self.y0.len()),
            ("lcon", self.ncon, self.lcon.len()),
            ("ucon", self.ncon, self.ucon.len()),
        ];
        for (what, expected, found) in checks {
            if expected != found {
                return Err(Error::DimensionMismatch {
                    what,
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }
}

/// Dimensions specific to nonlinear least-squares models.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NlsMeta {
    /// Number of residuals.
    pub nequ: usize,
    /// Number of non-zeros in the residual Jacobian.
    pub nnzj: usize,
    /// Number of non-zeros in one triangle of the weighted sum of residual Hessians.
    pub nnzh: usize,
}

/// A differentiable nonlinear program
///
/// ```text
/// min/max f(x)  s.t.  lcon <= c(x) <= ucon,  lvar <= x <= uvar.
/// ```
///
/// Sparse matrices are given in coordinate form: the structure functions fill row and column
/// indices once, and the corresponding value functions fill values in the same order.
/// Indices follow `indexing_style` (one-based by default) and symmetric matrices are given by
/// the triangle returned by `hessian_triangle` (lower by default).
///
/// Evaluation functions return `false` if they cannot produce values at `x`. The solver may
/// then try a different point.
///
/// The constraint related functions have empty default implementations, which is all an
/// unconstrained model needs.
pub trait NlpModel {
    fn meta(&self) -> &ModelMeta;

    fn indexing_style(&self) -> IndexingStyle {
        IndexingStyle::FortranStyle
    }

    fn hessian_triangle(&self) -> Triangle {
        Triangle::Lower
    }

    /// Objective value.
    fn obj(&self, x: &[Number], f: &mut Number) -> bool;

    /// Dense objective gradient.
    fn grad(&self, x: &[Number], g: &mut [Number]) -> bool;

    /// Constraint values. `c` has `ncon` entries.
    fn cons(&self, _x: &[Number], _c: &mut [Number]) -> bool {
        true
    }

    /// Constraint Jacobian structure. Each slice has `nnzj` entries.
    fn jac_structure(&self, _rows: &mut [Index], _cols: &mut [Index]) {}

    /// Constraint Jacobian values in the order given by `jac_structure`.
    fn jac_coord(&self, _x: &[Number], _vals: &mut [Number]) -> bool {
        true
    }

    /// Structure of the Lagrangian Hessian. Each slice has `nnzh` entries.
    fn hess_structure(&self, rows: &mut [Index], cols: &mut [Index]);

    /// Values of `obj_weight * ∇²f(x) + Σ y_i ∇²c_i(x)` in the order given by
    /// `hess_structure`. `y` is empty for unconstrained models.
    fn hess_coord(&self, x: &[Number], y: &[Number], obj_weight: Number, vals: &mut [Number])
        -> bool;

    /// Product of the Lagrangian Hessian with `v`.
    ///
    /// The default implementation assembles the product from `hess_structure` and `hess_coord`.
    fn hprod(
        &self,
        x: &[Number],
        y: &[Number],
        v: &[Number],
        obj_weight: Number,
        hv: &mut [Number],
    ) -> bool {
        let nnzh = self.meta().nnzh;
        let mut rows = vec![0; nnzh];
        let mut cols = vec![0; nnzh];
        let mut vals = vec![0.0; nnzh];
        self.hess_structure(&mut rows, &mut cols);
        if !self.hess_coord(x, y, obj_weight, &mut vals) {
            return false;
        }
        symmetric_product(&rows, &cols, &vals, self.indexing_style(), v, hv);
        true
    }
}

/// A nonlinear least-squares model minimizing `½‖F(x)‖²` subject to the constraints of the
/// underlying [`NlpModel`].
///
/// The residual derivatives follow the same indexing and triangle conventions as the model.
pub trait NlsModel: NlpModel {
    fn nls_meta(&self) -> &NlsMeta;

    /// Residual values `F(x)`. `r` has `nequ` entries.
    fn residual(&self, x: &[Number], r: &mut [Number]) -> bool;

    /// Residual Jacobian structure. Each slice has `nls_meta().nnzj` entries.
    fn jac_structure_residual(&self, rows: &mut [Index], cols: &mut [Index]);

    fn jac_coord_residual(&self, x: &[Number], vals: &mut [Number]) -> bool;

    /// Structure of `Σ v_i ∇²F_i`. Each slice has `nls_meta().nnzh` entries.
    fn hess_structure_residual(&self, rows: &mut [Index], cols: &mut [Index]);

    /// Values of `Σ v_i ∇²F_i(x)`.
    fn hess_coord_residual(&self, x: &[Number], v: &[Number], vals: &mut [Number]) -> bool;

    /// Product `(Σ v_i ∇²F_i(x)) w`.
    fn hprod_residual(&self, x: &[Number], v: &[Number], w: &[Number], hv: &mut [Number]) -> bool {
        let nnzh = self.nls_meta().nnzh;
        let mut rows = vec![0; nnzh];
        let mut cols = vec![0; nnzh];
        let mut vals = vec![0.0; nnzh];
        self.hess_structure_residual(&mut rows, &mut cols);
        if !self.hess_coord_residual(x, v, &mut vals) {
            return false;
        }
        symmetric_product(&rows, &cols, &vals, self.indexing_style(), w, hv);
        true
    }
}

/// Compute `hv = H v` for a symmetric `H` given by one of its triangles in coordinate form.
pub(crate) fn symmetric_product(
    rows: &[Index],
    cols: &[Index],
    vals: &[Number],
    style: IndexingStyle,
    v: &[Number],
    hv: &mut [Number],
) {
    let base = style.base();
    hv.iter_mut().for_each(|h| *h = 0.0);
    for ((&r, &c), &val) in rows.iter().zip(cols.iter()).zip(vals.iter()) {
        let r = (r - base) as usize;
        let c = (c - base) as usize;
        hv[r] += val * v[c];
        if r != c {
            hv[c] += val * v[r];
        }
    }
}
