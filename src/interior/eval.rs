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

//! Dense derivatives obtained through the registered evaluation callbacks.
//!
//! All values returned here belong to the minimization problem solved internally: for a
//! maximization the objective, its gradient and its Hessian are negated.

use nalgebra::{DMatrix, DVector};

use super::settings::HessianMode;
use crate::error::CallbackError;
use crate::session::{
    request, EvalCallback, EvalRequest, EvalResult, EvalStructure, ResidualStructure,
};
use crate::{Index, Number};

/// Callbacks registered with a session.
pub enum Callbacks<'a> {
    General {
        structure: EvalStructure,
        callback: EvalCallback<'a>,
    },
    LeastSquares {
        structure: ResidualStructure,
        residual: EvalCallback<'a>,
        jacobian: EvalCallback<'a>,
    },
}

/// Evaluation counters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Counts {
    pub fc: usize,
    pub ga: usize,
    pub h: usize,
}

pub struct Evaluator<'c, 'a> {
    callbacks: &'c mut Callbacks<'a>,
    n: usize,
    m: usize,
    nequ: usize,
    /// `1` when minimizing, `-1` when maximizing.
    sign: Number,
    hessian: HessianMode,
    /// Residual Jacobian of the last gradient evaluation, reused for the Gauss-Newton Hessian.
    residual_jacobian: Option<(DVector<Number>, DMatrix<Number>)>,
    pub counts: Counts,
}

impl<'c, 'a> Evaluator<'c, 'a> {
    pub fn new(
        callbacks: &'c mut Callbacks<'a>,
        n: usize,
        m: usize,
        nequ: usize,
        sign: Number,
        hessian: HessianMode,
    ) -> Self {
        Evaluator {
            callbacks,
            n,
            m,
            nequ,
            sign,
            hessian,
            residual_jacobian: None,
            counts: Counts::default(),
        }
    }

    /// `1` when minimizing, `-1` when maximizing.
    pub fn sign(&self) -> Number {
        self.sign
    }

    /// Objective and constraint values.
    pub fn obj_cons(&mut self, x: &DVector<Number>) -> Result<(Number, DVector<Number>), CallbackError> {
        self.counts.fc += 1;
        match self.callbacks {
            Callbacks::General { callback, .. } => {
                let mut f = 0.0;
                let mut c = DVector::<Number>::zeros(self.m);
                let req = request_at(request::EVAL_FC, x);
                let mut res = EvalResult::new(&mut f);
                res.c = c.as_mut_slice();
                callback(&req, &mut res)?;
                Ok((self.sign * f, c))
            }
            Callbacks::LeastSquares { residual, .. } => {
                let r = eval_residual(residual, x, self.nequ)?;
                Ok((self.sign * 0.5 * r.norm_squared(), DVector::zeros(0)))
            }
        }
    }

    /// Objective gradient and dense constraint Jacobian.
    pub fn grad_jac(
        &mut self,
        x: &DVector<Number>,
    ) -> Result<(DVector<Number>, DMatrix<Number>), CallbackError> {
        self.counts.ga += 1;
        match self.callbacks {
            Callbacks::General {
                structure,
                callback,
            } => {
                let mut f = 0.0;
                let mut g = DVector::<Number>::zeros(self.n);
                let mut vals = vec![0.0; structure.jac_rows.len()];
                let req = request_at(request::EVAL_GA, x);
                let mut res = EvalResult::new(&mut f);
                res.obj_grad = g.as_mut_slice();
                res.jac = vals.as_mut_slice();
                callback(&req, &mut res)?;

                let jac = coordinates_to_dense(
                    self.m,
                    self.n,
                    &structure.jac_rows,
                    &structure.jac_cols,
                    &vals,
                );
                Ok((g * self.sign, jac))
            }
            Callbacks::LeastSquares {
                structure,
                residual,
                jacobian,
            } => {
                let r = eval_residual(residual, x, self.nequ)?;
                let mut f = 0.0;
                let mut vals = vec![0.0; structure.jac_rows.len()];
                let req = request_at(request::EVAL_RJ, x);
                let mut res = EvalResult::new(&mut f);
                res.rsd_jac = vals.as_mut_slice();
                jacobian(&req, &mut res)?;

                let jr = coordinates_to_dense(
                    self.nequ,
                    self.n,
                    &structure.jac_rows,
                    &structure.jac_cols,
                    &vals,
                );
                let g = jr.tr_mul(&r) * self.sign;
                self.residual_jacobian = Some((x.clone(), jr));
                Ok((g, DMatrix::zeros(0, self.n)))
            }
        }
    }

    /// Dense Hessian of the Lagrangian with constraint multipliers `y`.
    pub fn hessian(
        &mut self,
        x: &DVector<Number>,
        y: &DVector<Number>,
    ) -> Result<DMatrix<Number>, CallbackError> {
        self.counts.h += 1;
        if let Callbacks::LeastSquares { .. } = self.callbacks {
            let jr = match self.residual_jacobian.take() {
                Some((at, jr)) if at == *x => jr,
                _ => {
                    self.grad_jac(x)?;
                    match self.residual_jacobian.take() {
                        Some((_, jr)) => jr,
                        None => return Err(CallbackError::EvalFailed),
                    }
                }
            };
            let hess = jr.tr_mul(&jr) * self.sign;
            self.residual_jacobian = Some((x.clone(), jr));
            return Ok(hess);
        }

        let n = self.n;
        let sign = self.sign;
        let hessian = self.hessian;
        let Callbacks::General {
            structure,
            callback,
        } = self.callbacks
        else {
            return Err(CallbackError::EvalFailed);
        };
        let lambda: &[Number] = if self.m > 0 { y.as_slice() } else { &[] };

        match hessian {
            HessianMode::Exact => {
                let mut f = 0.0;
                let mut vals = vec![0.0; structure.hess_rows.len()];
                let req = EvalRequest {
                    code: request::EVAL_H,
                    x: x.as_slice(),
                    lambda,
                    sigma: sign,
                    vec: &[],
                };
                let mut res = EvalResult::new(&mut f);
                res.hess = vals.as_mut_slice();
                callback(&req, &mut res)?;
                Ok(symmetric_to_dense(
                    n,
                    &structure.hess_rows,
                    &structure.hess_cols,
                    &vals,
                ))
            }
            HessianMode::Product => {
                let mut hess = DMatrix::<Number>::zeros(n, n);
                let mut e = DVector::<Number>::zeros(n);
                let mut hv = DVector::<Number>::zeros(n);
                for j in 0..n {
                    e.fill(0.0);
                    e[j] = 1.0;
                    let mut f = 0.0;
                    let req = EvalRequest {
                        code: request::EVAL_HV,
                        x: x.as_slice(),
                        lambda,
                        sigma: sign,
                        vec: e.as_slice(),
                    };
                    let mut res = EvalResult::new(&mut f);
                    res.hess_vec = hv.as_mut_slice();
                    callback(&req, &mut res)?;
                    hess.set_column(j, &hv);
                }
                Ok((&hess + hess.transpose()) * 0.5)
            }
        }
    }
}

fn request_at(code: crate::Int, x: &DVector<Number>) -> EvalRequest<'_> {
    EvalRequest {
        code,
        x: x.as_slice(),
        lambda: &[],
        sigma: 0.0,
        vec: &[],
    }
}

fn eval_residual(
    residual: &mut EvalCallback,
    x: &DVector<Number>,
    nequ: usize,
) -> Result<DVector<Number>, CallbackError> {
    let mut f = 0.0;
    let mut r = DVector::<Number>::zeros(nequ);
    let req = request_at(request::EVAL_R, x);
    let mut res = EvalResult::new(&mut f);
    res.rsd = r.as_mut_slice();
    residual(&req, &mut res)?;
    Ok(r)
}

/// Accumulate zero-based coordinate entries into a dense matrix.
pub fn coordinates_to_dense(
    nrows: usize,
    ncols: usize,
    rows: &[Index],
    cols: &[Index],
    vals: &[Number],
) -> DMatrix<Number> {
    let mut mtx = DMatrix::zeros(nrows, ncols);
    for ((&r, &c), &v) in rows.iter().zip(cols.iter()).zip(vals.iter()) {
        mtx[(r as usize, c as usize)] += v;
    }
    mtx
}

/// Dense symmetric matrix from the zero-based coordinates of one of its triangles.
pub fn symmetric_to_dense(n: usize, rows: &[Index], cols: &[Index], vals: &[Number]) -> DMatrix<Number> {
    let mut mtx = DMatrix::zeros(n, n);
    for ((&r, &c), &v) in rows.iter().zip(cols.iter()).zip(vals.iter()) {
        let (r, c) = (r as usize, c as usize);
        mtx[(r, c)] += v;
        if r != c {
            mtx[(c, r)] += v;
        }
    }
    mtx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_assembly() {
        let jac = coordinates_to_dense(2, 3, &[0, 1, 1, 1], &[2, 0, 1, 1], &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            jac,
            DMatrix::from_row_slice(2, 3, &[0.0, 0.0, 1.0, 2.0, 7.0, 0.0])
        );

        let hess = symmetric_to_dense(2, &[0, 0, 1], &[0, 1, 1], &[2.0, -1.0, 5.0]);
        assert_eq!(hess, DMatrix::from_row_slice(2, 2, &[2.0, -1.0, -1.0, 5.0]));
    }

    #[test]
    fn maximization_negates_derivatives() {
        // f(x) = x1² + 3 x1 x2, evaluated for maximization.
        let callback: EvalCallback = Box::new(|req: &EvalRequest, res: &mut EvalResult| {
            let x = req.x;
            match req.code {
                request::EVAL_FC => *res.obj = x[0] * x[0] + 3.0 * x[0] * x[1],
                request::EVAL_GA => {
                    res.obj_grad[0] = 2.0 * x[0] + 3.0 * x[1];
                    res.obj_grad[1] = 3.0 * x[0];
                }
                request::EVAL_H => {
                    res.hess[0] = 2.0 * req.sigma;
                    res.hess[1] = 3.0 * req.sigma;
                }
                code => return Err(CallbackError::UnknownRequest(code)),
            }
            Ok(())
        });
        let mut callbacks = Callbacks::General {
            structure: EvalStructure {
                jac_rows: vec![],
                jac_cols: vec![],
                hess_rows: vec![0, 0],
                hess_cols: vec![0, 1],
            },
            callback,
        };
        let mut eval = Evaluator::new(&mut callbacks, 2, 0, 0, -1.0, HessianMode::Exact);
        let x = DVector::from_vec(vec![1.0, 2.0]);

        let (f, c) = eval.obj_cons(&x).unwrap();
        assert_eq!(f, -7.0);
        assert!(c.is_empty());

        let (g, _) = eval.grad_jac(&x).unwrap();
        assert_eq!(g, DVector::from_vec(vec![-8.0, -3.0]));

        let h = eval.hessian(&x, &DVector::zeros(0)).unwrap();
        assert_eq!(h, DMatrix::from_row_slice(2, 2, &[-2.0, -3.0, -3.0, 0.0]));
        assert_eq!(eval.counts, Counts { fc: 1, ga: 1, h: 1 });
    }
}
