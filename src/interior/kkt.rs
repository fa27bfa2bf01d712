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

//! Primal-dual Newton system with inertia correction.
//!
//! The system
//!
//! ```text
//! [ W + Σ + δw I    Aᵀ   ] [dw]   [rw]
//! [      A        -δc I  ] [dy] = [ry]
//! ```
//!
//! is factored with a symmetric eigendecomposition. The step is accepted once the matrix has
//! exactly `nw` positive and `m` negative eigenvalues, which makes `dw` a descent direction for
//! the barrier problem restricted to the linearized constraints.

use nalgebra::{DMatrix, DVector, SymmetricEigen};

use crate::Number;

const DELTA_W_INIT: Number = 1e-4;
const DELTA_W_MIN: Number = 1e-20;
const DELTA_W_MAX: Number = 1e40;
const DELTA_C: Number = 1e-8;
const KAPPA_W_MINUS: Number = 1.0 / 3.0;
const KAPPA_W_PLUS: Number = 8.0;
const KAPPA_W_PLUS_FIRST: Number = 100.0;
/// Eigenvalues below this fraction of the largest magnitude are treated as zero.
const ZERO_EIGENVALUE: Number = 1e-12;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum KktError {
    #[error("failed to correct the inertia of the Newton system")]
    Inertia,
    #[error("non-finite entries in the Newton system")]
    NotFinite,
}

/// Numbers of positive, negative and zero eigenvalues.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Inertia {
    pub positive: usize,
    pub negative: usize,
    pub zero: usize,
}

impl Inertia {
    fn of(eigenvalues: &DVector<Number>) -> Self {
        let scale = eigenvalues.iter().fold(1.0, |acc: Number, e| acc.max(e.abs()));
        let tol = ZERO_EIGENVALUE * scale;
        let mut inertia = Inertia {
            positive: 0,
            negative: 0,
            zero: 0,
        };
        for &e in eigenvalues.iter() {
            if e > tol {
                inertia.positive += 1;
            } else if e < -tol {
                inertia.negative += 1;
            } else {
                inertia.zero += 1;
            }
        }
        inertia
    }
}

/// Solution of the Newton system.
#[derive(Clone, Debug)]
pub struct Step {
    pub dw: DVector<Number>,
    pub dy: DVector<Number>,
    /// Primal regularization that was needed.
    pub delta_w: Number,
}

/// Regularization state carried between iterations.
#[derive(Clone, Debug, Default)]
pub struct Regularization {
    last_delta_w: Number,
}

impl Regularization {
    /// Solve the Newton system with Hessian `hess` (`nw × nw`), barrier diagonal `sigma`,
    /// constraint Jacobian `jac` (`m × nw`) and right-hand side `(rw, ry)`.
    pub fn solve(
        &mut self,
        hess: &DMatrix<Number>,
        sigma: &DVector<Number>,
        jac: &DMatrix<Number>,
        rw: &DVector<Number>,
        ry: &DVector<Number>,
    ) -> Result<Step, KktError> {
        let nw = hess.nrows();
        let m = jac.nrows();

        let mut rhs = DVector::zeros(nw + m);
        rhs.rows_mut(0, nw).copy_from(rw);
        rhs.rows_mut(nw, m).copy_from(ry);

        let mut delta_w = 0.0;
        let mut delta_c = 0.0;
        loop {
            let kkt = assemble(hess, sigma, jac, delta_w, delta_c);
            if kkt.iter().any(|v| !v.is_finite()) {
                return Err(KktError::NotFinite);
            }

            let eig = SymmetricEigen::new(kkt);
            let inertia = Inertia::of(&eig.eigenvalues);
            if inertia.positive == nw && inertia.negative == m {
                if delta_w > 0.0 {
                    self.last_delta_w = delta_w;
                }
                let coeffs = eig.eigenvectors.transpose() * &rhs;
                let coeffs = coeffs.component_div(&eig.eigenvalues);
                let sol = &eig.eigenvectors * coeffs;
                return Ok(Step {
                    dw: sol.rows(0, nw).into_owned(),
                    dy: sol.rows(nw, m).into_owned(),
                    delta_w,
                });
            }

            log::trace!(
                "wrong inertia {:?} with delta_w = {:e}, delta_c = {:e}",
                inertia,
                delta_w,
                delta_c
            );

            if inertia.zero > 0 && m > 0 && delta_c == 0.0 {
                delta_c = DELTA_C;
                continue;
            }

            delta_w = if delta_w == 0.0 {
                if self.last_delta_w == 0.0 {
                    DELTA_W_INIT
                } else {
                    DELTA_W_MIN.max(KAPPA_W_MINUS * self.last_delta_w)
                }
            } else if self.last_delta_w == 0.0 {
                KAPPA_W_PLUS_FIRST * delta_w
            } else {
                KAPPA_W_PLUS * delta_w
            };

            if delta_w > DELTA_W_MAX {
                return Err(KktError::Inertia);
            }
        }
    }
}

fn assemble(
    hess: &DMatrix<Number>,
    sigma: &DVector<Number>,
    jac: &DMatrix<Number>,
    delta_w: Number,
    delta_c: Number,
) -> DMatrix<Number> {
    let nw = hess.nrows();
    let m = jac.nrows();
    let mut kkt = DMatrix::zeros(nw + m, nw + m);
    for i in 0..nw {
        for j in 0..nw {
            kkt[(i, j)] = hess[(i, j)];
        }
        kkt[(i, i)] += sigma[i] + delta_w;
    }
    for i in 0..m {
        for j in 0..nw {
            kkt[(nw + i, j)] = jac[(i, j)];
            kkt[(j, nw + i)] = jac[(i, j)];
        }
        kkt[(nw + i, nw + i)] = -delta_c;
    }
    kkt
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn positive_definite_system() {
        let hess = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let sigma = DVector::zeros(2);
        let jac = DMatrix::zeros(0, 2);
        let rw = DVector::from_vec(vec![1.0, 2.0]);
        let ry = DVector::zeros(0);

        let mut reg = Regularization::default();
        let step = reg.solve(&hess, &sigma, &jac, &rw, &ry).unwrap();
        assert_eq!(step.delta_w, 0.0);
        assert_relative_eq!(step.dw[0], 1.0 / 11.0, max_relative = 1e-12);
        assert_relative_eq!(step.dw[1], 7.0 / 11.0, max_relative = 1e-12);
        assert!(step.dy.is_empty());
    }

    #[test]
    fn equality_constrained_system() {
        // min x1² + x2² + x1 x2 + x1 - x2  s.t.  x1 + x2 = 1, Newton step from the origin.
        let hess = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]);
        let sigma = DVector::zeros(2);
        let jac = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        let rw = DVector::from_vec(vec![-1.0, 1.0]);
        let ry = DVector::from_vec(vec![1.0]);

        let mut reg = Regularization::default();
        let step = reg.solve(&hess, &sigma, &jac, &rw, &ry).unwrap();
        assert_eq!(step.delta_w, 0.0);
        assert_relative_eq!(step.dw[0], -0.5, epsilon = 1e-12);
        assert_relative_eq!(step.dw[1], 1.5, epsilon = 1e-12);
        assert_relative_eq!(step.dy[0], -1.5, epsilon = 1e-12);
    }

    #[test]
    fn indefinite_hessian_is_regularized() {
        let hess = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, -2.0]);
        let sigma = DVector::zeros(2);
        let jac = DMatrix::zeros(0, 2);
        let rw = DVector::from_vec(vec![-1.0, -1.0]);
        let ry = DVector::zeros(0);

        let mut reg = Regularization::default();
        let step = reg.solve(&hess, &sigma, &jac, &rw, &ry).unwrap();
        assert!(step.delta_w > 2.0);
        // Descent direction for a gradient of -rw.
        assert!(rw.dot(&step.dw) > 0.0);

        // The next factorization starts from a smaller shift.
        let again = reg.solve(&hess, &sigma, &jac, &rw, &ry).unwrap();
        assert!(again.delta_w > 2.0);
    }

    #[test]
    fn dependent_constraints_get_dual_regularization() {
        let hess = DMatrix::identity(2, 2);
        let sigma = DVector::zeros(2);
        let jac = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let rw = DVector::zeros(2);
        let ry = DVector::from_vec(vec![1.0, 1.0]);

        let mut reg = Regularization::default();
        let step = reg.solve(&hess, &sigma, &jac, &rw, &ry).unwrap();
        assert_relative_eq!(step.dw[0] + step.dw[1], 1.0, epsilon = 1e-6);
    }
}
