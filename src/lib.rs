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

/*!
 * # nlp-adapter
 *
 * Solve nonlinear programs described by the [`NlpModel`] and [`NlsModel`] traits with a
 * callback-driven solver.
 *
 * A model describes its dimensions, bounds and starting point through [`ModelMeta`] and
 * provides values and sparse derivatives on request. The adapter registers all of that with a
 * solver [`Session`](session::Session) obtained from a [`Backend`](session::Backend), runs a
 * single blocking solve and returns a [`SolutionReport`] with a normalized [`SolveStatus`].
 *
 * Two backends are available:
 *
 *  - [`InteriorPoint`], an in-process dense primal-dual interior point method, always built.
 *  - `knitro::Knitro`, driving the Knitro callable library, behind the `knitro` feature.
 *
 * # Example
 *
 * ```
 * use nlp_adapter::*;
 *
 * /// min (x1 - 1)² + (x2 - 2)²  s.t.  x1 + x2 = 1
 * struct Projection {
 *     meta: ModelMeta,
 * }
 *
 * impl NlpModel for Projection {
 *     fn meta(&self) -> &ModelMeta {
 *         &self.meta
 *     }
 *     fn obj(&self, x: &[Number], f: &mut Number) -> bool {
 *         *f = (x[0] - 1.0).powi(2) + (x[1] - 2.0).powi(2);
 *         true
 *     }
 *     fn grad(&self, x: &[Number], g: &mut [Number]) -> bool {
 *         g[0] = 2.0 * (x[0] - 1.0);
 *         g[1] = 2.0 * (x[1] - 2.0);
 *         true
 *     }
 *     fn cons(&self, x: &[Number], c: &mut [Number]) -> bool {
 *         c[0] = x[0] + x[1];
 *         true
 *     }
 *     fn jac_structure(&self, rows: &mut [Index], cols: &mut [Index]) {
 *         rows.copy_from_slice(&[1, 1]);
 *         cols.copy_from_slice(&[1, 2]);
 *     }
 *     fn jac_coord(&self, _x: &[Number], vals: &mut [Number]) -> bool {
 *         vals.copy_from_slice(&[1.0, 1.0]);
 *         true
 *     }
 *     fn hess_structure(&self, rows: &mut [Index], cols: &mut [Index]) {
 *         rows.copy_from_slice(&[1, 2]);
 *         cols.copy_from_slice(&[1, 2]);
 *     }
 *     fn hess_coord(&self, _x: &[Number], _y: &[Number], w: Number, vals: &mut [Number]) -> bool {
 *         vals.copy_from_slice(&[2.0 * w, 2.0 * w]);
 *         true
 *     }
 * }
 *
 * let model = Projection {
 *     meta: ModelMeta::new(vec![0.0, 0.0])
 *         .with_constraints(vec![1.0], vec![1.0])
 *         .with_nnzj(2)
 *         .with_nnzh(2),
 * };
 *
 * let report = solve(&InteriorPoint, &model, SolveOptions::new().param("outlev", 0)).unwrap();
 * assert_eq!(report.status, SolveStatus::FirstOrder);
 * assert!((report.solution[0] - 0.0).abs() < 1e-6);
 * assert!((report.solution[1] - 1.0).abs() < 1e-6);
 * ```
 */

/// Floating point type of every value exchanged with a solver.
pub type Number = f64;
/// Sparse matrix index type.
pub type Index = i32;
/// Raw solver code type.
pub type Int = i32;

mod adapter;
mod error;
mod feasibility;
pub mod interior;
#[cfg(feature = "knitro")]
pub mod knitro;
mod model;
mod options;
pub mod report;
pub mod session;
mod status;

pub use adapter::{hessian_coordinates, sanitize_bounds, solve, solve_least_squares, to_zero_based};
pub use error::{CallbackError, Error, SessionError};
pub use feasibility::FeasibilityForm;
pub use interior::InteriorPoint;
pub use model::{IndexingStyle, ModelMeta, NlpModel, NlsMeta, NlsModel, Triangle};
pub use options::{IterationCallback, Params, SolveOptions, Value};
pub use report::SolutionReport;
pub use status::SolveStatus;
