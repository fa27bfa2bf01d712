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

//! In-process primal-dual interior point backend.
//!
//! Sessions created by [`InteriorPoint`] implement the complete session contract on dense
//! matrices, which makes them suitable for small problems and for exercising the adapter
//! without a native solver library.
//!
//! Recognized parameters:
//!
//! | name           | type   | default | meaning                                           |
//! |----------------|--------|---------|---------------------------------------------------|
//! | `outlev`       | int    | 1       | 0 silent, 1 summary, 2 per-iteration log lines    |
//! | `maxit`        | int    | 3000    | iteration limit                                   |
//! | `maxtime_cpu`  | number | 1e8     | time limit in seconds (measured on the wall clock)|
//! | `maxtime_real` | number | 1e8     | wall-clock time limit in seconds                  |
//! | `maxfevals`    | int    | -1      | objective evaluation limit, -1 for none           |
//! | `opttol`       | number | 1e-8    | absolute optimality tolerance                     |
//! | `feastol`      | number | 1e-8    | absolute feasibility tolerance                    |
//! | `hessopt`      | int    | 1       | 1 exact Hessian, 5 Hessian-vector products        |
//! | `bar_initmu`   | number | 0.1     | initial barrier parameter                         |
//! | `bar_murule`   | int    | 0       | 0 or 1, both select the monotone rule             |
//! | `objrange`     | number | 1e20    | objective magnitude considered unbounded          |
//! | `algorithm`    | int    | 0       | 0 or 1, both select the interior point method     |
//!
//! Unknown names and values of the wrong type are reported by `solve` with
//! [`rc::BAD_PARAMINPUT`](crate::session::rc::BAD_PARAMINPUT).

mod eval;
mod ipm;
mod kkt;
mod session;
mod settings;

pub use self::session::InteriorSession;
pub use self::settings::{HessianMode, ParamError, Settings};

use crate::error::SessionError;
use crate::session::{Backend, Session};

/// Backend creating [`InteriorSession`]s.
#[derive(Copy, Clone, Debug, Default)]
pub struct InteriorPoint;

impl InteriorPoint {
    pub fn new() -> Self {
        InteriorPoint
    }
}

impl Backend for InteriorPoint {
    fn name(&self) -> &str {
        "interior-point"
    }

    fn create<'a>(&self) -> Result<Box<dyn Session<'a> + 'a>, SessionError> {
        Ok(Box::new(InteriorSession::new()))
    }
}
