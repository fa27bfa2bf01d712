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

use crate::Int;

/// Errors raised by the adapter itself.
///
/// A solve that runs but does not converge is not an error; its outcome is reported through
/// [`SolveStatus`](crate::SolveStatus) in the returned report.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller supplied vector or a model metadata vector has the wrong length.
    #[error("dimension mismatch in {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// The solver session could not be created or configured.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Failure reported by a solver session outside of the blocking solve.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("solver call `{call}` failed with return code {code}")]
pub struct SessionError {
    /// Name of the session call that failed.
    pub call: &'static str,
    /// Raw return code reported by the solver.
    pub code: Int,
}

impl SessionError {
    pub fn new(call: &'static str, code: Int) -> Self {
        SessionError { call, code }
    }
}

/// Failure of a single evaluation callback invoked by the solver.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CallbackError {
    /// The model could not produce the requested values at the current point.
    #[error("model evaluation failed")]
    EvalFailed,
    /// The solver asked for an evaluation this callback does not provide.
    #[error("unexpected evaluation request code {0}")]
    UnknownRequest(Int),
}
