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

use crate::options::Value;
use crate::Number;

/// How the Lagrangian Hessian is obtained from the model.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HessianMode {
    /// Coordinate values requested with `EVAL_H` (`hessopt = 1`).
    Exact,
    /// Columns assembled from `EVAL_HV` products (`hessopt = 5`).
    Product,
}

/// Rejected parameter.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ParamError {
    #[error("unknown parameter `{0}`")]
    Unknown(String),
    #[error("parameter `{name}` expects {expected}, got `{value}`")]
    Type {
        name: String,
        expected: &'static str,
        value: Value,
    },
    #[error("value `{value}` is out of range for parameter `{name}`")]
    Range { name: String, value: Value },
}

/// Interior point solver settings.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// 0: silent, 1: summary, 2: one line per iteration.
    pub outlev: i64,
    pub maxit: usize,
    /// Time limits in seconds. Both are measured on the wall clock.
    pub maxtime_cpu: Number,
    pub maxtime_real: Number,
    /// Limit on objective evaluations. `None` is unlimited.
    pub maxfevals: Option<usize>,
    /// Absolute stationarity and complementarity tolerance.
    pub opttol: Number,
    /// Absolute feasibility tolerance.
    pub feastol: Number,
    pub hessopt: HessianMode,
    /// Initial barrier parameter. Chosen automatically if `None`.
    pub bar_initmu: Option<Number>,
    /// Objective magnitude beyond which a feasible problem is declared unbounded.
    pub objrange: Number,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            outlev: 1,
            maxit: 3000,
            maxtime_cpu: 1e8,
            maxtime_real: 1e8,
            maxfevals: None,
            opttol: 1e-8,
            feastol: 1e-8,
            hessopt: HessianMode::Exact,
            bar_initmu: None,
            objrange: 1e20,
        }
    }
}

impl Settings {
    /// Time limit in effect.
    pub fn maxtime(&self) -> Number {
        self.maxtime_cpu.min(self.maxtime_real)
    }

    /// Apply a named parameter.
    pub fn set(&mut self, name: &str, value: &Value) -> Result<(), ParamError> {
        let int = || {
            value.as_int().ok_or_else(|| ParamError::Type {
                name: name.to_string(),
                expected: "an integer",
                value: value.clone(),
            })
        };
        let num = || {
            value.as_num().ok_or_else(|| ParamError::Type {
                name: name.to_string(),
                expected: "a number",
                value: value.clone(),
            })
        };
        let out_of_range = || ParamError::Range {
            name: name.to_string(),
            value: value.clone(),
        };
        let positive = |x: Number| if x > 0.0 { Ok(x) } else { Err(out_of_range()) };

        match name {
            "outlev" => self.outlev = int()?,
            "maxit" => self.maxit = usize::try_from(int()?).map_err(|_| out_of_range())?,
            "maxtime_cpu" => self.maxtime_cpu = positive(num()?)?,
            "maxtime_real" => self.maxtime_real = positive(num()?)?,
            "maxfevals" => {
                self.maxfevals = match int()? {
                    -1 => None,
                    n => Some(usize::try_from(n).map_err(|_| out_of_range())?),
                }
            }
            "opttol" => self.opttol = positive(num()?)?,
            "feastol" => self.feastol = positive(num()?)?,
            "objrange" => self.objrange = positive(num()?)?,
            "bar_initmu" => self.bar_initmu = Some(positive(num()?)?),
            "hessopt" => {
                self.hessopt = match int()? {
                    1 => HessianMode::Exact,
                    5 => HessianMode::Product,
                    _ => return Err(out_of_range()),
                }
            }
            // Only the automatic (0) and monotone (1) barrier rules exist here; both are monotone.
            "bar_murule" => {
                if !(0..=1).contains(&int()?) {
                    return Err(out_of_range());
                }
            }
            // Automatic (0) or direct interior point (1).
            "algorithm" => {
                if !(0..=1).contains(&int()?) {
                    return Err(out_of_range());
                }
            }
            _ => return Err(ParamError::Unknown(name.to_string())),
        }
        Ok(())
    }
}
