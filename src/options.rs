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

use std::fmt;

use crate::session::IterationData;
use crate::Number;

/// Value of a solver parameter or of a diagnostics entry.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Integer value.
    Int(i64),
    /// Numeric value.
    Num(f64),
    /// Boolean value.
    Bool(bool),
    /// String value.
    Str(String),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Value::Int(i) => Some(i),
            Value::Bool(b) => Some(b as i64),
            _ => None,
        }
    }

    /// Numeric view of the value. Integers are widened.
    pub fn as_num(&self) -> Option<f64> {
        match *self {
            Value::Num(x) => Some(x),
            Value::Int(i) => Some(i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Num(x) => write!(f, "{:e}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Num(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl<'a> From<&'a str> for Value {
    fn from(v: &'a str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

/// Solver parameters forwarded verbatim to the session, in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, Value)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter. Setting a name twice keeps its first position but the latest value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Callback invoked by the solver once per iteration. Return `false` to stop the solve early.
pub type IterationCallback<'a> = Box<dyn FnMut(&IterationData) -> bool + 'a>;

/// Options of a single solve.
///
/// `x0`, `y0`, `z0` and `callback` are interpreted by the adapter; everything in `params` is
/// passed on to the solver untouched.
#[derive(Default)]
pub struct SolveOptions<'a> {
    /// Initial point. Defaults to the model's own `x0`.
    pub x0: Option<Vec<Number>>,
    /// Initial constraint multipliers.
    pub y0: Option<Vec<Number>>,
    /// Initial bound multipliers.
    pub z0: Option<Vec<Number>>,
    /// Per-iteration notification callback.
    pub callback: Option<IterationCallback<'a>>,
    pub params: Params,
}

impl<'a> SolveOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn x0(mut self, x0: Vec<Number>) -> Self {
        self.x0 = Some(x0);
        self
    }

    pub fn y0(mut self, y0: Vec<Number>) -> Self {
        self.y0 = Some(y0);
        self
    }

    pub fn z0(mut self, z0: Vec<Number>) -> Self {
        self.z0 = Some(z0);
        self
    }

    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&IterationData) -> bool + 'a,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Add a solver parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.set(name, value);
        self
    }
}

impl fmt::Debug for SolveOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SolveOptions")
            .field("x0", &self.x0)
            .field("y0", &self.y0)
            .field("z0", &self.z0)
            .field("callback", &self.callback.as_ref().map(|_| "FnMut"))
            .field("params", &self.params)
            .finish()
    }
}
