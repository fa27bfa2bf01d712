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

use crate::Int;

/// Outcome of a solve, independent of the solver's raw return codes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SolveStatus {
    /// First-order stationary point found.
    FirstOrder,
    /// Stopped early at a point satisfying relaxed tolerances.
    Acceptable,
    /// Feasible, but no further progress could be made.
    Stalled,
    Infeasible,
    Unbounded,
    MaxIter,
    MaxTime,
    MaxEval,
    /// Internal solver error, callback error or user requested termination.
    Exception,
    Unknown,
}

impl SolveStatus {
    /// Classify a raw solver return code.
    pub fn from_code(code: Int) -> Self {
        use SolveStatus as S;
        match code {
            0 => S::FirstOrder,
            -100 => S::Acceptable,
            -103..=-101 => S::Stalled,
            -299..=-200 => S::Infeasible,
            -301..=-300 => S::Unbounded,
            -400 | -410 => S::MaxIter,
            -401 | -411 => S::MaxTime,
            -402 | -412 => S::MaxEval,
            -600..=-500 => S::Exception,
            _ => S::Unknown,
        }
    }

    /// Short machine readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SolveStatus::FirstOrder => "first_order",
            SolveStatus::Acceptable => "acceptable",
            SolveStatus::Stalled => "stalled",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unbounded => "unbounded",
            SolveStatus::MaxIter => "max_iter",
            SolveStatus::MaxTime => "max_time",
            SolveStatus::MaxEval => "max_eval",
            SolveStatus::Exception => "exception",
            SolveStatus::Unknown => "unknown",
        }
    }

    /// `true` for the statuses that deliver a usable solution.
    pub fn is_success(&self) -> bool {
        matches!(self, SolveStatus::FirstOrder | SolveStatus::Acceptable)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            SolveStatus::FirstOrder => "first-order stationary",
            SolveStatus::Acceptable => "solved to within acceptable tolerances",
            SolveStatus::Stalled => "the solver stalled",
            SolveStatus::Infeasible => "problem may be infeasible",
            SolveStatus::Unbounded => "objective function may be unbounded",
            SolveStatus::MaxIter => "maximum number of iterations",
            SolveStatus::MaxTime => "maximum elapsed time",
            SolveStatus::MaxEval => "maximum number of function evaluations",
            SolveStatus::Exception => "unhandled exception",
            SolveStatus::Unknown => "unknown",
        };
        f.write_str(msg)
    }
}

impl From<Int> for SolveStatus {
    fn from(code: Int) -> Self {
        SolveStatus::from_code(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SolveStatus as S;

    #[test]
    fn exact_codes() {
        assert_eq!(S::from_code(0), S::FirstOrder);
        assert_eq!(S::from_code(-100), S::Acceptable);
        assert_eq!(S::from_code(-400), S::MaxIter);
        assert_eq!(S::from_code(-410), S::MaxIter);
        assert_eq!(S::from_code(-401), S::MaxTime);
        assert_eq!(S::from_code(-411), S::MaxTime);
        assert_eq!(S::from_code(-402), S::MaxEval);
        assert_eq!(S::from_code(-412), S::MaxEval);
    }

    #[test]
    fn closed_ranges() {
        for code in -103..=-101 {
            assert_eq!(S::from_code(code), S::Stalled, "code {}", code);
        }
        for code in -299..=-200 {
            assert_eq!(S::from_code(code), S::Infeasible, "code {}", code);
        }
        for code in -301..=-300 {
            assert_eq!(S::from_code(code), S::Unbounded, "code {}", code);
        }
        for code in -600..=-500 {
            assert_eq!(S::from_code(code), S::Exception, "code {}", code);
        }
    }

    #[test]
    fn everything_else_is_unknown() {
        let known = |c: Int| {
            c == 0
                || c == -100
                || (-103..=-101).contains(&c)
                || (-299..=-200).contains(&c)
                || (-301..=-300).contains(&c)
                || [-400, -410, -401, -411, -402, -412].contains(&c)
                || (-600..=-500).contains(&c)
        };
        for code in -1000..=1000 {
            if !known(code) {
                assert_eq!(S::from_code(code), S::Unknown, "code {}", code);
            }
        }
        // Boundaries just outside the ranges.
        for code in [1, -1, -99, -104, -199, -302, -399, -403, -409, -413, -499, -601] {
            assert_eq!(S::from_code(code), S::Unknown, "code {}", code);
        }
        assert_eq!(S::from_code(Int::MIN), S::Unknown);
        assert_eq!(S::from_code(Int::MAX), S::Unknown);
    }

    #[test]
    fn success_and_names() {
        assert!(S::FirstOrder.is_success());
        assert!(S::Acceptable.is_success());
        assert!(!S::Stalled.is_success());
        assert_eq!(S::from(-504).as_str(), "exception");
        assert_eq!(S::MaxIter.to_string(), "maximum number of iterations");
    }
}
