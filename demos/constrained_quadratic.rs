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

//! Hock-Schittkowski problem 71:
//!
//! ```text
//! min  x1 x4 (x1 + x2 + x3) + x3
//! s.t. x1 x2 x3 x4 >= 25
//!      x1² + x2² + x3² + x4² = 40
//!      1 <= x <= 5
//! ```
//!
//! Run with `cargo run --example constrained_quadratic`, or add `--features knitro` to solve it
//! with Knitro.

use nlp_adapter::session::Backend;
use nlp_adapter::*;

struct Hs071 {
    meta: ModelMeta,
}

impl Hs071 {
    fn new() -> Self {
        Hs071 {
            meta: ModelMeta::new(vec![1.0, 5.0, 5.0, 1.0])
                .with_bounds(vec![1.0; 4], vec![5.0; 4])
                .with_constraints(vec![25.0, 40.0], vec![Number::INFINITY, 40.0])
                .with_nnzj(8)
                .with_nnzh(10)
                .named("hs071"),
        }
    }
}

impl NlpModel for Hs071 {
    fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    fn obj(&self, x: &[Number], f: &mut Number) -> bool {
        *f = x[0] * x[3] * (x[0] + x[1] + x[2]) + x[2];
        true
    }

    fn grad(&self, x: &[Number], g: &mut [Number]) -> bool {
        g[0] = x[3] * (2.0 * x[0] + x[1] + x[2]);
        g[1] = x[0] * x[3];
        g[2] = x[0] * x[3] + 1.0;
        g[3] = x[0] * (x[0] + x[1] + x[2]);
        true
    }

    fn cons(&self, x: &[Number], c: &mut [Number]) -> bool {
        c[0] = x.iter().product();
        c[1] = x.iter().map(|xi| xi * xi).sum();
        true
    }

    fn jac_structure(&self, rows: &mut [Index], cols: &mut [Index]) {
        for k in 0..8 {
            rows[k] = (k / 4 + 1) as Index;
            cols[k] = (k % 4 + 1) as Index;
        }
    }

    fn jac_coord(&self, x: &[Number], vals: &mut [Number]) -> bool {
        vals[0] = x[1] * x[2] * x[3];
        vals[1] = x[0] * x[2] * x[3];
        vals[2] = x[0] * x[1] * x[3];
        vals[3] = x[0] * x[1] * x[2];
        for j in 0..4 {
            vals[4 + j] = 2.0 * x[j];
        }
        true
    }

    fn hess_structure(&self, rows: &mut [Index], cols: &mut [Index]) {
        // Dense lower triangle, row by row.
        let mut k = 0;
        for r in 1..=4 {
            for c in 1..=r {
                rows[k] = r;
                cols[k] = c;
                k += 1;
            }
        }
    }

    fn hess_coord(&self, x: &[Number], y: &[Number], w: Number, vals: &mut [Number]) -> bool {
        vals[0] = w * 2.0 * x[3] + y[1] * 2.0;
        vals[1] = w * x[3] + y[0] * x[2] * x[3];
        vals[2] = y[1] * 2.0;
        vals[3] = w * x[3] + y[0] * x[1] * x[3];
        vals[4] = y[0] * x[0] * x[3];
        vals[5] = y[1] * 2.0;
        vals[6] = w * (2.0 * x[0] + x[1] + x[2]) + y[0] * x[1] * x[2];
        vals[7] = w * x[0] + y[0] * x[0] * x[2];
        vals[8] = w * x[0] + y[0] * x[0] * x[1];
        vals[9] = y[1] * 2.0;
        true
    }
}

fn backend() -> Box<dyn Backend> {
    #[cfg(feature = "knitro")]
    {
        Box::new(nlp_adapter::knitro::Knitro)
    }
    #[cfg(not(feature = "knitro"))]
    {
        Box::new(InteriorPoint)
    }
}

fn main() {
    let model = Hs071::new();
    let backend = backend();

    let opts = SolveOptions::new()
        .param("outlev", 0)
        .param("opttol", 1e-8)
        .callback(|data| {
            println!("{:>4}  x = {:?}", data.iteration, data.x);
            true
        });

    match solve(&*backend, &model, opts) {
        Ok(report) => {
            println!("status:      {} ({})", report.status, report.status.as_str());
            println!("solution:    {:?}", report.solution);
            println!("objective:   {}", report.objective);
            println!("multipliers: {:?}", report.constraint_multipliers);
            println!("iterations:  {}", report.iterations);
        }
        Err(err) => eprintln!("{}", err),
    }
}
