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

//! Backend driving the Knitro callable library.
//!
//! The library must be installed and located through the `KNITRODIR` environment variable at
//! build time; see the `knitro-sys` crate.

use std::ffi::CString;
use std::os::raw::{c_double, c_int, c_void};
use std::{ptr, slice};

use knitro_sys as ffi;

use crate::error::{CallbackError, SessionError};
use crate::model::Triangle;
use crate::options::{IterationCallback, Value};
use crate::session::{
    rc, request, Backend, EvalCallback, EvalRequest, EvalResult, EvalStructure, Goal,
    IterationData, RawSolution, ResidualStructure, Session,
};
use crate::{Int, Number};

/// Backend creating one Knitro context per session.
#[derive(Copy, Clone, Debug, Default)]
pub struct Knitro;

impl Backend for Knitro {
    fn name(&self) -> &str {
        "knitro"
    }

    fn create<'a>(&self) -> Result<Box<dyn Session<'a> + 'a>, SessionError> {
        let mut kc: ffi::KN_context_ptr = ptr::null_mut();
        check("KN_new", unsafe { ffi::KN_new(&mut kc) })?;
        if kc.is_null() {
            return Err(SessionError::new("KN_new", rc::INTERNAL_ERROR));
        }
        Ok(Box::new(KnitroSession::new(kc)))
    }
}

fn check(call: &'static str, code: c_int) -> Result<(), SessionError> {
    if code == 0 {
        Ok(())
    } else {
        Err(SessionError::new(call, code))
    }
}

/// Everything the library calls back into. Boxed so that its address stays fixed while it is
/// registered as user data.
#[derive(Default)]
struct CallbackState<'a> {
    n: usize,
    m: usize,
    nequ: usize,
    nnzj: usize,
    nnzh: usize,
    rsd_nnzj: usize,
    eval: Option<EvalCallback<'a>>,
    residual: Option<EvalCallback<'a>>,
    rsd_jacobian: Option<EvalCallback<'a>>,
    newpt: Option<IterationCallback<'a>>,
    iteration: usize,
}

/// A Knitro context together with the callbacks registered on it.
pub struct KnitroSession<'a> {
    kc: ffi::KN_context_ptr,
    state: Box<CallbackState<'a>>,
    /// Code of the first parameter the library rejected.
    param_error: Option<Int>,
    status: Option<Int>,
}

impl<'a> KnitroSession<'a> {
    fn new(kc: ffi::KN_context_ptr) -> Self {
        KnitroSession {
            kc,
            state: Box::default(),
            param_error: None,
            status: None,
        }
    }

    fn user_params(&mut self) -> *mut c_void {
        &mut *self.state as *mut CallbackState<'a> as *mut c_void
    }

    fn all(call: &'static str, expected: usize, v: &[Number]) -> Result<(), SessionError> {
        if v.len() == expected {
            Ok(())
        } else {
            log::error!("{}: expected {} values, got {}", call, expected, v.len());
            Err(SessionError::new(call, rc::ILLEGAL_CALL))
        }
    }

    fn set_param_raw(&mut self, name: &str, value: &Value) -> c_int {
        let Ok(name) = CString::new(name) else {
            return rc::BAD_PARAMINPUT;
        };
        unsafe {
            match value {
                Value::Int(i) => match c_int::try_from(*i) {
                    Ok(i) => ffi::KN_set_int_param_by_name(self.kc, name.as_ptr(), i),
                    Err(_) => rc::BAD_PARAMINPUT,
                },
                Value::Bool(b) => ffi::KN_set_int_param_by_name(self.kc, name.as_ptr(), *b as c_int),
                Value::Num(x) => ffi::KN_set_double_param_by_name(self.kc, name.as_ptr(), *x),
                Value::Str(s) => match CString::new(s.as_str()) {
                    Ok(s) => ffi::KN_set_char_param_by_name(self.kc, name.as_ptr(), s.as_ptr()),
                    Err(_) => rc::BAD_PARAMINPUT,
                },
            }
        }
    }

    fn get_number(&self, call: &'static str, getter: unsafe extern "C" fn(ffi::KN_context_ptr, *mut c_double) -> c_int) -> Option<Number> {
        let mut value = 0.0;
        let code = unsafe { getter(self.kc, &mut value) };
        if code == 0 {
            Some(value)
        } else {
            log::warn!("{} failed with return code {}", call, code);
            None
        }
    }
}

unsafe fn slice_or_empty<'s>(p: *const c_double, len: usize) -> &'s [Number] {
    if p.is_null() || len == 0 {
        &[]
    } else {
        slice::from_raw_parts(p, len)
    }
}

unsafe fn slice_mut_or_empty<'s>(p: *mut c_double, len: usize) -> &'s mut [Number] {
    if p.is_null() || len == 0 {
        &mut []
    } else {
        slice::from_raw_parts_mut(p, len)
    }
}

unsafe extern "C" fn eval_trampoline(
    _kc: ffi::KN_context_ptr,
    _cb: ffi::CB_context_ptr,
    eval_request: ffi::KN_eval_request_ptr,
    eval_result: ffi::KN_eval_result_ptr,
    user_params: *mut c_void,
) -> c_int {
    let state = &mut *(user_params as *mut CallbackState);
    let req = &*eval_request;
    let res = &mut *eval_result;
    let code = req.type_;
    let (n, m) = (state.n, state.m);

    let callback = match code {
        request::EVAL_R => state.residual.as_mut(),
        request::EVAL_RJ => state.rsd_jacobian.as_mut(),
        _ => state.eval.as_mut(),
    };
    let Some(callback) = callback else {
        return ffi::KN_RC_CALLBACK_ERR;
    };

    let mut unused_obj = 0.0;
    let obj = if res.obj.is_null() {
        &mut unused_obj
    } else {
        &mut *res.obj
    };
    let mut out = EvalResult::new(obj);
    match code {
        request::EVAL_FC => out.c = slice_mut_or_empty(res.c, m),
        request::EVAL_GA => {
            out.obj_grad = slice_mut_or_empty(res.objGrad, n);
            out.jac = slice_mut_or_empty(res.jac, state.nnzj);
        }
        request::EVAL_H | request::EVAL_H_NO_F => {
            out.hess = slice_mut_or_empty(res.hess, state.nnzh)
        }
        request::EVAL_HV | request::EVAL_HV_NO_F => {
            out.hess_vec = slice_mut_or_empty(res.hessVec, n)
        }
        request::EVAL_R => out.rsd = slice_mut_or_empty(res.rsd, state.nequ),
        request::EVAL_RJ => out.rsd_jac = slice_mut_or_empty(res.rsdJac, state.rsd_nnzj),
        _ => {}
    }

    let product = matches!(code, request::EVAL_HV | request::EVAL_HV_NO_F);
    let request = EvalRequest {
        code,
        x: slice_or_empty(req.x, n),
        lambda: slice_or_empty(req.lambda, m + n),
        sigma: if req.sigma.is_null() { 0.0 } else { *req.sigma },
        vec: if product { slice_or_empty(req.vec, n) } else { &[] },
    };

    match callback(&request, &mut out) {
        Ok(()) => 0,
        Err(CallbackError::EvalFailed) => ffi::KN_RC_EVAL_ERR,
        Err(CallbackError::UnknownRequest(code)) => {
            log::error!("evaluation callback cannot answer request {}", code);
            ffi::KN_RC_CALLBACK_ERR
        }
    }
}

unsafe extern "C" fn newpt_trampoline(
    _kc: ffi::KN_context_ptr,
    x: *const c_double,
    lambda: *const c_double,
    user_params: *mut c_void,
) -> c_int {
    let state = &mut *(user_params as *mut CallbackState);
    state.iteration += 1;
    let (n, m, iteration) = (state.n, state.m, state.iteration);
    let Some(callback) = state.newpt.as_mut() else {
        return 0;
    };
    let data = IterationData {
        iteration,
        x: slice_or_empty(x, n),
        lambda: slice_or_empty(lambda, m + n),
    };
    if callback(&data) {
        0
    } else {
        ffi::KN_RC_USER_TERMINATION
    }
}

impl<'a> Session<'a> for KnitroSession<'a> {
    fn infinity(&self) -> Number {
        ffi::KN_INFINITY
    }

    fn hessian_triangle(&self) -> Triangle {
        Triangle::Upper
    }

    fn set_objective_goal(&mut self, goal: Goal) -> Result<(), SessionError> {
        let goal = match goal {
            Goal::Minimize => ffi::KN_OBJGOAL_MINIMIZE,
            Goal::Maximize => ffi::KN_OBJGOAL_MAXIMIZE,
        };
        check("KN_set_obj_goal", unsafe { ffi::KN_set_obj_goal(self.kc, goal) })
    }

    fn add_vars(&mut self, n: usize) -> Result<(), SessionError> {
        check("KN_add_vars", unsafe {
            ffi::KN_add_vars(self.kc, n as ffi::KNINT, ptr::null_mut())
        })?;
        self.state.n += n;
        Ok(())
    }

    fn set_var_lower_bounds(&mut self, lb: &[Number]) -> Result<(), SessionError> {
        Self::all("KN_set_var_lobnds_all", self.state.n, lb)?;
        check("KN_set_var_lobnds_all", unsafe {
            ffi::KN_set_var_lobnds_all(self.kc, lb.as_ptr())
        })
    }

    fn set_var_upper_bounds(&mut self, ub: &[Number]) -> Result<(), SessionError> {
        Self::all("KN_set_var_upbnds_all", self.state.n, ub)?;
        check("KN_set_var_upbnds_all", unsafe {
            ffi::KN_set_var_upbnds_all(self.kc, ub.as_ptr())
        })
    }

    fn add_cons(&mut self, m: usize) -> Result<(), SessionError> {
        if m == 0 {
            return Ok(());
        }
        check("KN_add_cons", unsafe {
            ffi::KN_add_cons(self.kc, m as ffi::KNINT, ptr::null_mut())
        })?;
        self.state.m += m;
        Ok(())
    }

    fn set_con_lower_bounds(&mut self, lb: &[Number]) -> Result<(), SessionError> {
        Self::all("KN_set_con_lobnds_all", self.state.m, lb)?;
        check("KN_set_con_lobnds_all", unsafe {
            ffi::KN_set_con_lobnds_all(self.kc, lb.as_ptr())
        })
    }

    fn set_con_upper_bounds(&mut self, ub: &[Number]) -> Result<(), SessionError> {
        Self::all("KN_set_con_upbnds_all", self.state.m, ub)?;
        check("KN_set_con_upbnds_all", unsafe {
            ffi::KN_set_con_upbnds_all(self.kc, ub.as_ptr())
        })
    }

    fn add_residuals(&mut self, ne: usize) -> Result<(), SessionError> {
        check("KN_add_rsds", unsafe {
            ffi::KN_add_rsds(self.kc, ne as ffi::KNINT, ptr::null_mut())
        })?;
        self.state.nequ += ne;
        Ok(())
    }

    fn set_var_primal_init_values(&mut self, x0: &[Number]) -> Result<(), SessionError> {
        Self::all("KN_set_var_primal_init_values_all", self.state.n, x0)?;
        check("KN_set_var_primal_init_values_all", unsafe {
            ffi::KN_set_var_primal_init_values_all(self.kc, x0.as_ptr())
        })
    }

    fn set_con_dual_init_values(&mut self, y0: &[Number]) -> Result<(), SessionError> {
        Self::all("KN_set_con_dual_init_values_all", self.state.m, y0)?;
        check("KN_set_con_dual_init_values_all", unsafe {
            ffi::KN_set_con_dual_init_values_all(self.kc, y0.as_ptr())
        })
    }

    fn set_var_dual_init_values(&mut self, z0: &[Number]) -> Result<(), SessionError> {
        Self::all("KN_set_var_dual_init_values_all", self.state.n, z0)?;
        check("KN_set_var_dual_init_values_all", unsafe {
            ffi::KN_set_var_dual_init_values_all(self.kc, z0.as_ptr())
        })
    }

    fn set_eval_callback(
        &mut self,
        structure: EvalStructure,
        callback: EvalCallback<'a>,
    ) -> Result<(), SessionError> {
        let mut cb: ffi::CB_context_ptr = ptr::null_mut();
        check("KN_add_eval_callback_all", unsafe {
            ffi::KN_add_eval_callback_all(self.kc, Some(eval_trampoline), &mut cb)
        })?;

        let nnzj = structure.jac_rows.len();
        let nnzh = structure.hess_rows.len();
        check("KN_set_cb_grad", unsafe {
            ffi::KN_set_cb_grad(
                self.kc,
                cb,
                ffi::KN_DENSE,
                ptr::null(),
                nnzj as ffi::KNLONG,
                if nnzj > 0 { structure.jac_rows.as_ptr() } else { ptr::null() },
                if nnzj > 0 { structure.jac_cols.as_ptr() } else { ptr::null() },
                Some(eval_trampoline),
            )
        })?;
        check("KN_set_cb_hess", unsafe {
            ffi::KN_set_cb_hess(
                self.kc,
                cb,
                nnzh as ffi::KNLONG,
                if nnzh > 0 { structure.hess_rows.as_ptr() } else { ptr::null() },
                if nnzh > 0 { structure.hess_cols.as_ptr() } else { ptr::null() },
                Some(eval_trampoline),
            )
        })?;

        let user_params = self.user_params();
        check("KN_set_cb_user_params", unsafe {
            ffi::KN_set_cb_user_params(self.kc, cb, user_params)
        })?;

        self.state.nnzj = nnzj;
        self.state.nnzh = nnzh;
        self.state.eval = Some(callback);
        Ok(())
    }

    fn set_lsq_callbacks(
        &mut self,
        structure: ResidualStructure,
        residual: EvalCallback<'a>,
        jacobian: EvalCallback<'a>,
    ) -> Result<(), SessionError> {
        let mut cb: ffi::CB_context_ptr = ptr::null_mut();
        check("KN_add_lsq_eval_callback_all", unsafe {
            ffi::KN_add_lsq_eval_callback_all(self.kc, Some(eval_trampoline), &mut cb)
        })?;

        let nnz = structure.jac_rows.len();
        check("KN_set_cb_rsd_jac", unsafe {
            ffi::KN_set_cb_rsd_jac(
                self.kc,
                cb,
                nnz as ffi::KNLONG,
                if nnz > 0 { structure.jac_rows.as_ptr() } else { ptr::null() },
                if nnz > 0 { structure.jac_cols.as_ptr() } else { ptr::null() },
                Some(eval_trampoline),
            )
        })?;

        let user_params = self.user_params();
        check("KN_set_cb_user_params", unsafe {
            ffi::KN_set_cb_user_params(self.kc, cb, user_params)
        })?;

        self.state.rsd_nnzj = nnz;
        self.state.residual = Some(residual);
        self.state.rsd_jacobian = Some(jacobian);
        Ok(())
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<(), SessionError> {
        let code = self.set_param_raw(name, value);
        if code != 0 {
            log::warn!("Knitro rejected parameter {} = {} ({})", name, value, code);
            self.param_error.get_or_insert(code);
        }
        Ok(())
    }

    fn set_iteration_callback(
        &mut self,
        callback: IterationCallback<'a>,
    ) -> Result<(), SessionError> {
        let user_params = self.user_params();
        check("KN_set_newpt_callback", unsafe {
            ffi::KN_set_newpt_callback(self.kc, Some(newpt_trampoline), user_params)
        })?;
        self.state.newpt = Some(callback);
        Ok(())
    }

    fn solve(&mut self) -> Int {
        let status = match self.param_error {
            Some(code) => code,
            None => unsafe { ffi::KN_solve(self.kc) },
        };
        self.status = Some(status);
        status
    }

    fn solution(&self) -> RawSolution {
        let n = self.state.n;
        let m = self.state.m;
        let mut solution = RawSolution {
            status: self.status.unwrap_or(rc::ILLEGAL_CALL),
            objective: Number::NAN,
            x: vec![0.0; n],
            lambda: vec![0.0; m + n],
        };
        if self.param_error.is_some() || self.status.is_none() {
            return solution;
        }

        let mut status: c_int = 0;
        let code = unsafe {
            ffi::KN_get_solution(
                self.kc,
                &mut status,
                &mut solution.objective,
                solution.x.as_mut_ptr(),
                solution.lambda.as_mut_ptr(),
            )
        };
        if code == 0 {
            solution.status = status;
        } else {
            log::warn!("KN_get_solution failed with return code {}", code);
        }
        solution
    }

    fn abs_feas_error(&self) -> Number {
        self.get_number("KN_get_abs_feas_error", ffi::KN_get_abs_feas_error)
            .unwrap_or(Number::NAN)
    }

    fn abs_opt_error(&self) -> Number {
        self.get_number("KN_get_abs_opt_error", ffi::KN_get_abs_opt_error)
            .unwrap_or(Number::NAN)
    }

    fn number_iters(&self) -> usize {
        let mut iters: c_int = 0;
        let code = unsafe { ffi::KN_get_number_iters(self.kc, &mut iters) };
        if code == 0 {
            iters.max(0) as usize
        } else {
            log::warn!("KN_get_number_iters failed with return code {}", code);
            0
        }
    }

    fn solve_time_cpu(&self) -> Option<Number> {
        self.get_number("KN_get_solve_time_cpu", ffi::KN_get_solve_time_cpu)
    }

    fn solve_time_real(&self) -> Option<Number> {
        self.get_number("KN_get_solve_time_real", ffi::KN_get_solve_time_real)
    }

    fn reset_params_to_defaults(&mut self) -> Result<(), SessionError> {
        self.param_error = None;
        check("KN_reset_params_to_defaults", unsafe {
            ffi::KN_reset_params_to_defaults(self.kc)
        })
    }
}

impl Drop for KnitroSession<'_> {
    fn drop(&mut self) {
        unsafe {
            ffi::KN_free(&mut self.kc);
        }
    }
}
