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

//! Raw declarations for the subset of the Knitro callback API (`knitro.h`) used to drive a solve
//! from user supplied evaluation callbacks.
//!
//! Only the functions needed to register variables, constraints, residuals, bounds, initial
//! values, callbacks and parameters, run a solve and query its result are declared here.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use std::os::raw::{c_char, c_double, c_int, c_longlong, c_void};

pub type KNINT = c_int;
pub type KNBOOL = KNINT;
pub type KNLONG = c_longlong;

/// Opaque solver context.
#[repr(C)]
pub struct KN_context {
    _private: [u8; 0],
}
pub type KN_context_ptr = *mut KN_context;

/// Opaque callback context returned when a callback is registered.
#[repr(C)]
pub struct CB_context {
    _private: [u8; 0],
}
pub type CB_context_ptr = *mut CB_context;

/// Information passed to an evaluation callback. `type_` is one of the `KN_RC_EVAL*` codes.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct KN_eval_request {
    pub type_: c_int,
    pub threadID: c_int,
    pub x: *const c_double,
    pub lambda: *const c_double,
    pub sigma: *const c_double,
    pub vec: *const c_double,
}
pub type KN_eval_request_ptr = *mut KN_eval_request;

/// Output buffers of an evaluation callback. Only the buffers relevant to the request are valid.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct KN_eval_result {
    pub obj: *mut c_double,
    pub c: *mut c_double,
    pub objGrad: *mut c_double,
    pub jac: *mut c_double,
    pub hess: *mut c_double,
    pub hessVec: *mut c_double,
    pub rsd: *mut c_double,
    pub rsdJac: *mut c_double,
}
pub type KN_eval_result_ptr = *mut KN_eval_result;

pub type KN_eval_callback = Option<
    unsafe extern "C" fn(
        kc: KN_context_ptr,
        cb: CB_context_ptr,
        evalRequest: KN_eval_request_ptr,
        evalResult: KN_eval_result_ptr,
        userParams: *mut c_void,
    ) -> c_int,
>;

pub type KN_user_callback = Option<
    unsafe extern "C" fn(
        kc: KN_context_ptr,
        x: *const c_double,
        lambda: *const c_double,
        userParams: *mut c_void,
    ) -> c_int,
>;

pub const KN_INFINITY: c_double = 1.0e20;

pub const KN_OBJGOAL_MINIMIZE: c_int = 0;
pub const KN_OBJGOAL_MAXIMIZE: c_int = 1;

/// Passed as the number of gradient non-zeros to request a dense objective gradient.
pub const KN_DENSE: KNINT = -1;

pub const KN_RC_EVALFC: c_int = 1;
pub const KN_RC_EVALGA: c_int = 2;
pub const KN_RC_EVALH: c_int = 3;
pub const KN_RC_EVALHV: c_int = 7;
pub const KN_RC_EVALH_NO_F: c_int = 8;
pub const KN_RC_EVALHV_NO_F: c_int = 9;
pub const KN_RC_EVALR: c_int = 10;
pub const KN_RC_EVALRJ: c_int = 11;

pub const KN_RC_CALLBACK_ERR: c_int = -500;
pub const KN_RC_EVAL_ERR: c_int = -502;
pub const KN_RC_USER_TERMINATION: c_int = -504;

extern "C" {
    pub fn KN_new(kc: *mut KN_context_ptr) -> c_int;
    pub fn KN_free(kc: *mut KN_context_ptr) -> c_int;
    pub fn KN_reset_params_to_defaults(kc: KN_context_ptr) -> c_int;

    pub fn KN_set_int_param_by_name(kc: KN_context_ptr, name: *const c_char, value: c_int)
        -> c_int;
    pub fn KN_set_char_param_by_name(
        kc: KN_context_ptr,
        name: *const c_char,
        value: *const c_char,
    ) -> c_int;
    pub fn KN_set_double_param_by_name(
        kc: KN_context_ptr,
        name: *const c_char,
        value: c_double,
    ) -> c_int;

    pub fn KN_set_obj_goal(kc: KN_context_ptr, objGoal: c_int) -> c_int;

    pub fn KN_add_vars(kc: KN_context_ptr, nV: KNINT, indexVars: *mut KNINT) -> c_int;
    pub fn KN_set_var_lobnds_all(kc: KN_context_ptr, xLoBnds: *const c_double) -> c_int;
    pub fn KN_set_var_upbnds_all(kc: KN_context_ptr, xUpBnds: *const c_double) -> c_int;

    pub fn KN_add_cons(kc: KN_context_ptr, nC: KNINT, indexCons: *mut KNINT) -> c_int;
    pub fn KN_set_con_lobnds_all(kc: KN_context_ptr, cLoBnds: *const c_double) -> c_int;
    pub fn KN_set_con_upbnds_all(kc: KN_context_ptr, cUpBnds: *const c_double) -> c_int;

    pub fn KN_add_rsds(kc: KN_context_ptr, nR: KNINT, indexRsds: *mut KNINT) -> c_int;

    pub fn KN_set_var_primal_init_values_all(kc: KN_context_ptr, xInitVals: *const c_double)
        -> c_int;
    pub fn KN_set_var_dual_init_values_all(
        kc: KN_context_ptr,
        lambdaInitVals: *const c_double,
    ) -> c_int;
    pub fn KN_set_con_dual_init_values_all(
        kc: KN_context_ptr,
        lambdaInitVals: *const c_double,
    ) -> c_int;

    pub fn KN_add_eval_callback_all(
        kc: KN_context_ptr,
        funcCallback: KN_eval_callback,
        cb: *mut CB_context_ptr,
    ) -> c_int;
    pub fn KN_set_cb_grad(
        kc: KN_context_ptr,
        cb: CB_context_ptr,
        nV: KNINT,
        objGradIndexVars: *const KNINT,
        nnzJ: KNLONG,
        jacIndexCons: *const KNINT,
        jacIndexVars: *const KNINT,
        gradCallback: KN_eval_callback,
    ) -> c_int;
    pub fn KN_set_cb_hess(
        kc: KN_context_ptr,
        cb: CB_context_ptr,
        nnzH: KNLONG,
        hessIndexVars1: *const KNINT,
        hessIndexVars2: *const KNINT,
        hessCallback: KN_eval_callback,
    ) -> c_int;

    pub fn KN_add_lsq_eval_callback_all(
        kc: KN_context_ptr,
        rsdCallback: KN_eval_callback,
        cb: *mut CB_context_ptr,
    ) -> c_int;
    pub fn KN_set_cb_rsd_jac(
        kc: KN_context_ptr,
        cb: CB_context_ptr,
        nnzJ: KNLONG,
        jacIndexRsds: *const KNINT,
        jacIndexVars: *const KNINT,
        rsdJacCallback: KN_eval_callback,
    ) -> c_int;

    pub fn KN_set_cb_user_params(
        kc: KN_context_ptr,
        cb: CB_context_ptr,
        userParams: *mut c_void,
    ) -> c_int;
    pub fn KN_set_newpt_callback(
        kc: KN_context_ptr,
        fnPtr: KN_user_callback,
        userParams: *mut c_void,
    ) -> c_int;

    pub fn KN_solve(kc: KN_context_ptr) -> c_int;

    pub fn KN_get_solution(
        kc: KN_context_ptr,
        status: *mut c_int,
        obj: *mut c_double,
        x: *mut c_double,
        lambda: *mut c_double,
    ) -> c_int;
    pub fn KN_get_number_iters(kc: KN_context_ptr, numIters: *mut c_int) -> c_int;
    pub fn KN_get_abs_feas_error(kc: KN_context_ptr, absFeasError: *mut c_double) -> c_int;
    pub fn KN_get_abs_opt_error(kc: KN_context_ptr, absOptError: *mut c_double) -> c_int;
    pub fn KN_get_solve_time_cpu(kc: KN_context_ptr, time: *mut c_double) -> c_int;
    pub fn KN_get_solve_time_real(kc: KN_context_ptr, time: *mut c_double) -> c_int;
}
