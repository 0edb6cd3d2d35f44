//! Canonical logging macros
//!
//! Every top-level instance operation logs exactly one start event and one
//! end (or end_error) event through these macros.

/// Log the start of an operation
///
/// ```
/// # use cmdbx_core::log_op_start;
/// log_op_start!("search_instances");
/// log_op_start!("search_instances", tenant = "acme", obj_id = "host");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {{
        $crate::tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::cmdbx_core_types::schema::EVENT_START,
        );
    }};
    ($op:expr, $($field:tt)*) => {{
        $crate::tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::cmdbx_core_types::schema::EVENT_START,
            $($field)*
        );
    }};
}

/// Log the successful end of an operation
///
/// ```
/// # use cmdbx_core::log_op_end;
/// log_op_end!("search_instances", duration_ms = 3, result_count = 12);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {{
        $crate::tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::cmdbx_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    }};
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        $crate::tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::cmdbx_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    }};
}

/// Log an operation error
///
/// Accepts anything convertible into `ExError` and only borrows it, so the
/// caller can still return the error afterwards.
///
/// ```
/// # use cmdbx_core::{log_op_error, errors::CoreError};
/// let err = CoreError::EmptyTenant;
/// log_op_error!("search_instances", err, duration_ms = 1);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let ex_err: $crate::errors::ExError =
            ::core::convert::Into::into(::core::clone::Clone::clone(&$err));
        $crate::tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::cmdbx_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?ex_err.kind(),
            err.code = ex_err.code(),
            err.message = %ex_err,
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let ex_err: $crate::errors::ExError =
            ::core::convert::Into::into(::core::clone::Clone::clone(&$err));
        $crate::tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::cmdbx_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?ex_err.kind(),
            err.code = ex_err.code(),
            err.message = %ex_err,
            $($field)*
        );
    }};
}
