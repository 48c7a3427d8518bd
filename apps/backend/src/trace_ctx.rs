//! Task-local trace context for turn-processing requests.
//!
//! This module provides a minimal API for accessing the current request's
//! trace_id from anywhere in the processing pipeline. It uses Tokio's
//! task-local storage to maintain the trace_id for the lifetime of one
//! request. Service entry points establish the scope from the caller's
//! request id; everything below just reads it.

use std::cell::RefCell;

use tokio::task_local;

task_local! {
    static TRACE_ID: RefCell<Option<String>>;
}

/// Get the trace_id for the current task.
/// Returns "unknown" if no trace_id is set (e.g., outside of a request context).
pub fn trace_id() -> String {
    TRACE_ID
        .try_with(|cell| {
            cell.borrow()
                .as_ref()
                .cloned()
                .unwrap_or_else(|| "unknown".to_string())
        })
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Run a future within a trace context.
/// Service entry points use this to establish the task-local scope.
pub async fn with_trace_id<F, R>(trace_id: String, future: F) -> R
where
    F: std::future::Future<Output = R>,
{
    TRACE_ID.scope(RefCell::new(Some(trace_id)), future).await
}
