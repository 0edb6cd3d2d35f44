#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use cmdbx_core::errors::{CoreError, ExErrorKind};
use cmdbx_core::logging_facility::test_capture::init_test_capture;
use cmdbx_core::{log_op_end, log_op_error, log_op_start};
use cmdbx_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use cmdbx_core_types::RequestContext;
use common::{fields, seeded_service};
use serde_json::json;

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name, tenant = "acme");

    let events = capture.events();
    let start = events
        .iter()
        .find(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_START))
        .expect("start event");
    assert_eq!(start.field("tenant"), Some("acme"));
}

#[test]
fn test_log_op_end_records_duration() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42);

    let ends: Vec<_> = capture
        .events()
        .into_iter()
        .filter(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END))
        .collect();
    assert_eq!(ends.len(), 1);
    assert_eq!(ends[0].field("duration_ms"), Some("42"));
}

#[test]
fn test_macros_usable_as_match_arms() {
    let capture = init_test_capture();
    let op_name = "test_log_macros_match_arm_unique_4";

    let outcome: Result<u64, CoreError> = Ok(3);
    match &outcome {
        Ok(count) => log_op_end!(op_name, duration_ms = 1, result_count = *count),
        Err(_) => log_op_start!(op_name),
    }

    capture.assert_event_exists(op_name, EVENT_END);
}

#[test]
fn test_log_op_error_includes_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    let err = CoreError::InvalidInstanceId {
        raw: "x".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 10);

    let events = capture.events();
    let error = events
        .iter()
        .find(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("end_error event");
    assert_eq!(
        error.field("err.code"),
        Some(ExErrorKind::ValidationFailed.code())
    );

    // the error is still usable after logging
    assert!(matches!(err, CoreError::InvalidInstanceId { .. }));
}

#[test]
fn test_service_logs_start_and_end_once() {
    let capture = init_test_capture();
    let (_store, service) = seeded_service();
    let ctx = RequestContext::new();
    let request_id = ctx.request_id.to_string();

    service
        .create_instance(&ctx, "acme", "host", fields(json!({"ip": "10.0.0.9"})))
        .unwrap();

    let events = capture.events_where("create_instance", "request_id", &request_id);
    let starts = events
        .iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_START))
        .count();
    let ends = events
        .iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_END))
        .count();
    assert_eq!((starts, ends), (1, 1));
}

#[test]
fn test_service_logs_error_event_on_failure() {
    let capture = init_test_capture();
    let (_store, service) = seeded_service();
    let ctx = RequestContext::new();
    let request_id = ctx.request_id.to_string();

    let _ = service.search_instances(
        &ctx,
        "acme",
        "host",
        &json!({"condition": {"owner_id": "globex"}}),
    );

    let events = capture.events_where("search_instances", "request_id", &request_id);
    let error = events
        .iter()
        .find(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("end_error event");
    assert_eq!(
        error.field("err.code"),
        Some(ExErrorKind::MalformedFilter.code())
    );
    assert!(!events.iter().any(|e| e.event.as_deref() == Some(EVENT_END)));
}
