//! Integration tests for Error types
//!
//! Tests error construction, display, context, and error kinds.

use concord_foundation::{Error, ErrorContext, ErrorKind, SemanticLimit};

#[test]
fn error_invalid_rule() {
    let err = Error::invalid_rule("BlockUserRequest", "no trigger patterns");
    assert!(matches!(err.kind, ErrorKind::InvalidRule { .. }));
    let msg = format!("{err}");
    assert!(msg.contains("BlockUserRequest"));
    assert!(msg.contains("no trigger patterns"));
}

#[test]
fn error_unknown_flow() {
    let err = Error::unknown_flow(7);
    assert!(matches!(err.kind, ErrorKind::UnknownFlow(7)));
    assert_eq!(format!("{err}"), "unknown flow: 7");
}

#[test]
fn error_step_limit() {
    let err = Error::limit_exceeded(SemanticLimit::MaxSteps {
        limit: 100,
        context: Some("Requesting.respond".to_string()),
    });
    let msg = format!("{err}");
    assert!(msg.contains("100"));
    assert!(msg.contains("Requesting.respond"));
}

#[test]
fn context_display() {
    let ctx = ErrorContext::new()
        .with_rule("LogoutRequest")
        .with_action("Sessioning.delete")
        .with_frame("LoginResponseSuccess");
    let shown = format!("{ctx}");
    assert!(shown.starts_with("in rule LogoutRequest at Sessioning.delete"));
    assert!(shown.contains("via LoginResponseSuccess"));
}
