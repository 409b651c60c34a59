use std::path::PathBuf;

use blacklock::error::{exit_codes, Error, ImportIssue, JsonError};
use serde_json::Value;

#[test]
fn exit_code_user_error() {
    let err = Error::TaskNotFound("t1".to_string());
    assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    let err = Error::InvalidBackup(ImportIssue::MissingVersion);
    assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
}

#[test]
fn exit_code_policy_blocked() {
    let err = Error::CannotDeleteDefault("work".to_string());
    assert_eq!(err.exit_code(), exit_codes::POLICY_BLOCKED);
    let err = Error::AccountExists("hero".to_string());
    assert_eq!(err.exit_code(), exit_codes::POLICY_BLOCKED);
}

#[test]
fn exit_code_operation_failed() {
    let err = Error::CorruptDocument {
        name: "tasks.json".to_string(),
        reason: "not JSON".to_string(),
    };
    assert_eq!(err.exit_code(), exit_codes::OPERATION_FAILED);
    let err = Error::LockFailed(PathBuf::from("tasks.json.lock"));
    assert_eq!(err.exit_code(), exit_codes::OPERATION_FAILED);
}

#[test]
fn details_include_corrupt_document_fields() {
    let err = Error::CorruptDocument {
        name: "tasks.json".to_string(),
        reason: "unexpected shape".to_string(),
    };
    let details = err.details().expect("details");
    assert_eq!(details["document"], Value::String("tasks.json".to_string()));
    assert_eq!(details["reason"], Value::String("unexpected shape".to_string()));
}

#[test]
fn json_error_includes_import_issue() {
    let err = Error::InvalidBackup(ImportIssue::MissingData);
    let json = JsonError::from(&err);
    assert_eq!(json.code, exit_codes::USER_ERROR);
    assert_eq!(json.message, "Invalid backup format: missing 'data' field");
    assert_eq!(json.kind, "user_error");
    let details = json.details.expect("details");
    assert_eq!(details["issue"], Value::String("missing 'data' field".to_string()));
}

#[test]
fn json_error_omits_empty_details() {
    let json = JsonError::from(&Error::AccountNotFound);
    let rendered = serde_json::to_value(&json).expect("serialize");
    assert!(rendered.get("details").is_none());
    assert_eq!(rendered["code"], Value::from(exit_codes::USER_ERROR));
}

#[test]
fn kind_follows_exit_code() {
    assert_eq!(Error::AccountNotFound.kind(), "user_error");
    assert_eq!(
        Error::CannotDeleteDefault("work".to_string()).kind(),
        "policy_blocked"
    );
    assert_eq!(
        Error::OperationFailed("disk".to_string()).kind(),
        "operation_failed"
    );
}
