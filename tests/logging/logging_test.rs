//! Tests for `src/logging.rs`.

use mailvoice::logging::{init_cli, init_production, LoggingGuard, LOG_FILE_PREFIX};

#[test]
fn logging_guard_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<LoggingGuard>();
}

#[test]
fn log_files_are_prefixed_with_service_name() {
    assert!(LOG_FILE_PREFIX.starts_with("mailvoice"));
}

#[test]
fn init_production_creates_logs_dir() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let logs_dir = tmp.path().join("nested").join("logs");
    assert!(!logs_dir.exists());

    // Only one global subscriber per process; a second install errors
    // after the directory is already created.
    let _result = init_production(&logs_dir);
    assert!(logs_dir.exists(), "logs directory should be created");
}

#[test]
fn init_cli_can_be_called_twice() {
    init_cli();
    init_cli();
}
