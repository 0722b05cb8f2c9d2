use std::io::Write;
use std::time::Duration;

use procward::config::{load_and_validate, SuccessCodes, Timeout};
use procward::errors::ProcwardError;
use tempfile::NamedTempFile;

#[test]
fn loads_exec_section_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[exec]
timeout = "3s"
successful_exit_codes = [0, 1]
drain_grace_period = "500ms"
"#
    )
    .unwrap();

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.timeout, Timeout::After(Duration::from_secs(3)));
    assert_eq!(cfg.success_codes, SuccessCodes::only([0, 1]));
    assert_eq!(cfg.drain_grace_period, Duration::from_millis(500));
    assert!(cfg.kill_process_tree);
}

#[test]
fn infinite_timeout_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[exec]\ntimeout = \"infinite\"\naccept_any_exit_code = true\n").unwrap();

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.timeout, Timeout::Infinite);
    assert_eq!(cfg.success_codes, SuccessCodes::Any);
}

#[test]
fn unknown_key_is_a_toml_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[exec]\ntimeout_ms = 3000\n").unwrap();

    match load_and_validate(file.path()) {
        Err(ProcwardError::TomlError(_)) => {}
        other => panic!("expected TomlError, got {other:?}"),
    }
}

#[test]
fn bad_duration_is_a_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[exec]\ndrain_grace_period = \"5 fortnights\"\n").unwrap();

    match load_and_validate(file.path()) {
        Err(ProcwardError::ConfigError(msg)) => {
            assert!(msg.contains("drain_grace_period"));
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    match load_and_validate(dir.path().join("absent.toml")) {
        Err(ProcwardError::IoError(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        other => panic!("expected IoError, got {other:?}"),
    }
}
