//! tarunner.toml 통합 설정 테스트
//!
//! - tarunner.toml.example 파싱 테스트
//! - 파일 로딩 + 환경변수 우선순위 테스트
//! - 잘못된 형식 에러 테스트

use std::io::Write;

use tarunner_core::config::TarunnerConfig;
use tarunner_core::error::{ConfigError, TarunnerError};

// =============================================================================
// tarunner.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../tarunner.toml.example");
    let config = TarunnerConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
    assert!(!config.agent.cook);
    assert_eq!(config.agent.drain_mode, "lines");
    assert_eq!(config.agent.default_interval_secs, 3600);
    assert_eq!(config.agent.failure_backoff_ms, 1000);
    assert_eq!(config.agent.sink_channel_capacity, 1024);
    assert!(!config.metrics.enabled);
    assert_eq!(config.metrics.port, 9100);
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../tarunner.toml.example");
    let config = TarunnerConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

// =============================================================================
// 파일 로딩 테스트
// =============================================================================

#[tokio::test]
#[serial_test::serial]
async fn load_reads_file_and_validates() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(file, "[agent]\ncook = true\ndrain_mode = \"whole_stream\"").expect("write");

    let config = TarunnerConfig::load(file.path()).await.expect("should load");
    assert!(config.agent.cook);
    assert_eq!(config.agent.drain_mode, "whole_stream");
}

#[tokio::test]
#[serial_test::serial]
async fn load_rejects_invalid_values() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(file, "[general]\nlog_format = \"xml\"").expect("write");

    let err = TarunnerConfig::load(file.path()).await.unwrap_err();
    assert!(matches!(
        err,
        TarunnerError::Config(ConfigError::InvalidValue { .. })
    ));
}

#[tokio::test]
#[serial_test::serial]
async fn env_override_wins_over_file() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(file, "[agent]\nfailure_backoff_ms = 10").expect("write");

    // SAFETY: serial 테스트로 환경변수 접근을 직렬화합니다.
    unsafe { std::env::set_var("TARUNNER_AGENT_FAILURE_BACKOFF_MS", "250") };
    let result = TarunnerConfig::load(file.path()).await;
    unsafe { std::env::remove_var("TARUNNER_AGENT_FAILURE_BACKOFF_MS") };

    assert_eq!(result.expect("should load").agent.failure_backoff_ms, 250);
}

#[tokio::test]
#[serial_test::serial]
async fn env_override_can_make_config_invalid() {
    let file = tempfile::NamedTempFile::new().expect("tempfile");

    // SAFETY: serial 테스트로 환경변수 접근을 직렬화합니다.
    unsafe { std::env::set_var("TARUNNER_AGENT_DRAIN_MODE", "bytes") };
    let result = TarunnerConfig::load(file.path()).await;
    unsafe { std::env::remove_var("TARUNNER_AGENT_DRAIN_MODE") };

    let err = result.unwrap_err();
    assert!(err.to_string().contains("agent.drain_mode"));
}

// =============================================================================
// 잘못된 형식 에러 테스트
// =============================================================================

#[test]
fn comments_only_parses_with_defaults() {
    let toml = r#"
# 주석만 있는 파일
# 기본값이 적용되어야 함
"#;
    let config = TarunnerConfig::parse(toml).expect("comments-only should parse");
    config.validate().expect("should validate");
    assert_eq!(config.agent.default_interval_secs, 3600);
}

#[test]
fn invalid_type_returns_parse_error() {
    let toml = r#"
[agent]
cook = "maybe"
"#;
    let err = TarunnerConfig::parse(toml).unwrap_err();
    assert!(matches!(
        err,
        TarunnerError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn unknown_section_is_ignored() {
    let toml = r#"
[storage]
postgres_url = "ignored"
"#;
    let config = TarunnerConfig::parse(toml).expect("unknown sections are ignored");
    assert_eq!(config.general.log_level, "info");
}
