//! 설정 관리 -- tarunner.toml 파싱 및 런타임 설정
//!
//! [`TarunnerConfig`]는 에이전트 전체 설정을 담는 최상위 구조체입니다.
//! 입력 정의(inputs.conf 등)는 여기가 아니라 `tarunner-conf` 크레이트가 다룹니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`TARUNNER_AGENT_COOK=true` 형식)
//! 3. 설정 파일 (`tarunner.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), tarunner_core::error::TarunnerError> {
//! use tarunner_core::config::TarunnerConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = TarunnerConfig::load("tarunner.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = TarunnerConfig::parse("[agent]\ncook = true")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, TarunnerError};

/// 허용되는 로그 레벨
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
/// 허용되는 로그 형식
pub const LOG_FORMATS: [&str; 2] = ["json", "pretty"];
/// 허용되는 드레인 모드
pub const DRAIN_MODES: [&str; 2] = ["lines", "whole_stream"];

/// tarunner 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TarunnerConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 입력 실행 에이전트 설정
    #[serde(default)]
    pub agent: AgentConfig,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl TarunnerConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, TarunnerError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, TarunnerError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TarunnerError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                TarunnerError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, TarunnerError> {
        toml::from_str(toml_str).map_err(|e| {
            TarunnerError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `TARUNNER_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "TARUNNER_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "TARUNNER_GENERAL_LOG_FORMAT");

        // Agent
        override_bool(&mut self.agent.cook, "TARUNNER_AGENT_COOK");
        override_string(&mut self.agent.drain_mode, "TARUNNER_AGENT_DRAIN_MODE");
        override_u64(
            &mut self.agent.default_interval_secs,
            "TARUNNER_AGENT_DEFAULT_INTERVAL_SECS",
        );
        override_u64(
            &mut self.agent.failure_backoff_ms,
            "TARUNNER_AGENT_FAILURE_BACKOFF_MS",
        );
        override_usize(
            &mut self.agent.sink_channel_capacity,
            "TARUNNER_AGENT_SINK_CHANNEL_CAPACITY",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "TARUNNER_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "TARUNNER_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "TARUNNER_METRICS_PORT");
        override_string(&mut self.metrics.endpoint, "TARUNNER_METRICS_ENDPOINT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), TarunnerError> {
        if !LOG_LEVELS.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", LOG_LEVELS.join(", ")),
            ));
        }

        if !LOG_FORMATS.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", LOG_FORMATS.join(", ")),
            ));
        }

        if !DRAIN_MODES.contains(&self.agent.drain_mode.as_str()) {
            return Err(invalid(
                "agent.drain_mode",
                format!("must be one of: {}", DRAIN_MODES.join(", ")),
            ));
        }

        if self.agent.default_interval_secs == 0 {
            return Err(invalid(
                "agent.default_interval_secs",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.agent.sink_channel_capacity == 0 {
            return Err(invalid(
                "agent.sink_channel_capacity",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.metrics.enabled {
            if self.metrics.port == 0 {
                return Err(invalid("metrics.port", "must not be 0".to_owned()));
            }
            if !self.metrics.endpoint.starts_with('/') {
                return Err(invalid(
                    "metrics.endpoint",
                    "must start with '/'".to_owned(),
                ));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> TarunnerError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 입력 실행 에이전트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// 연산자 체인 확장 단계(재결합, 변환, 필드 별칭) 활성화
    pub cook: bool,
    /// 자식 프로세스 출력 드레인 방식 (lines, whole_stream)
    pub drain_mode: String,
    /// `interval` 파라미터가 없을 때의 실행 주기 (초)
    pub default_interval_secs: u64,
    /// 연속 실행 모드에서 실패 후 재시작 대기 시간 (밀리초)
    pub failure_backoff_ms: u64,
    /// 레코드 채널 용량
    pub sink_channel_capacity: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            cook: false,
            drain_mode: "lines".to_owned(),
            default_interval_secs: 3600,
            failure_backoff_ms: 1000,
            sink_channel_capacity: 1024,
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 리스너 주소
    pub listen_addr: String,
    /// 리스너 포트
    pub port: u16,
    /// 노출 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_has_sane_values() {
        let config = TarunnerConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert!(!config.agent.cook);
        assert_eq!(config.agent.drain_mode, "lines");
        assert_eq!(config.agent.default_interval_secs, 3600);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn default_config_passes_validation() {
        TarunnerConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = TarunnerConfig::parse("").unwrap();
        assert_eq!(config.agent.failure_backoff_ms, 1000);
        assert_eq!(config.metrics.port, 9100);
    }

    #[test]
    fn partial_toml_merges_with_defaults() {
        let toml = r#"
[agent]
cook = true
drain_mode = "whole_stream"
"#;
        let config = TarunnerConfig::parse(toml).unwrap();
        assert!(config.agent.cook);
        assert_eq!(config.agent.drain_mode, "whole_stream");
        // 나머지는 기본값 유지
        assert_eq!(config.agent.sink_channel_capacity, 1024);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn invalid_toml_returns_parse_error() {
        let err = TarunnerConfig::parse("agent = [[[").unwrap_err();
        assert!(matches!(
            err,
            TarunnerError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_unknown_drain_mode() {
        let mut config = TarunnerConfig::default();
        config.agent.drain_mode = "chunks".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("agent.drain_mode"));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = TarunnerConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = TarunnerConfig::default();
        config.agent.default_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_checks_metrics_only_when_enabled() {
        let mut config = TarunnerConfig::default();
        config.metrics.endpoint = "metrics".to_owned();
        config.validate().unwrap();

        config.metrics.enabled = true;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("metrics.endpoint"));
    }

    #[test]
    #[serial]
    fn env_override_applies_agent_fields() {
        // SAFETY: serial 테스트로 환경변수 접근을 직렬화합니다.
        unsafe {
            std::env::set_var("TARUNNER_AGENT_COOK", "true");
            std::env::set_var("TARUNNER_AGENT_DEFAULT_INTERVAL_SECS", "60");
        }
        let mut config = TarunnerConfig::default();
        config.apply_env_overrides();
        unsafe {
            std::env::remove_var("TARUNNER_AGENT_COOK");
            std::env::remove_var("TARUNNER_AGENT_DEFAULT_INTERVAL_SECS");
        }
        assert!(config.agent.cook);
        assert_eq!(config.agent.default_interval_secs, 60);
    }

    #[test]
    #[serial]
    fn env_override_invalid_value_keeps_original() {
        // SAFETY: serial 테스트로 환경변수 접근을 직렬화합니다.
        unsafe { std::env::set_var("TARUNNER_METRICS_PORT", "not-a-port") };
        let mut config = TarunnerConfig::default();
        config.apply_env_overrides();
        unsafe { std::env::remove_var("TARUNNER_METRICS_PORT") };
        assert_eq!(config.metrics.port, 9100);
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = "original".to_owned();
        override_string(&mut val, "TARUNNER_TEST_NONEXISTENT_12345");
        assert_eq!(val, "original");
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = TarunnerConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = TarunnerConfig::parse(&toml_str).unwrap();
        assert_eq!(config.agent.drain_mode, parsed.agent.drain_mode);
        assert_eq!(config.metrics.endpoint, parsed.metrics.endpoint);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = TarunnerConfig::from_file("/nonexistent/path/tarunner.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TarunnerError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
