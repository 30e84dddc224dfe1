//! 러너 설정
//!
//! [`RunnerConfig`]는 core의 [`AgentConfig`](tarunner_core::config::AgentConfig)를
//! 기반으로 러너와 스크립트 실행에 필요한 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use tarunner_core::config::TarunnerConfig;
//! use tarunner_log_pipeline::config::RunnerConfig;
//!
//! let core_config = TarunnerConfig::default();
//! let config = RunnerConfig::from_core(&core_config.agent)?;
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use tarunner_core::config::AgentConfig;

use crate::error::LogPipelineError;

/// 자식 프로세스 표준 출력을 레코드로 나누는 방식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainMode {
    /// 개행 문자로 끝나는 줄마다 레코드 하나 (개행 문자 포함, 마지막 미완성 줄도 방출)
    #[default]
    Lines,
    /// EOF 까지 읽은 스트림 전체를 레코드 하나로
    WholeStream,
}

impl DrainMode {
    /// 설정 문자열을 해석합니다.
    pub fn parse(value: &str) -> Result<Self, LogPipelineError> {
        match value {
            "lines" => Ok(Self::Lines),
            "whole_stream" => Ok(Self::WholeStream),
            other => Err(LogPipelineError::Config {
                field: "drain_mode".to_owned(),
                reason: format!("unknown drain mode '{other}'"),
            }),
        }
    }
}

/// 러너 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// 연산자 체인 확장 단계 활성화
    pub cook: bool,
    /// 출력 드레인 방식
    pub drain_mode: DrainMode,
    /// `interval` 파라미터가 없을 때의 주기
    pub default_interval: Duration,
    /// 연속 실행 모드에서 실패 후 재시작 대기
    pub failure_backoff: Duration,
    /// 레코드 채널 용량
    pub sink_channel_capacity: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            cook: false,
            drain_mode: DrainMode::Lines,
            default_interval: Duration::from_secs(3600),
            failure_backoff: Duration::from_millis(1000),
            sink_channel_capacity: 1024,
        }
    }
}

impl RunnerConfig {
    /// core의 `AgentConfig`에서 러너 설정을 생성합니다.
    pub fn from_core(core: &AgentConfig) -> Result<Self, LogPipelineError> {
        let config = Self {
            cook: core.cook,
            drain_mode: DrainMode::parse(&core.drain_mode)?,
            default_interval: Duration::from_secs(core.default_interval_secs),
            failure_backoff: Duration::from_millis(core.failure_backoff_ms),
            sink_channel_capacity: core.sink_channel_capacity,
        };
        config.validate()?;
        Ok(config)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        if self.default_interval.is_zero() {
            return Err(LogPipelineError::Config {
                field: "default_interval".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        if self.sink_channel_capacity == 0 {
            return Err(LogPipelineError::Config {
                field: "sink_channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        Ok(())
    }
}

/// 러너 설정 빌더
#[derive(Default)]
pub struct RunnerConfigBuilder {
    config: RunnerConfig,
}

impl RunnerConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 확장 단계 활성화 여부를 설정합니다.
    pub fn cook(mut self, cook: bool) -> Self {
        self.config.cook = cook;
        self
    }

    /// 드레인 방식을 설정합니다.
    pub fn drain_mode(mut self, mode: DrainMode) -> Self {
        self.config.drain_mode = mode;
        self
    }

    /// 기본 실행 주기를 설정합니다.
    pub fn default_interval(mut self, interval: Duration) -> Self {
        self.config.default_interval = interval;
        self
    }

    /// 실패 후 재시작 대기 시간을 설정합니다.
    pub fn failure_backoff(mut self, backoff: Duration) -> Self {
        self.config.failure_backoff = backoff;
        self
    }

    /// 레코드 채널 용량을 설정합니다.
    pub fn sink_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.sink_channel_capacity = capacity;
        self
    }

    /// 설정을 검증하고 `RunnerConfig`를 생성합니다.
    pub fn build(self) -> Result<RunnerConfig, LogPipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
