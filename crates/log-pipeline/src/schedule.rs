//! 입력별 실행 스케줄 결정
//!
//! `disabled = 1` 이면 비활성, `interval` 이 없으면 기본 주기,
//! `-1` 은 비활성, `0` 은 연속 실행, 양수는 초 단위 주기입니다.

use std::fmt;
use std::time::Duration;

use tarunner_conf::Input;

use crate::error::LogPipelineError;

/// 기본 실행 주기 (초)
pub const DEFAULT_INTERVAL_SECS: u64 = 3600;

/// 입력의 실행 스케줄
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// 실행하지 않음
    Disabled,
    /// 끝나는 즉시 다시 실행
    Continuous,
    /// 즉시 한 번 실행한 뒤, 이전 실행이 끝난 시점부터 주기마다 실행
    Interval(Duration),
}

impl Schedule {
    /// 입력 파라미터에서 스케줄을 결정합니다.
    pub fn for_input(input: &Input, default_interval: Duration) -> Result<Self, LogPipelineError> {
        if input.param("disabled") == Some("1") {
            return Ok(Self::Disabled);
        }
        let Some(raw) = input.param("interval") else {
            return Ok(Self::Interval(default_interval));
        };
        let secs: i64 = raw.trim().parse().map_err(|_| LogPipelineError::Schedule {
            input: input.name.clone(),
            reason: format!("invalid interval '{raw}'"),
        })?;
        match secs {
            -1 => Ok(Self::Disabled),
            0 => Ok(Self::Continuous),
            s if s < 0 => Err(LogPipelineError::Schedule {
                input: input.name.clone(),
                reason: format!("negative interval {s}"),
            }),
            s => Ok(Self::Interval(Duration::from_secs(s.unsigned_abs()))),
        }
    }

    /// 실행 대상인지 확인합니다.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::Continuous => write!(f, "continuous"),
            Self::Interval(d) => write!(f, "every {}s", d.as_secs()),
        }
    }
}
