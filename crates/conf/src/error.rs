//! 스탠자 설정 에러 타입
//!
//! [`ConfError`]는 `.conf` 파일 읽기와 파싱에서 발생하는 모든 에러를 표현합니다.
//! `From<ConfError> for TarunnerError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.

use tarunner_core::error::{ConfigError, TarunnerError};

/// 스탠자 설정 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfError {
    /// 문법 오류 (헤더 미종료, 빈 키, key=value 가 아닌 줄 등)
    #[error("syntax error at line {line}: {reason}")]
    Syntax {
        /// 1부터 시작하는 줄 번호
        line: usize,
        /// 실패 사유
        reason: String,
    },

    /// 타입이 정해진 필드의 값이 잘못됨
    #[error("invalid value for '{key}' in stanza [{stanza}]: {reason}")]
    InvalidValue {
        /// 스탠자 이름
        stanza: String,
        /// 키 이름
        key: String,
        /// 실패 사유
        reason: String,
    },

    /// local/default 어디에도 inputs.conf 가 없음
    #[error("no inputs.conf found under {dir}")]
    MissingInputs {
        /// 앱 디렉토리
        dir: String,
    },

    /// 파일 읽기 실패
    #[error("failed to read {path}: {reason}")]
    Read {
        /// 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConfError> for TarunnerError {
    fn from(err: ConfError) -> Self {
        TarunnerError::Config(ConfigError::ParseFailed {
            reason: err.to_string(),
        })
    }
}
