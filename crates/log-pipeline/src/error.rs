//! 로그 파이프라인 에러 타입
//!
//! [`LogPipelineError`]는 연산자 컴파일, 명령 경로 해석, 스케줄링, 스크립트 실행에서
//! 발생하는 모든 에러를 표현합니다.
//! `From<LogPipelineError> for TarunnerError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use tarunner_core::error::{PipelineError, SinkError, TarunnerError};

/// 로그 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// 입력 이름의 스킴을 처리할 수 없음
    #[error("unknown scheme {scheme:?}")]
    UnknownScheme {
        /// 스킴 (`invalid://x` 의 `invalid`)
        scheme: String,
    },

    /// 해석된 경로가 기준 디렉토리 밖을 가리킴
    #[error("path {path:?} is outside the base directory")]
    OutsideBaseDir {
        /// 해석된 절대 경로
        path: String,
    },

    /// 스케줄 파라미터 오류 (interval 등)
    #[error("schedule error: input '{input}': {reason}")]
    Schedule {
        /// 입력 이름
        input: String,
        /// 실패 사유
        reason: String,
    },

    /// 자식 프로세스 생성 실패
    #[error("failed to spawn '{command}': {reason}")]
    Spawn {
        /// 실행 파일 경로
        command: String,
        /// 실패 사유
        reason: String,
    },

    /// 자식 프로세스가 실패 상태로 종료
    #[error("'{command}' exited with {status}")]
    ChildExit {
        /// 실행 파일 경로
        command: String,
        /// 종료 상태
        status: String,
    },

    /// 자식 프로세스 파이프 에러
    #[error("pipe error: {0}")]
    Pipe(String),

    /// 싱크 전달 실패
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<LogPipelineError> for TarunnerError {
    fn from(err: LogPipelineError) -> Self {
        match err {
            LogPipelineError::Sink(e) => TarunnerError::Sink(e),
            other => TarunnerError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_scheme_display_quotes_scheme() {
        let err = LogPipelineError::UnknownScheme {
            scheme: "invalid".to_owned(),
        };
        assert_eq!(err.to_string(), "unknown scheme \"invalid\"");
    }

    #[test]
    fn outside_base_dir_display() {
        let err = LogPipelineError::OutsideBaseDir {
            path: "/tmp/foo.sh".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "path \"/tmp/foo.sh\" is outside the base directory"
        );
    }

    #[test]
    fn schedule_error_display() {
        let err = LogPipelineError::Schedule {
            input: "script://./bin/x.sh".to_owned(),
            reason: "invalid interval 'soon'".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("script://./bin/x.sh"));
        assert!(msg.contains("soon"));
    }

    #[test]
    fn converts_to_tarunner_error() {
        let err = LogPipelineError::Pipe("closed".to_owned());
        let top: TarunnerError = err.into();
        assert!(matches!(top, TarunnerError::Pipeline(_)));

        let err = LogPipelineError::Sink(SinkError::Closed);
        let top: TarunnerError = err.into();
        assert!(matches!(top, TarunnerError::Sink(SinkError::Closed)));
    }
}
