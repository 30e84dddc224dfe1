//! 에러 타입 -- 도메인별 에러 정의

/// tarunner 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum TarunnerError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 레코드 전달 에러
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 에이전트 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 생명주기 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 이미 실행 중
    #[error("pipeline already running")]
    AlreadyRunning,

    /// 스케줄된 입력이 하나도 없음
    #[error("nothing scheduled")]
    NothingScheduled,

    /// 입력 단위 실행 실패
    #[error("input '{input}' failed: {reason}")]
    Input { input: String, reason: String },
}

/// 레코드 싱크 에러
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// 수신측이 닫힘
    #[error("sink closed")]
    Closed,

    /// 전달 실패
    #[error("sink delivery failed: {0}")]
    Delivery(String),
}
