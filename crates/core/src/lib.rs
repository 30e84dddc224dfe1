//! tarunner 공통 크레이트 -- 에러, 에이전트 설정, 파이프라인 생명주기, 로그 레코드
//!
//! 다른 모든 크레이트가 의존하는 최하위 크레이트입니다.

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod record;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, PipelineError, SinkError, TarunnerError};

// 설정
pub use config::TarunnerConfig;

// 파이프라인 trait
pub use pipeline::{BoxFuture, DynPipeline, HealthStatus, Pipeline};

// 레코드
pub use record::{LogRecord, RecordSink};
