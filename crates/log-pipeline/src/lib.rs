//! tarunner 로그 파이프라인 크레이트
//!
//! 스탠자 설정에서 읽은 입력을 실행 가능한 수집 작업으로 바꿉니다.
//!
//! # 모듈 구성
//!
//! - [`operator`]: props/transforms 설정을 연산자 체인 명세로 컴파일, 수신기 단위 조립
//! - [`command`]: 입력 이름을 실행 파일/감시 경로로 해석 (앱 디렉토리 격리 검사)
//! - [`schedule`]: `interval`/`disabled` 파라미터로 실행 스케줄 결정
//! - [`supervisor`]: 주기 작업, 스크립트 1회 실행, 자식 프로세스 목록
//! - [`runner`]: 입력 스케줄러 (Pipeline trait 구현)
//! - [`scripted_input`]: 외부 엔진용 스크립트 입력 연산자
//! - [`monitor`]: 파일 감시 입력 등록과 외부 감시 엔진 인터페이스
//! - [`sink`]: bounded mpsc 채널 싱크
//! - [`config`]: 러너 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! App --Runner::schedule_app--> Schedule --> PeriodicJob --> ScriptExecution --> child process
//!  |                                                              |
//!  +--assemble_receiver--> [OperatorSpec] (plan)        stdout -> drain -> RecordSink
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod monitor;
pub mod operator;
pub mod runner;
pub mod schedule;
pub mod scripted_input;
pub mod sink;
pub mod supervisor;

// --- 주요 타입 re-export ---

// 러너
pub use runner::{ReceiverPlan, Runner, RunnerBuilder};

// 설정
pub use config::{DrainMode, RunnerConfig, RunnerConfigBuilder};

// 에러
pub use error::LogPipelineError;

// 연산자
pub use operator::{
    CompilerOptions, Field, OnError, OperatorKind, OperatorSpec, ReceiverKind, assemble_receiver,
    compile,
};

// 명령 경로
pub use command::{InputName, resolve_command, resolve_monitor_path, resolve_path};

// 스케줄 / 감독자
pub use schedule::Schedule;
pub use supervisor::{Execute, PeriodicJob, ProcessRegistry, ScriptExecution};

// 스크립트 입력 연산자
pub use scripted_input::ScriptedInput;

// 감시
pub use monitor::{WatchExecutor, WatchRegistration, WatchTarget};

// 싱크
pub use sink::ChannelSink;
