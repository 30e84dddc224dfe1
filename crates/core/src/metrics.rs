//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `tarunner_`
//! - 모듈명: `runner_`, `forwarder_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(tarunner_core::metrics::RUNNER_EXECUTIONS_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 입력 이름 레이블 키
pub const LABEL_INPUT: &str = "input";

/// 앱 이름 레이블 키
pub const LABEL_APP: &str = "app";

// ─── Runner 메트릭 ─────────────────────────────────────────────────

/// Runner: 스크립트 실행 횟수 (counter, label: input)
pub const RUNNER_EXECUTIONS_TOTAL: &str = "tarunner_runner_executions_total";

/// Runner: 실패한 스크립트 실행 횟수 (counter, label: input)
pub const RUNNER_EXECUTION_FAILURES_TOTAL: &str = "tarunner_runner_execution_failures_total";

/// Runner: 싱크로 전달된 레코드 수 (counter)
pub const RUNNER_RECORDS_EMITTED_TOTAL: &str = "tarunner_runner_records_emitted_total";

/// Runner: 싱크 에러로 드롭된 레코드 수 (counter)
pub const RUNNER_SINK_ERRORS_TOTAL: &str = "tarunner_runner_sink_errors_total";

/// Runner: 스케줄된 입력 수 (gauge)
pub const RUNNER_SCHEDULED_INPUTS: &str = "tarunner_runner_scheduled_inputs";

// ─── Forwarder 메트릭 ───────────────────────────────────────────────

/// Forwarder: 엔드포인트로 전송된 레코드 수 (counter)
pub const FORWARDER_RECORDS_TOTAL: &str = "tarunner_forwarder_records_total";

/// Forwarder: 전송 실패 횟수 (counter)
pub const FORWARDER_ERRORS_TOTAL: &str = "tarunner_forwarder_errors_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `tarunner-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    // Runner
    describe_counter!(
        RUNNER_EXECUTIONS_TOTAL,
        "Total number of scripted input executions started"
    );
    describe_counter!(
        RUNNER_EXECUTION_FAILURES_TOTAL,
        "Total number of scripted input executions that failed"
    );
    describe_counter!(
        RUNNER_RECORDS_EMITTED_TOTAL,
        "Total number of records delivered to the sink"
    );
    describe_counter!(
        RUNNER_SINK_ERRORS_TOTAL,
        "Total number of records dropped because the sink rejected them"
    );
    describe_gauge!(
        RUNNER_SCHEDULED_INPUTS,
        "Number of inputs currently scheduled"
    );

    // Forwarder
    describe_counter!(
        FORWARDER_RECORDS_TOTAL,
        "Total number of records written to the downstream endpoint"
    );
    describe_counter!(
        FORWARDER_ERRORS_TOTAL,
        "Total number of failed deliveries to the downstream endpoint"
    );
}
