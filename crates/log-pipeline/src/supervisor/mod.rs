//! 입력 감독자 -- 스케줄에 따라 실행기를 반복 호출하는 주기 작업
//!
//! 러너와 스크립트 입력 연산자가 같은 [`PeriodicJob`]을 사용합니다.
//!
//! # 실행 규칙
//! ```text
//! Continuous: loop { cancelled? break; execute; (실패 시 failure_backoff 대기) }
//! Interval:   execute; loop { select!(cancel => break, sleep(interval) => execute) }
//! ```
//! 취소와 다른 이벤트가 동시에 준비되면 항상 취소가 우선합니다.

pub mod execution;
pub mod registry;

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use tarunner_core::metrics as m;
use tarunner_core::pipeline::BoxFuture;

use crate::error::LogPipelineError;
use crate::schedule::Schedule;

pub use execution::{ScriptExecution, param_attributes, routing_attributes};
pub use registry::ProcessRegistry;

/// 1회 실행 콜백
pub trait Execute: Send + Sync {
    /// 로그에 쓰일 이름
    fn name(&self) -> &str;

    /// 한 번 실행합니다. `execution`은 1부터 증가하는 실행 번호입니다.
    fn execute(&self, execution: u64) -> BoxFuture<'_, Result<(), LogPipelineError>>;
}

/// 스케줄에 따라 실행기를 반복 호출하는 작업
pub struct PeriodicJob<E> {
    schedule: Schedule,
    executor: E,
    cancel: CancellationToken,
    failure_backoff: Duration,
}

impl<E: Execute> PeriodicJob<E> {
    /// 새 작업을 생성합니다.
    pub fn new(schedule: Schedule, executor: E, cancel: CancellationToken) -> Self {
        Self {
            schedule,
            executor,
            cancel,
            failure_backoff: Duration::from_secs(1),
        }
    }

    /// 연속 실행 모드에서 실패 후 대기 시간을 지정합니다.
    pub fn failure_backoff(mut self, backoff: Duration) -> Self {
        self.failure_backoff = backoff;
        self
    }

    /// 스케줄
    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    /// 취소될 때까지 실행하고, 시작한 실행 횟수를 반환합니다.
    pub async fn run(self) -> u64 {
        let name = self.executor.name().to_owned();
        info!(input = %name, schedule = %self.schedule, "job started");
        let executions = match self.schedule {
            Schedule::Disabled => 0,
            Schedule::Continuous => self.run_continuous(&name).await,
            Schedule::Interval(interval) => self.run_interval(&name, interval).await,
        };
        info!(input = %name, executions, "job stopped");
        executions
    }

    async fn run_continuous(&self, name: &str) -> u64 {
        let mut execution = 0;
        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            execution += 1;
            match self.execute_once(name, execution).await {
                None => break,
                Some(true) => {}
                Some(false) => {
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.failure_backoff) => {}
                    }
                }
            }
        }
        execution
    }

    async fn run_interval(&self, name: &str, interval: Duration) -> u64 {
        let mut execution = 1;
        if self.execute_once(name, execution).await.is_none() {
            return execution;
        }
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {
                    execution += 1;
                    if self.execute_once(name, execution).await.is_none() {
                        break;
                    }
                }
            }
        }
        execution
    }

    /// 취소되면 `None`, 성공 여부는 `Some`으로 반환합니다.
    async fn execute_once(&self, name: &str, execution: u64) -> Option<bool> {
        metrics::counter!(m::RUNNER_EXECUTIONS_TOTAL, m::LABEL_INPUT => name.to_owned()).increment(1);
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(input = %name, execution, "execution interrupted by shutdown");
                return None;
            }
            result = self.executor.execute(execution) => result,
        };
        match result {
            Ok(()) => Some(true),
            Err(e) => {
                metrics::counter!(m::RUNNER_EXECUTION_FAILURES_TOTAL, m::LABEL_INPUT => name.to_owned())
                    .increment(1);
                error!(input = %name, execution, error = %e, "execution failed");
                Some(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    struct Counting {
        calls: Arc<AtomicU64>,
        fail: bool,
        cancel_after: Option<(u64, CancellationToken)>,
    }

    impl Execute for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn execute(&self, execution: u64) -> BoxFuture<'_, Result<(), LogPipelineError>> {
            Box::pin(async move {
                let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
                assert_eq!(calls, execution);
                if let Some((limit, token)) = &self.cancel_after {
                    if calls >= *limit {
                        token.cancel();
                    }
                }
                if self.fail {
                    Err(LogPipelineError::Pipe("boom".to_owned()))
                } else {
                    Ok(())
                }
            })
        }
    }

    fn counting(cancel_after: Option<(u64, CancellationToken)>, fail: bool) -> (Counting, Arc<AtomicU64>) {
        let calls = Arc::new(AtomicU64::new(0));
        (
            Counting {
                calls: Arc::clone(&calls),
                fail,
                cancel_after,
            },
            calls,
        )
    }

    #[tokio::test]
    async fn disabled_never_executes() {
        let (exec, calls) = counting(None, false);
        let job = PeriodicJob::new(Schedule::Disabled, exec, CancellationToken::new());
        assert_eq!(job.run().await, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn continuous_repeats_until_cancelled() {
        let cancel = CancellationToken::new();
        let (exec, calls) = counting(Some((5, cancel.clone())), false);
        let job = PeriodicJob::new(Schedule::Continuous, exec, cancel);
        assert_eq!(job.run().await, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn continuous_backs_off_after_failure() {
        let cancel = CancellationToken::new();
        let (exec, calls) = counting(Some((3, cancel.clone())), true);
        let job = PeriodicJob::new(Schedule::Continuous, exec, cancel)
            .failure_backoff(Duration::from_millis(500));
        let started = tokio::time::Instant::now();
        job.run().await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 세 번째 실패 뒤에는 취소되어 대기하지 않음
        assert!(started.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn interval_runs_immediately_then_periodically() {
        let cancel = CancellationToken::new();
        let (exec, calls) = counting(None, false);
        let job = PeriodicJob::new(Schedule::Interval(Duration::from_secs(60)), exec, cancel.clone());
        let handle = tokio::spawn(job.run());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        cancel.cancel();
        assert_eq!(handle.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn cancelled_before_start_runs_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (exec, calls) = counting(None, false);
        let job = PeriodicJob::new(Schedule::Continuous, exec, cancel);
        assert_eq!(job.run().await, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
