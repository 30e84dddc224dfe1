//! 스크립트 입력 연산자
//!
//! 외부 실행 엔진의 입력 연산자로 끼워 넣기 위한 얇은 어댑터입니다.
//! 러너와 같은 [`PeriodicJob`] + [`ScriptExecution`]을 사용하지만,
//! 속성은 존재하는 `host`/`index`/`sourcetype`/`source` 파라미터에서만 가져오고
//! 레코드는 자신의 출력 싱크로 보냅니다. 기본 드레인 방식은 스트림 전체입니다.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use tarunner_conf::Input;
use tarunner_core::record::RecordSink;

use crate::command::{InputName, SCRIPT_SCHEME};
use crate::config::{DrainMode, RunnerConfig};
use crate::error::LogPipelineError;
use crate::schedule::Schedule;
use crate::supervisor::{PeriodicJob, ProcessRegistry, ScriptExecution, param_attributes};

/// 스크립트 입력 연산자
pub struct ScriptedInput {
    input: Input,
    base_dir: PathBuf,
    output: Arc<dyn RecordSink>,
    default_interval: Duration,
    failure_backoff: Duration,
    drain_mode: DrainMode,
    registry: ProcessRegistry,
    tracker: TaskTracker,
    cancel: Option<CancellationToken>,
}

impl ScriptedInput {
    /// 새 연산자를 생성합니다.
    pub fn new(input: Input, base_dir: impl Into<PathBuf>, output: Arc<dyn RecordSink>) -> Self {
        let defaults = RunnerConfig::default();
        Self {
            input,
            base_dir: base_dir.into(),
            output,
            default_interval: defaults.default_interval,
            failure_backoff: defaults.failure_backoff,
            drain_mode: DrainMode::WholeStream,
            registry: ProcessRegistry::new(),
            tracker: TaskTracker::new(),
            cancel: None,
        }
    }

    /// 러너 설정의 주기/백오프를 적용합니다. 드레인 방식은 바꾸지 않습니다.
    pub fn config(mut self, config: &RunnerConfig) -> Self {
        self.default_interval = config.default_interval;
        self.failure_backoff = config.failure_backoff;
        self
    }

    /// 드레인 방식을 지정합니다.
    pub fn drain_mode(mut self, mode: DrainMode) -> Self {
        self.drain_mode = mode;
        self
    }

    /// 실행 중인지 확인합니다.
    pub fn is_running(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| !c.is_cancelled())
    }

    /// 입력을 스케줄합니다. 비활성 입력이면 `false`를 반환합니다.
    pub fn start(&mut self) -> Result<bool, LogPipelineError> {
        let name = InputName::parse(&self.input.name);
        if !matches!(name.scheme.as_ref(), SCRIPT_SCHEME | "") {
            return Err(LogPipelineError::UnknownScheme {
                scheme: name.scheme.into_owned(),
            });
        }
        if self.is_running() {
            return Ok(true);
        }

        let schedule = Schedule::for_input(&self.input, self.default_interval)?;
        if !schedule.is_enabled() {
            debug!(input = %self.input.name, "scripted input disabled");
            return Ok(false);
        }

        self.tracker.reopen();
        let cancel = CancellationToken::new();
        let execution = ScriptExecution::new(self.input.clone(), &self.base_dir, Arc::clone(&self.output))
            .attributes(param_attributes(&self.input))
            .registry(self.registry.clone())
            .tracker(self.tracker.clone())
            .cancel_token(cancel.clone())
            .drain_mode(self.drain_mode);
        let job = PeriodicJob::new(schedule, execution, cancel.clone())
            .failure_backoff(self.failure_backoff);
        self.tracker.spawn(job.run());
        self.cancel = Some(cancel);

        info!(input = %self.input.name, schedule = %schedule, "scripted input started");
        Ok(true)
    }

    /// 정지합니다. 두 번째 호출부터는 아무 일도 하지 않습니다.
    pub async fn stop(&mut self) {
        let Some(cancel) = self.cancel.take() else {
            return;
        };
        cancel.cancel();
        self.registry.terminate_all();
        self.tracker.close();
        self.tracker.wait().await;
        info!(input = %self.input.name, "scripted input stopped");
    }
}
