//! 입력 스케줄러 -- 앱의 입력을 주기 작업으로 만들고 생명주기를 관리합니다.
//!
//! [`Runner`]는 core의 [`Pipeline`](tarunner_core::pipeline::Pipeline) trait을 구현하여
//! `tarunner-daemon`에서 포워더와 같은 생명주기로 관리됩니다.
//!
//! # 내부 아키텍처
//! ```text
//! App.inputs --schedule_app--> script/native  -> PeriodicJob<ScriptExecution> --+
//!                              monitor        -> WatchRegistration              |
//!                                                                               v
//!                                 child stdout -> drain task -> RecordSink (ChannelSink -> forwarder)
//! ```
//!
//! # 종료 순서
//! 취소 토큰 -> 자식 프로세스 SIGTERM -> 감시 엔진 정지 -> 태스크 트래커 대기 -> `done` 토큰

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use tarunner_conf::{App, Input};
use tarunner_core::error::{PipelineError, TarunnerError};
use tarunner_core::metrics as m;
use tarunner_core::pipeline::{HealthStatus, Pipeline};
use tarunner_core::record::{LogRecord, RecordSink};

use crate::command::{InputName, MONITOR_SCHEME, SCRIPT_SCHEME};
use crate::config::RunnerConfig;
use crate::error::LogPipelineError;
use crate::monitor::{WatchExecutor, WatchRegistration, WatchTarget};
use crate::operator::{CompilerOptions, OperatorSpec, ReceiverKind, assemble_receiver};
use crate::schedule::Schedule;
use crate::sink::ChannelSink;
use crate::supervisor::{PeriodicJob, ProcessRegistry, ScriptExecution, routing_attributes};

/// 러너 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunnerState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 입력 하나의 수신 계획 (입력측 속성 + 조립된 연산자 체인)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiverPlan {
    /// 앱 이름
    pub app: String,
    /// 입력 이름
    pub input: String,
    /// 수신기 종류
    pub kind: ReceiverKind,
    /// 스케줄 (`continuous`, `every 60s`, 감시 입력은 `watch`)
    pub schedule: String,
    /// 입력측에서 붙이는 속성
    pub attributes: BTreeMap<String, String>,
    /// 연산자 체인
    pub operators: Vec<OperatorSpec>,
}

/// 입력 스케줄러
///
/// # 사용 예시
/// ```ignore
/// use tarunner_conf::AppLoader;
/// use tarunner_log_pipeline::RunnerBuilder;
///
/// let apps = AppLoader::load_apps("/opt/ta").await?;
/// let (mut runner, records) = RunnerBuilder::new().config(config).build()?;
/// runner.schedule_apps(&apps);
/// runner.start().await?;
/// ```
pub struct Runner {
    config: RunnerConfig,
    state: RunnerState,
    sink: Arc<dyn RecordSink>,
    watch_executor: Option<Arc<dyn WatchExecutor>>,
    /// 시작 전까지 보관하는 작업
    jobs: Vec<PeriodicJob<ScriptExecution>>,
    registration: WatchRegistration,
    plans: Vec<ReceiverPlan>,
    scheduled: usize,
    registry: ProcessRegistry,
    tracker: TaskTracker,
    cancel: CancellationToken,
    done: CancellationToken,
}

impl Runner {
    /// 앱 하나의 입력을 스케줄하고, 스케줄된 입력 수를 반환합니다.
    ///
    /// 입력별 오류는 경고 로그를 남기고 해당 입력만 건너뜁니다.
    pub fn schedule_app(&mut self, app: &App) -> usize {
        let mut scheduled = 0;
        for input in &app.inputs {
            match self.schedule_input(app, input) {
                Ok(true) => scheduled += 1,
                Ok(false) => debug!(app = %app.name, input = %input.name, "input disabled"),
                Err(e) => {
                    warn!(app = %app.name, input = %input.name, error = %e, "skipping input");
                }
            }
        }
        info!(app = %app.name, inputs = app.inputs.len(), scheduled, "app scheduled");
        self.scheduled += scheduled;
        scheduled
    }

    /// 여러 앱을 순서대로 스케줄합니다.
    pub fn schedule_apps(&mut self, apps: &[App]) -> usize {
        apps.iter().map(|app| self.schedule_app(app)).sum()
    }

    fn schedule_input(&mut self, app: &App, input: &Input) -> Result<bool, LogPipelineError> {
        let name = InputName::parse(&input.name);
        match name.scheme.as_ref() {
            MONITOR_SCHEME => {
                if input.param("disabled") == Some("1") {
                    return Ok(false);
                }
                let target = WatchTarget::for_input(&app.dir, input)?;
                let operators = self.assemble(ReceiverKind::Monitor, app);
                self.plans.push(ReceiverPlan {
                    app: app.name.clone(),
                    input: input.name.clone(),
                    kind: ReceiverKind::Monitor,
                    schedule: "watch".to_owned(),
                    attributes: target.attributes.clone(),
                    operators,
                });
                self.registration.push(target);
                Ok(true)
            }
            SCRIPT_SCHEME | "" => {
                let schedule = Schedule::for_input(input, self.config.default_interval)?;
                if !schedule.is_enabled() {
                    return Ok(false);
                }
                let execution = ScriptExecution::new(input.clone(), &app.dir, Arc::clone(&self.sink))
                    .registry(self.registry.clone())
                    .tracker(self.tracker.clone())
                    .cancel_token(self.cancel.clone())
                    .drain_mode(self.config.drain_mode);
                let operators = self.assemble(ReceiverKind::Script, app);
                self.plans.push(ReceiverPlan {
                    app: app.name.clone(),
                    input: input.name.clone(),
                    kind: ReceiverKind::Script,
                    schedule: schedule.to_string(),
                    attributes: routing_attributes(input),
                    operators,
                });
                self.jobs.push(
                    PeriodicJob::new(schedule, execution, self.cancel.clone())
                        .failure_backoff(self.config.failure_backoff),
                );
                Ok(true)
            }
            other => Err(LogPipelineError::UnknownScheme {
                scheme: other.to_owned(),
            }),
        }
    }

    fn assemble(&self, kind: ReceiverKind, app: &App) -> Vec<OperatorSpec> {
        assemble_receiver(
            kind,
            &app.props,
            &app.transforms,
            &CompilerOptions::new(self.config.cook),
        )
    }

    /// 스케줄된 입력의 수신 계획
    pub fn plans(&self) -> &[ReceiverPlan] {
        &self.plans
    }

    /// 지금까지 스케줄된 입력 수 (스크립트 + 감시)
    pub fn scheduled_count(&self) -> usize {
        self.scheduled
    }

    /// 현재 상태 이름
    pub fn state_name(&self) -> &str {
        match self.state {
            RunnerState::Initialized => "initialized",
            RunnerState::Running => "running",
            RunnerState::Stopped => "stopped",
        }
    }

    /// 실행 중인 자식 프로세스 수
    pub fn running_processes(&self) -> usize {
        self.registry.len()
    }

    /// 종료가 끝나면 취소되는 토큰
    pub fn done_token(&self) -> CancellationToken {
        self.done.clone()
    }

    /// 모든 작업을 시작합니다.
    async fn launch(&mut self) -> Result<(), LogPipelineError> {
        let jobs = std::mem::take(&mut self.jobs);
        let job_count = jobs.len();
        for job in jobs {
            self.tracker.spawn(job.run());
        }

        if !self.registration.is_empty() {
            match &self.watch_executor {
                Some(executor) => {
                    executor
                        .start(self.registration.clone(), Arc::clone(&self.sink))
                        .await?;
                    info!(paths = self.registration.len(), "watch executor started");
                }
                None => {
                    info!(
                        paths = ?self.registration.include_patterns(),
                        "no watch executor configured, skipping monitored paths"
                    );
                }
            }
        }

        metrics::gauge!(m::RUNNER_SCHEDULED_INPUTS).set(self.scheduled as f64);
        info!(jobs = job_count, watched = self.registration.len(), "runner started");
        Ok(())
    }

    /// 종료합니다. 두 번째 호출부터는 아무 일도 하지 않습니다.
    pub async fn shutdown(&mut self) {
        if self.done.is_cancelled() {
            return;
        }
        info!("stopping runner");

        self.cancel.cancel();

        let signalled = self.registry.terminate_all();
        if signalled > 0 {
            info!(processes = signalled, "sent SIGTERM to running scripts");
        }

        if self.state == RunnerState::Running && !self.registration.is_empty() {
            if let Some(executor) = &self.watch_executor {
                if let Err(e) = executor.stop().await {
                    warn!(error = %e, "failed to stop watch executor");
                }
            }
        }

        self.tracker.close();
        self.tracker.wait().await;

        self.jobs.clear();
        metrics::gauge!(m::RUNNER_SCHEDULED_INPUTS).set(0.0);
        self.state = RunnerState::Stopped;
        self.done.cancel();
        info!("runner stopped");
    }
}

impl Pipeline for Runner {
    async fn start(&mut self) -> Result<(), TarunnerError> {
        match self.state {
            RunnerState::Running => return Err(PipelineError::AlreadyRunning.into()),
            RunnerState::Stopped => {
                return Err(PipelineError::InitFailed("runner already stopped".to_owned()).into());
            }
            RunnerState::Initialized => {}
        }
        if self.scheduled == 0 {
            return Err(PipelineError::NothingScheduled.into());
        }

        info!(inputs = self.scheduled, "starting runner");
        self.launch().await?;
        self.state = RunnerState::Running;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), TarunnerError> {
        self.shutdown().await;
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            RunnerState::Running => {
                if self.tracker.is_empty() && self.registration.is_empty() {
                    HealthStatus::Degraded("no active jobs".to_owned())
                } else {
                    HealthStatus::Healthy
                }
            }
            RunnerState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            RunnerState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 러너 빌더
///
/// 싱크를 지정하지 않으면 `sink_channel_capacity` 용량의 채널을 만들고 수신측을 함께 반환합니다.
pub struct RunnerBuilder {
    config: RunnerConfig,
    sink: Option<Arc<dyn RecordSink>>,
    watch_executor: Option<Arc<dyn WatchExecutor>>,
}

impl RunnerBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: RunnerConfig::default(),
            sink: None,
            watch_executor: None,
        }
    }

    /// 러너 설정을 지정합니다.
    pub fn config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// 레코드 싱크를 지정합니다.
    pub fn sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// 외부 파일 감시 엔진을 지정합니다.
    pub fn watch_executor(mut self, executor: Arc<dyn WatchExecutor>) -> Self {
        self.watch_executor = Some(executor);
        self
    }

    /// 러너를 빌드합니다.
    ///
    /// # Returns
    /// - `Runner`: 러너 인스턴스
    /// - `Option<mpsc::Receiver<Vec<LogRecord>>>`: 레코드 수신 채널 (외부 싱크를 지정한 경우 None)
    pub fn build(self) -> Result<(Runner, Option<mpsc::Receiver<Vec<LogRecord>>>), LogPipelineError> {
        self.config.validate()?;

        let (sink, rx) = match self.sink {
            Some(sink) => (sink, None),
            None => {
                let (sink, rx) = ChannelSink::channel(self.config.sink_channel_capacity);
                (Arc::new(sink) as Arc<dyn RecordSink>, Some(rx))
            }
        };

        let runner = Runner {
            config: self.config,
            state: RunnerState::Initialized,
            sink,
            watch_executor: self.watch_executor,
            jobs: Vec::new(),
            registration: WatchRegistration::new(),
            plans: Vec::new(),
            scheduled: 0,
            registry: ProcessRegistry::new(),
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            done: CancellationToken::new(),
        };
        Ok((runner, rx))
    }
}

impl Default for RunnerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
