//! 스크립트 1회 실행
//!
//! 자식 프로세스를 띄우고, 표준 입력으로 입력 디스크립터(XML)를 쓴 뒤 닫고,
//! 표준 출력을 레코드로 바꿔 싱크에 전달합니다. 실행은 드레인 태스크가
//! 끝날 때까지 반환하지 않으므로 같은 입력의 실행끼리는 겹치지 않습니다.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use tarunner_conf::Input;
use tarunner_core::metrics as m;
use tarunner_core::pipeline::BoxFuture;
use tarunner_core::record::{
    ATTR_INDEX, ATTR_SOURCE, ATTR_SOURCETYPE, DEFAULT_INDEX, LogRecord, RecordSink,
};

use crate::command::resolve_command;
use crate::config::DrainMode;
use crate::error::LogPipelineError;
use crate::supervisor::Execute;
use crate::supervisor::registry::ProcessRegistry;

/// 입력 파라미터에서 그대로 옮기는 속성 (있는 것만)
pub const PARAM_ATTRIBUTES: [&str; 4] = ["host", "index", "sourcetype", "source"];

/// 러너가 붙이는 라우팅 속성: index (기본 `main`), source (입력 이름), sourcetype (기본 빈 값)
pub fn routing_attributes(input: &Input) -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            ATTR_INDEX.to_owned(),
            input.param("index").unwrap_or(DEFAULT_INDEX).to_owned(),
        ),
        (ATTR_SOURCE.to_owned(), input.name.clone()),
        (
            ATTR_SOURCETYPE.to_owned(),
            input.param("sourcetype").unwrap_or_default().to_owned(),
        ),
    ])
}

/// `host`/`index`/`sourcetype`/`source` 파라미터 중 있는 것만 속성으로 만듭니다.
pub fn param_attributes(input: &Input) -> BTreeMap<String, String> {
    PARAM_ATTRIBUTES
        .iter()
        .filter_map(|key| input.param(key).map(|v| ((*key).to_owned(), v.to_owned())))
        .collect()
}

/// 스크립트 입력 하나의 실행기
pub struct ScriptExecution {
    input: Input,
    app_dir: PathBuf,
    attributes: BTreeMap<String, String>,
    sink: Arc<dyn RecordSink>,
    registry: ProcessRegistry,
    tracker: TaskTracker,
    cancel: CancellationToken,
    drain_mode: DrainMode,
}

impl ScriptExecution {
    /// 라우팅 속성을 붙이는 실행기를 생성합니다.
    pub fn new(input: Input, app_dir: impl Into<PathBuf>, sink: Arc<dyn RecordSink>) -> Self {
        let attributes = routing_attributes(&input);
        Self {
            input,
            app_dir: app_dir.into(),
            attributes,
            sink,
            registry: ProcessRegistry::new(),
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            drain_mode: DrainMode::default(),
        }
    }

    /// 레코드 속성을 교체합니다.
    pub fn attributes(mut self, attributes: BTreeMap<String, String>) -> Self {
        self.attributes = attributes;
        self
    }

    /// 공유 프로세스 목록을 지정합니다.
    pub fn registry(mut self, registry: ProcessRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// 드레인 태스크를 띄울 트래커를 지정합니다.
    pub fn tracker(mut self, tracker: TaskTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// 공유 취소 토큰을 지정합니다.
    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 드레인 방식을 지정합니다.
    pub fn drain_mode(mut self, mode: DrainMode) -> Self {
        self.drain_mode = mode;
        self
    }

    /// 입력
    pub fn input(&self) -> &Input {
        &self.input
    }

    /// 앱 디렉토리 (작업 디렉토리)
    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    /// 스크립트를 한 번 실행합니다.
    ///
    /// 자식이 종료되고 표준 출력이 모두 소비된 뒤 반환합니다.
    pub async fn run(&self, execution: u64) -> Result<(), LogPipelineError> {
        let command = resolve_command(&self.app_dir, &self.input.name)?;
        let command_name = command.display().to_string();

        let mut child = Command::new(&command)
            .current_dir(&self.app_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| LogPipelineError::Spawn {
                command: command_name.clone(),
                reason: e.to_string(),
            })?;
        let registration = child.id().map(|pid| self.registry.register(pid));

        debug!(
            input = %self.input.name,
            execution,
            pid = ?child.id(),
            "spawned script"
        );

        let Some(stdout) = child.stdout.take() else {
            self.abandon(&mut child, registration).await;
            return Err(LogPipelineError::Pipe("stdout not captured".to_owned()));
        };

        let drain = self.tracker.spawn(drain_output(
            stdout,
            DrainContext {
                input: self.input.name.clone(),
                attributes: self.attributes.clone(),
                sink: Arc::clone(&self.sink),
                cancel: self.cancel.clone(),
                mode: self.drain_mode,
                execution,
            },
        ));

        if let Some(mut stdin) = child.stdin.take() {
            let written = match stdin.write_all(self.input.to_xml().as_bytes()).await {
                Ok(()) => stdin.shutdown().await,
                Err(e) => Err(e),
            };
            drop(stdin);
            match written {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!(input = %self.input.name, execution, "script closed stdin early");
                }
                Err(e) => {
                    warn!(input = %self.input.name, execution, error = %e, "failed to write input descriptor");
                    self.abandon(&mut child, registration).await;
                    let _ = drain.await;
                    return Err(LogPipelineError::Pipe(format!(
                        "failed to write input descriptor: {e}"
                    )));
                }
            }
        }

        let status = child.wait().await;
        if let Some(id) = registration {
            self.registry.deregister(id);
        }
        let emitted = drain
            .await
            .map_err(|e| LogPipelineError::Pipe(format!("drain task failed: {e}")))?;
        let status = status?;

        debug!(
            input = %self.input.name,
            execution,
            records = emitted,
            status = %status,
            "script finished"
        );

        if status.success() {
            Ok(())
        } else {
            Err(LogPipelineError::ChildExit {
                command: command_name,
                status: status.to_string(),
            })
        }
    }

    /// 자식에게 SIGTERM을 보내고 종료를 기다립니다.
    async fn abandon(&self, child: &mut Child, registration: Option<u64>) {
        if let Some(id) = registration {
            self.registry.terminate(id);
        }
        if let Err(e) = child.wait().await {
            warn!(input = %self.input.name, error = %e, "failed to reap script");
        }
        if let Some(id) = registration {
            self.registry.deregister(id);
        }
    }
}

impl Execute for ScriptExecution {
    fn name(&self) -> &str {
        &self.input.name
    }

    fn execute(&self, execution: u64) -> BoxFuture<'_, Result<(), LogPipelineError>> {
        Box::pin(self.run(execution))
    }
}

struct DrainContext {
    input: String,
    attributes: BTreeMap<String, String>,
    sink: Arc<dyn RecordSink>,
    cancel: CancellationToken,
    mode: DrainMode,
    execution: u64,
}

enum Push {
    Delivered,
    Dropped,
    Cancelled,
}

impl DrainContext {
    async fn push(&self, body: String) -> Push {
        let record = LogRecord::new(body)
            .with_attributes(&self.attributes)
            .with_execution(self.execution);
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Push::Cancelled,
            result = self.sink.consume(vec![record]) => result,
        };
        match result {
            Ok(()) => {
                metrics::counter!(m::RUNNER_RECORDS_EMITTED_TOTAL, m::LABEL_INPUT => self.input.clone())
                    .increment(1);
                Push::Delivered
            }
            Err(e) => {
                metrics::counter!(m::RUNNER_SINK_ERRORS_TOTAL, m::LABEL_INPUT => self.input.clone())
                    .increment(1);
                warn!(input = %self.input, execution = self.execution, error = %e, "dropping record");
                Push::Dropped
            }
        }
    }
}

/// 표준 출력을 끝까지 읽어 레코드로 전달하고, 전달된 레코드 수를 반환합니다.
async fn drain_output<R>(reader: R, ctx: DrainContext) -> u64
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut delivered = 0;

    match ctx.mode {
        DrainMode::Lines => loop {
            let mut line = Vec::new();
            let read = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => break,
                read = reader.read_until(b'\n', &mut line) => read,
            };
            match read {
                Ok(0) => break,
                Ok(_) => match ctx.push(String::from_utf8_lossy(&line).into_owned()).await {
                    Push::Delivered => delivered += 1,
                    Push::Dropped => {}
                    Push::Cancelled => break,
                },
                Err(e) => {
                    warn!(input = %ctx.input, execution = ctx.execution, error = %e, "failed to read script output");
                    break;
                }
            }
        },
        DrainMode::WholeStream => {
            let mut body = Vec::new();
            let read = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => return delivered,
                read = reader.read_to_end(&mut body) => read,
            };
            match read {
                Ok(_) if body.is_empty() => {}
                Ok(_) => {
                    if let Push::Delivered = ctx.push(String::from_utf8_lossy(&body).into_owned()).await {
                        delivered += 1;
                    }
                }
                Err(e) => {
                    warn!(input = %ctx.input, execution = ctx.execution, error = %e, "failed to read script output");
                }
            }
        }
    }

    delivered
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tarunner_core::error::SinkError;

    use super::*;

    #[derive(Default)]
    struct VecSink {
        records: Mutex<Vec<LogRecord>>,
        fail_first: Mutex<bool>,
    }

    impl VecSink {
        fn bodies(&self) -> Vec<String> {
            self.records.lock().unwrap().iter().map(|r| r.body.clone()).collect()
        }
    }

    impl RecordSink for VecSink {
        fn consume(&self, batch: Vec<LogRecord>) -> BoxFuture<'_, Result<(), SinkError>> {
            Box::pin(async move {
                let mut fail = self.fail_first.lock().unwrap();
                if *fail {
                    *fail = false;
                    return Err(SinkError::Delivery("rejected".to_owned()));
                }
                self.records.lock().unwrap().extend(batch);
                Ok(())
            })
        }
    }

    fn context(sink: Arc<VecSink>, mode: DrainMode) -> DrainContext {
        DrainContext {
            input: "script://./bin/x.sh".to_owned(),
            attributes: BTreeMap::from([("k".to_owned(), "v".to_owned())]),
            sink,
            cancel: CancellationToken::new(),
            mode,
            execution: 3,
        }
    }

    #[test]
    fn routing_attributes_defaults() {
        let input = Input::new("script://./bin/x.sh", "ta");
        let attrs = routing_attributes(&input);
        assert_eq!(attrs[ATTR_INDEX], "main");
        assert_eq!(attrs[ATTR_SOURCE], "script://./bin/x.sh");
        assert_eq!(attrs[ATTR_SOURCETYPE], "");

        let input = input.with_param("index", "os").with_param("sourcetype", "cpu");
        let attrs = routing_attributes(&input);
        assert_eq!(attrs[ATTR_INDEX], "os");
        assert_eq!(attrs[ATTR_SOURCETYPE], "cpu");
    }

    #[test]
    fn param_attributes_only_present() {
        let input = Input::new("script://./bin/x.sh", "ta")
            .with_param("host", "web-1")
            .with_param("interval", "60");
        let attrs = param_attributes(&input);
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs["host"], "web-1");
    }

    #[tokio::test]
    async fn lines_keep_newline_and_trailing_partial() {
        let sink = Arc::new(VecSink::default());
        let data: &[u8] = b"one\ntwo\nthree";
        let delivered = drain_output(data, context(Arc::clone(&sink), DrainMode::Lines)).await;
        assert_eq!(delivered, 3);
        assert_eq!(sink.bodies(), vec!["one\n", "two\n", "three"]);

        let records = sink.records.lock().unwrap();
        assert_eq!(records[0].attribute("k"), Some("v"));
        assert_eq!(records[0].execution, Some(3));
    }

    #[tokio::test]
    async fn whole_stream_is_one_record() {
        let sink = Arc::new(VecSink::default());
        let data: &[u8] = b"a\nb\n";
        let delivered = drain_output(data, context(Arc::clone(&sink), DrainMode::WholeStream)).await;
        assert_eq!(delivered, 1);
        assert_eq!(sink.bodies(), vec!["a\nb\n"]);

        let sink = Arc::new(VecSink::default());
        let empty: &[u8] = b"";
        let delivered = drain_output(empty, context(Arc::clone(&sink), DrainMode::WholeStream)).await;
        assert_eq!(delivered, 0);
        assert!(sink.bodies().is_empty());
    }

    #[tokio::test]
    async fn sink_error_drops_record_and_continues() {
        let sink = Arc::new(VecSink::default());
        *sink.fail_first.lock().unwrap() = true;
        let data: &[u8] = b"one\ntwo\n";
        let delivered = drain_output(data, context(Arc::clone(&sink), DrainMode::Lines)).await;
        assert_eq!(delivered, 1);
        assert_eq!(sink.bodies(), vec!["two\n"]);
    }

    #[tokio::test]
    async fn cancelled_drain_emits_nothing() {
        let sink = Arc::new(VecSink::default());
        let ctx = context(Arc::clone(&sink), DrainMode::Lines);
        ctx.cancel.cancel();
        let data: &[u8] = b"one\n";
        assert_eq!(drain_output(data, ctx).await, 0);
        assert!(sink.bodies().is_empty());
    }

    #[tokio::test]
    async fn unknown_scheme_fails_before_spawn() {
        let sink: Arc<dyn RecordSink> = Arc::new(VecSink::default());
        let exec = ScriptExecution::new(Input::new("invalid://x", "ta"), "/tmp", sink);
        let err = exec.run(1).await.unwrap_err();
        assert!(matches!(err, LogPipelineError::UnknownScheme { .. }));
    }
}
