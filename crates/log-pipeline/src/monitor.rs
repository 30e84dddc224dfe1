//! 파일 감시 입력 등록
//!
//! `monitor://` 입력은 직접 실행하지 않고, 모든 입력을 스케줄한 뒤
//! 하나의 [`WatchRegistration`]으로 모아 외부 [`WatchExecutor`]에 넘깁니다.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use tarunner_conf::Input;
use tarunner_core::pipeline::BoxFuture;
use tarunner_core::record::RecordSink;

use crate::command::resolve_monitor_path;
use crate::error::LogPipelineError;
use crate::supervisor::param_attributes;

/// 감시 대상 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchTarget {
    /// 입력 이름
    pub input: String,
    /// 해석된 감시 경로
    pub path: PathBuf,
    /// 포함 패턴 (`whitelist`가 있으면 경로 아래로, 없으면 경로 자체)
    pub include: Vec<PathBuf>,
    /// 제외 패턴 (`blacklist`)
    pub exclude: Vec<PathBuf>,
    /// 레코드에 붙일 속성 (`host`/`index`/`sourcetype`/`source` 파라미터)
    pub attributes: BTreeMap<String, String>,
}

impl WatchTarget {
    /// `monitor://` 입력에서 감시 대상을 만듭니다.
    pub fn for_input(base: &Path, input: &Input) -> Result<Self, LogPipelineError> {
        let path = resolve_monitor_path(base, &input.name)?;
        let include = match input.param("whitelist") {
            Some(pattern) => path.join(pattern),
            None => path.clone(),
        };
        let exclude = input
            .param("blacklist")
            .map(|pattern| path.join(pattern))
            .into_iter()
            .collect();
        Ok(Self {
            input: input.name.clone(),
            include: vec![include],
            exclude,
            attributes: param_attributes(input),
            path,
        })
    }
}

/// 외부 감시 엔진에 넘기는 등록 정보
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WatchRegistration {
    targets: Vec<WatchTarget>,
}

impl WatchRegistration {
    /// 빈 등록을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 대상을 추가합니다.
    pub fn push(&mut self, target: WatchTarget) {
        self.targets.push(target);
    }

    /// 등록된 대상
    pub fn targets(&self) -> &[WatchTarget] {
        &self.targets
    }

    /// 대상 수
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// 전체 포함 패턴
    pub fn include_patterns(&self) -> Vec<&Path> {
        self.targets
            .iter()
            .flat_map(|t| t.include.iter().map(PathBuf::as_path))
            .collect()
    }

    /// 전체 제외 패턴
    pub fn exclude_patterns(&self) -> Vec<&Path> {
        self.targets
            .iter()
            .flat_map(|t| t.exclude.iter().map(PathBuf::as_path))
            .collect()
    }
}

/// 외부 파일 감시 엔진
///
/// 파일 추적(tailing) 자체는 이 크레이트의 범위 밖이며, 엔진은
/// 읽은 줄을 `sink`로 전달해야 합니다.
pub trait WatchExecutor: Send + Sync {
    /// 감시를 시작합니다.
    fn start(
        &self,
        registration: WatchRegistration,
        sink: Arc<dyn RecordSink>,
    ) -> BoxFuture<'_, Result<(), LogPipelineError>>;

    /// 감시를 중단합니다.
    fn stop(&self) -> BoxFuture<'_, Result<(), LogPipelineError>>;
}
