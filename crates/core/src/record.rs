//! 로그 레코드 -- 수집 결과의 기본 단위
//!
//! 스크립트 입력의 출력 한 줄(또는 스트림 전체)이 하나의 [`LogRecord`]가 되며,
//! [`RecordSink`]를 통해 하류 소비자(포워더 등)로 전달됩니다.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::SinkError;
use crate::pipeline::BoxFuture;

// --- 라우팅 속성 키 ---
//
// 속성 게이트가 검사하는 키 그대로입니다. `com.splunk.*`로의 이름 변경은
// 스크립트 수신기 체인의 `end-*` 연산자가 담당합니다.

/// 인덱스 속성 키
pub const ATTR_INDEX: &str = "index";
/// 소스 속성 키
pub const ATTR_SOURCE: &str = "source";
/// 소스타입 속성 키
pub const ATTR_SOURCETYPE: &str = "sourcetype";
/// 호스트 속성 키
pub const ATTR_HOST: &str = "host";

/// 인덱스 파라미터가 없을 때 사용하는 기본 인덱스
pub const DEFAULT_INDEX: &str = "main";

/// 구조화된 로그 레코드
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// 원문 (줄 단위 모드에서는 개행 문자를 포함)
    pub body: String,
    /// 리소스 수준 라우팅 속성
    pub attributes: BTreeMap<String, String>,
    /// 관측 시각
    pub observed_at: SystemTime,
    /// 레코드를 생성한 스크립트 실행 순번
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<u64>,
}

impl LogRecord {
    /// 현재 시각으로 새 레코드를 생성합니다.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            attributes: BTreeMap::new(),
            observed_at: SystemTime::now(),
            execution: None,
        }
    }

    /// 속성을 추가합니다.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// 속성 묶음을 덮어씁니다.
    pub fn with_attributes(mut self, attributes: &BTreeMap<String, String>) -> Self {
        self.attributes
            .extend(attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// 실행 순번을 설정합니다.
    pub fn with_execution(mut self, seq: u64) -> Self {
        self.execution = Some(seq);
        self
    }

    /// 속성 값을 조회합니다.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// 관측 시각을 Unix epoch 밀리초로 반환합니다.
    pub fn observed_unix_millis(&self) -> u128 {
        self.observed_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0)
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] source={} body={:?}",
            self.observed_unix_millis(),
            self.attribute(ATTR_SOURCE).unwrap_or("-"),
            self.body.trim_end_matches('\n'),
        )
    }
}

/// 레코드 배치를 받아들이는 하류 소비자
///
/// 구현체는 `Arc<dyn RecordSink>`로 여러 태스크에서 공유됩니다.
pub trait RecordSink: Send + Sync {
    /// 레코드 배치를 소비합니다.
    fn consume(&self, batch: Vec<LogRecord>) -> BoxFuture<'_, Result<(), SinkError>>;
}
