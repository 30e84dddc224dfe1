//! 연산자 체인 -- props/transforms 설정을 실행 엔진이 해석할 연산자 명세로 컴파일합니다.
//!
//! 실행 엔진은 외부에 있으므로 여기서는 명세([`OperatorSpec`])만 생성합니다.
//! 모든 명세는 serde로 직렬화되어 실행 계획으로 출력할 수 있습니다.
//!
//! # 아키텍처
//! ```text
//! Prop + [Transform] --compile--> [OperatorSpec] (start -> recombine -> transforms -> copies -> end)
//! resolve(props) --assemble_receiver--> start -> chain(p1) -> chain(p2) -> ... -> end [-> rename]
//! ```

pub mod compiler;
pub mod receiver;

use std::fmt;

use serde::{Serialize, Serializer};

pub use compiler::{CompilerOptions, compile};
pub use receiver::{ReceiverKind, assemble_receiver};

/// 레코드 필드 참조
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    /// 레코드 본문
    Body,
    /// 이름 있는 속성
    Attribute(String),
}

impl Field {
    /// 속성 필드를 생성합니다.
    pub fn attribute(name: impl Into<String>) -> Self {
        Self::Attribute(name.into())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Body => write!(f, "body"),
            Self::Attribute(name) => write!(f, "attributes.{name}"),
        }
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 연산자 실패 시 동작
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OnError {
    /// 에러를 기록하고 다음 연산자로 전달
    #[default]
    Send,
    /// 에러를 기록하지 않고 다음 연산자로 전달
    SendQuiet,
}

impl OnError {
    fn is_default(&self) -> bool {
        *self == Self::Send
    }
}

/// 연산자 종류
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperatorKind {
    /// 아무 것도 하지 않음
    Noop {
        #[serde(skip_serializing_if = "Option::is_none")]
        condition: Option<String>,
    },
    /// 조건이 맞으면 출력으로, 아니면 `on_miss`로 보냄
    Gate { condition: String, on_miss: String },
    /// 여러 레코드를 하나로 병합
    Recombine {
        combine_field: Field,
        combine_with: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_first_entry: Option<String>,
    },
    /// 정규식 치환/추출
    Transform {
        regex: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        replacement: Option<String>,
    },
    /// 필드 복사
    Copy { from: Field, to: Field },
    /// 필드 이동
    Move { from: Field, to: Field },
}

/// 연산자 명세 한 단계
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorSpec {
    pub id: String,
    #[serde(flatten)]
    pub op: OperatorKind,
    pub outputs: Vec<String>,
    #[serde(skip_serializing_if = "OnError::is_default")]
    pub on_error: OnError,
}

impl OperatorSpec {
    /// 출력이 없는 명세를 생성합니다.
    pub fn new(id: impl Into<String>, op: OperatorKind) -> Self {
        Self {
            id: id.into(),
            op,
            outputs: Vec::new(),
            on_error: OnError::Send,
        }
    }

    /// 출력 연산자를 지정합니다.
    pub fn output(mut self, target: impl Into<String>) -> Self {
        self.outputs = vec![target.into()];
        self
    }

    /// 실패를 조용히 넘기도록 합니다.
    pub fn quiet(mut self) -> Self {
        self.on_error = OnError::SendQuiet;
        self
    }
}

/// 명세 목록을 순서대로 연결합니다. 마지막 단계는 `last_output`으로 보냅니다.
pub(crate) fn chain(specs: &mut [OperatorSpec], last_output: Option<&str>) {
    let ids: Vec<String> = specs.iter().map(|s| s.id.clone()).collect();
    for (i, spec) in specs.iter_mut().enumerate() {
        match ids.get(i + 1) {
            Some(next) => spec.outputs = vec![next.clone()],
            None => {
                if let Some(target) = last_output {
                    spec.outputs = vec![target.to_owned()];
                }
            }
        }
    }
}
