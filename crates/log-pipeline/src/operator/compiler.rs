//! 속성 하나를 연산자 체인으로 컴파일합니다.

use regex::Regex;

use tarunner_conf::{Prop, Transform};

use crate::error::LogPipelineError;
use crate::operator::{Field, OperatorKind, OperatorSpec, chain};

/// 기본 종착 연산자 id
pub const END_ID: &str = "end";

/// 컴파일 옵션
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// 확장 단계 (병합/변환/별칭) 생성 여부
    pub cook: bool,
    /// 진입 조건이 맞지 않을 때 보낼 연산자 id
    pub miss_target: String,
    /// 종료 연산자가 보낼 연산자 id
    pub terminus: String,
}

impl CompilerOptions {
    /// miss/terminus 모두 [`END_ID`]인 옵션을 생성합니다.
    pub fn new(cook: bool) -> Self {
        Self {
            cook,
            miss_target: END_ID.to_owned(),
            terminus: END_ID.to_owned(),
        }
    }

    /// miss 대상을 지정합니다.
    pub fn miss_target(mut self, target: impl Into<String>) -> Self {
        self.miss_target = target.into();
        self
    }

    /// 종착 대상을 지정합니다.
    pub fn terminus(mut self, target: impl Into<String>) -> Self {
        self.terminus = target.into();
        self
    }
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self::new(false)
    }
}

/// 속성의 진입 연산자 id
pub fn start_id(prop: &Prop) -> String {
    format!("{}-start", prop.name)
}

/// 속성의 종료 연산자 id
pub fn end_id(prop: &Prop) -> String {
    format!("{}-end", prop.name)
}

/// 변환 단계 id: `transforms-"<prop>"-"<transform>"`
pub fn transform_id(prop: &Prop, transform: &str) -> String {
    format!("transforms-{:?}-{:?}", prop.name, transform)
}

/// 진입 조건식. Default 종류는 조건이 없습니다.
pub fn condition(prop: &Prop) -> Option<String> {
    prop.kind()
        .match_attribute()
        .map(|attr| format!("attributes[{attr:?}] == {:?}", prop.match_value()))
}

/// 속성 하나를 연산자 명세 목록으로 컴파일합니다.
///
/// 생성 순서: 진입 -> (병합) -> 변환 -> 별칭 복사 -> 종료.
/// `cook`이 꺼져 있으면 진입과 종료만 생성합니다.
pub fn compile(prop: &Prop, transforms: &[Transform], options: &CompilerOptions) -> Vec<OperatorSpec> {
    let mut specs = Vec::new();

    let entry = match condition(prop) {
        None => OperatorKind::Noop { condition: None },
        Some(condition) => OperatorKind::Gate {
            condition,
            on_miss: options.miss_target.clone(),
        },
    };
    specs.push(OperatorSpec::new(start_id(prop), entry));

    if options.cook {
        if prop.should_linemerge {
            specs.push(OperatorSpec::new(
                format!("{}-recombine", prop.name),
                OperatorKind::Recombine {
                    combine_field: Field::Body,
                    combine_with: "\n".to_owned(),
                    is_first_entry: prop.break_only_before.clone(),
                },
            ));
        }

        for directive in &prop.transform_chains {
            for name in &directive.transforms {
                let Some(transform) = transforms.iter().find(|t| &t.name == name) else {
                    tracing::debug!(prop = %prop.name, transform = %name, "transform not found, skipping");
                    continue;
                };
                match transform_kind(transform) {
                    Ok(op) => specs.push(OperatorSpec::new(transform_id(prop, name), op)),
                    Err(e) => {
                        tracing::warn!(
                            prop = %prop.name,
                            transform = %name,
                            error = %e,
                            "invalid transform, skipping"
                        );
                    }
                }
            }
        }

        for alias in &prop.field_aliases {
            if alias.from.is_empty() || alias.to.is_empty() {
                tracing::warn!(prop = %prop.name, alias = %alias.name, "malformed field alias, skipping");
                continue;
            }
            specs.push(OperatorSpec::new(
                format!("{}-copy", alias.name),
                OperatorKind::Copy {
                    from: Field::attribute(&alias.from),
                    to: Field::attribute(&alias.to),
                },
            ));
        }
    }

    specs.push(OperatorSpec::new(end_id(prop), OperatorKind::Noop { condition: None }));
    chain(&mut specs, Some(options.terminus.as_str()));
    specs
}

/// 변환 설정을 검증하고 연산자 종류로 바꿉니다.
///
/// 빈 정규식, 컴파일 실패, 이름 있는 그룹도 FORMAT도 없는 경우는 에러입니다.
pub fn transform_kind(transform: &Transform) -> Result<OperatorKind, LogPipelineError> {
    if transform.regex.is_empty() {
        return Err(LogPipelineError::Config {
            field: format!("{}.REGEX", transform.name),
            reason: "missing required field 'regex'".to_owned(),
        });
    }
    let regex = Regex::new(&transform.regex)?;
    let named_groups = regex.capture_names().flatten().count();
    if named_groups == 0 && transform.format.is_empty() {
        return Err(LogPipelineError::Config {
            field: format!("{}.REGEX", transform.name),
            reason: "no named capture groups in regex pattern".to_owned(),
        });
    }
    Ok(OperatorKind::Transform {
        regex: transform.regex.clone(),
        replacement: (!transform.format.is_empty()).then(|| transform.format.clone()),
    })
}
