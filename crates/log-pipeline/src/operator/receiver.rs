//! 수신기 단위 연산자 체인 조립
//!
//! 모든 속성 체인을 우선순위 순서로 이어 붙입니다. 앞선 속성의 진입 조건이 맞지 않으면
//! 다음 속성의 진입 연산자로, 맞으면 해당 체인을 거쳐 곧바로 공통 종료 연산자로 갑니다.

use serde::Serialize;

use tarunner_conf::{Prop, Transform, resolve};
use tarunner_core::record::{ATTR_HOST, ATTR_INDEX, ATTR_SOURCE, ATTR_SOURCETYPE};

use crate::operator::compiler::{CompilerOptions, compile, start_id};
use crate::operator::{Field, OperatorKind, OperatorSpec, chain};

/// 파일 감시 엔진이 채우는 파일 경로 속성
pub const FILE_PATH_ATTRIBUTE: &str = "log.file.path";

/// 종료 후 `com.splunk.*`로 옮기는 라우팅 속성 (순서대로 연결)
const RENAMED_ATTRIBUTES: [&str; 4] = [ATTR_SOURCE, ATTR_SOURCETYPE, ATTR_HOST, ATTR_INDEX];

/// 수신기 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiverKind {
    /// 스크립트 실행 입력
    Script,
    /// 파일 감시 입력
    Monitor,
}

/// 수신기 하나의 전체 연산자 체인을 조립합니다.
///
/// `options.cook`만 사용하며, 공통 종료 연산자의 id는 `options.terminus`입니다.
pub fn assemble_receiver(
    kind: ReceiverKind,
    props: &[Prop],
    transforms: &[Transform],
    options: &CompilerOptions,
) -> Vec<OperatorSpec> {
    let end = options.terminus.clone();
    let resolved = resolve(props);
    let starts: Vec<String> = resolved.iter().map(start_id).collect();

    let mut specs = vec![
        OperatorSpec::new(
            "start",
            OperatorKind::Move {
                from: Field::attribute(FILE_PATH_ATTRIBUTE),
                to: Field::attribute(ATTR_SOURCE),
            },
        )
        .output(starts.first().unwrap_or(&end))
        .quiet(),
    ];

    for (i, prop) in resolved.iter().enumerate() {
        let prop_options = CompilerOptions::new(options.cook)
            .miss_target(starts.get(i + 1).unwrap_or(&end))
            .terminus(&end);
        specs.extend(compile(prop, transforms, &prop_options));
    }

    match kind {
        ReceiverKind::Monitor => {
            specs.push(OperatorSpec::new(end, OperatorKind::Noop { condition: None }));
        }
        ReceiverKind::Script => {
            let mut tail = vec![OperatorSpec::new(end, OperatorKind::Noop { condition: None })];
            tail.extend(RENAMED_ATTRIBUTES.iter().map(|attr| {
                OperatorSpec::new(
                    format!("end-{attr}"),
                    OperatorKind::Move {
                        from: Field::attribute(*attr),
                        to: Field::attribute(format!("com.splunk.{attr}")),
                    },
                )
                .quiet()
            }));
            chain(&mut tail, None);
            specs.extend(tail);
        }
    }

    specs
}
