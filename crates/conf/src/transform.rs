//! 변환(Transform) 모델 -- transforms.conf 의 `REGEX` / `FORMAT` 정의

use serde::Serialize;

use crate::error::ConfError;
use crate::stanza::parse_bytes;

/// 이름 있는 정규식 변환
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transform {
    /// 스탠자 이름
    pub name: String,
    /// 정규식
    pub regex: String,
    /// 치환 템플릿 (비어 있으면 치환 없음)
    pub format: String,
}

impl Transform {
    /// 새 변환을 생성합니다.
    pub fn new(
        name: impl Into<String>,
        regex: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            regex: regex.into(),
            format: format.into(),
        }
    }
}

/// transforms.conf 페이로드에서 변환 목록을 읽습니다.
pub fn read_transforms(payload: &[u8]) -> Result<Vec<Transform>, ConfError> {
    let file = parse_bytes(payload)?;
    Ok(file
        .stanzas()
        .iter()
        .map(|stanza| Transform {
            name: stanza.name().to_owned(),
            regex: stanza.string("REGEX"),
            format: stanza.string("FORMAT"),
        })
        .collect())
}
