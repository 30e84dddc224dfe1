//! 속성(Prop) 모델과 우선순위 정렬
//!
//! props.conf 의 스탠자 이름은 적용 대상을 나타냅니다.
//!
//! | 이름 형태      | 종류         | 비교 속성     |
//! |----------------|--------------|---------------|
//! | `source::<v>`  | Source       | `source`      |
//! | `host::<v>`    | Host         | `host`        |
//! | `default`      | Default      | 없음          |
//! | 그 외          | SourceType   | `sourcetype`  |
//!
//! [`resolve`]는 `(kind, name)` 오름차순으로 정렬하며, 앞에 있는 항목이 우선합니다.

use serde::Serialize;

use crate::error::ConfError;
use crate::stanza::{Stanza, parse_bytes};

const SOURCE_PREFIX: &str = "source::";
const HOST_PREFIX: &str = "host::";
const DEFAULT_PROP: &str = "default";

const FIELDALIAS_PREFIX: &str = "FIELDALIAS-";
const TRANSFORMS_PREFIX: &str = "TRANSFORMS-";

/// 속성 스탠자 종류 (선언 순서가 곧 우선순위)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PropKind {
    /// `source::` 접두어
    Source,
    /// `host::` 접두어
    Host,
    /// 소스타입 이름
    SourceType,
    /// `default`
    Default,
}

impl PropKind {
    /// 스탠자 이름으로 종류를 판별합니다.
    pub fn of(name: &str) -> Self {
        if name.starts_with(SOURCE_PREFIX) {
            Self::Source
        } else if name.starts_with(HOST_PREFIX) {
            Self::Host
        } else if name == DEFAULT_PROP {
            Self::Default
        } else {
            Self::SourceType
        }
    }

    /// 레코드에서 비교할 속성 이름. Default 는 조건이 없습니다.
    pub fn match_attribute(self) -> Option<&'static str> {
        match self {
            Self::Source => Some("source"),
            Self::Host => Some("host"),
            Self::SourceType => Some("sourcetype"),
            Self::Default => None,
        }
    }
}

/// `FIELDALIAS-<name> = from AS to`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldAlias {
    /// 지시어 이름 (`FIELDALIAS-` 뒤)
    pub name: String,
    /// 원본 속성
    pub from: String,
    /// 대상 속성
    pub to: String,
}

/// `TRANSFORMS-<name> = a, b, c`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformChain {
    /// 지시어 이름 (`TRANSFORMS-` 뒤)
    pub name: String,
    /// 참조하는 변환 이름 (선언 순서)
    pub transforms: Vec<String>,
}

/// props.conf 스탠자 하나
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Prop {
    /// 스탠자 이름
    pub name: String,
    pub time_prefix: String,
    pub time_format: String,
    pub max_timestamp_lookahead: i64,
    pub datetime_config: String,
    pub no_binary_check: bool,
    /// 줄 병합 여부
    pub should_linemerge: bool,
    /// 새 레코드 시작을 판별하는 정규식
    pub break_only_before: Option<String>,
    pub category: String,
    /// 명시적 `sourcetype` 키, 없으면 SourceType 종류의 이름
    pub sourcetype: String,
    /// 필드 별칭 지시어 (파일 순서)
    pub field_aliases: Vec<FieldAlias>,
    /// 변환 체인 지시어 (파일 순서)
    pub transform_chains: Vec<TransformChain>,
}

impl Prop {
    /// 이름만 가진 속성을 생성합니다.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let sourcetype = match PropKind::of(&name) {
            PropKind::SourceType => name.clone(),
            _ => String::new(),
        };
        Self {
            name,
            sourcetype,
            ..Self::default()
        }
    }

    /// 필드 별칭을 추가합니다.
    pub fn with_alias(
        mut self,
        name: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        self.field_aliases.push(FieldAlias {
            name: name.into(),
            from: from.into(),
            to: to.into(),
        });
        self
    }

    /// 변환 체인을 추가합니다.
    pub fn with_transforms(mut self, name: impl Into<String>, transforms: &[&str]) -> Self {
        self.transform_chains.push(TransformChain {
            name: name.into(),
            transforms: transforms.iter().map(|t| (*t).to_owned()).collect(),
        });
        self
    }

    /// 줄 병합을 설정합니다.
    pub fn with_linemerge(mut self, break_only_before: Option<&str>) -> Self {
        self.should_linemerge = true;
        self.break_only_before = break_only_before.map(str::to_owned);
        self
    }

    /// 종류
    pub fn kind(&self) -> PropKind {
        PropKind::of(&self.name)
    }

    /// 비교 값 (`source::`/`host::` 접두어 제거)
    pub fn match_value(&self) -> &str {
        self.name
            .strip_prefix(SOURCE_PREFIX)
            .or_else(|| self.name.strip_prefix(HOST_PREFIX))
            .unwrap_or(&self.name)
    }

    fn from_stanza(stanza: &Stanza) -> Result<Self, ConfError> {
        let mut prop = Prop::new(stanza.name());
        prop.time_prefix = stanza.string("TIME_PREFIX");
        prop.time_format = stanza.string("TIME_FORMAT");
        prop.max_timestamp_lookahead = stanza.int("MAX_TIMESTAMP_LOOKAHEAD")?;
        prop.datetime_config = stanza.string("DATETIME_CONFIG");
        prop.no_binary_check = stanza.bool("NO_BINARY_CHECK")?;
        prop.should_linemerge = stanza.bool("SHOULD_LINEMERGE")?;
        prop.break_only_before = stanza
            .get("BREAK_ONLY_BEFORE")
            .filter(|v| !v.is_empty())
            .map(str::to_owned);
        prop.category = stanza.string("category");
        if let Some(sourcetype) = stanza.get("sourcetype") {
            prop.sourcetype = sourcetype.to_owned();
        }

        for (key, value) in stanza.entries() {
            if let Some(name) = key.strip_prefix(FIELDALIAS_PREFIX) {
                let (from, to) = parse_alias(value);
                prop.field_aliases.push(FieldAlias {
                    name: name.to_owned(),
                    from,
                    to,
                });
            } else if let Some(name) = key.strip_prefix(TRANSFORMS_PREFIX) {
                prop.transform_chains.push(TransformChain {
                    name: name.to_owned(),
                    transforms: value
                        .split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_owned)
                        .collect(),
                });
            }
        }

        Ok(prop)
    }
}

/// props.conf 페이로드에서 속성 목록을 읽습니다.
///
/// 타입이 정해진 필드가 잘못되면 전체 읽기가 실패합니다.
pub fn read_props(payload: &[u8]) -> Result<Vec<Prop>, ConfError> {
    let file = parse_bytes(payload)?;
    file.stanzas().iter().map(Prop::from_stanza).collect()
}

/// 우선순위 순서로 정렬된 속성 목록을 반환합니다.
pub fn resolve(props: &[Prop]) -> Vec<Prop> {
    let mut sorted = props.to_vec();
    sorted.sort_by(|a, b| (a.kind(), &a.name).cmp(&(b.kind(), &b.name)));
    sorted
}

/// `"from AS to"` 별칭 식을 해석합니다 (`AS` 대소문자 무시).
///
/// 형식이 맞지 않으면 두 빈 문자열을 반환합니다.
pub fn parse_alias(expr: &str) -> (String, String) {
    let tokens: Vec<&str> = expr.split_whitespace().collect();
    match tokens.as_slice() {
        [from, keyword, to] if keyword.eq_ignore_ascii_case("as") => {
            ((*from).to_owned(), (*to).to_owned())
        }
        _ => (String::new(), String::new()),
    }
}
