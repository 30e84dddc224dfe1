//! 스탠자 파서 -- `.conf` 파일을 이름 있는 스탠자 목록으로 변환합니다.
//!
//! # 문법
//! ```text
//! # 주석 (또는 ;)
//! key_before_header = 기본 스탠자에 속함
//!
//! [script://./bin/collect.sh]
//! interval = 60
//! REGEX = first \
//!         second          <- 백슬래시로 다음 줄과 이어짐
//! sourcetype = "quoted"   <- 양끝 큰따옴표는 제거
//! ```
//!
//! - 키 순서는 파일 순서를 유지하며, 같은 스탠자 안의 중복 키는 제자리에서 덮어씁니다.
//! - 같은 헤더가 다시 나오면 처음 등장한 스탠자에 병합됩니다.
//! - `[DEFAULT]` 헤더와 첫 헤더 이전의 키는 기본 스탠자에 속합니다.

use crate::error::ConfError;

/// 기본 스탠자 이름
pub const DEFAULT_STANZA: &str = "DEFAULT";

/// 하나의 `[name]` 블록
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stanza {
    name: String,
    entries: Vec<(String, String)>,
}

impl Stanza {
    /// 빈 스탠자를 생성합니다.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// 스탠자 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 키에 해당하는 값을 반환합니다.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// 파일 순서대로 (키, 값) 쌍을 순회합니다.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// 키 개수
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 키가 하나도 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 값을 설정합니다. 이미 있는 키면 위치를 유지한 채 값만 바꿉니다.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// 문자열 값을 반환합니다. 없으면 빈 문자열입니다.
    pub fn string(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_owned()
    }

    /// 정수 값을 반환합니다. 없거나 비어 있으면 0입니다.
    pub fn int(&self, key: &str) -> Result<i64, ConfError> {
        match self.get(key).map(str::trim) {
            None | Some("") => Ok(0),
            Some(raw) => raw.parse::<i64>().map_err(|e| self.invalid(key, e.to_string())),
        }
    }

    /// 불리언 값을 반환합니다. 없거나 비어 있으면 false 입니다.
    pub fn bool(&self, key: &str) -> Result<bool, ConfError> {
        match self.get(key).map(str::trim) {
            None | Some("") => Ok(false),
            Some(raw) => parse_bool(raw)
                .ok_or_else(|| self.invalid(key, format!("'{raw}' is not a boolean"))),
        }
    }

    fn invalid(&self, key: &str, reason: String) -> ConfError {
        ConfError::InvalidValue {
            stanza: self.name.clone(),
            key: key.to_owned(),
            reason,
        }
    }
}

/// 파싱된 `.conf` 파일
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StanzaFile {
    default: Stanza,
    stanzas: Vec<Stanza>,
}

impl StanzaFile {
    /// 기본 스탠자 (첫 헤더 이전의 키와 `[DEFAULT]`)
    pub fn default_stanza(&self) -> &Stanza {
        &self.default
    }

    /// 이름 있는 스탠자를 파일 순서대로 반환합니다.
    pub fn stanzas(&self) -> &[Stanza] {
        &self.stanzas
    }

    /// 이름으로 스탠자를 찾습니다.
    pub fn get(&self, name: &str) -> Option<&Stanza> {
        self.stanzas.iter().find(|s| s.name == name)
    }

    fn stanza_index(&mut self, name: &str) -> usize {
        match self.stanzas.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                self.stanzas.push(Stanza::new(name));
                self.stanzas.len() - 1
            }
        }
    }
}

/// 바이트 페이로드를 파싱합니다. UTF-8 이 아니면 문법 오류입니다.
pub fn parse_bytes(payload: &[u8]) -> Result<StanzaFile, ConfError> {
    match std::str::from_utf8(payload) {
        Ok(text) => parse_stanzas(text),
        Err(e) => {
            let valid = &payload[..e.valid_up_to()];
            let line = valid.iter().filter(|b| **b == b'\n').count() + 1;
            Err(ConfError::Syntax {
                line,
                reason: "invalid UTF-8".to_owned(),
            })
        }
    }
}

/// 스탠자 텍스트를 파싱합니다.
///
/// 잘못된 줄이 하나라도 있으면 전체 파싱이 실패합니다.
pub fn parse_stanzas(text: &str) -> Result<StanzaFile, ConfError> {
    let mut file = StanzaFile {
        default: Stanza::new(DEFAULT_STANZA),
        stanzas: Vec::new(),
    };
    // None 이면 기본 스탠자
    let mut current: Option<usize> = None;
    let mut lines = text.lines().enumerate();

    while let Some((index, raw)) = lines.next() {
        let line = index + 1;
        let trimmed = raw.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if trimmed.starts_with('[') {
            let name = trimmed
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
                .ok_or_else(|| ConfError::Syntax {
                    line,
                    reason: "unterminated stanza header".to_owned(),
                })?
                .trim();
            if name.is_empty() {
                return Err(ConfError::Syntax {
                    line,
                    reason: "empty stanza name".to_owned(),
                });
            }
            current = if name == DEFAULT_STANZA {
                None
            } else {
                Some(file.stanza_index(name))
            };
            continue;
        }

        let mut logical = trimmed.to_owned();
        while logical.ends_with('\\') {
            logical.pop();
            match lines.next() {
                Some((_, next)) => {
                    logical.push('\n');
                    logical.push_str(next.trim());
                }
                None => break,
            }
        }

        let (key, value) = logical.split_once('=').ok_or_else(|| ConfError::Syntax {
            line,
            reason: format!("expected 'key = value', got '{trimmed}'"),
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfError::Syntax {
                line,
                reason: "empty key".to_owned(),
            });
        }
        let value = unquote(value.trim());

        let target = match current {
            Some(index) => &mut file.stanzas[index],
            None => &mut file.default,
        };
        target.set(key, value);
    }

    Ok(file)
}

/// 불리언 문자열을 해석합니다 (대소문자 무시).
///
/// `1/t/true/yes/y/on` → true, `0/f/false/no/n/off` → false
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "f" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headers_and_keys_in_order() {
        let file = parse_stanzas(
            "[otlpinput]\nstart_by_shell = false\ninterval = 0\nsourcetype = _otlpinput\nindex =\n",
        )
        .unwrap();
        assert_eq!(file.stanzas().len(), 1);
        let stanza = &file.stanzas()[0];
        assert_eq!(stanza.name(), "otlpinput");
        let keys: Vec<&str> = stanza.entries().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["start_by_shell", "interval", "sourcetype", "index"]);
        assert_eq!(stanza.get("index"), Some(""));
    }

    #[test]
    fn keys_before_header_go_to_default() {
        let file = parse_stanzas("host = a\n[foo]\nx = 1\n[DEFAULT]\nindex = ops\n").unwrap();
        assert_eq!(file.default_stanza().get("host"), Some("a"));
        assert_eq!(file.default_stanza().get("index"), Some("ops"));
        assert_eq!(file.stanzas().len(), 1);
    }

    #[test]
    fn lowercase_default_is_a_named_stanza() {
        let file = parse_stanzas("[default]\nTIME_PREFIX = ^\n").unwrap();
        assert_eq!(file.stanzas().len(), 1);
        assert_eq!(file.stanzas()[0].name(), "default");
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let file = parse_stanzas("# top\n\n; other\n[a]\n  # indented\nk = v\n").unwrap();
        assert_eq!(file.get("a").unwrap().len(), 1);
    }

    #[test]
    fn repeated_key_overwrites_in_place() {
        let file = parse_stanzas("[a]\nx = 1\ny = 2\nx = 3\n").unwrap();
        let entries: Vec<(&str, &str)> = file.get("a").unwrap().entries().collect();
        assert_eq!(entries, vec![("x", "3"), ("y", "2")]);
    }

    #[test]
    fn repeated_header_merges_into_first() {
        let file = parse_stanzas("[a]\nx = 1\n[b]\nz = 0\n[a]\ny = 2\n").unwrap();
        assert_eq!(file.stanzas().len(), 2);
        assert_eq!(file.stanzas()[0].name(), "a");
        assert_eq!(file.get("a").unwrap().get("y"), Some("2"));
    }

    #[test]
    fn backslash_continues_value() {
        let file = parse_stanzas("[t]\nREGEX = foo\\\n   bar\nFORMAT = x\n").unwrap();
        let stanza = file.get("t").unwrap();
        assert_eq!(stanza.get("REGEX"), Some("foo\nbar"));
        assert_eq!(stanza.get("FORMAT"), Some("x"));
    }

    #[test]
    fn surrounding_quotes_are_stripped() {
        let file = parse_stanzas("[q]\na = \"hello world\"\nb = \"\nc = say \"hi\"\n").unwrap();
        let stanza = file.get("q").unwrap();
        assert_eq!(stanza.get("a"), Some("hello world"));
        assert_eq!(stanza.get("b"), Some("\""));
        assert_eq!(stanza.get("c"), Some("say \"hi\""));
    }

    #[test]
    fn value_may_contain_equals_sign() {
        let file = parse_stanzas("[r]\nREGEX = (?<k>a=b)\n").unwrap();
        assert_eq!(file.get("r").unwrap().get("REGEX"), Some("(?<k>a=b)"));
    }

    #[test]
    fn unterminated_header_fails_with_line() {
        let err = parse_stanzas("[ok]\nk = v\n[broken\n").unwrap_err();
        assert!(matches!(err, ConfError::Syntax { line: 3, .. }));
    }

    #[test]
    fn line_without_equals_fails() {
        let err = parse_stanzas("[a]\njust some words\n").unwrap_err();
        assert!(matches!(err, ConfError::Syntax { line: 2, .. }));
    }

    #[test]
    fn empty_key_fails() {
        let err = parse_stanzas("[a]\n = value\n").unwrap_err();
        assert!(err.to_string().contains("empty key"));
    }

    #[test]
    fn invalid_utf8_reports_line() {
        let err = parse_bytes(b"[a]\nk = \xff\n").unwrap_err();
        assert!(matches!(err, ConfError::Syntax { line: 2, .. }));
    }

    #[test]
    fn typed_accessors() {
        let file = parse_stanzas("[p]\nN = 128\nB = Yes\nBAD = maybe\nE =\n").unwrap();
        let stanza = file.get("p").unwrap();
        assert_eq!(stanza.int("N").unwrap(), 128);
        assert_eq!(stanza.int("MISSING").unwrap(), 0);
        assert_eq!(stanza.int("E").unwrap(), 0);
        assert!(stanza.bool("B").unwrap());
        assert!(!stanza.bool("MISSING").unwrap());
        assert!(stanza.bool("BAD").is_err());
        assert!(stanza.int("B").is_err());
    }

    #[test]
    fn parse_bool_accepts_all_spellings() {
        for t in ["1", "t", "T", "true", "TRUE", "yes", "y", "on", "On"] {
            assert_eq!(parse_bool(t), Some(true), "{t}");
        }
        for f in ["0", "f", "false", "False", "no", "n", "off", "OFF"] {
            assert_eq!(parse_bool(f), Some(false), "{f}");
        }
        assert_eq!(parse_bool("2"), None);
    }

    #[test]
    fn crlf_line_endings() {
        let file = parse_stanzas("[a]\r\nx = 1\r\n").unwrap();
        assert_eq!(file.get("a").unwrap().get("x"), Some("1"));
    }
}
