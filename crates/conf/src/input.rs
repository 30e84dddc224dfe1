//! 입력(Input) 모델 -- inputs.conf 스탠자 하나가 스케줄 단위 하나가 됩니다.
//!
//! 자식 프로세스에는 [`Input::to_xml`]로 만든 입력 디스크립터가 표준 입력으로 전달됩니다.

use std::fmt::Write as _;

use serde::Serialize;

use crate::error::ConfError;
use crate::stanza::parse_bytes;

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// 입력 파라미터
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    /// 파라미터 이름
    pub name: String,
    /// 파라미터 값
    pub value: String,
}

/// 순서가 보존되는 파라미터 목록
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Params(Vec<Param>);

impl Params {
    /// 이름이 일치하는 첫 번째 파라미터 값을 반환합니다.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    /// 파라미터를 파일 순서대로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.0.iter()
    }

    /// 파라미터 개수
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 파라미터를 추가합니다.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push(Param {
            name: name.into(),
            value: value.into(),
        });
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| Param { name, value })
                .collect(),
        )
    }
}

/// 스케줄 단위 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Input {
    /// URI 형태의 입력 이름 (`script://./bin/x.sh`, `monitor:///var/log`, `collect`)
    pub name: String,
    /// 소속 앱 이름
    pub app: String,
    /// 파라미터
    pub params: Params,
    /// 디스크립터 전달용 메타데이터
    pub server_host: String,
    /// 디스크립터 전달용 메타데이터
    pub server_uri: String,
    /// 디스크립터 전달용 메타데이터
    pub session_key: String,
    /// 디스크립터 전달용 메타데이터
    pub checkpoint_dir: String,
}

impl Input {
    /// 파라미터 없는 입력을 생성합니다.
    pub fn new(name: impl Into<String>, app: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            app: app.into(),
            params: Params::default(),
            server_host: String::new(),
            server_uri: String::new(),
            session_key: String::new(),
            checkpoint_dir: String::new(),
        }
    }

    /// 파라미터를 추가합니다.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push(name, value);
        self
    }

    /// 파라미터 값을 조회합니다.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// 입력 디스크립터 XML 문서를 생성합니다.
    ///
    /// ```text
    /// <?xml version="1.0" encoding="UTF-8"?>
    /// <Input>
    ///   <server_host></server_host>
    ///   ...
    ///   <configuration>
    ///     <stanza name="..." app="...">
    ///       <param name="interval">60</param>
    ///     </stanza>
    ///   </configuration>
    /// </Input>
    /// ```
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(256 + self.params.len() * 48);
        out.push_str(XML_DECLARATION);
        out.push_str("<Input>\n");
        for (tag, value) in [
            ("server_host", &self.server_host),
            ("server_uri", &self.server_uri),
            ("session_key", &self.session_key),
            ("checkpoint_dir", &self.checkpoint_dir),
        ] {
            let _ = writeln!(out, "  <{tag}>{}</{tag}>", escape(value));
        }
        out.push_str("  <configuration>\n");
        let _ = write!(
            out,
            "    <stanza name=\"{}\" app=\"{}\">",
            escape(&self.name),
            escape(&self.app)
        );
        if !self.params.is_empty() {
            out.push('\n');
            for param in self.params.iter() {
                let _ = writeln!(
                    out,
                    "      <param name=\"{}\">{}</param>",
                    escape(&param.name),
                    escape(&param.value)
                );
            }
            out.push_str("    ");
        }
        out.push_str("</stanza>\n");
        out.push_str("  </configuration>\n");
        out.push_str("</Input>");
        out
    }
}

/// inputs.conf 페이로드에서 입력 목록을 읽습니다.
///
/// 기본 스탠자는 건너뛰고, 이름 있는 스탠자마다 입력 하나를 만듭니다.
pub fn read_inputs(payload: &[u8], app: &str) -> Result<Vec<Input>, ConfError> {
    let file = parse_bytes(payload)?;
    Ok(file
        .stanzas()
        .iter()
        .map(|stanza| Input {
            params: stanza
                .entries()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
            ..Input::new(stanza.name(), app)
        })
        .collect())
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_INPUT: &str = "\
[otlpinput]
start_by_shell = false
interval = 0
sourcetype = _otlpinput
index =
grpc_port = 4317
http_port = 4318
listen_address = 0.0.0.0
";

    #[test]
    fn reads_one_input_with_ordered_params() {
        let inputs = read_inputs(ONE_INPUT.as_bytes(), "tarunner").unwrap();
        assert_eq!(inputs.len(), 1);
        let input = &inputs[0];
        assert_eq!(input.name, "otlpinput");
        assert_eq!(input.app, "tarunner");
        assert_eq!(input.params.len(), 7);
        let names: Vec<&str> = input.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "start_by_shell",
                "interval",
                "sourcetype",
                "index",
                "grpc_port",
                "http_port",
                "listen_address"
            ]
        );
        assert_eq!(input.param("index"), Some(""));
        assert_eq!(input.server_host, "");
    }

    #[test]
    fn reads_two_inputs_skipping_default() {
        let text = "disabled = 0\n[a]\ninterval = 1\n[otlpinput/2]\nindex = nondefault\n";
        let inputs = read_inputs(text.as_bytes(), "app").unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[1].name, "otlpinput/2");
        assert_eq!(inputs[1].param("index"), Some("nondefault"));
        assert_eq!(inputs[0].param("disabled"), None);
    }

    #[test]
    fn empty_file_yields_no_inputs() {
        assert!(read_inputs(b"", "app").unwrap().is_empty());
    }

    #[test]
    fn to_xml_matches_descriptor_layout() {
        let mut input = read_inputs(ONE_INPUT.as_bytes(), "tarunner")
            .unwrap()
            .remove(0);
        input.server_host = "773c28971b2a".to_owned();
        input.server_uri = "https://127.0.0.1:8089".to_owned();
        input.session_key = "OwLHq7jpfgz0WLe5t8KwZuxT4QZRggryMB2io6Phimb2zi5ErifFvx0Eu8WTmfviO^KUKEA8CsGbVltVlCDlYOBM0RE8QoOjOHZhKnHsphk20XoqaK1KXTZj1N".to_owned();
        input.checkpoint_dir = "/opt/splunk/var/lib/splunk/modinputs/otlpinput".to_owned();

        let expected = r#"<?xml version="1.0" encoding="UTF-8"?>
<Input>
  <server_host>773c28971b2a</server_host>
  <server_uri>https://127.0.0.1:8089</server_uri>
  <session_key>OwLHq7jpfgz0WLe5t8KwZuxT4QZRggryMB2io6Phimb2zi5ErifFvx0Eu8WTmfviO^KUKEA8CsGbVltVlCDlYOBM0RE8QoOjOHZhKnHsphk20XoqaK1KXTZj1N</session_key>
  <checkpoint_dir>/opt/splunk/var/lib/splunk/modinputs/otlpinput</checkpoint_dir>
  <configuration>
    <stanza name="otlpinput" app="tarunner">
      <param name="start_by_shell">false</param>
      <param name="interval">0</param>
      <param name="sourcetype">_otlpinput</param>
      <param name="index"></param>
      <param name="grpc_port">4317</param>
      <param name="http_port">4318</param>
      <param name="listen_address">0.0.0.0</param>
    </stanza>
  </configuration>
</Input>"#;
        assert_eq!(input.to_xml(), expected);
    }

    #[test]
    fn to_xml_escapes_values() {
        let input = Input::new("script://./bin/a&b.sh", "app").with_param("q", "<x> \"y\"");
        let xml = input.to_xml();
        assert!(xml.contains(r#"name="script://./bin/a&amp;b.sh""#));
        assert!(xml.contains("<param name=\"q\">&lt;x&gt; &#34;y&#34;</param>"));
    }

    #[test]
    fn to_xml_without_params() {
        let xml = Input::new("x", "app").to_xml();
        assert!(xml.contains("<stanza name=\"x\" app=\"app\"></stanza>\n"));
    }
}
