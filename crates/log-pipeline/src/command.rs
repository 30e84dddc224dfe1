//! 명령 경로 해석
//!
//! 입력 이름(`script://./bin/foo.sh`, `monitor:///var/log`, `foo`)을
//! 앱 디렉토리 기준의 실행 파일/감시 경로로 바꿉니다.
//! 상대 경로는 어휘적으로 정규화한 뒤 앱 디렉토리의 하위인지 검사합니다.

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use crate::error::LogPipelineError;

/// 스크립트 스킴
pub const SCRIPT_SCHEME: &str = "script";
/// 파일 감시 스킴
pub const MONITOR_SCHEME: &str = "monitor";

const SCHEME_SEPARATOR: &str = "://";

/// 스킴과 위치로 나눈 입력 이름
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputName<'a> {
    /// 소문자로 바꾼 스킴 (없으면 빈 문자열)
    pub scheme: Cow<'a, str>,
    /// `://` 뒤의 위치 (스킴이 없으면 이름 전체)
    pub location: &'a str,
}

impl<'a> InputName<'a> {
    /// 입력 이름을 나눕니다.
    pub fn parse(name: &'a str) -> Self {
        if let Some((scheme, location)) = name.split_once(SCHEME_SEPARATOR) {
            if is_valid_scheme(scheme) {
                let scheme = if scheme.bytes().any(|b| b.is_ascii_uppercase()) {
                    Cow::Owned(scheme.to_ascii_lowercase())
                } else {
                    Cow::Borrowed(scheme)
                };
                return Self { scheme, location };
            }
        }
        Self {
            scheme: Cow::Borrowed(""),
            location: name,
        }
    }
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// 입력 이름에서 실행할 명령의 절대 경로를 구합니다.
///
/// - `script://<path>`: 앱 디렉토리 기준 경로
/// - 스킴 없음: `bin/<os>_<arch>/<name>`
/// - 그 외 스킴: [`LogPipelineError::UnknownScheme`]
pub fn resolve_command(base: &Path, input_name: &str) -> Result<PathBuf, LogPipelineError> {
    let name = InputName::parse(input_name);
    match name.scheme.as_ref() {
        SCRIPT_SCHEME => resolve_path(base, Path::new(name.location)),
        "" => resolve_path(base, &platform_dir().join(name.location)),
        other => Err(LogPipelineError::UnknownScheme {
            scheme: other.to_owned(),
        }),
    }
}

/// `monitor://` 입력의 감시 경로를 구합니다. 절대 경로는 그대로 사용합니다.
pub fn resolve_monitor_path(base: &Path, input_name: &str) -> Result<PathBuf, LogPipelineError> {
    let name = InputName::parse(input_name);
    if name.scheme != MONITOR_SCHEME {
        return Err(LogPipelineError::UnknownScheme {
            scheme: name.scheme.into_owned(),
        });
    }
    resolve_path(base, Path::new(name.location))
}

/// 기준 디렉토리 아래의 경로를 구합니다.
///
/// 절대 경로는 검사 없이 그대로 반환합니다. 상대 경로는 기준 디렉토리와 합쳐
/// 정규화한 결과가 기준 디렉토리의 (자기 자신이 아닌) 하위여야 합니다.
pub fn resolve_path(base: &Path, path: &Path) -> Result<PathBuf, LogPipelineError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let base = normalize(&absolute(base)?);
    let resolved = normalize(&base.join(path));
    match resolved.strip_prefix(&base) {
        Ok(rel) if !rel.as_os_str().is_empty() => Ok(resolved),
        _ => Err(LogPipelineError::OutsideBaseDir {
            path: resolved.display().to_string(),
        }),
    }
}

/// 플랫폼별 실행 파일 디렉토리: `bin/<os>_<arch>`
pub fn platform_dir() -> PathBuf {
    Path::new("bin").join(format!("{}_{}", platform_os(), platform_arch()))
}

fn platform_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

fn platform_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => other,
    }
}

fn absolute(path: &Path) -> Result<PathBuf, LogPipelineError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()?;
    if path.as_os_str().is_empty() {
        Ok(cwd)
    } else {
        Ok(cwd.join(path))
    }
}

/// `.`/`..`를 경로 수준에서 해석합니다 (심볼릭 링크는 따르지 않음).
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
