//! 앱 로더 -- 디렉토리 트리에서 inputs/transforms/props 를 읽어 [`App`]을 만듭니다.
//!
//! # 디렉토리 레이아웃
//! ```text
//! <app>/
//!   default/inputs.conf       <- local 에 없을 때 사용
//!   local/inputs.conf         <- 있으면 default 를 통째로 대체 (필드 단위 병합 없음)
//!   default/transforms.conf
//!   default/props.conf
//! ```
//!
//! 여러 앱을 한 번에 읽을 때는 `<base>/<app>/{default,local}` 형태를 사용합니다.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::ConfError;
use crate::input::{Input, read_inputs};
use crate::props::{Prop, read_props};
use crate::transform::{Transform, read_transforms};

/// `.conf` 파일 최대 크기
const MAX_CONF_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB

/// 앱 이름을 알 수 없을 때 사용하는 이름
pub const FALLBACK_APP_NAME: &str = "tarunner";

const LOCAL_DIR: &str = "local";
const DEFAULT_DIR: &str = "default";

/// 앱 디렉토리 아래의 설정 파일 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfFile {
    Inputs,
    Transforms,
    Props,
}

impl ConfFile {
    /// 파일 이름
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Inputs => "inputs.conf",
            Self::Transforms => "transforms.conf",
            Self::Props => "props.conf",
        }
    }
}

/// 입력/변환/속성 묶음 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct App {
    /// 앱 디렉토리 (명령 경로 해석의 기준)
    pub dir: PathBuf,
    /// 앱 이름 (디렉토리 이름)
    pub name: String,
    pub inputs: Vec<Input>,
    pub transforms: Vec<Transform>,
    pub props: Vec<Prop>,
}

/// 앱 디렉토리 로더
pub struct AppLoader;

impl AppLoader {
    /// `local/<file>` 이 있으면 그것을, 없으면 `default/<file>` 을 반환합니다.
    pub async fn locate(dir: &Path, file: ConfFile) -> Option<PathBuf> {
        for layer in [LOCAL_DIR, DEFAULT_DIR] {
            let candidate = dir.join(layer).join(file.file_name());
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return Some(candidate);
            }
        }
        None
    }

    /// 앱 디렉토리 하나를 읽습니다.
    ///
    /// # Errors
    /// - inputs.conf 가 local/default 어디에도 없는 경우
    /// - 파일 문법 오류 또는 타입 필드 값 오류
    pub async fn load_app(dir: impl AsRef<Path>) -> Result<App, ConfError> {
        let dir = dir.as_ref();
        let name = app_name(dir);

        let inputs_path =
            Self::locate(dir, ConfFile::Inputs)
                .await
                .ok_or_else(|| ConfError::MissingInputs {
                    dir: dir.display().to_string(),
                })?;
        let inputs = read_inputs(&read_file(&inputs_path).await?, &name)?;

        let transforms = match Self::locate(dir, ConfFile::Transforms).await {
            Some(path) => read_transforms(&read_file(&path).await?)?,
            None => Vec::new(),
        };

        let props = match Self::locate(dir, ConfFile::Props).await {
            Some(path) => read_props(&read_file(&path).await?)?,
            None => Vec::new(),
        };

        tracing::info!(
            app = %name,
            dir = %dir.display(),
            inputs = inputs.len(),
            transforms = transforms.len(),
            props = props.len(),
            "loaded app configuration"
        );

        Ok(App {
            dir: dir.to_path_buf(),
            name,
            inputs,
            transforms,
            props,
        })
    }

    /// 기준 디렉토리에서 앱 목록을 읽습니다.
    ///
    /// 기준 디렉토리 자체에 `default/` 또는 `local/` 이 있으면 단일 앱으로 취급합니다.
    /// 그렇지 않으면 이름순으로 하위 디렉토리 중 앱 레이아웃을 가진 것만 읽습니다.
    pub async fn load_apps(base: impl AsRef<Path>) -> Result<Vec<App>, ConfError> {
        let base = base.as_ref();
        if is_app_dir(base).await {
            return Ok(vec![Self::load_app(base).await?]);
        }

        let mut entries = tokio::fs::read_dir(base)
            .await
            .map_err(|e| ConfError::Read {
                path: base.display().to_string(),
                reason: format!("failed to read directory: {e}"),
            })?;

        let mut dirs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if is_app_dir(&path).await {
                dirs.push(path);
            } else {
                tracing::debug!(dir = %path.display(), "not an app directory, skipping");
            }
        }
        dirs.sort();

        if dirs.is_empty() {
            return Err(ConfError::MissingInputs {
                dir: base.display().to_string(),
            });
        }

        let mut apps = Vec::with_capacity(dirs.len());
        for dir in dirs {
            apps.push(Self::load_app(&dir).await?);
        }
        Ok(apps)
    }
}

async fn is_app_dir(dir: &Path) -> bool {
    for layer in [LOCAL_DIR, DEFAULT_DIR] {
        if tokio::fs::metadata(dir.join(layer))
            .await
            .is_ok_and(|m| m.is_dir())
        {
            return true;
        }
    }
    false
}

fn app_name(dir: &Path) -> String {
    std::path::absolute(dir)
        .ok()
        .and_then(|abs| abs.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| FALLBACK_APP_NAME.to_owned())
}

async fn read_file(path: &Path) -> Result<Vec<u8>, ConfError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| ConfError::Read {
            path: path.display().to_string(),
            reason: format!("failed to read file metadata: {e}"),
        })?;

    if metadata.len() > MAX_CONF_FILE_SIZE {
        return Err(ConfError::Read {
            path: path.display().to_string(),
            reason: format!(
                "file too large: {} bytes (max: {MAX_CONF_FILE_SIZE})",
                metadata.len()
            ),
        });
    }

    tokio::fs::read(path).await.map_err(|e| ConfError::Read {
        path: path.display().to_string(),
        reason: format!("failed to read file: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn local_replaces_default() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "default/inputs.conf", "[a]\n[b]\n");
        write(tmp.path(), "local/inputs.conf", "[c]\ninterval = 5\n");

        let app = AppLoader::load_app(tmp.path()).await.unwrap();
        assert_eq!(app.inputs.len(), 1);
        assert_eq!(app.inputs[0].name, "c");
        assert_eq!(app.inputs[0].app, app.name);
    }

    #[tokio::test]
    async fn missing_inputs_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "default/props.conf", "[x]\n");
        let err = AppLoader::load_app(tmp.path()).await.unwrap_err();
        assert!(matches!(err, ConfError::MissingInputs { .. }));
    }

    #[tokio::test]
    async fn missing_transforms_and_props_are_empty() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "default/inputs.conf", "[a]\n");
        let app = AppLoader::load_app(tmp.path()).await.unwrap();
        assert!(app.transforms.is_empty());
        assert!(app.props.is_empty());
    }

    #[tokio::test]
    async fn app_name_is_directory_name() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("Splunk_TA_demo");
        write(&dir, "default/inputs.conf", "[a]\n");
        let app = AppLoader::load_app(&dir).await.unwrap();
        assert_eq!(app.name, "Splunk_TA_demo");
        assert_eq!(app.inputs[0].app, "Splunk_TA_demo");
    }

    #[tokio::test]
    async fn load_apps_single_app_layout() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "local/inputs.conf", "[a]\n");
        let apps = AppLoader::load_apps(tmp.path()).await.unwrap();
        assert_eq!(apps.len(), 1);
    }

    #[tokio::test]
    async fn load_apps_multi_app_layout_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "zeta/default/inputs.conf", "[z]\n");
        write(tmp.path(), "alpha/local/inputs.conf", "[a]\n");
        write(tmp.path(), "notes/readme.txt", "ignored");

        let apps = AppLoader::load_apps(tmp.path()).await.unwrap();
        let names: Vec<&str> = apps.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn load_apps_propagates_parse_errors() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "default/inputs.conf", "[broken\n");
        let err = AppLoader::load_apps(tmp.path()).await.unwrap_err();
        assert!(matches!(err, ConfError::Syntax { line: 1, .. }));
    }

    #[tokio::test]
    async fn load_apps_without_any_app_fails() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("empty")).unwrap();
        let err = AppLoader::load_apps(tmp.path()).await.unwrap_err();
        assert!(matches!(err, ConfError::MissingInputs { .. }));
    }
}
