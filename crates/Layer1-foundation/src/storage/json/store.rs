//! JSON 파일 저장소 (엔진 설정 파일용)

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// 글로벌 설정 디렉토리 (`<config_dir>/tether`)
const APP_DIR: &str = "tether";

/// 프로젝트 설정 디렉토리 (`<root>/.tether`)
const PROJECT_DIR: &str = ".tether";

/// 설정 범위
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreScope {
    Global,
    Project,
    Custom,
}

impl StoreScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreScope::Global => "global",
            StoreScope::Project => "project",
            StoreScope::Custom => "custom",
        }
    }
}

/// 디렉토리 하나에 묶인 JSON 파일 저장소
#[derive(Debug, Clone)]
pub struct JsonStore {
    base_dir: PathBuf,
    scope: StoreScope,
}

impl JsonStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            scope: StoreScope::Custom,
        }
    }

    /// 글로벌 설정 저장소
    pub fn global() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("no config directory on this platform".to_string()))?;
        Ok(Self {
            base_dir: config_dir.join(APP_DIR),
            scope: StoreScope::Global,
        })
    }

    /// `root` 아래 프로젝트 설정 저장소
    pub fn project(root: impl AsRef<Path>) -> Self {
        Self {
            base_dir: root.as_ref().join(PROJECT_DIR),
            scope: StoreScope::Project,
        }
    }

    /// 현재 작업 디렉토리의 프로젝트 설정 저장소
    pub fn current_project() -> Result<Self> {
        Ok(Self::project(std::env::current_dir()?))
    }

    pub fn scope(&self) -> StoreScope {
        self.scope
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.base_dir.join(filename)
    }

    pub fn exists(&self, filename: &str) -> bool {
        self.file_path(filename).is_file()
    }

    /// 파일 로드 (없으면 Config 에러)
    pub fn load<T: DeserializeOwned>(&self, filename: &str) -> Result<T> {
        self.load_optional(filename)?.ok_or_else(|| {
            Error::Config(format!(
                "{} not found",
                self.file_path(filename).display()
            ))
        })
    }

    /// 파일 로드 (없으면 None, 깨진 JSON은 Config 에러)
    pub fn load_optional<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        let path = self.file_path(filename);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| Error::Config(format!("{} ({} config): {}", path.display(), self.scope.as_str(), e)))
    }

    /// 저장 (임시 파일에 쓴 뒤 rename)
    pub fn save<T: Serialize>(&self, filename: &str, data: &T) -> Result<()> {
        std::fs::create_dir_all(&self.base_dir)?;

        let path = self.file_path(filename);
        let staging = path.with_extension("json.tmp");
        std::fs::write(&staging, serde_json::to_vec_pretty(data)?)?;
        std::fs::rename(&staging, &path)?;

        tracing::debug!(path = %path.display(), scope = self.scope.as_str(), "saved config file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        let loaded: Option<Value> = store.load_optional("absent.json").unwrap();
        assert!(loaded.is_none());
        assert!(!store.exists("absent.json"));
        assert!(matches!(store.load::<Value>("absent.json"), Err(Error::Config(_))));
    }

    #[test]
    fn test_project_save_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::project(dir.path());
        assert_eq!(store.scope(), StoreScope::Project);

        store.save("engine.json", &json!({"defaultTimeoutMs": 5})).unwrap();

        assert!(dir.path().join(".tether").join("engine.json").is_file());
        assert!(!dir.path().join(".tether").join("engine.json.tmp").exists());
        let loaded: Value = store.load("engine.json").unwrap();
        assert_eq!(loaded["defaultTimeoutMs"], 5);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        let store = JsonStore::new(dir.path());
        let err = store.load::<Value>("bad.json").unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("bad.json")));
    }
}
