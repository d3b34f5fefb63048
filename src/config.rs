use crate::error::{GeoPicError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_DATABASE: &str = "geopic.db";
const DEFAULT_UPLOAD_DIR: &str = "uploads";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub database_path: Option<PathBuf>,
    pub upload_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| GeoPicError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("geopic").join("config.json"))
    }

    /// 優先順位: コマンドライン > 環境変数 GEOPIC_DB > 設定ファイル > 既定値
    pub fn database_path(&self, cli_override: Option<&Path>) -> PathBuf {
        resolve(
            cli_override,
            "GEOPIC_DB",
            self.database_path.as_deref(),
            DEFAULT_DATABASE,
        )
    }

    /// 優先順位: コマンドライン > 環境変数 GEOPIC_UPLOADS > 設定ファイル > 既定値
    ///
    /// カタログには保存先の絶対パスが入るため、相対パスは起動時の
    /// 作業ディレクトリ基準で絶対パスにする。
    pub fn upload_dir(&self, cli_override: Option<&Path>) -> PathBuf {
        let dir = resolve(
            cli_override,
            "GEOPIC_UPLOADS",
            self.upload_dir.as_deref(),
            DEFAULT_UPLOAD_DIR,
        );
        std::path::absolute(&dir).unwrap_or(dir)
    }
}

fn resolve(cli: Option<&Path>, env_key: &str, configured: Option<&Path>, default: &str) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    if let Some(value) = std::env::var_os(env_key).filter(|v| !v.is_empty()) {
        return PathBuf::from(value);
    }
    configured
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(default))
}
