use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP: &str = "bookdl";

/// Global configuration loaded from `~/.config/bookdl/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookdlConfig {
    /// Maximum downloads transferring at once. Zero holds everything queued.
    pub max_concurrent_downloads: usize,
    /// Where finished files land; `~/.local/share/bookdl/Downloads` if unset.
    pub downloads_dir: Option<PathBuf>,
    pub connect_timeout_secs: u64,
    /// A transfer slower than this many bytes/s for `low_speed_time_secs`
    /// is abandoned as a network failure.
    pub low_speed_limit_bytes: u32,
    pub low_speed_time_secs: u64,
    pub max_redirections: u32,
    /// User-Agent header; libcurl sends none if unset.
    pub user_agent: Option<String>,
}

impl Default for BookdlConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 3,
            downloads_dir: None,
            connect_timeout_secs: 30,
            low_speed_limit_bytes: 1024,
            low_speed_time_secs: 60,
            max_redirections: 10,
            user_agent: None,
        }
    }
}

impl BookdlConfig {
    pub fn downloads_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.downloads_dir {
            return Ok(dir.clone());
        }
        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP)?;
        Ok(xdg_dirs.get_data_home().join(APP).join("Downloads"))
    }

    /// Partial files of running and paused transfers.
    pub fn staging_dir(&self) -> Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP)?;
        Ok(xdg_dirs.get_cache_home().join(APP).join("partial"))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix(APP)?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Unix socket a running `bookdl run` listens on for pause/resume/remove.
pub fn control_socket_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix(APP)?;
    Ok(xdg_dirs.get_state_home().join(APP).join("control.sock"))
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BookdlConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<BookdlConfig> {
    if !path.exists() {
        let default_cfg = BookdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let cfg: BookdlConfig =
        toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = BookdlConfig::default();
        assert_eq!(cfg.max_concurrent_downloads, 3);
        assert_eq!(cfg.connect_timeout_secs, 30);
        assert_eq!(cfg.max_redirections, 10);
        assert!(cfg.downloads_dir.is_none());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = BookdlConfig {
            downloads_dir: Some(PathBuf::from("/srv/books")),
            user_agent: Some("bookdl/0.1".to_string()),
            ..BookdlConfig::default()
        };
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: BookdlConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_toml_partial_uses_defaults() {
        let toml = r#"
            max_concurrent_downloads = 1
            downloads_dir = "/tmp/books"
        "#;
        let cfg: BookdlConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.max_concurrent_downloads, 1);
        assert_eq!(cfg.downloads_dir().unwrap(), PathBuf::from("/tmp/books"));
        assert_eq!(cfg.low_speed_time_secs, 60);
    }

    #[test]
    fn load_or_init_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = load_or_init_at(&path).unwrap();
        assert_eq!(cfg, BookdlConfig::default());
        assert!(path.exists());

        fs::write(&path, "max_concurrent_downloads = 7\n").unwrap();
        assert_eq!(load_or_init_at(&path).unwrap().max_concurrent_downloads, 7);
    }
}
