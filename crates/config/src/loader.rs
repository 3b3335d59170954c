use std::path::{Path, PathBuf};

use {
    chanstat_common::{Error, Result},
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::ChanstatConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "chanstat.toml",
    "chanstat.yaml",
    "chanstat.yml",
    "chanstat.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<ChanstatConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::external(format!("failed to read {}", path.display()), e))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./chanstat.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/chanstat/chanstat.{toml,yaml,yml,json}` (user-global)
///
/// Returns `ChanstatConfig::default()` if no config file is found or it fails to parse.
pub fn discover_and_load() -> ChanstatConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    ChanstatConfig::default()
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    let mut dirs = vec![PathBuf::from(".")];
    dirs.extend(config_dir());
    find_config_file_in(&dirs)
}

fn find_config_file_in(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/chanstat/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "chanstat").map(|d| d.config_dir().to_path_buf())
}

/// Returns the path of an existing config file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chanstat.toml")
}

/// Apply the well-known environment variables on top of a loaded config.
///
/// `YOUTUBE_API_KEY`, `TOKINSIGHT_API_KEY`, `DATABASE_URL` and `PORT` win over
/// file values when set and non-empty.
pub fn apply_env_overrides(config: &mut ChanstatConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut ChanstatConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(key) = get("YOUTUBE_API_KEY") {
        config.youtube.api_key = Some(Secret::new(key));
    }
    if let Some(key) = get("TOKINSIGHT_API_KEY") {
        config.tiktok.api_key = Some(Secret::new(key));
    }
    if let Some(url) = get("DATABASE_URL") {
        config.database.url = url;
    }
    if let Some(port) = get("PORT") {
        match port.trim().parse::<u16>() {
            Ok(port) => config.server.port = port,
            Err(e) => warn!(value = %port, error = %e, "ignoring invalid PORT"),
        }
    }
}

fn parse_config(raw: &str, path: &Path) -> Result<ChanstatConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::external("invalid TOML config", e)),
        "yaml" | "yml" => {
            serde_yaml::from_str(raw).map_err(|e| Error::external("invalid YAML config", e))
        },
        "json" => serde_json::from_str(raw).map_err(|e| Error::external("invalid JSON config", e)),
        _ => Err(Error::message(format!("unsupported config format: .{ext}"))),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::schema::FailurePolicy, secrecy::ExposeSecret};

    #[test]
    fn loads_each_format() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("chanstat.toml");
        std::fs::write(&toml_path, "[server]\nport = 7000\n").unwrap();
        assert_eq!(load_config(&toml_path).unwrap().server.port, 7000);

        let yaml_path = dir.path().join("chanstat.yaml");
        std::fs::write(&yaml_path, "collector:\n  failure_policy: record_error\n").unwrap();
        assert_eq!(
            load_config(&yaml_path).unwrap().collector.failure_policy,
            FailurePolicy::RecordError
        );

        let json_path = dir.path().join("chanstat.json");
        std::fs::write(&json_path, r#"{"database": {"url": "sqlite::memory:"}}"#).unwrap();
        assert_eq!(load_config(&json_path).unwrap().database.url, "sqlite::memory:");
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chanstat.ini");
        std::fs::write(&path, "port=1").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_config(Path::new("/nonexistent/chanstat.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn discovery_prefers_first_directory_and_toml() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join("chanstat.toml"), "").unwrap();
        std::fs::write(first.path().join("chanstat.json"), "{}").unwrap();
        std::fs::write(first.path().join("chanstat.toml"), "").unwrap();

        let found = find_config_file_in(&[first.path().into(), second.path().into()]).unwrap();
        assert_eq!(found, first.path().join("chanstat.toml"));
    }

    #[test]
    fn discovery_returns_none_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_config_file_in(&[dir.path().into()]).is_none());
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let mut cfg = ChanstatConfig::default();
        apply_env_overrides_with(&mut cfg, |name| match name {
            "YOUTUBE_API_KEY" => Some("yt".into()),
            "TOKINSIGHT_API_KEY" => Some(" ".into()),
            "DATABASE_URL" => Some("sqlite://other.db".into()),
            "PORT" => Some("8080".into()),
            _ => None,
        });
        assert_eq!(cfg.youtube.api_key.unwrap().expose_secret(), "yt");
        assert!(cfg.tiktok.api_key.is_none());
        assert_eq!(cfg.database.url, "sqlite://other.db");
        assert_eq!(cfg.server.port, 8080);
    }

    #[test]
    fn invalid_port_override_is_ignored() {
        let mut cfg = ChanstatConfig::default();
        apply_env_overrides_with(&mut cfg, |name| (name == "PORT").then(|| "http".into()));
        assert_eq!(cfg.server.port, 5000);
    }
}
