use crate::error::App;
use crate::store::state::StreamProvider;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Bus {
    pub name: String,
    pub path: String,
}

impl Default for Bus {
    fn default() -> Self {
        Self {
            name: "org.tunebridge.Client".to_string(),
            path: "/org/tunebridge/Client".to_string(),
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Player {
    pub volume: f64,
    pub playlists_file: Option<PathBuf>,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            volume: 100.0,
            playlists_file: None,
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    pub bus: Bus,
    pub player: Player,
    pub stream_providers: Vec<StreamProvider>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
            bus: Bus::default(),
            player: Player::default(),
            stream_providers: vec![
                StreamProvider::new("Local", "Plays tracks from local folders"),
                StreamProvider::new("YouTube", "Streams audio from YouTube"),
            ],
        }
    }
}

impl Config {
    pub fn config_dir() -> Result<PathBuf, App> {
        let home_dir = std::env::var("HOME")?;
        Ok(Path::new(&home_dir).join(".config/tunebridge"))
    }

    pub fn from_toml(content: &str) -> Result<Self, App> {
        Ok(toml::from_str(content)?)
    }

    /// Reads the config file, falling back to defaults when it does not exist.
    pub async fn load(path: &Path) -> Result<Self, App> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).await?;
        Self::from_toml(&content)
    }

    pub fn log_dir(&self, config_dir: &Path) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| config_dir.join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
log_level = "debug"

[player]
playlists_file = "/tmp/playlists.toml"

[[stream_providers]]
source_name = "Local"
"#,
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.bus, Bus::default());
        assert!((config.player.volume - 100.0).abs() < f64::EPSILON);
        assert_eq!(
            config.player.playlists_file.as_deref(),
            Some(Path::new("/tmp/playlists.toml"))
        );
        assert_eq!(config.stream_providers.len(), 1);
        assert_eq!(config.log_dir(Path::new("/cfg")), Path::new("/cfg/logs"));
    }

    #[test]
    fn bad_types_are_reported() {
        assert!(matches!(
            Config::from_toml("log_level = 3"),
            Err(App::TomlParsing(_))
        ));
    }

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.toml")).await.unwrap();
        assert_eq!(config, Config::default());
    }
}
