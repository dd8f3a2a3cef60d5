use std::path::Path;

use serde::{Deserialize, Serialize};

use palimpsest_types::{ChannelLayout, User, WideId};

use crate::error::{ProjectError, Result};
use crate::ids::IdGenerator;
use crate::paths;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    defaults: DefaultsConfig,
    #[serde(default)]
    user: UserConfig,
}

#[derive(Deserialize, Default)]
struct DefaultsConfig {
    sample_rate: Option<u32>,
    channel_layout: Option<String>,
    master_line_name: Option<String>,
}

#[derive(Deserialize, Default)]
struct UserConfig {
    name: Option<String>,
}

/// Values a new project starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSettings {
    pub sample_rate: u32,
    pub channel_layout: ChannelLayout,
    pub master_line_name: String,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channel_layout: ChannelLayout::stereo(),
            master_line_name: "Master".to_string(),
        }
    }
}

pub struct Config {
    defaults: DefaultsConfig,
    user: UserConfig,
}

impl Config {
    /// Embedded defaults merged with the user's config file, if any.
    pub fn load() -> Self {
        let user_file = paths::user_config_path().filter(|p| p.exists());
        let contents = user_file.as_deref().and_then(|path| {
            std::fs::read_to_string(path)
                .map_err(|e| {
                    log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                })
                .ok()
                .map(|c| (path, c))
        });
        match contents {
            Some((path, text)) => Self::from_sources(Some((path, &text))),
            None => Self::from_sources(None),
        }
    }

    fn from_sources(user: Option<(&Path, &str)>) -> Self {
        let mut base: ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|e| {
            log::error!(target: "config", "embedded config.toml is malformed: {}", e);
            ConfigFile::default()
        });

        if let Some((path, text)) = user {
            match toml::from_str::<ConfigFile>(text) {
                Ok(user) => {
                    merge_defaults(&mut base.defaults, user.defaults);
                    merge_user(&mut base.user, user.user);
                }
                Err(e) => {
                    log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                }
            }
        }

        Config {
            defaults: base.defaults,
            user: base.user,
        }
    }

    pub fn project_settings(&self) -> ProjectSettings {
        let fallback = ProjectSettings::default();
        let channel_layout = match self.defaults.channel_layout.as_deref() {
            Some(name) => ChannelLayout::builtin_by_name(name).unwrap_or_else(|| {
                log::warn!(target: "config", "unknown channel layout {:?}, using {}", name, fallback.channel_layout.name);
                fallback.channel_layout.clone()
            }),
            None => fallback.channel_layout.clone(),
        };
        ProjectSettings {
            sample_rate: self
                .defaults
                .sample_rate
                .filter(|&rate| rate > 0)
                .unwrap_or(fallback.sample_rate),
            channel_layout,
            master_line_name: self
                .defaults
                .master_line_name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or(fallback.master_line_name),
        }
    }

    /// Display name for new user identities.
    pub fn user_name(&self) -> String {
        self.user
            .name
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Anonymous".to_string())
    }

    /// The local user identity, created and saved on first use.
    pub fn load_or_create_user(&self, ids: &mut IdGenerator) -> Result<User> {
        let path = paths::user_identity_path().ok_or_else(|| {
            ProjectError::SystemResources("no config directory for user identity".to_string())
        })?;
        load_or_create_identity(&path, || User::new(ids.next_id(), self.user_name()))
    }
}

#[derive(Serialize, Deserialize)]
struct IdentityFile {
    id: WideId,
    name: String,
}

fn load_or_create_identity(path: &Path, create: impl FnOnce() -> User) -> Result<User> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let file: IdentityFile = toml::from_str(&text).map_err(|e| {
                ProjectError::InvalidFormat(format!("{}: {}", path.display(), e))
            })?;
            Ok(User::new(file.id, file.name))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let user = create();
            let text = toml::to_string(&IdentityFile {
                id: user.id,
                name: user.name.clone(),
            })
            .map_err(|e| ProjectError::InvalidArgument(e.to_string()))?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ProjectError::from_io(e, parent))?;
            }
            std::fs::write(path, text).map_err(|e| ProjectError::from_io(e, path))?;
            log::info!(target: "config", "created user identity {} ({})", user.name, user.id.short());
            Ok(user)
        }
        Err(e) => Err(ProjectError::from_io(e, path)),
    }
}

fn merge_defaults(base: &mut DefaultsConfig, user: DefaultsConfig) {
    if user.sample_rate.is_some() {
        base.sample_rate = user.sample_rate;
    }
    if user.channel_layout.is_some() {
        base.channel_layout = user.channel_layout;
    }
    if user.master_line_name.is_some() {
        base.master_line_name = user.master_line_name;
    }
}

fn merge_user(base: &mut UserConfig, user: UserConfig) {
    if user.name.is_some() {
        base.name = user.name;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_embedded_config() {
        let settings = Config::from_sources(None).project_settings();
        assert_eq!(settings, ProjectSettings::default());
    }

    #[test]
    fn test_user_values_override_field_by_field() {
        let user = "[defaults]\nsample_rate = 48000\n\n[user]\nname = \"ada\"\n";
        let config = Config::from_sources(Some((Path::new("user.toml"), user)));
        let settings = config.project_settings();
        assert_eq!(settings.sample_rate, 48_000);
        assert_eq!(settings.channel_layout, ChannelLayout::stereo());
        assert_eq!(settings.master_line_name, "Master");
        assert_eq!(config.user_name(), "ada");
    }

    #[test]
    fn test_malformed_user_config_is_ignored() {
        let config = Config::from_sources(Some((Path::new("bad.toml"), "[defaults\nsample_rate=")));
        assert_eq!(config.project_settings().sample_rate, 44_100);
    }

    #[test]
    fn test_unknown_layout_falls_back() {
        let user = "[defaults]\nchannel_layout = \"22.2\"\nsample_rate = 0\n";
        let settings = Config::from_sources(Some((Path::new("user.toml"), user))).project_settings();
        assert_eq!(settings.channel_layout, ChannelLayout::stereo());
        assert_eq!(settings.sample_rate, 44_100);
    }

    #[test]
    fn test_identity_is_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("user.toml");
        let mut ids = IdGenerator::seeded(1);
        let first = load_or_create_identity(&path, || User::new(ids.next_id(), "ada")).unwrap();
        let second = load_or_create_identity(&path, || panic!("identity recreated")).unwrap();
        assert_eq!(first, second);
    }
}
