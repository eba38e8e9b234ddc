use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    secrecy::Secret,
    tracing::{debug, info},
};

use crate::{
    ConfigError,
    env_subst::substitute_env,
    schema::DynstageConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "dynstage.toml",
    "dynstage.yaml",
    "dynstage.yml",
    "dynstage.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<DynstageConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path).with_context(|| format!("failed to parse {}", path.display()))
}

/// Resolve the effective configuration for this process.
///
/// Reads `explicit` when given, otherwise discovers a config file in the
/// standard locations (falling back to defaults when there is none), then
/// applies environment overrides and validates the result.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<DynstageConfig> {
    let config = match explicit {
        Some(path) => load_config(path)?,
        None => discover_and_load()?,
    };
    finish(config, |name| std::env::var(name).ok())
}

/// Overrides, glyph placeholders and validation, in that order.
fn finish(
    mut config: DynstageConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<DynstageConfig> {
    apply_env_overrides(&mut config, lookup)?;
    config.resolve_glyphs();
    config.validate()?;
    Ok(config)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./dynstage.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/dynstage/dynstage.{toml,yaml,yml,json}` (user-global)
///
/// Returns `DynstageConfig::default()` if no config file is found.
pub fn discover_and_load() -> anyhow::Result<DynstageConfig> {
    let mut dirs = vec![PathBuf::from(".")];
    dirs.extend(config_dir());
    match find_config_file(&dirs) {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            load_config(&path)
        },
        None => {
            debug!("no config file found, using defaults");
            Ok(DynstageConfig::default())
        },
    }
}

/// First existing config file across `dirs`, in order.
fn find_config_file(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)))
        .find(|p| p.exists())
}

/// Returns the user-global config directory, `~/.config/dynstage/`.
pub fn config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().join(".config").join("dynstage"))
}

/// Apply the environment variables a plain `.env` deployment uses.
pub fn apply_env_overrides(
    config: &mut DynstageConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(token) = lookup("DISCORD_TOKEN") {
        config.discord.token = Some(Secret::new(token));
    }
    if let Some(name) = lookup("CATEGORY_NAME") {
        config.community.category_name = name;
    }
    if let Some(name) = lookup("TEXT_CHANNEL_NAME") {
        config.community.control_channel_name = name;
    }
    if let Some(topic) = lookup("TEXT_CHANNEL_TOPIC") {
        config.community.control_channel_topic = Some(topic);
    }
    if let Some(body) = lookup("BOT_CONTROL_MESSAGE") {
        config.community.control_message = body;
    }
    if let Some(minutes) = lookup("STAGE_MAX_MINUTES") {
        config.community.stage_max_minutes =
            minutes
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber {
                    var: "STAGE_MAX_MINUTES",
                    value: minutes.clone(),
                })?;
    }
    Ok(())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<DynstageConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
