//! Config schema types (discord, community, sweep, commands).

use {secrecy::Secret, serde::Deserialize};

use crate::ConfigError;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DynstageConfig {
    pub discord: DiscordConfig,
    pub community: CommunityConfig,
    pub sweep: SweepConfig,
    pub commands: CommandsConfig,
}

/// Discord connection settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token. Usually supplied through `DISCORD_TOKEN` rather than the file.
    pub token: Option<Secret<String>>,
}

/// Per-community layout and behavior. Shared read-only by every community
/// the bot serves.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommunityConfig {
    /// Name of the category holding the control channel and all stages.
    pub category_name: String,
    /// Name of the read-only text channel carrying the control message.
    pub control_channel_name: String,
    /// Topic set on the control channel when it has to be created.
    pub control_channel_topic: Option<String>,
    /// Static body of the control message. `{create}`, `{delete}` and
    /// `{purge}` are replaced with the glyphs from `[commands]` on load.
    pub control_message: String,
    /// Stages older than this are deleted on the next sweep, occupied or not.
    pub stage_max_minutes: u64,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            category_name: "Stages".into(),
            control_channel_name: "stage-control".into(),
            control_channel_topic: Some("Create your own stage by reacting below.".into()),
            control_message: "React with {create} to open your own stage, {delete} to close it \
                              again.\nModerators can remove every stage with {purge}."
                .into(),
            stage_max_minutes: 120,
        }
    }
}

/// Background sweep settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Seconds between two sweep ticks.
    pub interval_secs: u64,
    /// Delete untracked channels in the category once the bot is logged in.
    /// Occupied stages survive.
    pub reconcile_on_startup: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            reconcile_on_startup: true,
        }
    }
}

/// Reaction glyphs bound to the control message commands.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub create: String,
    pub delete: String,
    pub purge: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            create: "🆕".into(),
            delete: "❌".into(),
            purge: "🔥".into(),
        }
    }
}

impl DynstageConfig {
    /// Reject configurations the bot cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let community = &self.community;
        if community.category_name.trim().is_empty() {
            return Err(ConfigError::Empty("community.category_name"));
        }
        if community.control_channel_name.trim().is_empty() {
            return Err(ConfigError::Empty("community.control_channel_name"));
        }
        if community.stage_max_minutes == 0 {
            return Err(ConfigError::Zero("community.stage_max_minutes"));
        }
        if self.sweep.interval_secs == 0 {
            return Err(ConfigError::Zero("sweep.interval_secs"));
        }
        self.commands.validate()
    }

    /// Put the configured glyphs into the control message body.
    pub fn resolve_glyphs(&mut self) {
        self.community.control_message = self.commands.fill_glyphs(&self.community.control_message);
    }
}

impl CommandsConfig {
    /// Glyphs in menu order.
    pub fn glyphs(&self) -> [&str; 3] {
        [&self.create, &self.delete, &self.purge]
    }

    /// Replace the `{create}`, `{delete}` and `{purge}` placeholders in `text`.
    pub fn fill_glyphs(&self, text: &str) -> String {
        text.replace("{create}", &self.create)
            .replace("{delete}", &self.delete)
            .replace("{purge}", &self.purge)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let glyphs = self.glyphs();
        for (i, glyph) in glyphs.iter().enumerate() {
            if glyph.trim().is_empty() {
                return Err(ConfigError::Empty("commands"));
            }
            if glyphs[..i].contains(glyph) {
                return Err(ConfigError::DuplicateGlyph((*glyph).to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        DynstageConfig::default().validate().unwrap();
    }

    #[test]
    fn duplicate_glyph_is_rejected() {
        let mut config = DynstageConfig::default();
        config.commands.purge = config.commands.create.clone();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateGlyph(g)) if g == "🆕"
        ));
    }

    #[test]
    fn zero_max_age_is_rejected() {
        let mut config = DynstageConfig::default();
        config.community.stage_max_minutes = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Zero("community.stage_max_minutes"))
        ));
    }

    #[test]
    fn default_body_names_configured_glyphs() {
        let mut config = DynstageConfig::default();
        config.commands.create = "➕".into();
        config.resolve_glyphs();

        let body = &config.community.control_message;
        assert!(body.starts_with("React with ➕ to open your own stage, ❌ to close it again.\n"));
        assert!(body.ends_with("every stage with 🔥."));
        assert!(!body.contains('{'));
    }

    #[test]
    fn blank_category_is_rejected() {
        let mut config = DynstageConfig::default();
        config.community.category_name = "  ".into();
        assert!(config.validate().is_err());
    }
}
