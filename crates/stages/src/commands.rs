use {
    dynstage_config::CommandsConfig,
    dynstage_platform::Capability,
};

/// Operations offered on the control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Create the reacting user's stage.
    CreateOwn,
    /// Delete the reacting user's stage if nobody is on it.
    DeleteOwn,
    /// Delete every stage and every untracked channel in the category.
    PurgeAll,
}

impl Command {
    pub fn name(self) -> &'static str {
        match self {
            Self::CreateOwn => "create_own",
            Self::DeleteOwn => "delete_own",
            Self::PurgeAll => "purge_all",
        }
    }

    /// Capability the actor must hold in the community.
    pub fn required_capability(self) -> Option<Capability> {
        match self {
            Self::PurgeAll => Some(Capability::ManageChannels),
            Self::CreateOwn | Self::DeleteOwn => None,
        }
    }
}

/// Glyph to command binding, fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct CommandTable {
    entries: Vec<(String, Command)>,
}

impl CommandTable {
    /// Build a table from `(glyph, command)` pairs in menu order. Later
    /// duplicates of a glyph are ignored.
    pub fn new<G: Into<String>>(entries: impl IntoIterator<Item = (G, Command)>) -> Self {
        let mut table = Self {
            entries: Vec::new(),
        };
        for (glyph, command) in entries {
            let glyph = glyph.into();
            if table.lookup(&glyph).is_none() {
                table.entries.push((glyph, command));
            }
        }
        table
    }

    pub fn from_config(config: &CommandsConfig) -> Self {
        Self::new([
            (config.create.as_str(), Command::CreateOwn),
            (config.delete.as_str(), Command::DeleteOwn),
            (config.purge.as_str(), Command::PurgeAll),
        ])
    }

    pub fn lookup(&self, glyph: &str) -> Option<Command> {
        self.entries
            .iter()
            .find(|(g, _)| g == glyph)
            .map(|(_, command)| *command)
    }

    /// Glyphs in menu order.
    pub fn glyphs(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(g, _)| g.as_str())
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::from_config(&CommandsConfig::default())
    }
}
