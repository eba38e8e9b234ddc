use {
    anyhow::Result,
    clap::Subcommand,
    dynstage_config::{DynstageConfig, loader::config_dir},
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the effective configuration and print a summary.
    Check,
    /// Print the user-global config directory.
    Dir,
}

pub fn handle_config(action: ConfigAction, config: &DynstageConfig) -> Result<()> {
    match action {
        ConfigAction::Check => {
            print!("{}", summary(config));
            Ok(())
        },
        ConfigAction::Dir => {
            match config_dir() {
                Some(dir) => println!("{}", dir.display()),
                None => anyhow::bail!("no home directory"),
            }
            Ok(())
        },
    }
}

/// Human-readable view of `config`. The token is never printed.
fn summary(config: &DynstageConfig) -> String {
    let community = &config.community;
    let token = if config.discord.token.is_some() {
        "set"
    } else {
        "missing"
    };
    format!(
        "config ok\n\
         token:            {token}\n\
         category:         {}\n\
         control channel:  {}\n\
         max stage age:    {} min\n\
         sweep interval:   {} s\n\
         startup cleanup:  {}\n\
         commands:         {}\n",
        community.category_name,
        community.control_channel_name,
        community.stage_max_minutes,
        config.sweep.interval_secs,
        config.sweep.reconcile_on_startup,
        config.commands.glyphs().join(" "),
    )
}

#[cfg(test)]
mod tests {
    use secrecy::Secret;

    use super::*;

    #[test]
    fn summary_hides_token() {
        let mut config = DynstageConfig::default();
        config.discord.token = Some(Secret::new("super-secret".into()));

        let text = summary(&config);

        assert!(text.contains("token:            set"));
        assert!(!text.contains("super-secret"));
        assert!(text.contains("category:         Stages"));
        assert!(text.contains("commands:         🆕 ❌ 🔥"));
    }

    #[test]
    fn summary_reports_missing_token() {
        assert!(summary(&DynstageConfig::default()).contains("token:            missing"));
    }
}
