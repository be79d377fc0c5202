//! `config` subcommands.

use secrecy::SecretString;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            let path = global
                .config
                .clone()
                .unwrap_or_else(unifly_watch_config::config_path);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let (config, _) = super::load(global)?;
            let redacted = config.redacted();
            let out = match global.output {
                OutputFormat::Json => serde_json::to_string_pretty(&redacted)?,
                OutputFormat::JsonCompact => serde_json::to_string(&redacted)?,
                OutputFormat::Table | OutputFormat::Plain => toml::to_string_pretty(&redacted)?,
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── SetPassword ─────────────────────────────────────────────
        ConfigCommand::SetPassword => {
            let (config, path) = super::load(global)?;
            let username = config.controller.username.clone().ok_or_else(|| {
                CliError::config(
                    unifly_watch_config::ConfigError::Missing {
                        field: "controller.username".into(),
                    },
                    &path,
                )
            })?;

            let secret = rpassword::prompt_password(format!("Password for {username}: "))?;
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "value cannot be empty".into(),
                });
            }
            unifly_watch_config::store_password(&username, &SecretString::from(secret))
                .map_err(|e| CliError::config(e, &path))?;
            eprintln!("Password for '{username}' stored in the system keyring.");
            Ok(())
        }
    }
}
