//! Configuration view and validation commands: `p4m config`.

use anyhow::Result;
use p4m_client::config::{CONFIG_DIR_NAME, ClientConfig, ClientToml};
use std::path::Path;

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &Path, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = ClientConfig::project_file(project_dir);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Client Configuration");
            println!("====================");
            println!();

            let config = ClientConfig::new(project_dir.to_path_buf())?;
            match &config.source {
                Some(path) => println!("Config file: {}", path.display()),
                None => println!("No client.toml found; using defaults."),
            }
            println!();

            let api = config.api();
            println!("[api]");
            println!("  host = \"{}\"", api.host);
            println!("  version = {}", api.version);
            println!("  client_id = \"{}\"", api.client_id);
            println!(
                "  client_secret = {}",
                if api.client_secret.is_empty() { "(unset)" } else { "(set)" }
            );
            println!();

            let auth = config.auth();
            println!("[auth]");
            println!("  refresh_access_tokens = {}", auth.refresh_access_tokens);
            println!("  refresh_with_scope = {}", auth.refresh_with_scope);
            println!("  token_refresh_offset_ms = {}", auth.token_refresh_offset_ms);
            println!();

            let routes = config.routes();
            println!("[routes]");
            println!("  access_denied = \"{}\"", routes.access_denied);
            println!("  signin = \"{}\"", routes.signin);
            println!("  after_signin = \"{}\"", routes.after_signin);
            println!("  public = {:?}", routes.public);
            println!("  allow = {:?}", routes.allow);
            println!();

            println!("[locale]");
            println!("  language = \"{}\"", config.toml.locale.language);
            if let Some(path) = config.catalog_path() {
                println!("  catalog = \"{}\"", path.display());
            }
            println!();

            if config.source.is_none() {
                println!("Run 'p4m config init' to create a client.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let config = ClientConfig::new(project_dir.to_path_buf())?;
            let warnings = config.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("client.toml already exists at {}", config_path.display());
                return Ok(());
            }

            std::fs::create_dir_all(project_dir.join(CONFIG_DIR_NAME))?;
            ClientToml::default().save(&config_path)?;
            println!("Created {}", config_path.display());
        }
    }

    Ok(())
}
