//! `casegate init` — config and schema bootstrap.

use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;

use crate::adapters::sqlite::{all_embedded_migrations, create_pool, Migrator};
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

pub async fn execute(args: InitArgs, json: bool) -> Result<()> {
    let config_dir = Path::new(".casegate");
    let config_path = config_dir.join("config.yaml");

    std::fs::create_dir_all(config_dir).context("Failed to create .casegate directory")?;

    let wrote_config = if config_path.exists() && !args.force {
        false
    } else {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).context("Failed to serialize default config")?;
        std::fs::write(&config_path, yaml).context("Failed to write config file")?;
        true
    };

    let config = ConfigLoader::load()?;
    let database_url = format!("sqlite://{}", config.database.path);
    let pool = create_pool(&database_url, None)
        .await
        .context("Failed to create database")?;

    let applied = Migrator::new(pool.clone())
        .run_embedded_migrations(all_embedded_migrations())
        .await
        .context("Failed to apply migrations")?;

    pool.close().await;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "config_path": config_path.display().to_string(),
                "config_written": wrote_config,
                "database_path": config.database.path,
                "migrations_applied": applied,
            })
        );
    } else {
        if wrote_config {
            println!("Wrote {}", config_path.display());
        } else {
            println!("Config exists at {} (use --force to overwrite)", config_path.display());
        }
        println!("Database ready at {} ({applied} migration(s) applied)", config.database.path);
    }

    Ok(())
}
