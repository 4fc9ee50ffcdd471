use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::path::Path;

use super::prompt;
use crate::config::Config;

/// Run the init command - interactively create a config file
pub fn run(config_path: &Path, force: bool) -> Result<()> {
    // Check if config already exists
    if config_path.exists() && !force {
        eprintln!(
            "{}: Config already exists at {}",
            "Error".red().bold(),
            config_path.display()
        );
        eprintln!();
        eprintln!("Use {} to overwrite.", "--force".cyan());
        bail!("Config file already exists");
    }

    println!("{}", "absctl configuration".bold());
    println!();
    println!(
        "This will create a config file at: {}",
        config_path.display().to_string().cyan()
    );
    println!();

    let mut config = Config::default();

    println!("{}", "Step 1: Server".bold());
    println!();
    let host = prompt_host()?;
    let token = prompt(&format!(
        "API token (user settings page) [{}]: ",
        "leave empty to use ABS_TOKEN".green()
    ))?;
    config.server.host = Some(host);
    config.server.token = Some(token).filter(|t| !t.is_empty());
    println!();

    println!("{}", "Step 2: Chapters".bold());
    println!();
    let library = prompt("Library id for match-chapters [none]: ")?;
    config.chapters.library_id = Some(library).filter(|l| !l.is_empty());

    let provider = prompt(&format!(
        "Metadata provider [{}]: ",
        config.chapters.provider.green()
    ))?;
    if !provider.is_empty() {
        config.chapters.provider = provider;
    }

    let region = prompt(&format!("Region [{}]: ", config.chapters.region.green()))?;
    if !region.is_empty() {
        config.chapters.region = region.to_uppercase();
    }

    write_config(config_path, &config)?;

    println!();
    println!(
        "{} Config written to {}",
        "✓".green(),
        config_path.display()
    );
    println!();
    println!("You can now use:");
    println!(
        "  {} - match chapters of every book in the library",
        "absctl match-chapters".cyan()
    );
    println!(
        "  {} - delete implausibly long listening sessions",
        "absctl cleanup-sessions".cyan()
    );

    Ok(())
}

fn prompt_host() -> Result<String> {
    let default = "http://localhost:3333";
    loop {
        let input = prompt(&format!("Server URL [{}]: ", default.green()))?;
        let host = if input.is_empty() {
            default.to_string()
        } else {
            input
        };

        if host.starts_with("http://") || host.starts_with("https://") {
            return Ok(host.trim_end_matches('/').to_string());
        }
        println!(
            "{}: the URL must start with http:// or https://",
            "Note".yellow()
        );
    }
}

/// Serialize a config and write it, creating the directory
pub fn write_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }

    let body = toml::to_string_pretty(config).context("Failed to serialize config")?;
    let content = format!("# absctl configuration\n\n{}", body);

    std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))
}
