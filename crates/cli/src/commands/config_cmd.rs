//! `stepwise config` — Configuration management commands.

use std::path::Path;

use stepwise_config::AppConfig;

pub async fn validate(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let path = super::config_file(config_path);
    println!("Validating {}", path.display());

    let config = match AppConfig::load_with_env(&path) {
        Ok(config) => config,
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    };
    println!("   ✅ Config parsed and validated");

    let warnings = warnings(&config);
    if warnings.is_empty() {
        println!("   ✅ All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("   ⚠️  {w}");
        }
    }

    println!();
    println!("   Provider:  {}", config.default_provider);
    println!("   Model:     {}", config.default_model);
    println!("   Max steps: {}", config.agent.max_steps);
    println!(
        "   Gateway:   {}:{}",
        config.gateway.host, config.gateway.port
    );
    Ok(())
}

/// Problems that do not stop loading but will bite at run time.
fn warnings(config: &AppConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    if !config.has_api_key() {
        warnings.push("No API key set (set STEPWISE_API_KEY or OPENAI_API_KEY)".to_string());
    }
    if config.tools.brave_api_key.is_none() {
        warnings.push("No Brave key set; web_search will fail (set BRAVE_API_KEY)".to_string());
    }
    if config.agent.max_steps == 0 {
        warnings.push("max_steps is 0; the agent will answer without calling the model".into());
    }
    warnings
}

pub async fn show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path)?;
    redact(&mut config);
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn redact(config: &mut AppConfig) {
    if config.api_key.is_some() {
        config.api_key = Some("[REDACTED]".into());
    }
    if config.tools.brave_api_key.is_some() {
        config.tools.brave_api_key = Some("[REDACTED]".into());
    }
}

pub async fn init(config_path: Option<&Path>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = super::config_file(config_path);
    write_starter(&path, force)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn write_starter(path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() && !force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )
        .into());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(())
}

pub async fn path(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", super::config_file(config_path).display());
    Ok(())
}
