//! `stepwise tools` — List the built-in tools.

use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let registry = stepwise_tools::default_registry(&config.tools)?;
    let enabled = &config.agent.enabled_tools;

    println!("Built-in tools ({}):", registry.len());
    for def in registry.definitions() {
        let marker = if enabled.is_empty() || enabled.contains(&def.name) {
            "*"
        } else {
            " "
        };
        println!("  {marker} {:<12} {}", def.name, def.description);
    }
    println!();
    println!("  * enabled for agent runs");
    if config.tools.brave_api_key.is_none() {
        println!("  web_search needs BRAVE_API_KEY");
    }
    Ok(())
}
