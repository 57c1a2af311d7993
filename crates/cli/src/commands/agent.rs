//! `stepwise agent` — Run the reasoning agent, rendering events as they stream.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use stepwise_agent::{AgentEvent, ReactAgent};
use stepwise_config::AppConfig;
use stepwise_core::provider::Provider;
use stepwise_core::tool::ToolView;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

pub struct AgentOptions {
    pub max_steps: Option<usize>,
    pub tools: Vec<String>,
    pub trace: bool,
}

pub async fn run(
    config_path: Option<&Path>,
    message: Option<String>,
    opts: AgentOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let provider = build_provider(&config)?;

    let registry = stepwise_tools::default_registry(&config.tools)?;
    let view = if !opts.tools.is_empty() {
        registry.filtered(opts.tools.as_slice())
    } else if !config.agent.enabled_tools.is_empty() {
        registry.filtered(config.agent.enabled_tools.as_slice())
    } else {
        registry.view()
    };

    let mut agent = ReactAgent::new(provider, config.default_model.clone(), view)
        .with_config(&config.agent)
        .with_temperature(config.default_temperature);
    if let Some(max) = opts.max_steps {
        agent = agent.with_max_steps(max);
    }
    debug!(
        tools = ?agent.tools().names(),
        max_steps = agent.max_steps(),
        "Agent configured"
    );

    if let Some(msg) = message {
        return run_once(&agent, msg, opts.trace).await;
    }

    println!();
    println!("  stepwise agent — interactive mode");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!("  Tools:     {}", describe_tools(agent.tools()));
    println!("  Max steps: {}", agent.max_steps());
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }
        if let Err(e) = run_once(&agent, line.to_string(), opts.trace).await {
            eprintln!("  [Error] {e}");
        }
        println!();
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}

/// Build the provider, explaining how to fix a missing API key.
pub(crate) fn build_provider(
    config: &AppConfig,
) -> Result<Arc<dyn Provider>, Box<dyn std::error::Error>> {
    stepwise_providers::build_from_config(config).map_err(|e| {
        eprintln!();
        eprintln!("  ERROR: {e}");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    STEPWISE_API_KEY  = 'sk-...'   (generic)");
        eprintln!("    OPENAI_API_KEY    = 'sk-...'   (for OpenAI direct)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        e.into()
    })
}

fn describe_tools(view: &ToolView) -> String {
    if view.is_empty() {
        "none".into()
    } else {
        view.names().join(", ")
    }
}

async fn run_once(
    agent: &ReactAgent,
    message: String,
    trace: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut rx = agent.run_stream(message);
    let mut stdout = std::io::stdout();
    let mut failure = None;

    while let Some(event) = rx.recv().await {
        if trace {
            writeln!(stdout, "{}", serde_json::to_string(&event)?)?;
        } else {
            write!(stdout, "{}", render(&event))?;
        }
        stdout.flush()?;
        if let AgentEvent::RunFailed { message } = event {
            failure = Some(message);
        }
    }

    match failure {
        Some(message) => Err(message.into()),
        None => Ok(()),
    }
}

/// Terminal rendering of one event.
pub fn render(event: &AgentEvent) -> String {
    match event {
        AgentEvent::ThoughtStart { step } => format!("\n── Step {step} ──\n"),
        AgentEvent::ThoughtChunk { text } | AgentEvent::ObservationChunk { text } => text.clone(),
        AgentEvent::ThoughtComplete | AgentEvent::ObservationComplete => "\n".into(),
        AgentEvent::ActionStart { summary, .. } => format!("→ {summary}\n"),
        AgentEvent::ActionProgress { text } => format!("  {text}\n"),
        AgentEvent::ObservationStart => "← Observation:\n".into(),
        AgentEvent::Error { message } => format!("! {message}\n"),
        AgentEvent::FinalAnswer { text } => format!("\nFinal answer:\n{text}\n"),
        AgentEvent::RunFailed { message } => format!("\nRun failed: {message}\n"),
    }
}
