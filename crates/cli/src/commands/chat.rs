//! `stepwise chat` — Plain streaming chat with the model.

use std::io::Write;
use std::path::Path;

use stepwise_agent::{ChatEvent, DirectChat};
use stepwise_core::message::Message;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    config_path: Option<&Path>,
    message: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let provider = super::agent::build_provider(&config)?;
    let chat = DirectChat::new(provider, config.default_model.clone())
        .with_temperature(config.default_temperature);

    if let Some(msg) = message {
        stream_reply(&chat, vec![Message::user(msg)]).await?;
        return Ok(());
    }

    println!();
    println!("  stepwise chat — {}", config.default_model);
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut history = Vec::new();
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

        history.push(Message::user(line));
        match stream_reply(&chat, history.clone()).await {
            Ok(reply) => history.push(Message::assistant(reply)),
            Err(e) => {
                history.pop();
                eprintln!("  [Error] {e}");
            }
        }
        println!();
    }

    Ok(())
}

/// Print the reply as it streams; returns the full text.
async fn stream_reply(
    chat: &DirectChat,
    messages: Vec<Message>,
) -> Result<String, Box<dyn std::error::Error>> {
    let mut rx = chat.stream(messages);
    let mut stdout = std::io::stdout();
    let mut reply = String::new();

    while let Some(event) = rx.recv().await {
        match event {
            ChatEvent::Delta { text } => {
                write!(stdout, "{text}")?;
                stdout.flush()?;
                reply.push_str(&text);
            }
            ChatEvent::Done { .. } => writeln!(stdout)?,
            ChatEvent::Failed { message } => return Err(message.into()),
        }
    }
    Ok(reply)
}
