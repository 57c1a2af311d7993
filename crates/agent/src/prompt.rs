//! Prompt construction for each reasoning step.

use std::fmt::Write;

use stepwise_core::message::Message;
use stepwise_core::tool::ToolView;

use crate::scratchpad::Scratchpad;

const INSTRUCTIONS: &str = "\
You are a helpful assistant that solves tasks step by step.

Think out loud in plain prose. When you need a tool, write exactly one action \
block and stop writing after it:

```json
{\"tool_name\": \"<tool name>\", \"tool_input\": { ... }}
```

Only use the tools listed below and follow their input schemas exactly. The \
tool's result will be shown to you as an Observation on the next step.

When you can answer the user, do not write an action block. Start your reply \
with \"Final Answer:\" followed by the complete answer.";

/// System prompt listing the tools available to this run.
pub fn system_prompt(tools: &ToolView) -> String {
    let mut prompt = String::from(INSTRUCTIONS);
    prompt.push_str("\n\nAvailable tools:\n");
    if tools.is_empty() {
        prompt.push_str("(none; answer from your own knowledge)\n");
    }
    for def in tools.definitions() {
        let _ = writeln!(prompt, "- {}: {}", def.name, def.description);
        if !def.parameters.is_null() {
            let _ = writeln!(prompt, "  Input schema: {}", def.parameters);
        }
    }
    prompt
}

/// The user turn: prior reasoning, then the request itself.
pub fn user_prompt(request: &str, scratchpad: &Scratchpad) -> String {
    if scratchpad.is_empty() {
        return format!("User's request: {request}");
    }
    format!(
        "Scratchpad:\n{}\n\nUser's request: {request}\n\nContinue from where you left off.",
        scratchpad.render()
    )
}

/// Full message list for one provider call.
pub fn build_messages(request: &str, tools: &ToolView, scratchpad: &Scratchpad) -> Vec<Message> {
    vec![
        Message::system(system_prompt(tools)),
        Message::user(user_prompt(request, scratchpad)),
    ]
}
