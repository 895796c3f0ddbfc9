//! Slash commands for interactive mode

use ragline_core::{Engine, Settings};

/// Result of executing a slash command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Clear the conversation
    Clear,
    /// Show a message to the user (not sent to the backend)
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Short label for the active mode and endpoint
pub fn modes_label(settings: &Settings) -> String {
    let mode = if settings.use_mock {
        "mock"
    } else if settings.use_streaming {
        "stream"
    } else {
        "single"
    };
    format!("{} │ {}", mode, settings.effective_endpoint())
}

/// Parse and execute a slash command. Returns `None` for non-command input.
pub fn execute_command(input: &str, engine: &mut Engine) -> Option<CommandResult> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default().to_lowercase();
    let args = parts.next().map(str::trim).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "clear" | "c" => CommandResult::Clear,

        "quit" | "exit" | "q" => CommandResult::Exit,

        "mock" => match parse_switch(args, engine.settings().use_mock) {
            Some(on) => {
                engine.settings_mut().set_mock(on);
                switched("Mock mode", on)
            }
            None => usage("/mock"),
        },

        "stream" => match parse_switch(args, engine.settings().use_streaming) {
            Some(on) => {
                engine.settings_mut().set_streaming(on);
                switched("Streaming", on)
            }
            None => usage("/stream"),
        },

        "endpoint" => {
            if !args.is_empty() {
                engine.settings_mut().set_endpoint(args);
            }
            CommandResult::Message(format!(
                "Endpoint: {}",
                engine.settings().effective_endpoint()
            ))
        }

        "settings" => CommandResult::Message(settings_message(engine.settings())),

        _ => CommandResult::Unknown(command),
    })
}

fn parse_switch(args: &str, current: bool) -> Option<bool> {
    match args.to_lowercase().as_str() {
        "" => Some(!current),
        "on" | "true" | "1" | "yes" => Some(true),
        "off" | "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn switched(label: &str, on: bool) -> CommandResult {
    CommandResult::Message(format!("{}: {}", label, if on { "on" } else { "off" }))
}

fn usage(command: &str) -> CommandResult {
    CommandResult::Message(format!("Usage: {} [on|off]", command))
}

fn settings_message(settings: &Settings) -> String {
    let flag = |on: bool| if on { "on" } else { "off" };
    format!(
        "Endpoint:  {}\nStreaming: {}\nMock:      {}",
        settings.effective_endpoint(),
        flag(settings.use_streaming),
        flag(settings.use_mock)
    )
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?          Show this help message
  /mock [on|off]         Toggle mock answers (no network)
  /stream [on|off]       Toggle server-sent event streaming
  /endpoint [url]        Show or set the query endpoint
  /settings              Show current settings
  /clear, /c             Clear conversation history
  /quit, /exit, /q       Exit ragline

Mock mode takes precedence over streaming."#
        .to_string()
}
