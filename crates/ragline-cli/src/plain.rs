//! Line-oriented mode for pipes and non-TUI terminals

use crate::commands::{CommandResult, execute_command, modes_label};
use ragline_client::{Message, Role, Sanitizer};
use ragline_core::{ChatEvent, Engine, SendOutcome};
use ragline_tui::widgets::message_list::{source_title, strip_control};
use std::future::Future;
use std::io::{self, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

/// Prints the growing answer of a send as it arrives
#[derive(Debug)]
pub struct DeltaPrinter {
    /// Log length before the send; earlier messages are never printed
    start: usize,
    current: Option<usize>,
    printed: usize,
}

impl DeltaPrinter {
    /// Start printing after the first `start` messages
    pub fn new(start: usize) -> Self {
        Self {
            start,
            current: None,
            printed: 0,
        }
    }

    /// Print whatever answer text is new in `messages`
    pub fn update(&mut self, messages: &[Message], out: &mut impl Write) -> io::Result<()> {
        for (index, msg) in messages.iter().enumerate().skip(self.start) {
            if msg.role != Role::Assistant {
                continue;
            }
            if self.current != Some(index) {
                if self.current.is_some() {
                    writeln!(out)?;
                }
                self.current = Some(index);
                self.printed = 0;
            }

            let text = strip_control(&msg.content);
            let count = text.chars().count();
            if count > self.printed {
                let suffix: String = text.chars().skip(self.printed).collect();
                write!(out, "{}", suffix)?;
                self.printed = count;
            }
        }
        out.flush()
    }

    /// Print the rest of the answer followed by its sources
    pub fn finish(
        &mut self,
        messages: &[Message],
        sanitizer: &Sanitizer,
        out: &mut impl Write,
    ) -> io::Result<()> {
        self.update(messages, out)?;
        let Some(msg) = self.current.and_then(|i| messages.get(i)) else {
            return Ok(());
        };
        writeln!(out)?;
        write_sources(msg, sanitizer, out)?;
        out.flush()
    }
}

fn write_sources(msg: &Message, sanitizer: &Sanitizer, out: &mut impl Write) -> io::Result<()> {
    if msg.sources.is_empty() {
        return Ok(());
    }
    writeln!(out, "Sources:")?;
    for (i, source) in msg.sources.iter().enumerate() {
        let href = sanitizer.url(&source.url);
        if href.is_empty() {
            writeln!(out, "  {}. {}", i + 1, source_title(source, i))?;
        } else {
            writeln!(out, "  {}. {} <{}>", i + 1, source_title(source, i), href)?;
        }
    }
    Ok(())
}

/// Print the whole conversation
pub fn print_history(
    messages: &[Message],
    sanitizer: &Sanitizer,
    out: &mut impl Write,
) -> io::Result<()> {
    if messages.is_empty() {
        writeln!(out, "No messages yet.")?;
        return Ok(());
    }
    for msg in messages {
        writeln!(out, "{}: {}", msg.role.label(), strip_control(&msg.content))?;
        write_sources(msg, sanitizer, out)?;
        writeln!(out)?;
    }
    out.flush()
}

/// Send one question and print the answer as it arrives. Ctrl+C aborts the send.
pub async fn send_and_print(engine: &mut Engine, question: &str) -> anyhow::Result<SendOutcome> {
    let sanitizer = engine.conversation().sanitizer().clone();
    let mut events = engine.subscribe();
    let handle = engine.handle();
    let mut printer = DeltaPrinter::new(engine.messages().len());
    let mut stdout = io::stdout();

    let outcome = {
        let mut send_future = std::pin::pin!(engine.send(question));
        let mut ctrl_c = std::pin::pin!(tokio::signal::ctrl_c());
        let mut interrupted = false;

        loop {
            tokio::select! {
                biased;

                outcome = &mut send_future => break outcome,

                event = events.recv() => match event {
                    Ok(ChatEvent::Updated { messages }) => printer.update(&messages, &mut stdout)?,
                    Ok(ChatEvent::Status { text, is_error }) => {
                        tracing::debug!(is_error, "Status: {}", text);
                    }
                    Ok(ChatEvent::Sending { .. }) => {}
                    Err(e) => tracing::debug!("Event receiver: {}", e),
                },

                _ = &mut ctrl_c, if !interrupted => {
                    interrupted = true;
                    handle.abort();
                }
            }
        }
    };

    printer.finish(engine.messages(), &sanitizer, &mut stdout)?;
    Ok(outcome)
}

/// Next prompt line, or `None` at EOF or when `interrupt` fires first
pub async fn next_input<R>(
    lines: &mut Lines<R>,
    interrupt: impl Future<Output = ()>,
) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    tokio::select! {
        line = lines.next_line() => line,
        _ = interrupt => Ok(None),
    }
}

async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Read questions from stdin until EOF, Ctrl+C or `/quit`
pub async fn run_interactive(engine: &mut Engine) -> anyhow::Result<()> {
    if std::io::IsTerminal::is_terminal(&io::stderr()) {
        eprintln!("ragline ({})", modes_label(engine.settings()));
        eprintln!("Type /help for commands.");
        eprintln!();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(input) = next_input(&mut lines, ctrl_c()).await? else {
            println!();
            break;
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(result) = execute_command(input, engine) {
            match result {
                CommandResult::Clear => {
                    engine.clear();
                    println!("Cleared conversation.");
                }
                CommandResult::Message(text) => println!("{}", text),
                CommandResult::Exit => break,
                CommandResult::Unknown(command) => {
                    println!("Unknown command: /{}", command);
                    println!("Type /help for available commands.");
                }
            }
            println!();
            continue;
        }

        if let SendOutcome::Failed(reason) = send_and_print(engine, input).await? {
            tracing::warn!("Send failed: {}", reason);
        }
        println!();
    }

    Ok(())
}
