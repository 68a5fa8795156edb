use std::borrow::Cow::{self, Borrowed, Owned};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::sync::{Mutex, mpsc};

use formdesk_application::BotDispatcher;
use formdesk_core::identity::{AllowList, UserId};
use formdesk_core::transport::{InboundEvent, InboundPayload};
use formdesk_execution::{AsyncBridge, LogEvent, LoggingOptions, init_tracing};
use formdesk_infrastructure::{ConfigService, SqliteFormRepository};

mod command;
mod console_transport;

use command::{COMMANDS, ConsoleCommand};
use console_transport::ConsoleTransport;

const DISPATCH_TIMEOUT: Duration = Duration::from_secs(30);
const LOG_CAPACITY: usize = 500;
const GUEST_ID: UserId = UserId(1000);

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') || line.starts_with('@') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

/// Most recent log events received from the forwarding layer.
struct LogBuffer {
    receiver: mpsc::UnboundedReceiver<LogEvent>,
    events: VecDeque<LogEvent>,
}

impl LogBuffer {
    fn new(receiver: mpsc::UnboundedReceiver<LogEvent>) -> Self {
        Self {
            receiver,
            events: VecDeque::with_capacity(LOG_CAPACITY),
        }
    }

    fn drain(&mut self) {
        while let Ok(event) = self.receiver.try_recv() {
            if self.events.len() == LOG_CAPACITY {
                self.events.pop_front();
            }
            self.events.push_back(event);
        }
    }

    fn last(&mut self, count: usize) -> impl Iterator<Item = &LogEvent> {
        self.drain();
        let skip = self.events.len().saturating_sub(count);
        self.events.iter().skip(skip)
    }
}

/// The console's view of the bot: who is typing, and where events go.
struct Console {
    bridge: AsyncBridge,
    dispatcher: Arc<Mutex<BotDispatcher>>,
    admins: AllowList,
    current: UserId,
    current_name: String,
}

impl Console {
    /// Dispatches one event on the bot loop and waits for it to finish.
    fn send(&self, sender: Option<UserId>, payload: InboundPayload) -> Result<()> {
        let sender = sender.unwrap_or(self.current);
        let name = if sender == self.current {
            self.current_name.clone()
        } else {
            format!("user {}", sender)
        };
        let event = InboundEvent::new(sender, name, payload);
        let dispatcher = Arc::clone(&self.dispatcher);

        self.bridge
            .submit(async move { dispatcher.lock().await.dispatch(event).await })?
            .wait_timeout(DISPATCH_TIMEOUT)??;
        Ok(())
    }

    fn describe_current(&self) -> String {
        let role = if self.admins.contains(self.current) {
            "admin"
        } else {
            "user"
        };
        format!("{} ({}, {})", self.current, self.current_name, role)
    }
}

fn print_help() {
    println!("{}", "Type a message to send it as the current identity.".bright_black());
    println!("{}", "  /start, /cancel          start or abort the form".bright_black());
    println!("{}", "  /photo <ref>             send a photo".bright_black());
    println!("{}", "  /cb <data>               press an inline button".bright_black());
    println!("{}", "  @<id> <input>            send one input as another identity".bright_black());
    println!("{}", "  /as <id> [name]          switch identity".bright_black());
    println!("{}", "  /logs [n]                show recent log lines".bright_black());
    println!("{}", "  /whoami, /help, quit".bright_black());
}

/// The main entry point for the formdesk console.
///
/// Runs the form bot against a terminal transport. Events are dispatched on
/// an [`AsyncBridge`] loop while rustyline blocks the main thread.
fn main() -> Result<()> {
    // ===== Configuration & Logging =====
    let service = ConfigService::new();
    let config = service.get_config();

    let (log_tx, log_rx) = mpsc::unbounded_channel::<LogEvent>();
    let _guard = init_tracing(
        LoggingOptions::new(config.logging.level.clone())
            .with_log_dir(service.log_dir(&config)?)
            .with_file_prefix("formdesk-console")
            .with_stderr(false)
            .with_forwarding(log_tx),
    )?;
    let mut logs = LogBuffer::new(log_rx);

    // ===== Backend Initialization =====
    let database_path = service.database_path(&config)?;
    let repository = Arc::new(SqliteFormRepository::open(&database_path)?);
    tracing::info!("[Console] Using form database {}", database_path.display());
    let transport = Arc::new(ConsoleTransport);
    let dispatcher = BotDispatcher::from_config(&config.bot, repository, transport);

    let bridge = AsyncBridge::with_shutdown_timeout(
        "formdesk-console",
        Duration::from_secs(config.client.shutdown_timeout_secs),
    );
    bridge.start()?;

    let admins = config.bot.allow_list();
    let mut console = Console {
        bridge,
        dispatcher: Arc::new(Mutex::new(dispatcher)),
        current: GUEST_ID,
        current_name: "Guest".to_string(),
        admins,
    };

    // ===== REPL Setup =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== formdesk console ===".bright_magenta().bold());
    let admin_ids: Vec<String> = console.admins.iter().map(|id| id.to_string()).collect();
    println!(
        "{}",
        format!("Admins: {}", if admin_ids.is_empty() { "none".to_string() } else { admin_ids.join(", ") })
            .bright_black()
    );
    println!("{}", format!("You are {}", console.describe_current()).bright_black());
    println!("{}", "Type '/help' for commands or 'quit' to exit.".bright_black());
    println!();

    // ===== Main REPL Loop =====
    loop {
        let readline = rl.readline(">> ");

        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                let command = match command::parse(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(message) => {
                        println!("{}", message.yellow());
                        continue;
                    }
                };

                match command {
                    ConsoleCommand::Quit => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    ConsoleCommand::Event { sender, payload } => {
                        if let Err(e) = console.send(sender, payload) {
                            eprintln!("{}", format!("Error: {}", e).red());
                        }
                    }
                    ConsoleCommand::SwitchUser { id, name } => {
                        console.current = id;
                        console.current_name = name.unwrap_or_else(|| format!("user {}", id));
                        println!(
                            "{}",
                            format!("You are {}", console.describe_current()).green()
                        );
                    }
                    ConsoleCommand::Logs(count) => {
                        for event in logs.last(count) {
                            println!("{}", event.render().bright_black());
                        }
                    }
                    ConsoleCommand::WhoAmI => {
                        println!("{}", console.describe_current().green());
                    }
                    ConsoleCommand::Help => print_help(),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
        logs.drain();
    }

    console.bridge.shutdown();
    Ok(())
}
