//! Console input grammar.
//!
//! A line is either a console command or an event sent on behalf of the
//! current identity. `@<id> <rest>` sends `<rest>` as identity `<id>` once.

use formdesk_core::identity::UserId;
use formdesk_core::transport::{InboundPayload, PhotoRef};

pub const COMMANDS: &[&str] = &[
    "/as", "/start", "/cancel", "/photo", "/cb", "/logs", "/whoami", "/help",
];

pub const DEFAULT_LOG_LINES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Deliver an event to the bot.
    Event {
        sender: Option<UserId>,
        payload: InboundPayload,
    },
    /// Switch the current identity.
    SwitchUser { id: UserId, name: Option<String> },
    Logs(usize),
    WhoAmI,
    Help,
    Quit,
}

pub fn parse(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line == "quit" || line == "exit" {
        return Ok(Some(ConsoleCommand::Quit));
    }

    let (sender, rest) = match line.strip_prefix('@') {
        Some(addressed) => {
            let (id, rest) = addressed.split_once(' ').unwrap_or((addressed, ""));
            let id = id
                .parse::<UserId>()
                .map_err(|_| format!("invalid identity '{}'", id))?;
            (Some(id), rest.trim())
        }
        None => (None, line),
    };
    if rest.is_empty() {
        return Err("nothing to send".to_string());
    }

    let (word, arg) = rest.split_once(' ').unwrap_or((rest, ""));
    let arg = arg.trim();
    let event = |payload: InboundPayload| -> Result<Option<ConsoleCommand>, String> {
        Ok(Some(ConsoleCommand::Event { sender, payload }))
    };

    match word {
        "/start" => event(InboundPayload::Start),
        "/cancel" => event(InboundPayload::Cancel),
        "/photo" if arg.is_empty() => Err("usage: /photo <ref>".to_string()),
        "/photo" => event(InboundPayload::Photo(PhotoRef::new(arg))),
        "/cb" if arg.is_empty() => Err("usage: /cb <callback data>".to_string()),
        "/cb" => event(InboundPayload::Callback(arg.to_string())),
        "/as" | "/logs" | "/whoami" | "/help" if sender.is_some() => {
            Err(format!("{} cannot be addressed to an identity", word))
        }
        "/as" => {
            let (id, name) = arg.split_once(' ').unwrap_or((arg, ""));
            let id = id
                .parse::<UserId>()
                .map_err(|_| "usage: /as <id> [name]".to_string())?;
            let name = Some(name.trim().to_string()).filter(|n| !n.is_empty());
            Ok(Some(ConsoleCommand::SwitchUser { id, name }))
        }
        "/logs" if arg.is_empty() => Ok(Some(ConsoleCommand::Logs(DEFAULT_LOG_LINES))),
        "/logs" => arg
            .parse()
            .map(|n| Some(ConsoleCommand::Logs(n)))
            .map_err(|_| "usage: /logs [count]".to_string()),
        "/whoami" => Ok(Some(ConsoleCommand::WhoAmI)),
        "/help" => Ok(Some(ConsoleCommand::Help)),
        _ if word.starts_with('/') => Err(format!("unknown command '{}'", word)),
        _ => event(InboundPayload::Text(rest.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(sender: Option<i64>, payload: InboundPayload) -> Option<ConsoleCommand> {
        Some(ConsoleCommand::Event {
            sender: sender.map(UserId),
            payload,
        })
    }

    #[test]
    fn test_plain_text_is_an_event() {
        assert_eq!(
            parse("  Иван Петров ").unwrap(),
            event(None, InboundPayload::Text("Иван Петров".to_string()))
        );
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn test_addressed_events() {
        assert_eq!(
            parse("@42 /start").unwrap(),
            event(Some(42), InboundPayload::Start)
        );
        assert_eq!(
            parse("@1 /cb mark_transferred:42").unwrap(),
            event(
                Some(1),
                InboundPayload::Callback("mark_transferred:42".to_string())
            )
        );
        assert_eq!(
            parse("@42 /photo file-1").unwrap(),
            event(Some(42), InboundPayload::Photo(PhotoRef::new("file-1")))
        );
        assert!(parse("@abc hello").is_err());
        assert!(parse("@42").is_err());
    }

    #[test]
    fn test_console_commands() {
        assert_eq!(
            parse("/as 7 Anna Smith").unwrap(),
            Some(ConsoleCommand::SwitchUser {
                id: UserId(7),
                name: Some("Anna Smith".to_string())
            })
        );
        assert_eq!(
            parse("/as 7").unwrap(),
            Some(ConsoleCommand::SwitchUser {
                id: UserId(7),
                name: None
            })
        );
        assert_eq!(
            parse("/logs").unwrap(),
            Some(ConsoleCommand::Logs(DEFAULT_LOG_LINES))
        );
        assert_eq!(parse("/logs 5").unwrap(), Some(ConsoleCommand::Logs(5)));
        assert_eq!(parse("exit").unwrap(), Some(ConsoleCommand::Quit));
    }

    #[test]
    fn test_invalid_commands() {
        assert!(parse("/photo").is_err());
        assert!(parse("/as x").is_err());
        assert!(parse("/launch").is_err());
        assert!(parse("@5 /logs").is_err());
    }
}
