//! Operator commands typed on stdin.

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use lib_dashboard::dashboard::filters::CUSTOM_RANGE;
use lib_dashboard::{Command, ControllerHandle, FilterControls};

pub const HELP: &str = "commands: refresh | ack <id> | note <id> <text> | range <preset> | range custom <from> <to> \
| severity <level>|any | type <event_type>|any | ip <addr>|any | clear | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Refresh,
    Ack(i64),
    Note(i64, String),
    Range(String),
    CustomRange { from: String, to: String },
    Severity(Option<String>),
    EventType(Option<String>),
    SourceIp(Option<String>),
    Clear,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("'{0}' is not a valid alert id")]
    BadId(String),
}

fn optional(value: &str) -> Option<String> {
    match value {
        "" | "any" | "all" => None,
        v => Some(v.to_string()),
    }
}

fn alert_id(raw: Option<&str>, usage: &'static str) -> Result<i64, CommandError> {
    let raw = raw.ok_or(CommandError::Usage(usage))?;
    raw.parse::<i64>().map_err(|_| CommandError::BadId(raw.to_string()))
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb.to_lowercase().as_str() {
            "refresh" | "r" => Ok(ConsoleCommand::Refresh),
            "ack" => Ok(ConsoleCommand::Ack(alert_id(
                rest.split_whitespace().next(),
                "ack <id>",
            )?)),
            "note" => {
                let (id, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                let id = alert_id(Some(id).filter(|s| !s.is_empty()), "note <id> <text>")?;
                let text = text.trim();
                if text.is_empty() {
                    return Err(CommandError::Usage("note <id> <text>"));
                }
                Ok(ConsoleCommand::Note(id, text.to_string()))
            }
            "range" => {
                let parts: Vec<&str> = rest.split_whitespace().collect();
                match parts.as_slice() {
                    [c, from, to] if *c == CUSTOM_RANGE => Ok(ConsoleCommand::CustomRange {
                        from: from.to_string(),
                        to: to.to_string(),
                    }),
                    [c, from] if *c == CUSTOM_RANGE => Ok(ConsoleCommand::CustomRange {
                        from: from.to_string(),
                        to: String::new(),
                    }),
                    [preset] if *preset != CUSTOM_RANGE => Ok(ConsoleCommand::Range(preset.to_string())),
                    _ => Err(CommandError::Usage("range <preset> | range custom <from> [<to>]")),
                }
            }
            "severity" | "sev" => Ok(ConsoleCommand::Severity(optional(rest))),
            "type" => Ok(ConsoleCommand::EventType(optional(rest))),
            "ip" => Ok(ConsoleCommand::SourceIp(optional(rest))),
            "clear" => Ok(ConsoleCommand::Clear),
            "help" | "?" => Ok(ConsoleCommand::Help),
            "quit" | "exit" | "q" => Ok(ConsoleCommand::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }

    /// The controller command this maps to, updating `controls` for filter edits.
    /// `clear` restores `initial`, the controls the console started with.
    pub fn to_controller(self, controls: &mut FilterControls, initial: &FilterControls) -> Option<Command> {
        match self {
            ConsoleCommand::Refresh => Some(Command::Resync),
            ConsoleCommand::Ack(id) => Some(Command::Acknowledge(id)),
            ConsoleCommand::Note(alert_id, note) => Some(Command::AddNote { alert_id, note }),
            ConsoleCommand::Range(preset) => {
                controls.time_range = preset;
                controls.range_from.clear();
                controls.range_to.clear();
                Some(Command::SetControls(controls.clone()))
            }
            ConsoleCommand::CustomRange { from, to } => {
                controls.time_range = CUSTOM_RANGE.to_string();
                controls.range_from = from;
                controls.range_to = to;
                Some(Command::SetControls(controls.clone()))
            }
            ConsoleCommand::Severity(level) => {
                controls.severity = level.unwrap_or_default();
                Some(Command::SetControls(controls.clone()))
            }
            ConsoleCommand::EventType(event_type) => {
                controls.event_type = event_type.unwrap_or_default();
                Some(Command::SetControls(controls.clone()))
            }
            ConsoleCommand::SourceIp(ip) => {
                controls.source_ip = ip.unwrap_or_default();
                Some(Command::SetControls(controls.clone()))
            }
            ConsoleCommand::Clear => {
                *controls = initial.clone();
                Some(Command::SetControls(controls.clone()))
            }
            ConsoleCommand::Help | ConsoleCommand::Quit => None,
        }
    }
}

/// Reads commands from stdin until `quit`, end of input or cancellation.
/// `quit` cancels `cancel` so the rest of the program shuts down too.
pub async fn read_commands(controller: ControllerHandle, initial: FilterControls, cancel: CancellationToken) {
    let mut controls = initial.clone();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", HELP);

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => return,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                log::info!("stdin closed; commands disabled.");
                return;
            }
            Err(e) => {
                log::error!("Failed to read command: {}", e);
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match ConsoleCommand::parse(&line) {
            Ok(ConsoleCommand::Quit) => {
                log::info!("Quit requested from the console.");
                cancel.cancel();
                return;
            }
            Ok(ConsoleCommand::Help) => println!("{}", HELP),
            Ok(command) => {
                log::debug!("Console command: {:?}", command);
                if let Some(command) = command.to_controller(&mut controls, &initial) {
                    if !controller.send(command) {
                        return;
                    }
                }
            }
            Err(e) => println!("{}", e),
        }
    }
}
