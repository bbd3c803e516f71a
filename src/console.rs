//! Interactive commands read from stdin

use std::str::FromStr;

/// Errors raised while parsing a console line
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

/// One console command
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Play,
    Stop,
    Next,
    Prev,
    /// Zero-based list row
    Click(usize),
    Loop(bool),
    Shuffle(bool),
    Favorite(String),
    Search(String),
    FavoritesOnly(bool),
    Rescan,
    List,
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  play | stop | next | prev
  click <n>            play row n of 'list'
  loop on|off          shuffle on|off
  fav <title>          toggle a favorite
  search <text>        filter the list (empty clears)
  favonly on|off       only list and queue favorites
  rescan | list | status | help | quit";

fn parse_switch(arg: &str, usage: &'static str) -> Result<bool, CommandError> {
    match arg.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(CommandError::Usage(usage)),
    }
}

impl FromStr for ConsoleCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "" => return Err(CommandError::Empty),
            "play" => ConsoleCommand::Play,
            "stop" => ConsoleCommand::Stop,
            "next" => ConsoleCommand::Next,
            "prev" => ConsoleCommand::Prev,
            "click" => {
                let row: usize = rest
                    .parse()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or(CommandError::Usage("click <n>"))?;
                ConsoleCommand::Click(row - 1)
            }
            "loop" => ConsoleCommand::Loop(parse_switch(rest, "loop on|off")?),
            "shuffle" => ConsoleCommand::Shuffle(parse_switch(rest, "shuffle on|off")?),
            "favonly" => ConsoleCommand::FavoritesOnly(parse_switch(rest, "favonly on|off")?),
            "fav" if rest.is_empty() => return Err(CommandError::Usage("fav <title>")),
            "fav" => ConsoleCommand::Favorite(rest.to_string()),
            "search" => ConsoleCommand::Search(rest.to_string()),
            "rescan" => ConsoleCommand::Rescan,
            "list" | "ls" => ConsoleCommand::List,
            "status" => ConsoleCommand::Status,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        Ok(command)
    }
}
