use lockstep_core::{ChatNote, PlaybackState, PlayerAction, Presenter, Status};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const HELP: &str = "\
commands:
  play | pause      play/pause control (broadcast to the room)
  toggle            the player's own play/pause button
  seek <secs>       drag the seek bar to <secs>
  load <url>        open media locally (e.g. /uploads/movie.mp4)
  upload <path>     upload a video and share it with everyone
  say <text>        send a chat message
  status            show the player state
  help              this text
  quit              leave";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Toggle,
    Seek(f64),
    Load(String),
    Upload(PathBuf),
    Say(String),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command `{0}`, try `help`")]
    Unknown(String),

    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),

    #[error("not a time in seconds: {0}")]
    InvalidTime(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let arg = |name: &'static str| {
            if rest.is_empty() {
                Err(CommandError::MissingArgument(name))
            } else {
                Ok(rest.to_string())
            }
        };

        match word.to_ascii_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "play" => Ok(Command::Play),
            "pause" => Ok(Command::Pause),
            "toggle" => Ok(Command::Toggle),
            "seek" => {
                let raw = arg("seek")?;
                raw.parse::<f64>()
                    .ok()
                    .filter(|t| t.is_finite())
                    .map(Command::Seek)
                    .ok_or(CommandError::InvalidTime(raw))
            }
            "load" => arg("load").map(Command::Load),
            "upload" => arg("upload").map(|p| Command::Upload(PathBuf::from(p))),
            "say" => arg("say").map(Command::Say),
            "status" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Prints controller feedback to the terminal.
#[derive(Debug, Default)]
pub struct ConsolePresenter {
    last_status: Option<Status>,
}

impl ConsolePresenter {
    pub fn last_status(&self) -> Option<&Status> {
        self.last_status.as_ref()
    }

    pub fn chat(&self, content: &str) {
        println!("💬 {}", content);
    }

    pub fn history(&self, notes: &[ChatNote]) {
        for note in notes {
            println!("💬 {}: {}", note.author, note.content);
        }
    }

    pub fn playback(&self, source: Option<&str>, state: &PlaybackState, suppressed: bool) {
        println!(
            "source={} time={:.2}s {} ready={:?}{}",
            source.unwrap_or("-"),
            state.current_time,
            if state.paused { "paused" } else { "playing" },
            state.ready_state,
            if suppressed { " (applying remote change)" } else { "" },
        );
    }
}

impl Presenter for ConsolePresenter {
    fn acknowledge(&mut self, action: PlayerAction) {
        println!("  {}", action.symbol());
    }

    fn set_status(&mut self, status: Status) {
        println!("[{}]", status);
        self.last_status = Some(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!("play".parse::<Command>(), Ok(Command::Play));
        assert_eq!("  PAUSE ".parse::<Command>(), Ok(Command::Pause));
        assert_eq!("seek 12.5".parse::<Command>(), Ok(Command::Seek(12.5)));
        assert_eq!("say hello  there".parse::<Command>(), Ok(Command::Say("hello  there".into())));
        assert_eq!(
            "upload ./my clip.mp4".parse::<Command>(),
            Ok(Command::Upload(PathBuf::from("./my clip.mp4")))
        );
        assert_eq!("exit".parse::<Command>(), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Command>(), Err(CommandError::Empty));
        assert_eq!("seek".parse::<Command>(), Err(CommandError::MissingArgument("seek")));
        assert_eq!(
            "seek soon".parse::<Command>(),
            Err(CommandError::InvalidTime("soon".into()))
        );
        assert_eq!("seek NaN".parse::<Command>(), Err(CommandError::InvalidTime("NaN".into())));
        assert_eq!("rewind".parse::<Command>(), Err(CommandError::Unknown("rewind".into())));
    }

    #[test]
    fn test_presenter_remembers_status() {
        let mut presenter = ConsolePresenter::default();
        presenter.set_status(Status::Uploading);
        presenter.set_status(Status::MediaReady);
        assert_eq!(presenter.last_status(), Some(&Status::MediaReady));
    }
}
