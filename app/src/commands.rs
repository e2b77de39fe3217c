//! Command line options, console commands and hotkey bindings.

use clap::Parser;
use keyloop_core::{HotkeyConfig, KeyCode};
use keyloop_platform::key_name;
use std::path::PathBuf;
use std::str::FromStr;

/// Record key presses with their timing and replay them on a loop.
#[derive(Debug, Parser)]
#[command(name = "keyloop", version, about)]
pub struct Cli {
    /// Config file. Defaults to keyloop/config.json in the user config directory.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log injections instead of performing them
    #[arg(long)]
    pub dry_run: bool,

    /// Print engine events and status as JSON lines
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleRecording,
    TogglePlayback,
    Status,
    Help,
    Quit,
}

impl Command {
    /// The toggle bound to `code`, if it is one of the hotkeys.
    pub fn for_hotkey(code: KeyCode, hotkeys: &HotkeyConfig) -> Option<Self> {
        if code == hotkeys.record {
            Some(Command::ToggleRecording)
        } else if code == hotkeys.play {
            Some(Command::TogglePlayback)
        } else {
            None
        }
    }
}

/// Recording and playback are only reachable through the hotkeys, so the console itself never
/// types anything a recording would pick up.
impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "status" | "s" => Ok(Command::Status),
            "help" | "h" | "?" => Ok(Command::Help),
            "quit" | "q" | "exit" => Ok(Command::Quit),
            other => Err(format!("unknown command: {other} (try 'help')")),
        }
    }
}

pub fn help_text(hotkeys: &HotkeyConfig) -> String {
    format!(
        "hotkeys (global):
  {:<8} start / stop recording
  {:<8} start / stop playback

commands (one per line on stdin):
  status   show the current status
  help     show this text
  quit     stop everything and exit",
        key_name(hotkeys.record),
        key_name(hotkeys.play),
    )
}
