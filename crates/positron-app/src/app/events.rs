use std::fmt;
use std::str::FromStr;

use positron_common::WindowError;

/// Application lifecycle events callbacks can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppEvent {
    Ready,
    WindowAllClosed,
    BeforeQuit,
    Quit,
}

impl AppEvent {
    pub fn name(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::WindowAllClosed => "window-all-closed",
            Self::BeforeQuit => "before-quit",
            Self::Quit => "quit",
        }
    }
}

impl FromStr for AppEvent {
    type Err = WindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(Self::Ready),
            "window-all-closed" => Ok(Self::WindowAllClosed),
            "before-quit" => Ok(Self::BeforeQuit),
            "quit" => Ok(Self::Quit),
            other => Err(WindowError::UnknownEvent(other.to_string())),
        }
    }
}

impl fmt::Display for AppEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `NotReady -> Ready -> Quitting -> Quit`. `Quit` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    NotReady,
    Ready,
    Quitting,
    Quit,
}
