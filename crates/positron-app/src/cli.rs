use std::path::PathBuf;

use clap::Parser;

/// Positron: native windows around web content.
#[derive(Parser, Debug)]
#[command(name = "positron", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Load this URL into the window.
    #[arg(long, group = "source")]
    pub url: Option<String>,

    /// Load this local HTML file into the window.
    #[arg(long, group = "source")]
    pub file: Option<PathBuf>,

    /// Start the configured dev server and load its URL.
    #[arg(long, group = "source")]
    pub dev: bool,

    /// Use the in-process engine and run a bridge self-check.
    #[arg(long)]
    pub headless: bool,
}

/// What the first window shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    File(PathBuf),
    DevServer,
    Builtin,
}

impl Args {
    pub fn source(&self) -> Source {
        if let Some(url) = &self.url {
            Source::Url(url.clone())
        } else if let Some(file) = &self.file {
            Source::File(file.clone())
        } else if self.dev {
            Source::DevServer
        } else {
            Source::Builtin
        }
    }

    /// Tracing directive: `--log-level` wins over the config file.
    pub fn log_directive(&self, configured: &str) -> String {
        match self.log_level.as_deref() {
            Some(level) if !level.contains('=') => format!("positron={level}"),
            Some(directive) => directive.to_string(),
            None => configured.to_string(),
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
