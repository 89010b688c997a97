//! Status lines for the user and diagnostic logging.
//!
//! Status lines always go to stderr so that stdout stays clean for anything a command prints
//! as data (dry-run JSON, BibTeX entries).

use std::fmt::Display;

use owo_colors::{OwoColorize, Stream};
use tracing_subscriber::EnvFilter;

pub fn success(msg: impl Display) {
    eprintln!("{} {msg}", "✓".if_supports_color(Stream::Stderr, |t| t.green()));
}

pub fn failure(msg: impl Display) {
    eprintln!("{} {msg}", "✗".if_supports_color(Stream::Stderr, |t| t.red()));
}

pub fn warning(msg: impl Display) {
    eprintln!("{} {msg}", "⚠".if_supports_color(Stream::Stderr, |t| t.yellow()));
}

pub fn added(msg: impl Display) {
    eprintln!("{} {msg}", "+".if_supports_color(Stream::Stderr, |t| t.cyan()));
}

pub fn note(msg: impl Display) {
    eprintln!("{} {msg}", "•".if_supports_color(Stream::Stderr, |t| t.dimmed()));
}

/// Indented continuation of the previous status line.
pub fn detail(msg: impl Display) {
    eprintln!("    {msg}");
}

pub fn heading(title: impl Display) {
    let rule = "=".repeat(60);
    eprintln!("{rule}");
    eprintln!("{}", title.if_supports_color(Stream::Stderr, |t| t.bold()));
    eprintln!("{rule}");
}

/// Install the tracing subscriber. `RUST_LOG` wins over the `-v` count.
pub fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pubkit={default}")));
    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
