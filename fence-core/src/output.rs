//! # Console Output
//!
//! Status lines and labels for terminal output. Everything is colored through
//! `if_supports_color`, so `--colors`, `NO_COLOR` and non-terminal streams are
//! honoured and JSON piped from stdout never carries escape codes.

use owo_colors::{OwoColorize, Stream, Style};

/// When colored output is used
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
  /// Color when the stream is a terminal
  Auto,
  /// Always color
  #[value(alias = "yes")]
  Always,
  /// Never color
  #[value(alias = "no")]
  Never,
}

impl ColorMode {
  /// Install this mode as the process-wide owo-colors override
  pub fn apply(self) {
    match self {
      ColorMode::Always => owo_colors::set_override(true),
      ColorMode::Never => owo_colors::set_override(false),
      ColorMode::Auto => owo_colors::unset_override(),
    }
  }
}

#[derive(Debug, Clone, Copy)]
enum Tone {
  Success,
  Info,
  Error,
}

impl Tone {
  /// Emoji shortcode and the plain symbol used when it is unknown
  const fn symbol(self) -> (&'static str, &'static str) {
    match self {
      Tone::Success => ("check_mark", "✓"),
      Tone::Info => ("information", "i"),
      Tone::Error => ("cross_mark", "✗"),
    }
  }

  fn style(self) -> Style {
    match self {
      Tone::Success => Style::new().green().bold(),
      Tone::Info => Style::new().blue().bold(),
      Tone::Error => Style::new().red().bold(),
    }
  }

  const fn stream(self) -> Stream {
    match self {
      Tone::Error => Stream::Stderr,
      Tone::Success | Tone::Info => Stream::Stdout,
    }
  }

  fn line(self, message: &str) -> String {
    let (shortcode, fallback) = self.symbol();
    let symbol = emojis::get_by_shortcode(shortcode).map_or(fallback, |emoji| emoji.as_str());
    let style = self.style();
    format!(
      "{} {message}",
      symbol.if_supports_color(self.stream(), |text| text.style(style))
    )
  }
}

pub fn print_success(message: &str) {
  println!("{}", Tone::Success.line(message));
}

pub fn print_info(message: &str) {
  println!("{}", Tone::Info.line(message));
}

/// Print an error line to stderr
pub fn print_error(message: &str) {
  eprintln!("{}", Tone::Error.line(message));
}

fn paint(text: &str, style: Style) -> String {
  text
    .if_supports_color(Stream::Stdout, |text| text.style(style))
    .to_string()
}

/// Print a section header, preceded by a blank line
pub fn print_header(header: &str) {
  println!("\n{}", paint(header, Style::new().blue().bold().underline()));
}

pub fn format_target(target: &str) -> String {
  paint(target, Style::new().bright_cyan().bold())
}

/// Color a step status label by outcome
pub fn format_step_status(status: &str) -> String {
  let style = match status {
    "applied" => Style::new().green(),
    "unchanged" => Style::new().bright_black(),
    "failed" => Style::new().red().bold(),
    "cancelled" => Style::new().yellow(),
    _ => Style::new(),
  };
  paint(status, style)
}

/// Color a run state label by severity
pub fn format_run_state(state: &str) -> String {
  let style = match state {
    "completed" => Style::new().green().bold(),
    "partially_failed" => Style::new().red().bold(),
    "aborted" => Style::new().red(),
    "cancelled" => Style::new().yellow().bold(),
    _ => Style::new(),
  };
  paint(state, style)
}

pub fn format_command(cmd: &str) -> String {
  paint(cmd, Style::new().purple())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_lines_keep_message_and_symbol() {
    ColorMode::Never.apply();

    assert!(Tone::Success.line("done").ends_with(" done"));
    assert!(Tone::Error.line("boom").ends_with(" boom"));
    assert_eq!(format_step_status("applied"), "applied");
    assert_eq!(format_run_state("partially_failed"), "partially_failed");
    assert_eq!(format_target("octo/repo:main"), "octo/repo:main");
    assert_eq!(format_step_status("mystery"), "mystery");
  }
}
