//! Console output for helper runs.

use std::io::{self, Write};

use console::style;

use siteup_core::status::StatusReporter;

/// Prints helper progress as it happens
pub struct ConsoleReporter<W: Write = io::Stdout> {
    writer: W,
    /// Show informational messages
    verbose: bool,
    current: Option<String>,
}

impl ConsoleReporter<io::Stdout> {
    pub fn new(verbose: bool) -> Self {
        Self::with_writer(io::stdout(), verbose)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn with_writer(writer: W, verbose: bool) -> Self {
        Self {
            writer,
            verbose,
            current: None,
        }
    }

    fn line(&mut self, text: std::fmt::Arguments<'_>) {
        // A closed stdout should not abort the helper run
        let _ = writeln!(self.writer, "{}", text);
    }
}

impl<W: Write> StatusReporter for ConsoleReporter<W> {
    fn status(&mut self, message: &str) {
        self.line(format_args!("{} {}", style("==>").cyan().bold(), message));
        self.current = Some(message.to_string());
    }

    fn success(&mut self) {
        if let Some(current) = self.current.take() {
            self.line(format_args!("    {} {}", style("✓").green(), current));
        }
    }

    fn warning(&mut self, message: &str) {
        self.line(format_args!("    {} {}", style("Warning:").yellow(), message));
    }

    fn error(&mut self, message: &str) {
        self.line(format_args!("{} {}", style("Error:").red().bold(), message));
    }

    fn message(&mut self, message: &str) {
        if self.verbose {
            self.line(format_args!("    {}", style(message).dim()));
        }
    }
}
