//! Interactive branch selection for `siteup branches --pick`.
//!
//! Uses dialoguer for the prompt. When stdin is not a terminal the newest
//! admissible branch is chosen without asking.

use std::io::{self, IsTerminal, Write};

use anyhow::Result;
use console::style;
use dialoguer::{Select, theme::ColorfulTheme};

use siteup_core::resolver::ResolutionResult;
use siteup_core::version::BranchTag;

pub struct BranchPicker<W: Write = io::Stdout> {
    /// Output writer (for testing)
    writer: W,
    /// Prompt the operator, or fall back to the newest branch
    interactive: bool,
    theme: ColorfulTheme,
}

impl BranchPicker<io::Stdout> {
    pub fn new() -> Self {
        Self {
            writer: io::stdout(),
            interactive: io::stdin().is_terminal(),
            theme: ColorfulTheme::default(),
        }
    }
}

impl<W: Write> BranchPicker<W> {
    /// Create a non-interactive picker with a custom writer (for testing).
    #[cfg(test)]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            interactive: false,
            theme: ColorfulTheme::default(),
        }
    }

    /// Choose one of the branches `result` offers for `variant`.
    ///
    /// Returns `None` when nothing is admissible.
    pub fn pick(&mut self, variant: &str, result: &ResolutionResult) -> Result<Option<BranchTag>> {
        for warning in &result.warnings {
            writeln!(self.writer, "  {} {}", style("Warning:").yellow(), warning)?;
        }

        let tags = result.tags(variant);
        let Some(newest) = result.newest(variant) else {
            writeln!(
                self.writer,
                "{}",
                style(format!("No branches available for variant '{}'", variant)).red()
            )?;
            return Ok(None);
        };

        if !self.interactive {
            writeln!(self.writer, "Selected newest branch {}", newest)?;
            return Ok(Some(newest.clone()));
        }

        let default = tags.iter().position(|tag| tag == newest).unwrap_or(0);
        let items: Vec<&str> = tags.iter().map(BranchTag::as_str).collect();
        let selection = Select::with_theme(&self.theme)
            .with_prompt(format!("Branch to use ({})", variant))
            .items(&items)
            .default(default)
            .interact()?;

        Ok(tags.get(selection).cloned())
    }
}
