//! Interactive menu shown when svcdeploy is started without a command.
//!
//! Offers the two operator choices (install everything, remove everything),
//! confirms destructive removal, and pauses before exit so a double-clicked
//! console window stays open long enough to read the result.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use console::style;
use dialoguer::{Confirm, Select, theme::ColorfulTheme};

use svcdeploy_core::config::DeployConfig;

/// What the operator asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Install,
    Remove,
}

/// Pre-filled values from CLI args that skip prompts.
#[derive(Debug, Clone, Default)]
pub struct PrefilledOptions {
    /// Action - if Some, skip the menu
    pub choice: Option<MenuChoice>,
    /// Skip the removal confirmation
    pub yes: bool,
}

#[derive(Debug, Clone)]
pub struct InteractiveResult {
    pub choice: MenuChoice,
    /// Whether the operator confirmed; always true for install
    pub confirmed: bool,
}

pub struct InteractiveFlow<W: Write = io::Stdout> {
    base_dir: PathBuf,
    services: Vec<String>,
    prefilled: PrefilledOptions,
    /// Output writer (for testing)
    writer: W,
    theme: ColorfulTheme,
}

impl InteractiveFlow<io::Stdout> {
    pub fn new(config: &DeployConfig, prefilled: PrefilledOptions) -> Self {
        Self::build(config, prefilled, io::stdout())
    }
}

impl<W: Write> InteractiveFlow<W> {
    /// Create a flow with a custom writer (for testing).
    #[cfg(test)]
    pub fn with_writer(config: &DeployConfig, prefilled: PrefilledOptions, writer: W) -> Self {
        Self::build(config, prefilled, writer)
    }

    fn build(config: &DeployConfig, prefilled: PrefilledOptions, writer: W) -> Self {
        Self {
            base_dir: config.base_dir().to_path_buf(),
            services: config
                .services()
                .iter()
                .map(|def| def.name().to_string())
                .collect(),
            prefilled,
            writer,
            theme: ColorfulTheme::default(),
        }
    }

    /// Show the header, pick an action and confirm it if destructive.
    pub fn collect(&mut self) -> Result<InteractiveResult> {
        self.print_header()?;

        let choice = self.prompt_choice()?;
        let confirmed = match choice {
            MenuChoice::Install => true,
            MenuChoice::Remove => self.confirm_removal()?,
        };

        Ok(InteractiveResult { choice, confirmed })
    }

    fn print_header(&mut self) -> Result<()> {
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "{}",
            style("  Service Bundle Installer").bold().cyan()
        )?;
        writeln!(self.writer, "  ───────────────────────────")?;
        writeln!(
            self.writer,
            "  Base directory: {}",
            style(self.base_dir.display()).green()
        )?;
        writeln!(
            self.writer,
            "  Services:       {}",
            style(self.services.join(", ")).green()
        )?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn prompt_choice(&self) -> Result<MenuChoice> {
        if let Some(choice) = self.prefilled.choice {
            return Ok(choice);
        }

        let options = vec![
            "Install all services",
            "Remove all services completely",
        ];
        let selection = Select::with_theme(&self.theme)
            .with_prompt("Select")
            .items(&options)
            .default(0)
            .interact()?;

        Ok(match selection {
            0 => MenuChoice::Install,
            _ => MenuChoice::Remove,
        })
    }

    fn confirm_removal(&mut self) -> Result<bool> {
        writeln!(
            self.writer,
            "  {} every service above will be stopped and unregistered, and {} deleted.",
            style("Warning:").yellow().bold(),
            self.base_dir.display()
        )?;
        writeln!(self.writer)?;

        if self.prefilled.yes {
            return Ok(true);
        }

        let confirmed = Confirm::with_theme(&self.theme)
            .with_prompt("Proceed with removal?")
            .default(false)
            .interact()?;

        Ok(confirmed)
    }
}

/// Block until the operator presses Enter.
pub fn pause<W: Write, R: BufRead>(writer: &mut W, mut input: R) -> Result<()> {
    writeln!(writer)?;
    write!(writer, "Press Enter to exit...")?;
    writer.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(())
}
