//! Browser and application launching on the host

use crate::{AppLauncher, AppTarget, DispatchError, Result, SearchRequest, WebSearch};
use serde::{Deserialize, Serialize};
use std::process::Command;
use tracing::debug;

/// Opens searches in the system default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl WebSearch for SystemBrowser {
    fn open(&mut self, request: &SearchRequest) -> Result<()> {
        let url = request.url();
        debug!(%url, "opening browser");
        open::that(&url).map_err(|e| DispatchError::Launch(format!("{url}: {e}")))
    }
}

/// Commands used to start each application. The first element is the
/// program, the rest are its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppCommands {
    pub browser_url: String,
    pub word_processor: Vec<String>,
    pub spreadsheet: Vec<String>,
}

impl Default for AppCommands {
    fn default() -> Self {
        let (word, sheet): (&[&str], &[&str]) = if cfg!(target_os = "windows") {
            (
                &[r"C:\Program Files\Microsoft Office\root\Office16\WINWORD.EXE"],
                &[r"C:\Program Files\Microsoft Office\root\Office16\EXCEL.EXE"],
            )
        } else if cfg!(target_os = "macos") {
            (
                &["open", "-a", "Microsoft Word"],
                &["open", "-a", "Microsoft Excel"],
            )
        } else {
            (&["libreoffice", "--writer"], &["libreoffice", "--calc"])
        };
        Self {
            browser_url: "https://www.google.com".to_string(),
            word_processor: owned(word),
            spreadsheet: owned(sheet),
        }
    }
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Default, Clone)]
pub struct SystemLauncher {
    commands: AppCommands,
}

impl SystemLauncher {
    pub fn new(commands: AppCommands) -> Self {
        Self { commands }
    }

    fn spawn(argv: &[String]) -> Result<()> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| DispatchError::Launch("no command configured".into()))?;
        debug!(%program, ?args, "spawning application");
        Command::new(program)
            .args(args)
            .spawn()
            .map(|_| ())
            .map_err(|e| DispatchError::Launch(format!("{program}: {e}")))
    }
}

impl AppLauncher for SystemLauncher {
    fn launch(&mut self, target: AppTarget) -> Result<()> {
        match target {
            AppTarget::Browser => open::that(&self.commands.browser_url)
                .map_err(|e| DispatchError::Launch(format!("{}: {e}", self.commands.browser_url))),
            AppTarget::WordProcessor => Self::spawn(&self.commands.word_processor),
            AppTarget::Spreadsheet => Self::spawn(&self.commands.spreadsheet),
            AppTarget::Unavailable => Err(DispatchError::Launch("application not available".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_command_is_launch_error() {
        let mut launcher = SystemLauncher::new(AppCommands {
            browser_url: String::new(),
            word_processor: Vec::new(),
            spreadsheet: vec!["/definitely/not/a/real/binary".into()],
        });
        assert!(matches!(
            launcher.launch(AppTarget::WordProcessor),
            Err(DispatchError::Launch(_))
        ));
        assert!(matches!(
            launcher.launch(AppTarget::Spreadsheet),
            Err(DispatchError::Launch(_))
        ));
        assert!(launcher.launch(AppTarget::Unavailable).is_err());
    }

    #[test]
    fn test_commands_round_trip_json() {
        let cmds = AppCommands::default();
        let json = serde_json::to_string(&cmds).unwrap();
        let back: AppCommands = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmds);
        assert!(!back.word_processor.is_empty());
    }
}
