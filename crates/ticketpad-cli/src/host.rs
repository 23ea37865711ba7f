//! Line-oriented terminal front end over the in-memory surface.
//!
//! Each input line is one host command: a verb, a window, and for `x` and
//! `look` the rest of the line verbatim, so queries keep their quotes.

use std::env;
use std::io::{BufRead, Write};
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};

use ticketpad_core::App;
use ticketpad_core::surface::MemorySurface;

const HELP: &str = "\
commands:
  ls                     list windows
  cat <win>              print a window body
  edit <win>             edit a window body in $EDITOR
  x <win> <command>      run an action word (Get, Put, New, Search ..., transitions)
  look <win> <text>      navigate to an issue key or window
  close <win>            close a window
  quit                   close everything and exit
";

/// How long `quit` waits for sessions to wind down.
const QUIT_GRACE: Duration = Duration::from_secs(5);

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    List,
    Cat(String),
    Edit(String),
    Execute(String, String),
    Look(String, String),
    Close(String),
    Help,
    Quit,
}

impl HostCommand {
    /// Parse one line. `Ok(None)` for a blank line.
    ///
    /// # Errors
    ///
    /// Returns an error naming the problem for unknown commands or missing
    /// arguments.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let (first, rest) = next_word(line);
        if first.is_empty() {
            return Ok(None);
        }
        let (window, tail) = next_word(rest);
        let window = || {
            if window.is_empty() {
                bail!("{first}: missing window name");
            }
            Ok(window.to_string())
        };
        let tail = || {
            let text = tail.trim_end();
            if text.is_empty() {
                bail!("{first}: missing argument");
            }
            Ok(text.to_string())
        };
        let command = match first {
            "ls" => Self::List,
            "cat" => Self::Cat(window()?),
            "edit" => Self::Edit(window()?),
            "x" => Self::Execute(window()?, tail()?),
            "look" => Self::Look(window()?, tail()?),
            "close" => Self::Close(window()?),
            "help" | "?" => Self::Help,
            "quit" | "q" => Self::Quit,
            other => bail!("unknown command {other:?} (try help)"),
        };
        Ok(Some(command))
    }
}

/// Split off the first whitespace-delimited word.
fn next_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    let end = text.find(char::is_whitespace).unwrap_or(text.len());
    (&text[..end], text[end..].trim_start())
}

pub struct Host {
    app: Arc<App>,
    surface: MemorySurface,
    editor: String,
}

impl Host {
    #[must_use]
    pub fn new(app: Arc<App>, surface: MemorySurface) -> Self {
        let editor = env::var("VISUAL")
            .or_else(|_| env::var("EDITOR"))
            .unwrap_or_else(|_| "vi".to_string());
        Self {
            app,
            surface,
            editor,
        }
    }

    /// Full window name for what the user typed: an open window name, or a
    /// title to prefix.
    fn resolve(&self, window: &str) -> String {
        if self.surface.body(window).is_some() {
            window.to_string()
        } else {
            self.app.config().window_name(window)
        }
    }

    /// Read commands until `quit`, end of input, or every window is closed.
    ///
    /// # Errors
    ///
    /// Returns an error if reading input or writing output fails.
    pub fn run<R: BufRead, W: Write>(&self, input: R, out: &mut W) -> Result<()> {
        for line in input.lines() {
            let line = line.context("failed to read command")?;
            match HostCommand::parse(&line) {
                Ok(None) => {}
                Ok(Some(HostCommand::Quit)) => break,
                Ok(Some(command)) => self.dispatch(command, out)?,
                Err(e) => writeln!(out, "{e}")?,
            }
            out.flush()?;
            if self.app.registry().is_empty() {
                debug!("no windows left");
                break;
            }
        }
        self.shutdown();
        Ok(())
    }

    fn dispatch<W: Write>(&self, command: HostCommand, out: &mut W) -> Result<()> {
        debug!(?command, "host command");
        match command {
            HostCommand::List => {
                for name in self.surface.names() {
                    let dirty = if self.surface.is_dirty(&name) == Some(true) {
                        "*"
                    } else {
                        " "
                    };
                    let actions = self.surface.actions(&name).unwrap_or_default().join(" ");
                    writeln!(out, "{dirty} {name}\t{actions}")?;
                }
            }
            HostCommand::Cat(window) => match self.surface.body(&self.resolve(&window)) {
                Some(body) => write!(out, "{body}")?,
                None => writeln!(out, "no window {window:?}")?,
            },
            HostCommand::Edit(window) => {
                let name = self.resolve(&window);
                if let Err(e) = self.edit(&name) {
                    writeln!(out, "edit {window}: {e:#}")?;
                }
            }
            HostCommand::Execute(window, text) => {
                if !self.surface.execute(&self.resolve(&window), &text) {
                    writeln!(out, "no window {window:?}")?;
                }
            }
            HostCommand::Look(window, text) => {
                if !self.surface.look(&self.resolve(&window), &text) {
                    writeln!(out, "no window {window:?}")?;
                }
            }
            HostCommand::Close(window) => {
                if !self.surface.close(&self.resolve(&window)) {
                    writeln!(out, "no window {window:?}")?;
                }
            }
            HostCommand::Help => write!(out, "{HELP}")?,
            HostCommand::Quit => {}
        }
        Ok(())
    }

    /// Round-trip a window body through the user's editor.
    fn edit(&self, name: &str) -> Result<()> {
        let body = self
            .surface
            .body(name)
            .with_context(|| format!("no window {name:?}"))?;
        let file = tempfile::Builder::new()
            .prefix("ticketpad-")
            .suffix(".txt")
            .tempfile()
            .context("failed to create temp file")?;
        std::fs::write(file.path(), &body).context("failed to write temp file")?;

        let status = Command::new(&self.editor)
            .arg(file.path())
            .status()
            .with_context(|| format!("failed to run {}", self.editor))?;
        if !status.success() {
            bail!("{} exited with {status}", self.editor);
        }

        let edited = std::fs::read_to_string(file.path()).context("failed to read temp file")?;
        if edited != body && !self.surface.edit(name, &edited) {
            bail!("window closed while editing");
        }
        Ok(())
    }

    fn shutdown(&self) {
        for name in self.surface.names() {
            self.surface.close(&name);
        }
        if !self.app.registry().wait_until_empty_timeout(QUIT_GRACE) {
            warn!(
                remaining = ?self.app.registry().titles(),
                "sessions still busy at exit"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketpad_core::config::Config;
    use ticketpad_core::error::TrackerError;
    use ticketpad_core::reconcile::UpdateDocument;
    use ticketpad_core::tracker::{
        Filter, Issue, IssueSummary, IssueType, NewIssue, Project, Tracker, Transition,
    };

    struct Listing;

    impl Tracker for Listing {
        fn get_issue(&self, key: &str) -> Result<Issue, TrackerError> {
            Err(TrackerError::Transport {
                url: key.to_string(),
                reason: "offline".to_string(),
            })
        }

        fn search(&self, _query: &str) -> Result<Vec<IssueSummary>, TrackerError> {
            Ok(vec![IssueSummary {
                key: "WEB-1".to_string(),
                kind: "Bug".to_string(),
                status: "Open".to_string(),
                summary: "Checkout fails".to_string(),
            }])
        }

        fn create_issue(&self, _issue: &NewIssue) -> Result<String, TrackerError> {
            Ok("WEB-2".to_string())
        }

        fn apply_update(&self, _key: &str, _update: &UpdateDocument) -> Result<(), TrackerError> {
            Ok(())
        }

        fn apply_transition(
            &self,
            _key: &str,
            _transition_id: &str,
            _update: Option<&UpdateDocument>,
        ) -> Result<(), TrackerError> {
            Ok(())
        }

        fn list_transitions(&self, _key: &str) -> Result<Vec<Transition>, TrackerError> {
            Ok(Vec::new())
        }

        fn list_projects(&self) -> Result<Vec<Project>, TrackerError> {
            Ok(Vec::new())
        }

        fn list_issue_types(&self) -> Result<Vec<IssueType>, TrackerError> {
            Ok(Vec::new())
        }

        fn list_filters(&self) -> Result<Vec<Filter>, TrackerError> {
            Ok(Vec::new())
        }
    }

    fn host() -> Host {
        let surface = MemorySurface::new();
        let app = App::new(Arc::new(Listing), Arc::new(surface.clone()), Config::default());
        app.start(None);
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !surface
            .body("/jira/my-issues")
            .is_some_and(|b| !b.is_empty())
        {
            assert!(std::time::Instant::now() < deadline, "listing never loaded");
            std::thread::sleep(Duration::from_millis(5));
        }
        Host {
            app,
            surface,
            editor: "true".to_string(),
        }
    }

    fn run(host: &Host, script: &str) -> String {
        let mut out = Vec::new();
        host.run(script.as_bytes(), &mut out).expect("run");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn commands_parse() {
        assert_eq!(HostCommand::parse("  ").expect("blank"), None);
        assert_eq!(
            HostCommand::parse("x  WEB-1 Search status = 'In Progress' ").expect("parse"),
            Some(HostCommand::Execute(
                "WEB-1".to_string(),
                "Search status = 'In Progress'".to_string()
            ))
        );
        assert_eq!(
            HostCommand::parse("look my-issues WEB-7").expect("parse"),
            Some(HostCommand::Look("my-issues".to_string(), "WEB-7".to_string()))
        );
        assert!(HostCommand::parse("cat").is_err());
        assert!(HostCommand::parse("x WEB-1").is_err());
        assert!(HostCommand::parse("frobnicate").is_err());
    }

    #[test]
    fn ls_and_cat_show_windows() {
        let host = host();
        let out = run(&host, "ls\ncat my-issues\nquit\n");
        assert!(out.contains("/jira/my-issues\tNew Get Search\n"));
        assert!(out.contains("WEB-1  Bug/Open  Checkout fails\n"));
        assert!(host.app.registry().is_empty());
    }

    #[test]
    fn bad_lines_are_reported_and_skipped() {
        let host = host();
        let out = run(&host, "frobnicate\ncat nowhere\nquit\n");
        assert!(out.contains("unknown command \"frobnicate\""));
        assert!(out.contains("no window \"nowhere\""));
    }

    #[test]
    fn closing_the_last_window_ends_the_loop() {
        let host = host();
        let out = run(&host, "close my-issues\nls\nls\nls\nls\n");
        assert!(!out.contains("my-issues"));
        assert!(host.surface.names().is_empty());
    }

    #[test]
    fn unchanged_edit_keeps_the_window_clean() {
        let host = host();
        host.edit("/jira/my-issues").expect("edit");
        assert_eq!(host.surface.is_dirty("/jira/my-issues"), Some(false));
        assert!(host.edit("/jira/nowhere").is_err());
        run(&host, "quit\n");
    }
}
