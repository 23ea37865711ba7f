use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;
use clap_complete::{Shell, generate};
use tracing::debug;

/// Arguments for `tp completions`.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate the script for.
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Write the completion script for `command` to `out`, named after the
/// command itself.
///
/// # Errors
///
/// Returns an error if flushing `out` fails.
pub fn write_completions<W: Write>(
    shell: Shell,
    command: &mut clap::Command,
    out: &mut W,
) -> Result<()> {
    let bin = command.get_name().to_string();
    debug!(%shell, %bin, "generating completions");
    generate(shell, command, bin, out);
    out.flush().context("failed to write completions")
}

/// Print the completion script to stdout.
///
/// # Errors
///
/// Returns an error if writing to stdout fails.
pub fn run_completions(shell: Shell, command: &mut clap::Command) -> Result<()> {
    write_completions(shell, command, &mut io::stdout().lock())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_uses_the_command_name() {
        let mut command = clap::Command::new("tp").arg(clap::Arg::new("server"));
        let mut out = Vec::new();
        write_completions(Shell::Bash, &mut command, &mut out).expect("write");
        let script = String::from_utf8(out).expect("utf8");
        assert!(script.contains("_tp()"));
        assert!(script.contains("complete -F _tp"));
    }
}
