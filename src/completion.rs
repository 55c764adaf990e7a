//! # Shell Completion Module
//!
//! ```bash
//! # Generate bash completions
//! adaptive-drive completion bash > ~/.local/share/bash-completion/completions/adaptive-drive
//!
//! # Generate zsh completions
//! adaptive-drive completion zsh > ~/.config/zsh/completions/_adaptive-drive
//! ```

use crate::cli::Shell;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io::Write;

impl From<Shell> for CompletionShell {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => CompletionShell::Bash,
            Shell::Zsh => CompletionShell::Zsh,
            Shell::Fish => CompletionShell::Fish,
            Shell::PowerShell => CompletionShell::PowerShell,
            Shell::Elvish => CompletionShell::Elvish,
        }
    }
}

/// Write a completion script for `cmd` to `out`.
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command, out: &mut dyn Write) {
    let name = cmd.get_name().to_string();
    generate(gen, cmd, name, out);
}

/// Print the completion script for `shell` to stdout.
pub fn print_completions(shell: Shell, cmd: &mut Command) {
    generate_completions(CompletionShell::from(shell), cmd, &mut std::io::stdout());
}
