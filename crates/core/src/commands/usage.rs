use super::node::{CommandDescriptor, DEFAULT_SUBCOMMAND};
use itertools::Itertools;
use std::sync::Arc;

/// Builds the usage line of a command: `/label [-flags] <sub|commands> <n..m args>`.
///
/// An explicit usage string given at registration takes precedence.
pub fn render(
    command: &CommandDescriptor,
    label: &str,
    subcommands: &[Arc<CommandDescriptor>],
) -> String {
    if let Some(usage) = command.explicit_usage() {
        return usage.to_string();
    }

    let mut parts = vec![label.to_string()];

    if !command.flags().is_empty() {
        parts.push(format!("[-{}]", command.flags()));
    }

    let names = subcommands
        .iter()
        .map(|subcommand| subcommand.name())
        .filter(|name| *name != DEFAULT_SUBCOMMAND)
        .join("|");
    let has_default = subcommands
        .iter()
        .any(|subcommand| subcommand.name() == DEFAULT_SUBCOMMAND);
    if !names.is_empty() {
        if has_default || command.target().is_some() {
            parts.push(format!("[{names}]"));
        } else {
            parts.push(format!("<{names}>"));
        }
    } else if let Some(arity) = arity(command.min_args(), command.max_args()) {
        parts.push(arity);
    }

    format!("/{}", parts.join(" "))
}

fn arity(min: i32, max: i32) -> Option<String> {
    let min = min.max(0);
    match max {
        0 => None,
        max if max < 0 && min == 0 => Some("[args...]".to_string()),
        max if max < 0 => Some(format!("<{min}.. args>")),
        max if max == min => Some(format!("<{max} args>")),
        max => Some(format!("<{min}..{max} args>")),
    }
}
