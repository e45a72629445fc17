use super::dispatcher::{CommandDispatcher, NodeId};
use super::executor::{Resolution, check_eligibility, resolve};
use super::node::DEFAULT_SUBCOMMAND;
use crate::sender::SenderRef;
use itertools::Itertools;

/// Completes the last token of `line` against the commands the sender may run,
/// descending into sub-commands for every earlier token.
pub(crate) fn complete(
    dispatcher: &CommandDispatcher,
    root: NodeId,
    sender: &SenderRef,
    line: &str,
) -> Vec<String> {
    let backend = &**dispatcher.backend();
    let mut tokens: Vec<&str> = line.split_whitespace().collect();
    if line.is_empty() || line.ends_with(char::is_whitespace) {
        tokens.push("");
    }
    let Some((partial, path)) = tokens.split_last() else {
        return Vec::new();
    };

    let mut node = root;
    for name in path {
        let commands = dispatcher.commands_at(node);
        let Resolution::Found(command) = resolve(&commands, backend, &**sender, name) else {
            return Vec::new();
        };
        match command.subcommands() {
            Some(child) => node = child,
            None => return Vec::new(),
        }
    }

    let partial = partial.to_lowercase();
    dispatcher
        .commands_at(node)
        .iter()
        .filter(|command| check_eligibility(backend, &**sender, command).is_ok())
        .flat_map(|command| {
            std::iter::once(command.name().to_string())
                .chain(command.aliases().map(str::to_string))
                .collect::<Vec<_>>()
        })
        .filter(|name| name != DEFAULT_SUBCOMMAND && name.to_lowercase().starts_with(&partial))
        .sorted()
        .dedup()
        .collect()
}
