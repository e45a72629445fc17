use super::node::CommandDescriptor;
use std::sync::Arc;

/// The commands registered at one handler node, in registration order.
#[derive(Default, Clone)]
pub struct CommandRegistry {
    commands: Vec<Arc<CommandDescriptor>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Re-registering a name replaces the earlier descriptor in place.
    pub fn register(&mut self, command: Arc<CommandDescriptor>) -> Option<Arc<CommandDescriptor>> {
        match self
            .commands
            .iter_mut()
            .find(|existing| existing.name() == command.name())
        {
            Some(existing) => Some(std::mem::replace(existing, command)),
            None => {
                self.commands.push(command);
                None
            }
        }
    }

    pub fn commands(&self) -> &[Arc<CommandDescriptor>] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Arc<CommandDescriptor>> {
        best_match(&self.commands, name)
    }
}

pub(crate) fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Exact name, then case-insensitive name, then exact alias, then case-insensitive
/// alias. Within a tier the earliest registered command wins.
pub(crate) fn best_match<'a>(
    commands: &'a [Arc<CommandDescriptor>],
    name: &str,
) -> Option<&'a Arc<CommandDescriptor>> {
    commands
        .iter()
        .find(|command| command.name() == name)
        .or_else(|| {
            commands
                .iter()
                .find(|command| eq_ignore_case(command.name(), name))
        })
        .or_else(|| commands.iter().find(|command| command.has_alias(name)))
        .or_else(|| {
            commands.iter().find(|command| {
                command
                    .aliases()
                    .any(|alias| eq_ignore_case(alias, name))
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::node::CommandBuilder;

    fn command(name: &str, aliases: &[&str]) -> Arc<CommandDescriptor> {
        let builder = aliases
            .iter()
            .fold(CommandBuilder::new(name), |builder, alias| builder.alias(*alias));
        Arc::new(builder.executes_raw(|_, _| Ok(())).build(None))
    }

    #[test]
    fn exact_name_beats_everything() {
        let mut registry = CommandRegistry::new();
        registry.register(command("Ban", &["ban", "b"]));
        registry.register(command("ban", &[]));
        assert_eq!(registry.find("ban").unwrap().name(), "ban");
        assert_eq!(registry.find("Ban").unwrap().name(), "Ban");
    }

    #[test]
    fn tiers_are_searched_in_order() {
        let mut registry = CommandRegistry::new();
        registry.register(command("kick", &["BAN"]));
        registry.register(command("BAN", &[]));
        registry.register(command("gamemode", &["gm", "Mode"]));
        // Case-insensitive name beats exact alias.
        assert_eq!(registry.find("ban").unwrap().name(), "BAN");
        assert_eq!(registry.find("gm").unwrap().name(), "gamemode");
        assert_eq!(registry.find("GM").unwrap().name(), "gamemode");
        assert_eq!(registry.find("mode").unwrap().name(), "gamemode");
        assert!(registry.find("g").is_none());
    }

    #[test]
    fn registration_order_breaks_ties() {
        let mut registry = CommandRegistry::new();
        registry.register(command("first", &["x"]));
        registry.register(command("second", &["x"]));
        assert_eq!(registry.find("x").unwrap().name(), "first");
        assert_eq!(registry.find("X").unwrap().name(), "first");
    }

    #[test]
    fn reregistration_replaces_in_place() {
        let mut registry = CommandRegistry::new();
        registry.register(command("a", &[]));
        registry.register(command("b", &[]));
        let previous = registry.register(command("a", &["alpha"]));
        assert!(previous.is_some());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.commands()[0].name(), "a");
        assert!(registry.commands()[0].has_alias("alpha"));
    }

    #[test]
    fn unicode_case_folding() {
        assert!(eq_ignore_case("ÉCHO", "écho"));
        assert!(!eq_ignore_case("echo", "ech"));
    }
}
