use crate::commands::argument_view::ArgumentView;
use crate::commands::context::CommandContext;
use crate::commands::dispatcher::NodeId;
use crate::commands::error::{CommandResult, RegistrationError};
use indexmap::IndexSet;
use std::fmt;
use std::sync::Arc;

/// Name a nested resolution uses when the branch command received no arguments.
pub const DEFAULT_SUBCOMMAND: &str = "";

/// Sentinel for an unbounded argument count.
pub const ANY_COUNT: i32 = -1;

pub type RawHandler = Arc<dyn Fn(&CommandContext, &[String]) -> CommandResult<()> + Send + Sync>;
pub type ParsedHandler =
    Arc<dyn Fn(&CommandContext, &ArgumentView) -> CommandResult<()> + Send + Sync>;

#[derive(Clone)]
pub enum CommandTarget {
    /// Receives the arguments exactly as typed. No flag or count validation happens.
    Raw(RawHandler),
    Parsed(ParsedHandler),
}

/// When a branch command's own handler runs relative to its sub-commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallTiming {
    /// Handler first. Returning `SkipSubcommand` stops nested resolution.
    Pre,
    /// Nested resolution first, then the handler regardless of the outcome.
    Post,
    /// Handler only runs if no sub-command matched.
    #[default]
    Fallback,
    /// Sub-commands are ignored.
    Never,
}

/// Immutable metadata of one registered command.
pub struct CommandDescriptor {
    name: String,
    aliases: IndexSet<String>,
    permission: String,
    description: String,
    usage: Option<String>,
    allow_players: bool,
    allow_console: bool,
    operator_fallback: bool,
    is_async: bool,
    flags: String,
    min_args: i32,
    max_args: i32,
    target: Option<CommandTarget>,
    timing: CallTiming,
    subcommands: Option<NodeId>,
}

impl CommandDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Aliases in the order they were declared.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.aliases.iter().map(String::as_str)
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.aliases.contains(alias)
    }

    /// Empty when the command needs no permission.
    pub fn permission(&self) -> &str {
        &self.permission
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn explicit_usage(&self) -> Option<&str> {
        self.usage.as_deref()
    }

    pub fn allows_players(&self) -> bool {
        self.allow_players
    }

    pub fn allows_console(&self) -> bool {
        self.allow_console
    }

    pub fn operator_fallback(&self) -> bool {
        self.operator_fallback
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// Supported flag characters. Empty means flags are not checked.
    pub fn flags(&self) -> &str {
        &self.flags
    }

    pub fn min_args(&self) -> i32 {
        self.min_args
    }

    pub fn max_args(&self) -> i32 {
        self.max_args
    }

    pub fn target(&self) -> Option<&CommandTarget> {
        self.target.as_ref()
    }

    pub fn parses_arguments(&self) -> bool {
        !matches!(self.target, Some(CommandTarget::Raw(_)))
    }

    pub fn timing(&self) -> CallTiming {
        self.timing
    }

    /// The handler node holding this command's sub-commands.
    pub fn subcommands(&self) -> Option<NodeId> {
        match self.timing {
            CallTiming::Never => None,
            _ => self.subcommands,
        }
    }

    pub(crate) fn subcommand_node(&self) -> Option<NodeId> {
        self.subcommands
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("permission", &self.permission)
            .field("flags", &self.flags)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("is_async", &self.is_async)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

/// Tagged construction of a [`CommandDescriptor`].
#[derive(Clone)]
pub struct CommandBuilder {
    name: String,
    aliases: Vec<String>,
    permission: String,
    description: String,
    usage: Option<String>,
    allow_players: bool,
    allow_console: bool,
    operator_fallback: bool,
    is_async: bool,
    flags: String,
    min_args: i32,
    max_args: i32,
    target: Option<CommandTarget>,
    timing: CallTiming,
    subcommands: Vec<CommandBuilder>,
}

impl CommandBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            permission: String::new(),
            description: String::new(),
            usage: None,
            allow_players: true,
            allow_console: true,
            operator_fallback: false,
            is_async: false,
            flags: String::new(),
            min_args: ANY_COUNT,
            max_args: ANY_COUNT,
            target: None,
            timing: CallTiming::default(),
            subcommands: Vec::new(),
        }
    }

    /// The sub-command picked when a branch command is run without arguments.
    pub fn default_subcommand() -> Self {
        Self::new(DEFAULT_SUBCOMMAND)
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = permission.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn players_only(mut self) -> Self {
        self.allow_players = true;
        self.allow_console = false;
        self
    }

    pub fn console_only(mut self) -> Self {
        self.allow_players = false;
        self.allow_console = true;
        self
    }

    /// Without a permission system, only operators may run the command.
    pub fn operator_only(mut self) -> Self {
        self.operator_fallback = true;
        self
    }

    pub fn asynchronous(mut self) -> Self {
        self.is_async = true;
        self
    }

    pub fn flags(mut self, flags: impl Into<String>) -> Self {
        self.flags = flags.into();
        self
    }

    pub fn min_args(mut self, min: i32) -> Self {
        self.min_args = min;
        self
    }

    pub fn max_args(mut self, max: i32) -> Self {
        self.max_args = max;
        self
    }

    pub fn args(self, min: i32, max: i32) -> Self {
        self.min_args(min).max_args(max)
    }

    pub fn executes<F>(mut self, handler: F) -> Self
    where
        F: Fn(&CommandContext, &ArgumentView) -> CommandResult<()> + Send + Sync + 'static,
    {
        self.target = Some(CommandTarget::Parsed(Arc::new(handler)));
        self
    }

    pub fn executes_raw<F>(mut self, handler: F) -> Self
    where
        F: Fn(&CommandContext, &[String]) -> CommandResult<()> + Send + Sync + 'static,
    {
        self.target = Some(CommandTarget::Raw(Arc::new(handler)));
        self
    }

    pub fn then(mut self, subcommand: CommandBuilder) -> Self {
        self.subcommands.push(subcommand);
        self
    }

    pub fn timing(mut self, timing: CallTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn validate(&self, allow_default: bool) -> Result<(), RegistrationError> {
        let invalid_name = |name: &str| {
            name.chars().any(char::is_whitespace) || (name.is_empty() && !allow_default)
        };
        if invalid_name(&self.name) {
            return Err(RegistrationError::InvalidName(self.name.clone()));
        }
        if let Some(alias) = self.aliases.iter().find(|alias| invalid_name(alias)) {
            return Err(RegistrationError::InvalidName(alias.clone()));
        }
        if self.min_args >= 0 && self.max_args >= 0 && self.min_args > self.max_args {
            return Err(RegistrationError::InvalidBounds {
                name: self.name.clone(),
                min: self.min_args,
                max: self.max_args,
            });
        }
        if self.target.is_none() && self.subcommands.is_empty() {
            return Err(RegistrationError::MissingHandler(self.name.clone()));
        }
        Ok(())
    }

    pub(crate) fn subcommand_builders(&self) -> &[CommandBuilder] {
        &self.subcommands
    }

    /// Splits off the sub-command builders so the registrar can place them in a
    /// child node before the descriptor is frozen.
    pub(crate) fn take_subcommands(&mut self) -> Vec<CommandBuilder> {
        std::mem::take(&mut self.subcommands)
    }

    pub(crate) fn build(self, subcommands: Option<NodeId>) -> CommandDescriptor {
        CommandDescriptor {
            name: self.name,
            aliases: self.aliases.into_iter().collect(),
            permission: self.permission,
            description: self.description,
            usage: self.usage,
            allow_players: self.allow_players,
            allow_console: self.allow_console,
            operator_fallback: self.operator_fallback,
            is_async: self.is_async,
            flags: self.flags,
            min_args: self.min_args,
            max_args: self.max_args,
            target: self.target,
            timing: self.timing,
            subcommands,
        }
    }
}
