use super::node::CommandBuilder;
use std::any::Any;
use std::sync::Arc;

/// A plugin-side group of commands.
pub trait CommandProvider: Send + Sync {
    fn commands(&self) -> Vec<CommandBuilder>;
}

/// Turns a registration source into command builders.
///
/// Returns `None` for sources the loader does not understand so the next loader
/// can try.
pub trait CommandLoader: Send + Sync {
    fn load(&self, source: &dyn Any) -> Option<Vec<CommandBuilder>>;
}

/// Accepts a `CommandBuilder`, a `Vec<CommandBuilder>` or an
/// `Arc<dyn CommandProvider>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuilderLoader;

impl CommandLoader for BuilderLoader {
    fn load(&self, source: &dyn Any) -> Option<Vec<CommandBuilder>> {
        if let Some(builder) = source.downcast_ref::<CommandBuilder>() {
            return Some(vec![builder.clone()]);
        }
        if let Some(builders) = source.downcast_ref::<Vec<CommandBuilder>>() {
            return Some(builders.clone());
        }
        source
            .downcast_ref::<Arc<dyn CommandProvider>>()
            .map(|provider| provider.commands())
    }
}
