use super::dispatcher::{CommandDispatcher, NodeId};
use super::node::CommandDescriptor;
use crate::component::{CallOutcome, ComponentArg, ComponentError, ComponentManager};
use crate::sender::SenderRef;
use crate::session::SessionStore;
use std::sync::Arc;

/// What a command handler knows about its invocation.
pub struct CommandContext {
    dispatcher: CommandDispatcher,
    node: NodeId,
    sender: SenderRef,
    command: Arc<CommandDescriptor>,
    label: String,
}

impl CommandContext {
    pub(crate) fn new(
        dispatcher: CommandDispatcher,
        node: NodeId,
        sender: SenderRef,
        command: Arc<CommandDescriptor>,
        label: &str,
    ) -> Self {
        Self {
            dispatcher,
            node,
            sender,
            command,
            label: label.to_string(),
        }
    }

    pub fn sender(&self) -> &SenderRef {
        &self.sender
    }

    pub fn is_player(&self) -> bool {
        self.sender.is_player()
    }

    pub fn reply(&self, message: &str) {
        self.sender.reply(message);
    }

    pub fn reply_translated(&self, key: &str, args: &[&str]) {
        self.dispatcher.send_translated(&*self.sender, key, args);
    }

    pub fn translate(&self, key: &str, args: &[&str]) -> String {
        self.dispatcher.translate(&*self.sender, key, args)
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn command(&self) -> &Arc<CommandDescriptor> {
        &self.command
    }

    /// The name or alias the command was invoked with.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The handler node the command was resolved in.
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn sessions(&self) -> &SessionStore {
        self.dispatcher.sessions()
    }

    pub fn components(&self) -> &ComponentManager {
        self.dispatcher.components()
    }

    /// Calls a component method with the sender as its receiver.
    pub fn call_component(
        &self,
        name: &str,
        args: Vec<ComponentArg>,
    ) -> Result<CallOutcome, ComponentError> {
        self.components()
            .call(name, ComponentArg::sender(self.sender.clone()), args)
    }
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("command", &self.command.name())
            .field("label", &self.label)
            .field("sender", &self.sender.name())
            .field("node", &self.node)
            .finish()
    }
}

