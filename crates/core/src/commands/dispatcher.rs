use super::argument_parser::ConverterRegistry;
use super::completion;
use super::error::RegistrationError;
use super::exception::{ErasedExceptionHandler, ExceptionHandler, ExceptionHandlers};
use super::executor::{self, Input};
use super::loader::{BuilderLoader, CommandLoader};
use super::node::{CommandBuilder, CommandDescriptor};
use super::registry::CommandRegistry;
use super::splitter::{ArgumentSplitter, PlainSplitter};
use super::usage;
use crate::component::ComponentManager;
use crate::platform::PlatformBackend;
use crate::sender::{CommandSender, SenderRef};
use crate::session::SessionStore;
use crate::translation::{TranslationManager, TranslationProvider, keys};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::error::Error as StdError;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Index of a handler node in the dispatcher's arena.
///
/// A node's parent always has a smaller index than the node itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

pub(crate) struct HandlerNode {
    parent: Option<NodeId>,
    registry: CommandRegistry,
    converters: Option<Arc<ConverterRegistry>>,
    exceptions: ExceptionHandlers,
}

impl HandlerNode {
    fn new(parent: Option<NodeId>) -> Self {
        Self {
            parent,
            registry: CommandRegistry::new(),
            converters: None,
            exceptions: ExceptionHandlers::default(),
        }
    }
}

struct Shared {
    backend: Arc<dyn PlatformBackend>,
    splitter: Arc<dyn ArgumentSplitter>,
    translations: Arc<dyn TranslationProvider>,
    loaders: RwLock<Vec<Arc<dyn CommandLoader>>>,
    nodes: RwLock<Vec<HandlerNode>>,
    components: OnceCell<ComponentManager>,
    sessions: SessionStore,
}

pub struct DispatcherBuilder {
    backend: Arc<dyn PlatformBackend>,
    splitter: Arc<dyn ArgumentSplitter>,
    translations: Arc<dyn TranslationProvider>,
    converters: ConverterRegistry,
    loaders: Vec<Arc<dyn CommandLoader>>,
}

impl DispatcherBuilder {
    pub fn splitter(mut self, splitter: impl ArgumentSplitter + 'static) -> Self {
        self.splitter = Arc::new(splitter);
        self
    }

    pub fn translations(mut self, translations: Arc<dyn TranslationProvider>) -> Self {
        self.translations = translations;
        self
    }

    pub fn converters(mut self, converters: ConverterRegistry) -> Self {
        self.converters = converters;
        self
    }

    /// Loaders added here are consulted before the built-in builder loader.
    pub fn loader(mut self, loader: impl CommandLoader + 'static) -> Self {
        let builtin = self.loaders.len().saturating_sub(1);
        self.loaders.insert(builtin, Arc::new(loader));
        self
    }

    pub fn build(self) -> CommandDispatcher {
        let mut root = HandlerNode::new(None);
        root.converters = Some(Arc::new(self.converters));
        CommandDispatcher {
            shared: Arc::new(Shared {
                backend: self.backend,
                splitter: self.splitter,
                translations: self.translations,
                loaders: RwLock::new(self.loaders),
                nodes: RwLock::new(vec![root]),
                components: OnceCell::new(),
                sessions: SessionStore::new(),
            }),
        }
    }
}

/// The root of a command handler tree and everything the tree shares: splitter,
/// translations, loaders, sessions and the component manager.
///
/// Cloning is cheap and every clone refers to the same tree.
#[derive(Clone)]
pub struct CommandDispatcher {
    shared: Arc<Shared>,
}

impl CommandDispatcher {
    pub fn new(backend: Arc<dyn PlatformBackend>) -> Self {
        Self::builder(backend).build()
    }

    pub fn builder(backend: Arc<dyn PlatformBackend>) -> DispatcherBuilder {
        DispatcherBuilder {
            backend,
            splitter: Arc::new(PlainSplitter),
            translations: Arc::new(TranslationManager::new()),
            converters: ConverterRegistry::with_defaults(),
            loaders: vec![Arc::new(BuilderLoader)],
        }
    }

    pub fn backend(&self) -> &Arc<dyn PlatformBackend> {
        &self.shared.backend
    }

    pub fn splitter(&self) -> &dyn ArgumentSplitter {
        &*self.shared.splitter
    }

    pub fn translations(&self) -> &Arc<dyn TranslationProvider> {
        &self.shared.translations
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.shared.sessions
    }

    /// Created on first use.
    pub fn components(&self) -> &ComponentManager {
        self.shared
            .components
            .get_or_init(|| ComponentManager::new(self.shared.backend.clone()))
    }

    fn read_nodes(&self) -> RwLockReadGuard<'_, Vec<HandlerNode>> {
        self.shared
            .nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_nodes(&self) -> RwLockWriteGuard<'_, Vec<HandlerNode>> {
        self.shared
            .nodes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn root(&self) -> HandlerRef {
        HandlerRef {
            dispatcher: self.clone(),
            id: NodeId::ROOT,
        }
    }

    pub fn node(&self, id: NodeId) -> Option<HandlerRef> {
        (id.0 < self.read_nodes().len()).then(|| HandlerRef {
            dispatcher: self.clone(),
            id,
        })
    }

    pub fn register(
        &self,
        builder: CommandBuilder,
    ) -> Result<Arc<CommandDescriptor>, RegistrationError> {
        self.register_at(NodeId::ROOT, builder)
    }

    /// Registers a command and, recursively, its sub-commands in fresh child nodes.
    pub fn register_at(
        &self,
        node: NodeId,
        builder: CommandBuilder,
    ) -> Result<Arc<CommandDescriptor>, RegistrationError> {
        validate_tree(&builder, node != NodeId::ROOT)?;
        let mut nodes = self.write_nodes();
        if node.0 >= nodes.len() {
            return Err(RegistrationError::UnknownNode(node.0));
        }
        Ok(insert_command(&mut nodes, node, builder))
    }

    /// Registers every command the first accepting loader produces for `source`.
    pub fn load(
        &self,
        source: &dyn Any,
    ) -> Result<Vec<Arc<CommandDescriptor>>, RegistrationError> {
        self.load_at(NodeId::ROOT, source)
    }

    pub fn load_at(
        &self,
        node: NodeId,
        source: &dyn Any,
    ) -> Result<Vec<Arc<CommandDescriptor>>, RegistrationError> {
        let loaders = self
            .shared
            .loaders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let builders = loaders
            .iter()
            .find_map(|loader| loader.load(source))
            .ok_or(RegistrationError::UnsupportedSource)?;
        builders
            .into_iter()
            .map(|builder| self.register_at(node, builder))
            .collect()
    }

    /// Consulted before every loader already present.
    pub fn add_loader(&self, loader: impl CommandLoader + 'static) {
        self.shared
            .loaders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(0, Arc::new(loader));
    }

    /// Resolves `name` among the root commands and dispatches it. Returns whether a
    /// command was found, whatever happened afterwards.
    pub fn execute(&self, sender: &SenderRef, name: &str, args: &[String]) -> bool {
        self.execute_at(NodeId::ROOT, sender, name, args)
    }

    pub fn execute_at(
        &self,
        node: NodeId,
        sender: &SenderRef,
        name: &str,
        args: &[String],
    ) -> bool {
        executor::execute(self, node, sender, name, Input::Words(args.to_vec()))
    }

    /// Executes a typed command line (without its prefix), telling the sender when
    /// nothing matched. The first word names the command and the rest goes to the
    /// splitter as typed.
    pub fn execute_line(&self, sender: &SenderRef, line: &str) -> bool {
        let line = line.trim_start();
        let (name, rest) = line
            .split_once(char::is_whitespace)
            .unwrap_or((line, ""));
        if name.is_empty() {
            return false;
        }
        let input = Input::Line(rest.trim().to_string());
        let found = executor::execute(self, NodeId::ROOT, sender, name, input);
        if !found {
            self.send_translated(&**sender, keys::COMMAND_NOT_FOUND, &[name]);
        }
        found
    }

    /// Names and aliases of eligible commands completing the last token of `line`.
    pub fn complete(&self, sender: &SenderRef, line: &str) -> Vec<String> {
        completion::complete(self, NodeId::ROOT, sender, line)
    }

    pub fn usage(&self, command: &CommandDescriptor, label: &str) -> String {
        let subcommands = command
            .subcommands()
            .map(|node| self.commands_at(node))
            .unwrap_or_default();
        usage::render(command, label, &subcommands)
    }

    pub fn translate(&self, sender: &dyn CommandSender, key: &str, args: &[&str]) -> String {
        self.shared.translations.translate(sender, key, args)
    }

    pub fn send_translated(&self, sender: &dyn CommandSender, key: &str, args: &[&str]) {
        let message = self.translate(sender, key, args);
        sender.send_message(&[message.as_str()]);
    }

    pub(crate) fn commands_at(&self, node: NodeId) -> Vec<Arc<CommandDescriptor>> {
        self.read_nodes()
            .get(node.0)
            .map(|node| node.registry.commands().to_vec())
            .unwrap_or_default()
    }

    pub(crate) fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.read_nodes().get(node.0).and_then(|node| node.parent)
    }

    /// The nearest converter registry on the way to the root.
    pub(crate) fn converters_for(&self, node: NodeId) -> Arc<ConverterRegistry> {
        let nodes = self.read_nodes();
        let mut current = Some(node);
        while let Some(id) = current {
            let Some(node) = nodes.get(id.0) else { break };
            if let Some(converters) = &node.converters {
                return converters.clone();
            }
            current = node.parent;
        }
        nodes[0]
            .converters
            .clone()
            .unwrap_or_else(|| Arc::new(ConverterRegistry::with_defaults()))
    }

    /// Searches `node` first, then its ancestors. Within a node the error's source
    /// chain is walked before giving up on that node.
    pub(crate) fn find_exception_handler<'e>(
        &self,
        node: NodeId,
        error: &'e (dyn StdError + 'static),
    ) -> Option<(Arc<dyn ErasedExceptionHandler>, &'e (dyn StdError + 'static))> {
        let nodes = self.read_nodes();
        let mut current = Some(node);
        while let Some(id) = current {
            let node = nodes.get(id.0)?;
            if let Some(found) = node.exceptions.find(error) {
                return Some(found);
            }
            current = node.parent;
        }
        None
    }
}

fn validate_tree(builder: &CommandBuilder, allow_default: bool) -> Result<(), RegistrationError> {
    builder.validate(allow_default)?;
    builder
        .subcommand_builders()
        .iter()
        .try_for_each(|subcommand| validate_tree(subcommand, true))
}

fn insert_command(
    nodes: &mut Vec<HandlerNode>,
    at: NodeId,
    mut builder: CommandBuilder,
) -> Arc<CommandDescriptor> {
    let subcommands = builder.take_subcommands();
    let child = (!subcommands.is_empty()).then(|| {
        nodes.push(HandlerNode::new(Some(at)));
        let child = NodeId(nodes.len() - 1);
        for subcommand in subcommands {
            insert_command(nodes, child, subcommand);
        }
        child
    });
    let descriptor = Arc::new(builder.build(child));
    if nodes[at.0].registry.register(descriptor.clone()).is_some() {
        debug!(command = descriptor.name(), node = at.0, "Replaced existing command");
    }
    descriptor
}

/// A handle to one node of the handler tree.
#[derive(Clone)]
pub struct HandlerRef {
    dispatcher: CommandDispatcher,
    id: NodeId,
}

impl HandlerRef {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn parent(&self) -> Option<HandlerRef> {
        self.dispatcher.parent_of(self.id).map(|id| HandlerRef {
            dispatcher: self.dispatcher.clone(),
            id,
        })
    }

    pub fn register(
        &self,
        builder: CommandBuilder,
    ) -> Result<Arc<CommandDescriptor>, RegistrationError> {
        self.dispatcher.register_at(self.id, builder)
    }

    pub fn load(
        &self,
        source: &dyn Any,
    ) -> Result<Vec<Arc<CommandDescriptor>>, RegistrationError> {
        self.dispatcher.load_at(self.id, source)
    }

    pub fn execute(&self, sender: &SenderRef, name: &str, args: &[String]) -> bool {
        self.dispatcher.execute_at(self.id, sender, name, args)
    }

    pub fn commands(&self) -> Vec<Arc<CommandDescriptor>> {
        self.dispatcher.commands_at(self.id)
    }

    /// The node holding the sub-commands of the command registered as `name`.
    pub fn subcommands(&self, name: &str) -> Option<HandlerRef> {
        let id = {
            let nodes = self.dispatcher.read_nodes();
            nodes.get(self.id.0)?.registry.find(name)?.subcommand_node()?
        };
        Some(HandlerRef {
            dispatcher: self.dispatcher.clone(),
            id,
        })
    }

    /// Handles failures of type `E` raised by commands at this node or below.
    pub fn on_error<E, H>(&self, handler: H)
    where
        E: StdError + 'static,
        H: ExceptionHandler<E> + 'static,
    {
        if let Some(node) = self.dispatcher.write_nodes().get_mut(self.id.0) {
            node.exceptions.insert::<E, H>(handler);
        }
    }

    /// Replaces the converters this node and its descendants without their own
    /// registry use.
    pub fn set_converters(&self, converters: ConverterRegistry) {
        if let Some(node) = self.dispatcher.write_nodes().get_mut(self.id.0) {
            node.converters = Some(Arc::new(converters));
        }
    }

    pub fn converters(&self) -> Arc<ConverterRegistry> {
        self.dispatcher.converters_for(self.id)
    }
}
