use super::{ComponentError, TypeKey};
use crate::sender::SenderRef;
use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

pub type Object = Arc<dyn Any + Send + Sync>;

pub type ComponentHandler =
    Arc<dyn Fn(&ComponentCall) -> anyhow::Result<Option<Object>> + Send + Sync>;

/// A value passed to a component method, tagged with its dispatch key.
#[derive(Clone)]
pub struct ComponentArg {
    ty: TypeKey,
    value: Object,
}

impl ComponentArg {
    pub fn new<T: Any + Send + Sync>(ty: TypeKey, value: T) -> Self {
        Self {
            ty,
            value: Arc::new(value),
        }
    }

    /// Tagged with the sender's own type key.
    pub fn sender(sender: SenderRef) -> Self {
        Self::new(sender.type_key(), sender)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(TypeKey::STRING, value.into())
    }

    pub fn int(value: i64) -> Self {
        Self::new(TypeKey::INT, value)
    }

    pub fn float(value: f64) -> Self {
        Self::new(TypeKey::FLOAT, value)
    }

    pub fn bool(value: bool) -> Self {
        Self::new(TypeKey::BOOL, value)
    }

    pub fn ty(&self) -> TypeKey {
        self.ty
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for ComponentArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentArg").field(&self.ty).finish()
    }
}

/// The receiver and arguments of one component call. Position 0 is the receiver.
#[derive(Debug, Clone)]
pub struct ComponentCall {
    this: ComponentArg,
    args: Vec<ComponentArg>,
}

impl ComponentCall {
    pub fn new(this: ComponentArg, args: Vec<ComponentArg>) -> Self {
        Self { this, args }
    }

    pub fn this_arg(&self) -> &ComponentArg {
        &self.this
    }

    pub fn args(&self) -> &[ComponentArg] {
        &self.args
    }

    pub fn arg_types(&self) -> Vec<TypeKey> {
        self.args.iter().map(ComponentArg::ty).collect()
    }

    pub fn this<T: Any>(&self) -> Result<&T, ComponentError> {
        self.this
            .downcast_ref::<T>()
            .ok_or(ComponentError::TypeMismatch {
                position: 0,
                expected: type_name::<T>(),
            })
    }

    pub fn sender(&self) -> Result<&SenderRef, ComponentError> {
        self.this::<SenderRef>()
    }

    pub fn arg<T: Any>(&self, index: usize) -> Result<&T, ComponentError> {
        self.args
            .get(index)
            .and_then(|arg| arg.downcast_ref::<T>())
            .ok_or(ComponentError::TypeMismatch {
                position: index + 1,
                expected: type_name::<T>(),
            })
    }

    pub fn string(&self, index: usize) -> Result<&str, ComponentError> {
        self.arg::<String>(index).map(String::as_str)
    }

    pub fn int(&self, index: usize) -> Result<i64, ComponentError> {
        self.arg::<i64>(index).copied()
    }
}

/// How a resolved component method is run relative to the main context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPolicy {
    /// On the caller's thread.
    #[default]
    Ignore,
    /// On the main context, blocking the caller until it finishes.
    Synchronous,
    /// On a worker. The caller receives a pending result.
    Asynchronous,
}

/// One registered extension method.
#[derive(Clone)]
pub struct ComponentMethod {
    name: String,
    this: TypeKey,
    params: Vec<TypeKey>,
    policy: SyncPolicy,
    handler: ComponentHandler,
    container: Option<usize>,
}

impl ComponentMethod {
    pub fn new<F>(name: impl Into<String>, this: TypeKey, handler: F) -> Self
    where
        F: Fn(&ComponentCall) -> anyhow::Result<Option<Object>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            this,
            params: Vec::new(),
            policy: SyncPolicy::Ignore,
            handler: Arc::new(handler),
            container: None,
        }
    }

    pub fn param(mut self, ty: TypeKey) -> Self {
        self.params.push(ty);
        self
    }

    pub fn params(mut self, types: impl IntoIterator<Item = TypeKey>) -> Self {
        self.params.extend(types);
        self
    }

    pub fn policy(mut self, policy: SyncPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn self_type(&self) -> TypeKey {
        self.this
    }

    pub fn param_types(&self) -> &[TypeKey] {
        &self.params
    }

    pub fn sync_policy(&self) -> SyncPolicy {
        self.policy
    }

    pub(crate) fn handler(&self) -> &ComponentHandler {
        &self.handler
    }

    pub(crate) fn bind(mut self, container: usize) -> Self {
        self.container = Some(container);
        self
    }

    /// Same method of the same container, regardless of the handler value.
    pub(crate) fn same_identity(&self, other: &ComponentMethod) -> bool {
        self.container == other.container
            && self.name == other.name
            && self.this == other.this
            && self.params == other.params
    }
}

impl fmt::Debug for ComponentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentMethod")
            .field("name", &self.name)
            .field("this", &self.this)
            .field("params", &self.params)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// A group of component methods that share state.
pub trait ComponentContainer: Send + Sync + 'static {
    fn methods(self: Arc<Self>) -> Vec<ComponentMethod>;
}
