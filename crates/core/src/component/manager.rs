use super::resolve::resolve;
use super::{
    ComponentArg, ComponentCall, ComponentContainer, ComponentError, ComponentMethod, Object,
    SyncPolicy, TypeGraph, TypeKey,
};
use crate::commands::error::panic_message;
use crate::platform::PlatformBackend;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::{debug, warn};

pub type ComponentResult = Result<Option<Object>, ComponentError>;

/// Result of an asynchronous component call. Can be waited on from a plain
/// thread or awaited.
pub struct PendingCall {
    receiver: oneshot::Receiver<ComponentResult>,
}

impl PendingCall {
    /// Blocks the current thread. Must not be called from inside an async runtime.
    pub fn wait(self) -> ComponentResult {
        self.receiver
            .blocking_recv()
            .unwrap_or(Err(ComponentError::Interrupted))
    }

    /// `None` while the call is still running.
    pub fn try_take(&mut self) -> Option<ComponentResult> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(ComponentError::Interrupted)),
        }
    }
}

impl Future for PendingCall {
    type Output = ComponentResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(ComponentError::Interrupted)))
    }
}

pub enum CallOutcome {
    Done(Option<Object>),
    Pending(PendingCall),
}

impl CallOutcome {
    /// The call's value, waiting for it if it is still pending.
    pub fn wait(self) -> ComponentResult {
        match self {
            CallOutcome::Done(value) => Ok(value),
            CallOutcome::Pending(pending) => pending.wait(),
        }
    }
}

/// Registry and invoker of component methods. One per dispatcher.
pub struct ComponentManager {
    methods: Mutex<Vec<Arc<ComponentMethod>>>,
    containers: Mutex<Vec<(Weak<dyn ComponentContainer>, usize)>>,
    next_container: AtomicUsize,
    types: RwLock<TypeGraph>,
    backend: Arc<dyn PlatformBackend>,
}

impl ComponentManager {
    pub fn new(backend: Arc<dyn PlatformBackend>) -> Self {
        Self {
            methods: Mutex::new(Vec::new()),
            containers: Mutex::new(Vec::new()),
            next_container: AtomicUsize::new(1),
            types: RwLock::new(TypeGraph::new()),
            backend,
        }
    }

    /// Returns `false` if an identical method was already registered.
    pub fn register(&self, method: ComponentMethod) -> bool {
        let mut methods = self.methods.lock().unwrap_or_else(PoisonError::into_inner);
        if methods.iter().any(|existing| existing.same_identity(&method)) {
            debug!(method = method.name(), "Ignoring duplicate component method");
            return false;
        }
        methods.push(Arc::new(method));
        true
    }

    /// Registers every method of `container`. Registering the same container
    /// again adds nothing while it is alive.
    pub fn register_container<C: ComponentContainer>(&self, container: Arc<C>) -> usize {
        let identity = self.container_id(&container);
        container
            .methods()
            .into_iter()
            .map(|method| self.register(method.bind(identity)))
            .filter(|added| *added)
            .count()
    }

    fn container_id<C: ComponentContainer>(&self, container: &Arc<C>) -> usize {
        let container: Arc<dyn ComponentContainer> = container.clone();
        let mut containers = self
            .containers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        containers.retain(|(known, _)| known.strong_count() > 0);

        let weak = Arc::downgrade(&container);
        if let Some((_, id)) = containers.iter().find(|(known, _)| known.ptr_eq(&weak)) {
            return *id;
        }
        let id = self.next_container.fetch_add(1, Ordering::Relaxed);
        containers.push((weak, id));
        id
    }

    pub fn declare_type(&self, ty: TypeKey, parents: &[TypeKey]) -> Result<(), ComponentError> {
        self.types
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .declare(ty, parents)
    }

    pub fn is_assignable(&self, target: TypeKey, source: TypeKey) -> bool {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_assignable(target, source)
    }

    pub fn len(&self) -> usize {
        self.methods
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn resolve(
        &self,
        name: &str,
        this: TypeKey,
        args: &[TypeKey],
    ) -> Result<Arc<ComponentMethod>, ComponentError> {
        let methods = self
            .methods
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let types = self.types.read().unwrap_or_else(PoisonError::into_inner);
        resolve(&methods, &types, name, this, args)
    }

    /// Resolves and runs a component method according to its sync policy.
    ///
    /// Synchronous methods called off the main context block until the main
    /// context has run them. There is no timeout.
    pub fn call(
        &self,
        name: &str,
        this: ComponentArg,
        args: Vec<ComponentArg>,
    ) -> Result<CallOutcome, ComponentError> {
        let call = ComponentCall::new(this, args);
        let method = self.resolve(name, call.this_arg().ty(), &call.arg_types())?;

        match method.sync_policy() {
            SyncPolicy::Ignore => invoke(&method, &call).map(CallOutcome::Done),
            SyncPolicy::Synchronous if self.backend.is_on_main_context() => {
                invoke(&method, &call).map(CallOutcome::Done)
            }
            SyncPolicy::Synchronous => {
                let (sender, receiver) = oneshot::channel();
                self.backend.schedule_sync(Box::new(move || {
                    let _ = sender.send(invoke(&method, &call));
                }));
                let result = receiver
                    .blocking_recv()
                    .unwrap_or(Err(ComponentError::Interrupted));
                result.map(CallOutcome::Done)
            }
            SyncPolicy::Asynchronous => {
                let (sender, receiver) = oneshot::channel();
                self.backend.schedule_async(Box::new(move || {
                    let _ = sender.send(invoke(&method, &call));
                }));
                Ok(CallOutcome::Pending(PendingCall { receiver }))
            }
        }
    }
}

fn invoke(method: &ComponentMethod, call: &ComponentCall) -> ComponentResult {
    match panic::catch_unwind(AssertUnwindSafe(|| (method.handler())(call))) {
        Ok(result) => result.map_err(ComponentError::Failed),
        Err(payload) => {
            let message = panic_message(&*payload);
            warn!(method = method.name(), "Component method panicked: {message}");
            Err(ComponentError::Panicked {
                name: method.name().to_string(),
                message,
            })
        }
    }
}
