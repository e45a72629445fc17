use crate::commands::argument_view::ArgumentView;
use crate::sender::SenderRef;
use indexmap::IndexMap;
use std::any::TypeId;
use std::error::Error as StdError;
use std::marker::PhantomData;
use std::sync::Arc;

/// User handling for failures of one error type raised by command handlers.
pub trait ExceptionHandler<E>: Send + Sync {
    fn handle(&self, error: &E, command: &str, sender: &SenderRef, args: Option<&ArgumentView>);
}

impl<E, F> ExceptionHandler<E> for F
where
    F: Fn(&E, &str, &SenderRef, Option<&ArgumentView>) + Send + Sync,
{
    fn handle(&self, error: &E, command: &str, sender: &SenderRef, args: Option<&ArgumentView>) {
        self(error, command, sender, args)
    }
}

pub(crate) trait ErasedExceptionHandler: Send + Sync {
    fn matches(&self, error: &(dyn StdError + 'static)) -> bool;

    fn handle(
        &self,
        error: &(dyn StdError + 'static),
        command: &str,
        sender: &SenderRef,
        args: Option<&ArgumentView>,
    );
}

struct Typed<E, H> {
    handler: H,
    _marker: PhantomData<fn(&E)>,
}

impl<E, H> ErasedExceptionHandler for Typed<E, H>
where
    E: StdError + 'static,
    H: ExceptionHandler<E>,
{
    fn matches(&self, error: &(dyn StdError + 'static)) -> bool {
        error.is::<E>()
    }

    fn handle(
        &self,
        error: &(dyn StdError + 'static),
        command: &str,
        sender: &SenderRef,
        args: Option<&ArgumentView>,
    ) {
        if let Some(error) = error.downcast_ref::<E>() {
            self.handler.handle(error, command, sender, args);
        }
    }
}

/// Exception handlers of one handler node, keyed by error type.
#[derive(Default, Clone)]
pub(crate) struct ExceptionHandlers {
    handlers: IndexMap<TypeId, Arc<dyn ErasedExceptionHandler>>,
}

impl ExceptionHandlers {
    pub(crate) fn insert<E, H>(&mut self, handler: H)
    where
        E: StdError + 'static,
        H: ExceptionHandler<E> + 'static,
    {
        self.handlers.insert(
            TypeId::of::<E>(),
            Arc::new(Typed {
                handler,
                _marker: PhantomData,
            }),
        );
    }

    pub(crate) fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Tries the error itself first, then each of its sources in order.
    pub(crate) fn find<'e>(
        &self,
        error: &'e (dyn StdError + 'static),
    ) -> Option<(Arc<dyn ErasedExceptionHandler>, &'e (dyn StdError + 'static))> {
        let mut current = Some(error);
        while let Some(error) = current {
            if let Some(handler) = self.handlers.values().find(|handler| handler.matches(error)) {
                return Some((handler.clone(), error));
            }
            current = error.source();
        }
        None
    }
}
