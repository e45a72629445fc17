use crate::sender::SenderHandle;
use rustc_hash::FxHashMap;
use std::any::{Any, TypeId};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    last_access: Instant,
}

/// Per-sender session state, one value per session type.
///
/// Owned by the dispatcher, so two dispatchers never share sessions.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<FxHashMap<(SenderHandle, TypeId), Entry>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FxHashMap<(SenderHandle, TypeId), Entry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces any existing session of the same type.
    pub fn create<T: Any + Send + Sync>(&self, handle: SenderHandle, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.lock().insert(
            (handle, TypeId::of::<T>()),
            Entry {
                value: value.clone(),
                last_access: Instant::now(),
            },
        );
        value
    }

    pub fn get<T: Any + Send + Sync>(&self, handle: SenderHandle) -> Option<Arc<T>> {
        let mut sessions = self.lock();
        let entry = sessions.get_mut(&(handle, TypeId::of::<T>()))?;
        entry.last_access = Instant::now();
        entry.value.clone().downcast::<T>().ok()
    }

    /// Runs `create` without holding the store lock, so it may use the store.
    /// If another session of type `T` appeared meanwhile, that one is kept.
    pub fn get_or_create<T, F>(&self, handle: SenderHandle, create: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        if let Some(existing) = self.get::<T>(handle) {
            return existing;
        }
        let created = Arc::new(create());

        let mut sessions = self.lock();
        let entry = sessions
            .entry((handle, TypeId::of::<T>()))
            .or_insert_with(|| Entry {
                value: created.clone(),
                last_access: Instant::now(),
            });
        entry.last_access = Instant::now();
        // Keys are typed, so the stored value always has type `T`.
        entry.value.clone().downcast::<T>().unwrap_or(created)
    }

    pub fn expire<T: Any + Send + Sync>(&self, handle: SenderHandle) -> bool {
        self.lock().remove(&(handle, TypeId::of::<T>())).is_some()
    }

    /// Drops every session belonging to `handle`, e.g. when a player disconnects.
    pub fn expire_all(&self, handle: SenderHandle) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|(owner, _), _| *owner != handle);
        before - sessions.len()
    }

    pub fn expire_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_access) <= max_idle);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct Selection {
        clicks: AtomicU32,
    }

    #[test]
    fn sessions_are_typed_and_per_sender() {
        let store = SessionStore::new();
        let steve = SenderHandle::Player(1);
        store.create(steve, Selection::default());
        store.create(steve, String::from("history"));

        let selection = store.get::<Selection>(steve).unwrap();
        selection.clicks.fetch_add(1, Ordering::SeqCst);
        assert_eq!(
            store.get::<Selection>(steve).unwrap().clicks.load(Ordering::SeqCst),
            1
        );
        assert!(store.get::<Selection>(SenderHandle::Console).is_none());
        assert_eq!(store.len(), 2);

        assert!(store.expire::<Selection>(steve));
        assert!(!store.expire::<Selection>(steve));
        assert_eq!(store.expire_all(steve), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn get_or_create_reuses_existing() {
        let store = SessionStore::new();
        let first = store.get_or_create(SenderHandle::Console, Selection::default);
        first.clicks.fetch_add(3, Ordering::SeqCst);
        let second = store.get_or_create(SenderHandle::Console, Selection::default);
        assert_eq!(second.clicks.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn get_or_create_may_use_the_store() {
        let store = SessionStore::new();
        let alex = SenderHandle::Player(2);
        store.create(alex, String::from("history"));

        let value = store.get_or_create(alex, || {
            assert_eq!(store.len(), 1);
            store.create(alex, 1u32);
            2u32
        });
        assert_eq!(*value, 1);
        assert_eq!(*store.get::<u32>(alex).unwrap(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn idle_sessions_expire() {
        let store = SessionStore::new();
        store.create(SenderHandle::Player(7), 5u32);
        assert_eq!(store.expire_idle(Duration::from_secs(60)), 0);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(store.expire_idle(Duration::from_millis(1)), 1);
        assert!(store.is_empty());
    }
}
