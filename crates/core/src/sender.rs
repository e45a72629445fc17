use crate::component::TypeKey;
use std::fmt;
use std::sync::Arc;

/// Identifies the entity behind a sender, independent of the wrapper object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SenderHandle {
    Player(u128),
    Console,
}

/// The executor context of a command: a connected player or the console.
pub trait CommandSender: Send + Sync {
    fn name(&self) -> &str;

    fn send_message(&self, lines: &[&str]);

    /// `None` means the sender itself knows nothing about `node`.
    fn has_permission(&self, node: &str) -> Option<bool>;

    fn is_player(&self) -> bool;

    fn is_operator(&self) -> bool;

    fn handle(&self) -> SenderHandle;

    /// The key this sender is matched under when used as the self argument of a
    /// component method.
    fn type_key(&self) -> TypeKey {
        match self.handle() {
            SenderHandle::Player(_) => TypeKey::PLAYER,
            SenderHandle::Console => TypeKey::CONSOLE,
        }
    }
}

pub type SenderRef = Arc<dyn CommandSender>;

impl dyn CommandSender {
    pub fn reply(&self, message: &str) {
        self.send_message(&[message]);
    }

    pub fn same_as(&self, other: &dyn CommandSender) -> bool {
        self.handle() == other.handle()
    }
}

impl PartialEq for dyn CommandSender {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl fmt::Debug for dyn CommandSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSender")
            .field("name", &self.name())
            .field("handle", &self.handle())
            .finish()
    }
}
