use super::ComponentError;
use rustc_hash::FxHashMap;
use std::fmt;

/// Dispatch key of a component argument or self handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(pub &'static str);

impl TypeKey {
    /// Every key is assignable to `ANY`.
    pub const ANY: TypeKey = TypeKey("any");
    pub const SENDER: TypeKey = TypeKey("sender");
    pub const PLAYER: TypeKey = TypeKey("player");
    pub const CONSOLE: TypeKey = TypeKey("console");
    pub const STRING: TypeKey = TypeKey("string");
    pub const INT: TypeKey = TypeKey("int");
    pub const FLOAT: TypeKey = TypeKey("float");
    pub const BOOL: TypeKey = TypeKey("bool");

    pub fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Declared subtype relation between type keys.
///
/// The graph is kept acyclic: a declaration that would make a key its own
/// ancestor is rejected.
#[derive(Debug, Clone)]
pub struct TypeGraph {
    parents: FxHashMap<TypeKey, Vec<TypeKey>>,
}

impl TypeGraph {
    pub fn new() -> Self {
        let mut graph = TypeGraph {
            parents: FxHashMap::default(),
        };
        graph.insert(TypeKey::PLAYER, TypeKey::SENDER);
        graph.insert(TypeKey::CONSOLE, TypeKey::SENDER);
        graph
    }

    fn insert(&mut self, ty: TypeKey, parent: TypeKey) {
        let parents = self.parents.entry(ty).or_default();
        if !parents.contains(&parent) {
            parents.push(parent);
        }
    }

    /// Declares `ty` as a subtype of every key in `parents`.
    pub fn declare(&mut self, ty: TypeKey, parents: &[TypeKey]) -> Result<(), ComponentError> {
        for &parent in parents {
            if ty == TypeKey::ANY || self.is_assignable(ty, parent) {
                return Err(ComponentError::InvalidHierarchy { ty, parent });
            }
        }
        for &parent in parents {
            if parent != TypeKey::ANY {
                self.insert(ty, parent);
            }
        }
        Ok(())
    }

    /// Whether a value of type `source` may be passed where `target` is expected.
    pub fn is_assignable(&self, target: TypeKey, source: TypeKey) -> bool {
        if target == source || target == TypeKey::ANY {
            return true;
        }
        let mut pending = vec![source];
        while let Some(ty) = pending.pop() {
            if let Some(parents) = self.parents.get(&ty) {
                for &parent in parents {
                    if parent == target {
                        return true;
                    }
                    pending.push(parent);
                }
            }
        }
        false
    }
}

impl Default for TypeGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORLD_EDITOR: TypeKey = TypeKey("world_editor");
    const BUILDER: TypeKey = TypeKey("builder");

    #[test]
    fn builtin_hierarchy() {
        let graph = TypeGraph::new();
        assert!(graph.is_assignable(TypeKey::SENDER, TypeKey::PLAYER));
        assert!(graph.is_assignable(TypeKey::ANY, TypeKey::CONSOLE));
        assert!(graph.is_assignable(TypeKey::ANY, TypeKey::INT));
        assert!(!graph.is_assignable(TypeKey::PLAYER, TypeKey::SENDER));
        assert!(!graph.is_assignable(TypeKey::PLAYER, TypeKey::CONSOLE));
        assert!(!graph.is_assignable(TypeKey::FLOAT, TypeKey::INT));
    }

    #[test]
    fn declared_types_are_transitive() {
        let mut graph = TypeGraph::new();
        graph.declare(BUILDER, &[TypeKey::PLAYER]).unwrap();
        graph.declare(WORLD_EDITOR, &[BUILDER]).unwrap();
        assert!(graph.is_assignable(TypeKey::SENDER, WORLD_EDITOR));
        assert!(graph.is_assignable(BUILDER, WORLD_EDITOR));
        assert!(!graph.is_assignable(WORLD_EDITOR, BUILDER));
    }

    #[test]
    fn cycles_are_rejected() {
        let mut graph = TypeGraph::new();
        graph.declare(BUILDER, &[TypeKey::PLAYER]).unwrap();
        assert!(matches!(
            graph.declare(TypeKey::PLAYER, &[BUILDER]),
            Err(ComponentError::InvalidHierarchy { .. })
        ));
        assert!(graph.declare(BUILDER, &[BUILDER]).is_err());
        assert!(graph.declare(TypeKey::ANY, &[TypeKey::SENDER]).is_err());
        assert!(!graph.is_assignable(BUILDER, TypeKey::PLAYER));
    }
}
