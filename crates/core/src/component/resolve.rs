use super::{ComponentError, ComponentMethod, TypeGraph, TypeKey};
use itertools::Itertools;
use std::sync::Arc;

fn accepts(graph: &TypeGraph, params: &[TypeKey], args: &[TypeKey]) -> bool {
    params.len() == args.len()
        && params
            .iter()
            .zip(args)
            .all(|(&param, &arg)| graph.is_assignable(param, arg))
}

/// Picks the most specific method for a call.
///
/// Candidates whose parameter list is strictly more general than another
/// candidate's are dropped until none can be. Any remaining tie goes to the
/// candidate whose self type derives from every other candidate's self type.
pub(crate) fn resolve(
    methods: &[Arc<ComponentMethod>],
    graph: &TypeGraph,
    name: &str,
    this: TypeKey,
    args: &[TypeKey],
) -> Result<Arc<ComponentMethod>, ComponentError> {
    let mut candidates: Vec<&Arc<ComponentMethod>> = methods
        .iter()
        .filter(|method| {
            method.name() == name
                && graph.is_assignable(method.self_type(), this)
                && accepts(graph, method.param_types(), args)
        })
        .collect();

    match candidates.len() {
        0 => {
            return Err(ComponentError::UnknownMethod {
                name: name.to_string(),
                this,
                args: args.iter().join(", "),
            });
        }
        1 => return Ok(candidates[0].clone()),
        _ => {}
    }

    // The type graph is acyclic, so at least one candidate always survives.
    while let Some(general) = candidates.iter().position(|general| {
        candidates.iter().any(|specific| {
            general.param_types() != specific.param_types()
                && accepts(graph, general.param_types(), specific.param_types())
        })
    }) {
        candidates.remove(general);
    }

    if let [only] = candidates.as_slice() {
        return Ok((*only).clone());
    }

    (0..candidates.len())
        .find(|&best| {
            let this = candidates[best].self_type();
            candidates.iter().enumerate().all(|(index, other)| {
                index == best
                    || (other.self_type() != this && graph.is_assignable(other.self_type(), this))
            })
        })
        .map(|best| candidates[best].clone())
        .ok_or(ComponentError::AmbiguousMethod {
            name: name.to_string(),
            candidates: candidates.len(),
        })
}
