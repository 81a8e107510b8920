//! Entities: records with a stable identity.

use std::collections::HashMap;

/// A record identified by `Id` rather than by its field values.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}

/// Index a slice of entities by id. A repeated id keeps the last entry.
pub fn index_by_id<E: Entity>(items: &[E]) -> HashMap<E::Id, &E> {
    items.iter().map(|item| (item.id().clone(), item)).collect()
}
