//! Item / Processed - the records a pipeline moves between stages

use serde::{Deserialize, Serialize};

use crate::ItemError;

/// Opaque item identifier
pub type ItemId = u64;

/// Unit of work submitted by the producer
///
/// Produced once and never mutated after it is enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item<T = String> {
    /// Identifier carried through to the result
    pub id: ItemId,
    /// Payload handed to the transform
    pub payload: T,
}

impl<T> Item<T> {
    /// Create a new item
    pub fn new(id: ItemId, payload: T) -> Self {
        Self { id, payload }
    }
}

/// Successful output derived from exactly one `Item`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Processed<T = String> {
    /// Identifier of the originating item
    pub id: ItemId,
    /// Derived payload
    pub payload: T,
}

impl<T> Processed<T> {
    /// Create a new processed record
    pub fn new(id: ItemId, payload: T) -> Self {
        Self { id, payload }
    }
}

/// Result of one traversal: either the derived record or the failure
pub type ItemResult<T = String> = Result<Processed<T>, ItemError>;

/// Identifier of the item a result was derived from
pub fn result_id<T>(result: &ItemResult<T>) -> ItemId {
    match result {
        Ok(processed) => processed.id,
        Err(err) => err.id,
    }
}
