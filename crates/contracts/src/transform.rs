//! Transform trait - worker stage capability

use crate::Item;

/// Item transform run by pipeline workers
///
/// Shared by every worker of a pipeline, so it takes `&self`.
/// An `Err` is turned into an `ItemError` carrying the item id; it never
/// stops the worker.
#[trait_variant::make(Transform: Send)]
pub trait LocalTransform<I, O> {
    /// Derive the output payload for one item
    ///
    /// # Errors
    /// Returns the failure cause for this item only
    async fn apply(&self, item: Item<I>) -> Result<O, String>;
}

/// Adapter turning a plain closure into a `Transform`
pub struct FnTransform<F>(pub F);

impl<I, O, F> Transform<I, O> for FnTransform<F>
where
    I: Send,
    F: Fn(Item<I>) -> Result<O, String> + Send + Sync,
{
    async fn apply(&self, item: Item<I>) -> Result<O, String> {
        (self.0)(item)
    }
}

/// Wrap a closure as a transform
pub fn transform_fn<I, O, F>(f: F) -> FnTransform<F>
where
    F: Fn(Item<I>) -> Result<O, String> + Send + Sync,
{
    FnTransform(f)
}

#[cfg(test)]
mod tests {
    use super::{transform_fn, Item, Transform};

    #[tokio::test]
    async fn test_fn_transform() {
        let transform = transform_fn(|item: Item| Ok::<_, String>(format!("processed:{}", item.id)));
        let out = transform.apply(Item::new(1, "a".to_string())).await;
        assert_eq!(out, Ok("processed:1".to_string()));
    }

    #[tokio::test]
    async fn test_fn_transform_error() {
        let transform = transform_fn(|item: Item| {
            if item.payload.is_empty() {
                Err("empty payload".to_string())
            } else {
                Ok(item.payload)
            }
        });
        let out = transform.apply(Item::new(2, String::new())).await;
        assert_eq!(out, Err("empty payload".to_string()));
    }
}
