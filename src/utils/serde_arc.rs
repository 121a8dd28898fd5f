//! Serialize an `Arc<T>` field as its inner value.
//!
//! Plan nodes share selections through `Arc`; explain output only needs the
//! pointee, so sharing is not preserved on the wire.

use serde::Serialize;
use std::sync::Arc;

pub fn serialize<S, T>(val: &Arc<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
    T: Serialize,
{
    T::serialize(val.as_ref(), serializer)
}

/// Same as [`serialize`] for an optional shared value.
pub mod option {
    use serde::Serialize;
    use std::sync::Arc;

    pub fn serialize<S, T>(val: &Option<Arc<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: Serialize,
    {
        match val {
            Some(inner) => serializer.serialize_some(inner.as_ref()),
            None => serializer.serialize_none(),
        }
    }
}
