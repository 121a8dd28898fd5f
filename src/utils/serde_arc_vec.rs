//! Serialize a list of shared values as a plain sequence.

use serde::{Serialize, Serializer};
use std::sync::Arc;

pub fn serialize<S, T>(values: &[Arc<T>], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    serializer.collect_seq(values.iter().map(Arc::as_ref))
}
