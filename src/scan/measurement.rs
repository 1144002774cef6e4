//! Length Measurement: list length per key, skipping keys that are not lists.

use std::collections::HashMap;

use crate::store::{LengthOutcome, QueueName, StoreError, StoreSession};

/// All-or-nothing: the first failed measurement discards everything measured so far.
pub async fn measure_lengths<I>(
    session: &mut dyn StoreSession,
    keys: I,
) -> Result<HashMap<QueueName, u64>, StoreError>
where
    I: IntoIterator<Item = QueueName>,
{
    let mut lengths = HashMap::new();
    for key in keys {
        match session.list_length(&key).await {
            LengthOutcome::Measured(len) => {
                lengths.insert(key, len);
            }
            LengthOutcome::NotApplicable => {
                tracing::trace!(key = %String::from_utf8_lossy(&key), "not a list, skipped");
            }
            LengthOutcome::Failed(err) => return Err(err),
        }
    }
    Ok(lengths)
}
