//! Key Enumeration: union of the keys matching any configured pattern.

use std::collections::BTreeSet;

use crate::scan::KeyPatternSet;
use crate::store::{QueueName, StoreError, StoreSession};

/// Every pattern is queried on its own; a key matched by several patterns appears once.
/// A single failing pattern fails the whole enumeration.
pub async fn enumerate_keys(
    session: &mut dyn StoreSession,
    patterns: &KeyPatternSet,
) -> Result<BTreeSet<QueueName>, StoreError> {
    let mut keys = BTreeSet::new();
    for pattern in patterns.iter() {
        let found = session.keys(pattern).await?;
        tracing::trace!(pattern, matched = found.len(), "pattern enumerated");
        keys.extend(found);
    }
    Ok(keys)
}
