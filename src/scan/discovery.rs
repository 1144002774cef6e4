//! Database Discovery: which logical databases currently hold keys.

use crate::store::{DatabaseIndex, StoreError, StoreSession};

/// Extracts database indexes from a keyspace report, one per `db<N>:...` line, in report
/// order. Lines that do not have that shape are ignored.
pub fn parse_keyspace(info: &str) -> Vec<DatabaseIndex> {
    let mut databases = Vec::new();
    for line in info.lines() {
        let Some((digits, _)) = line.strip_prefix("db").and_then(|rest| rest.split_once(':')) else {
            continue;
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if let Ok(db) = digits.parse::<DatabaseIndex>() {
            if !databases.contains(&db) {
                databases.push(db);
            }
        }
    }
    databases
}

pub async fn discover_databases(
    session: &mut dyn StoreSession,
) -> Result<Vec<DatabaseIndex>, StoreError> {
    let info = session.keyspace().await?;
    Ok(parse_keyspace(&info))
}
