mod communities;
mod messages;
mod posts;
mod users;

use anyhow::Result;
use rusqlite::{Connection, Row};

/// Max ids bound into one `IN (...)` list. SQLite caps host parameters per statement.
pub(crate) const BATCH_SIZE: usize = 500;

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// `?1, ?2, ... ?n` for an `IN (...)` clause.
fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{}", i)).collect::<Vec<_>>().join(", ")
}

fn as_params(ids: &[String]) -> Vec<&dyn rusqlite::types::ToSql> {
    ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect()
}

/// Run an `IN (...)` query over `ids` in chunks of [`BATCH_SIZE`], concatenating results.
/// `sql` receives the placeholder list for one chunk.
fn query_in_batches<T, F>(
    conn: &Connection,
    ids: &[String],
    sql: impl Fn(&str) -> String,
    map: F,
) -> Result<Vec<T>>
where
    F: Fn(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut out = Vec::new();
    for chunk in ids.chunks(BATCH_SIZE) {
        let mut stmt = conn.prepare(&sql(&placeholders(chunk.len())))?;
        let rows = stmt
            .query_map(as_params(chunk).as_slice(), &map)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        out.extend(rows);
    }
    Ok(out)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::Database;

    pub fn seed_user(db: &Database, username: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        db.create_user(
            &id,
            username,
            &format!("{}@example.com", username),
            "hash",
            hub_types::models::DEFAULT_AVATAR_URL,
        )
        .unwrap();
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_list() {
        assert_eq!(placeholders(1), "?1");
        assert_eq!(placeholders(3), "?1, ?2, ?3");
    }
}
