use anyhow::Result;
use rusqlite::{Connection, Row};

use super::OptionalExt;
use crate::models::MessageRow;
use crate::{Database, timestamp};

// JOIN both participants to fetch usernames in a single query (no N+1)
const MESSAGE_SELECT: &str =
    "SELECT m.id, m.sender_id, s.username, s.avatar_url, m.receiver_id, r.username, r.avatar_url,
            m.content, m.is_read, m.conversation, m.created_at
     FROM messages m
     LEFT JOIN users s ON m.sender_id = s.id
     LEFT JOIN users r ON m.receiver_id = r.id";

impl Database {
    pub fn insert_message(
        &self,
        id: &str,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
        conversation: &str,
    ) -> Result<()> {
        let now = timestamp();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (id, sender_id, receiver_id, content, conversation, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, sender_id, receiver_id, content, conversation, now],
            )?;
            Ok(())
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE m.id = ?1", MESSAGE_SELECT);
            let row = conn.query_row(&sql, [id], map_message).optional()?;
            Ok(row)
        })
    }

    /// Full history of one conversation, oldest first.
    pub fn get_conversation(&self, conversation: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE m.conversation = ?1 ORDER BY m.created_at ASC, m.rowid ASC",
                MESSAGE_SELECT
            );
            query_messages(conn, &sql, conversation)
        })
    }

    /// Mark everything addressed to `receiver_id` in the conversation as read.
    /// Returns the number of messages that changed.
    pub fn mark_conversation_read(&self, conversation: &str, receiver_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE messages SET is_read = 1
                 WHERE conversation = ?1 AND receiver_id = ?2 AND is_read = 0",
                [conversation, receiver_id],
            )?;
            Ok(n)
        })
    }

    /// Every message `user_id` sent or received, newest first.
    pub fn get_messages_for_user(&self, user_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE m.sender_id = ?1 OR m.receiver_id = ?1
                 ORDER BY m.created_at DESC, m.rowid DESC",
                MESSAGE_SELECT
            );
            query_messages(conn, &sql, user_id)
        })
    }

    pub fn delete_message(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }
}

fn query_messages(conn: &Connection, sql: &str, param: &str) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([param], map_message)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        sender_username: row.get::<_, Option<String>>(2)?.unwrap_or_else(|| "unknown".to_string()),
        sender_avatar_url: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        receiver_id: row.get(4)?,
        receiver_username: row.get::<_, Option<String>>(5)?.unwrap_or_else(|| "unknown".to_string()),
        receiver_avatar_url: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        content: row.get(7)?,
        is_read: row.get(8)?,
        conversation: row.get(9)?,
        created_at: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use hub_types::conversation::conversation_id;

    use crate::Database;
    use crate::queries::test_support::seed_user;

    #[test]
    fn both_directions_share_history() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");

        db.insert_message("m1", &alice, &bob, "hi bob", &conversation_id(&alice, &bob)).unwrap();
        db.insert_message("m2", &bob, &alice, "hi alice", &conversation_id(&bob, &alice)).unwrap();

        let history = db.get_conversation(&conversation_id(&alice, &bob)).unwrap();
        let ids: Vec<&str> = history.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
        assert_eq!(history[0].sender_username, "alice");
        assert_eq!(history[0].receiver_username, "bob");
    }

    #[test]
    fn mark_read_only_touches_receiver() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let key = conversation_id(&alice, &bob);

        db.insert_message("m1", &alice, &bob, "one", &key).unwrap();
        db.insert_message("m2", &alice, &bob, "two", &key).unwrap();
        db.insert_message("m3", &bob, &alice, "three", &key).unwrap();

        assert_eq!(db.mark_conversation_read(&key, &bob).unwrap(), 2);
        assert_eq!(db.mark_conversation_read(&key, &bob).unwrap(), 0);
        assert!(!db.get_message("m3").unwrap().unwrap().is_read);
    }

    #[test]
    fn user_inbox_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let carol = seed_user(&db, "carol");

        db.insert_message("m1", &alice, &bob, "a", &conversation_id(&alice, &bob)).unwrap();
        db.insert_message("m2", &carol, &alice, "b", &conversation_id(&carol, &alice)).unwrap();
        db.insert_message("m3", &bob, &carol, "c", &conversation_id(&bob, &carol)).unwrap();

        let inbox = db.get_messages_for_user(&alice).unwrap();
        let ids: Vec<&str> = inbox.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m1"]);

        assert!(db.delete_message("m2").unwrap());
        assert!(!db.delete_message("m2").unwrap());
    }
}
