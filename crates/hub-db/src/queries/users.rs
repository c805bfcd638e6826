use anyhow::Result;
use rusqlite::Connection;

use super::OptionalExt;
use crate::models::UserRow;
use crate::{Database, timestamp};

const USER_COLUMNS: &str =
    "id, username, email, password, avatar_url, bio, created_at, updated_at";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        avatar_url: &str,
    ) -> Result<()> {
        let now = timestamp();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password, avatar_url, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                rusqlite::params![id, username, email, password_hash, avatar_url, now],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    /// Overwrite the editable profile fields. The password is only replaced when a new hash is given.
    pub fn update_profile(
        &self,
        id: &str,
        username: &str,
        bio: &str,
        avatar_url: &str,
        password_hash: Option<&str>,
    ) -> Result<()> {
        let now = timestamp();
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET username = ?2, bio = ?3, avatar_url = ?4, updated_at = ?5 WHERE id = ?1",
                rusqlite::params![id, username, bio, avatar_url, now],
            )?;
            if let Some(hash) = password_hash {
                conn.execute("UPDATE users SET password = ?2 WHERE id = ?1", [id, hash])?;
            }
            Ok(())
        })
    }

    // -- Follow graph --

    /// Follow or unfollow. Returns true when `follower_id` now follows `followee_id`.
    pub fn toggle_follow(&self, follower_id: &str, followee_id: &str) -> Result<bool> {
        let now = timestamp();
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                [follower_id, followee_id],
            )?;
            if removed > 0 {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO follows (follower_id, followee_id, created_at) VALUES (?1, ?2, ?3)",
                [follower_id, followee_id, now.as_str()],
            )?;
            Ok(true)
        })
    }

    /// Ids of users following `user_id`.
    pub fn get_followers(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            query_ids(
                conn,
                "SELECT follower_id FROM follows WHERE followee_id = ?1 ORDER BY created_at, rowid",
                user_id,
            )
        })
    }

    /// Ids of users that `user_id` follows.
    pub fn get_following(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            query_ids(
                conn,
                "SELECT followee_id FROM follows WHERE follower_id = ?1 ORDER BY created_at, rowid",
                user_id,
            )
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                avatar_url: row.get(4)?,
                bio: row.get(5)?,
                created_at: row.get(6)?,
                updated_at: row.get(7)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_ids(conn: &Connection, sql: &str, param: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map([param], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use crate::is_unique_violation;
    use crate::queries::test_support::seed_user;

    #[test]
    fn lookup_by_each_key() {
        let db = Database::open_in_memory().unwrap();
        let id = seed_user(&db, "alice");

        let by_id = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(by_id.username, "alice");
        assert_eq!(by_id.bio, "");

        let by_name = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(by_name.id, id);

        let by_email = db.get_user_by_email("alice@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, id);

        assert!(db.get_user_by_username("bob").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_unique_violation() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "alice");

        let err = db
            .create_user("other-id", "alice2", "alice@example.com", "hash", "")
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn update_profile_keeps_password_unless_given() {
        let db = Database::open_in_memory().unwrap();
        let id = seed_user(&db, "alice");

        db.update_profile(&id, "alicia", "coins only", "http://a/b.png", None).unwrap();
        let user = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(user.username, "alicia");
        assert_eq!(user.bio, "coins only");
        assert_eq!(user.password, "hash");

        db.update_profile(&id, "alicia", "coins only", "http://a/b.png", Some("new-hash")).unwrap();
        let user = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(user.password, "new-hash");
    }

    #[test]
    fn follow_toggles() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");

        assert!(db.toggle_follow(&alice, &bob).unwrap());
        assert_eq!(db.get_followers(&bob).unwrap(), vec![alice.clone()]);
        assert_eq!(db.get_following(&alice).unwrap(), vec![bob.clone()]);
        assert!(db.get_followers(&alice).unwrap().is_empty());

        assert!(!db.toggle_follow(&alice, &bob).unwrap());
        assert!(db.get_followers(&bob).unwrap().is_empty());
    }
}
