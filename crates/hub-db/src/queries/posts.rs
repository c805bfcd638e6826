use anyhow::Result;
use rusqlite::{Connection, Row};

use super::{OptionalExt, query_in_batches};
use crate::models::{CommentRow, LikeRow, PostRow};
use crate::{Database, timestamp};

// Author is LEFT JOINed so a post never disappears because its owner row is gone.
const POST_SELECT: &str =
    "SELECT p.id, p.user_id, u.username, u.avatar_url, p.image_url, p.caption, p.community_id,
            p.created_at, p.updated_at
     FROM posts p
     LEFT JOIN users u ON p.user_id = u.id";

impl Database {
    // -- Posts --

    pub fn insert_post(
        &self,
        id: &str,
        user_id: &str,
        image_url: &str,
        caption: &str,
        community_id: Option<&str>,
    ) -> Result<()> {
        let now = timestamp();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (id, user_id, image_url, caption, community_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                rusqlite::params![id, user_id, image_url, caption, community_id, now],
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE p.id = ?1", POST_SELECT);
            let row = conn.query_row(&sql, [id], map_post).optional()?;
            Ok(row)
        })
    }

    /// Every post, newest first.
    pub fn list_posts(&self) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} ORDER BY p.created_at DESC, p.rowid DESC", POST_SELECT);
            query_posts(conn, &sql, rusqlite::params![])
        })
    }

    pub fn list_posts_by_user(&self, user_id: &str) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE p.user_id = ?1 ORDER BY p.created_at DESC, p.rowid DESC",
                POST_SELECT
            );
            query_posts(conn, &sql, [user_id])
        })
    }

    pub fn list_posts_by_community(&self, community_id: &str, limit: u32) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE p.community_id = ?1 ORDER BY p.created_at DESC, p.rowid DESC LIMIT ?2",
                POST_SELECT
            );
            query_posts(conn, &sql, rusqlite::params![community_id, limit])
        })
    }

    /// Deletes the post; likes and comments go with it through ON DELETE CASCADE.
    pub fn delete_post(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    // -- Likes --

    /// Like or unlike. Returns true when the like was added, false when removed.
    pub fn toggle_like(&self, post_id: &str, user_id: &str) -> Result<bool> {
        let now = timestamp();
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
                [post_id, user_id],
            )?;
            let added = if removed > 0 {
                false
            } else {
                conn.execute(
                    "INSERT INTO post_likes (post_id, user_id, created_at) VALUES (?1, ?2, ?3)",
                    [post_id, user_id, now.as_str()],
                )?;
                true
            };
            touch_post(conn, post_id, &now)?;
            Ok(added)
        })
    }

    /// Batch-fetch likes for a set of posts, most recent first.
    pub fn get_likes_for_posts(&self, post_ids: &[String]) -> Result<Vec<LikeRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            query_in_batches(
                conn,
                post_ids,
                |ids| {
                    format!(
                        "SELECT post_id, user_id FROM post_likes WHERE post_id IN ({})
                         ORDER BY created_at DESC, rowid DESC",
                        ids
                    )
                },
                |row| {
                    Ok(LikeRow {
                        post_id: row.get(0)?,
                        user_id: row.get(1)?,
                    })
                },
            )
        })
    }

    // -- Comments --

    pub fn insert_comment(
        &self,
        id: &str,
        post_id: &str,
        user_id: &str,
        username: &str,
        avatar_url: &str,
        text: &str,
    ) -> Result<()> {
        let now = timestamp();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (id, post_id, user_id, username, avatar_url, text, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                rusqlite::params![id, post_id, user_id, username, avatar_url, text, now],
            )?;
            touch_post(conn, post_id, &now)?;
            Ok(())
        })
    }

    pub fn get_comment(&self, post_id: &str, comment_id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, post_id, user_id, username, avatar_url, text, created_at, updated_at
                     FROM comments WHERE post_id = ?1 AND id = ?2",
                    [post_id, comment_id],
                    map_comment,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn update_comment(&self, post_id: &str, comment_id: &str, text: &str) -> Result<()> {
        let now = timestamp();
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE comments SET text = ?3, updated_at = ?4 WHERE post_id = ?1 AND id = ?2",
                [post_id, comment_id, text, now.as_str()],
            )?;
            touch_post(conn, post_id, &now)?;
            Ok(())
        })
    }

    pub fn delete_comment(&self, post_id: &str, comment_id: &str) -> Result<()> {
        let now = timestamp();
        self.with_conn_mut(|conn| {
            conn.execute(
                "DELETE FROM comments WHERE post_id = ?1 AND id = ?2",
                [post_id, comment_id],
            )?;
            touch_post(conn, post_id, &now)?;
            Ok(())
        })
    }

    /// Batch-fetch comments for a set of posts, newest first.
    pub fn get_comments_for_posts(&self, post_ids: &[String]) -> Result<Vec<CommentRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            query_in_batches(
                conn,
                post_ids,
                |ids| {
                    format!(
                        "SELECT id, post_id, user_id, username, avatar_url, text, created_at, updated_at
                         FROM comments WHERE post_id IN ({})
                         ORDER BY created_at DESC, rowid DESC",
                        ids
                    )
                },
                map_comment,
            )
        })
    }
}

fn touch_post(conn: &Connection, post_id: &str, now: &str) -> Result<()> {
    conn.execute("UPDATE posts SET updated_at = ?2 WHERE id = ?1", [post_id, now])?;
    Ok(())
}

fn query_posts<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<PostRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map_post)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_post(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        author_username: row.get::<_, Option<String>>(2)?.unwrap_or_else(|| "unknown".to_string()),
        author_avatar_url: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        image_url: row.get(4)?,
        caption: row.get(5)?,
        community_id: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        user_id: row.get(2)?,
        username: row.get(3)?,
        avatar_url: row.get(4)?,
        text: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use crate::queries::BATCH_SIZE;
    use crate::queries::test_support::seed_user;

    fn seed_post(db: &Database, owner: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        db.insert_post(&id, owner, "https://img/1.png", "first find", None).unwrap();
        id
    }

    #[test]
    fn insert_and_fetch_post() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let post_id = seed_post(&db, &alice);

        let post = db.get_post(&post_id).unwrap().unwrap();
        assert_eq!(post.image_url, "https://img/1.png");
        assert_eq!(post.caption, "first find");
        assert_eq!(post.author_username, "alice");
        assert!(post.community_id.is_none());

        assert!(db.get_post("missing").unwrap().is_none());
    }

    #[test]
    fn list_posts_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let first = seed_post(&db, &alice);
        let second = seed_post(&db, &alice);

        let ids: Vec<String> = db.list_posts().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[test]
    fn like_twice_restores_count() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let post_id = seed_post(&db, &alice);
        let ids = vec![post_id.clone()];

        assert!(db.toggle_like(&post_id, &bob).unwrap());
        assert_eq!(db.get_likes_for_posts(&ids).unwrap().len(), 1);

        assert!(!db.toggle_like(&post_id, &bob).unwrap());
        assert!(db.get_likes_for_posts(&ids).unwrap().is_empty());
    }

    #[test]
    fn batch_lookups_span_several_chunks() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");

        let ids: Vec<String> = (0..BATCH_SIZE * 2 + 7).map(|_| seed_post(&db, &alice)).collect();
        let first = &ids[0];
        let last = &ids[ids.len() - 1];

        db.toggle_like(first, &bob).unwrap();
        db.toggle_like(last, &bob).unwrap();
        db.insert_comment("c-first", first, &bob, "bob", "", "early").unwrap();
        db.insert_comment("c-last", last, &bob, "bob", "", "late").unwrap();

        let liked: Vec<String> = db
            .get_likes_for_posts(&ids)
            .unwrap()
            .into_iter()
            .map(|l| l.post_id)
            .collect();
        assert_eq!(liked.len(), 2);
        assert!(liked.contains(first) && liked.contains(last));

        let commented: Vec<String> = db
            .get_comments_for_posts(&ids)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(commented.len(), 2);
        assert!(commented.contains(&"c-first".to_string()));
        assert!(commented.contains(&"c-last".to_string()));
    }

    #[test]
    fn comments_newest_first_and_cascade() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let post_id = seed_post(&db, &alice);

        db.insert_comment("c1", &post_id, &alice, "alice", "", "nice").unwrap();
        db.insert_comment("c2", &post_id, &alice, "alice", "", "very nice").unwrap();

        let ids = vec![post_id.clone()];
        let comments = db.get_comments_for_posts(&ids).unwrap();
        assert_eq!(comments.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), vec!["c2", "c1"]);

        db.update_comment(&post_id, "c1", "edited").unwrap();
        assert_eq!(db.get_comment(&post_id, "c1").unwrap().unwrap().text, "edited");

        db.delete_comment(&post_id, "c2").unwrap();
        assert!(db.get_comment(&post_id, "c2").unwrap().is_none());

        assert!(db.delete_post(&post_id).unwrap());
        assert!(db.get_comments_for_posts(&ids).unwrap().is_empty());
    }
}
