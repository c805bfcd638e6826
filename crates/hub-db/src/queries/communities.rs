use anyhow::Result;
use rusqlite::{Connection, Row};

use super::{OptionalExt, query_in_batches};
use crate::models::{CommunityRow, MemberRow, NewCommunity};
use crate::{Database, timestamp};

const COMMUNITY_SELECT: &str =
    "SELECT c.id, c.name, c.description, c.image, c.creator_id, u.username, u.avatar_url,
            c.category, c.is_public,
            (SELECT COUNT(*) FROM community_members m WHERE m.community_id = c.id),
            (SELECT COUNT(*) FROM posts p WHERE p.community_id = c.id),
            c.created_at, c.updated_at
     FROM communities c
     LEFT JOIN users u ON c.creator_id = u.id";

impl Database {
    /// Create a community with its creator as the first member.
    pub fn create_community(&self, new: &NewCommunity<'_>) -> Result<()> {
        let now = timestamp();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO communities (id, name, description, image, creator_id, category, is_public, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                rusqlite::params![
                    new.id,
                    new.name,
                    new.description,
                    new.image,
                    new.creator_id,
                    new.category,
                    new.is_public,
                    now,
                ],
            )?;
            conn.execute(
                "INSERT INTO community_members (community_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
                [new.id, new.creator_id, now.as_str()],
            )?;
            Ok(())
        })
    }

    pub fn get_community(&self, id: &str) -> Result<Option<CommunityRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE c.id = ?1", COMMUNITY_SELECT);
            let row = conn.query_row(&sql, [id], map_community).optional()?;
            Ok(row)
        })
    }

    /// Public communities, newest first.
    pub fn list_public_communities(&self) -> Result<Vec<CommunityRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE c.is_public = 1 ORDER BY c.created_at DESC, c.rowid DESC",
                COMMUNITY_SELECT
            );
            query_communities(conn, &sql, rusqlite::params![])
        })
    }

    /// Communities `user_id` belongs to, newest first.
    pub fn list_communities_for_member(&self, user_id: &str) -> Result<Vec<CommunityRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE c.id IN (SELECT community_id FROM community_members WHERE user_id = ?1)
                 ORDER BY c.created_at DESC, c.rowid DESC",
                COMMUNITY_SELECT
            );
            query_communities(conn, &sql, [user_id])
        })
    }

    /// Returns false when the user was already a member.
    pub fn add_member(&self, community_id: &str, user_id: &str) -> Result<bool> {
        let now = timestamp();
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "INSERT OR IGNORE INTO community_members (community_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
                [community_id, user_id, now.as_str()],
            )?;
            if n > 0 {
                conn.execute(
                    "UPDATE communities SET updated_at = ?2 WHERE id = ?1",
                    [community_id, now.as_str()],
                )?;
            }
            Ok(n > 0)
        })
    }

    /// Returns false when the user was not a member.
    pub fn remove_member(&self, community_id: &str, user_id: &str) -> Result<bool> {
        let now = timestamp();
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "DELETE FROM community_members WHERE community_id = ?1 AND user_id = ?2",
                [community_id, user_id],
            )?;
            if n > 0 {
                conn.execute(
                    "UPDATE communities SET updated_at = ?2 WHERE id = ?1",
                    [community_id, now.as_str()],
                )?;
            }
            Ok(n > 0)
        })
    }

    pub fn is_member(&self, community_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM community_members WHERE community_id = ?1 AND user_id = ?2",
                    [community_id, user_id],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Batch-fetch members for a set of communities, in join order.
    pub fn get_members_for_communities(&self, community_ids: &[String]) -> Result<Vec<MemberRow>> {
        if community_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            query_in_batches(
                conn,
                community_ids,
                |ids| {
                    format!(
                        "SELECT m.community_id, m.user_id, u.username, u.avatar_url
                         FROM community_members m
                         LEFT JOIN users u ON m.user_id = u.id
                         WHERE m.community_id IN ({})
                         ORDER BY m.joined_at, m.rowid",
                        ids
                    )
                },
                |row| {
                    Ok(MemberRow {
                        community_id: row.get(0)?,
                        user_id: row.get(1)?,
                        username: row
                            .get::<_, Option<String>>(2)?
                            .unwrap_or_else(|| "unknown".to_string()),
                        avatar_url: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    })
                },
            )
        })
    }
}

fn query_communities<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<CommunityRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map_community)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_community(row: &Row<'_>) -> rusqlite::Result<CommunityRow> {
    Ok(CommunityRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        image: row.get(3)?,
        creator_id: row.get(4)?,
        creator_username: row.get::<_, Option<String>>(5)?.unwrap_or_else(|| "unknown".to_string()),
        creator_avatar_url: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        category: row.get(7)?,
        is_public: row.get(8)?,
        member_count: row.get(9)?,
        post_count: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use crate::models::NewCommunity;
    use crate::queries::test_support::seed_user;

    fn seed_community(db: &Database, creator: &str, name: &str, is_public: bool) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        db.create_community(&NewCommunity {
            id: &id,
            name,
            description: "all about it",
            image: "https://img/c.png",
            creator_id: creator,
            category: "coins",
            is_public,
        })
        .unwrap();
        id
    }

    #[test]
    fn creator_is_first_member() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let id = seed_community(&db, &alice, "Coin Club", true);

        let community = db.get_community(&id).unwrap().unwrap();
        assert_eq!(community.member_count, 1);
        assert_eq!(community.post_count, 0);
        assert_eq!(community.creator_username, "alice");
        assert!(db.is_member(&id, &alice).unwrap());
    }

    #[test]
    fn join_and_leave() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let id = seed_community(&db, &alice, "Coin Club", true);

        assert!(db.add_member(&id, &bob).unwrap());
        assert!(!db.add_member(&id, &bob).unwrap());

        let members = db.get_members_for_communities(&[id.clone()]).unwrap();
        let names: Vec<&str> = members.iter().map(|m| m.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);

        assert_eq!(db.list_communities_for_member(&bob).unwrap().len(), 1);

        assert!(db.remove_member(&id, &bob).unwrap());
        assert!(!db.remove_member(&id, &bob).unwrap());
        assert!(db.list_communities_for_member(&bob).unwrap().is_empty());
    }

    #[test]
    fn private_communities_are_not_listed() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        seed_community(&db, &alice, "Open", true);
        seed_community(&db, &alice, "Secret", false);

        let listed = db.list_public_communities().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Open");
        assert_eq!(db.list_communities_for_member(&alice).unwrap().len(), 2);
    }

    #[test]
    fn community_posts_are_counted() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let id = seed_community(&db, &alice, "Coin Club", true);

        db.insert_post("p1", &alice, "https://img/1.png", "", Some(&id)).unwrap();
        db.insert_post("p2", &alice, "https://img/2.png", "", None).unwrap();

        assert_eq!(db.get_community(&id).unwrap().unwrap().post_count, 1);
        let posts = db.list_posts_by_community(&id, 10).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, "p1");
    }
}
