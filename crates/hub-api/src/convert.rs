//! Row → API model conversion.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use hub_db::Database;
use hub_db::models::{CommunityRow, MessageRow, PostRow};
use hub_types::api::{CommentResponse, CommunityResponse, DirectMessageResponse, PostResponse};
use hub_types::models::{Category, UserSummary};

pub fn parse_id(raw: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}': {}", raw, e);
        Uuid::default()
    })
}

pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

pub fn summary(id: &str, username: &str, avatar_url: &str) -> UserSummary {
    UserSummary {
        id: parse_id(id),
        username: username.to_string(),
        avatar_url: avatar_url.to_string(),
    }
}

/// Attach likes and comments to post rows, preserving row order.
/// Blocking: call from inside `with_db`.
pub fn load_posts(db: &Database, rows: Vec<PostRow>) -> anyhow::Result<Vec<PostResponse>> {
    let post_ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let like_rows = db.get_likes_for_posts(&post_ids)?;
    let comment_rows = db.get_comments_for_posts(&post_ids)?;

    let mut likes: HashMap<String, Vec<Uuid>> = HashMap::new();
    for like in like_rows {
        likes.entry(like.post_id).or_default().push(parse_id(&like.user_id));
    }

    let mut comments: HashMap<String, Vec<CommentResponse>> = HashMap::new();
    for c in comment_rows {
        comments.entry(c.post_id).or_default().push(CommentResponse {
            id: parse_id(&c.id),
            user: parse_id(&c.user_id),
            username: c.username,
            avatar_url: c.avatar_url,
            text: c.text,
            created_at: parse_timestamp(&c.created_at),
            updated_at: parse_timestamp(&c.updated_at),
        });
    }

    let posts = rows
        .into_iter()
        .map(|row| PostResponse {
            id: parse_id(&row.id),
            user: summary(&row.user_id, &row.author_username, &row.author_avatar_url),
            image_url: row.image_url,
            caption: row.caption,
            community: row.community_id.as_deref().map(parse_id),
            likes: likes.remove(&row.id).unwrap_or_default(),
            comments: comments.remove(&row.id).unwrap_or_default(),
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        })
        .collect();

    Ok(posts)
}

/// Attach member ids to community rows, preserving row order.
/// Blocking: call from inside `with_db`.
pub fn load_communities(
    db: &Database,
    rows: Vec<CommunityRow>,
) -> anyhow::Result<Vec<CommunityResponse>> {
    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();

    let mut members: HashMap<String, Vec<Uuid>> = HashMap::new();
    for m in db.get_members_for_communities(&ids)? {
        members.entry(m.community_id).or_default().push(parse_id(&m.user_id));
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let member_ids = members.remove(&row.id).unwrap_or_default();
            community_response(row, member_ids)
        })
        .collect())
}

pub fn community_response(row: CommunityRow, members: Vec<Uuid>) -> CommunityResponse {
    CommunityResponse {
        id: parse_id(&row.id),
        creator: summary(&row.creator_id, &row.creator_username, &row.creator_avatar_url),
        category: parse_category(&row.category, &row.id),
        member_count: row.member_count as usize,
        post_count: row.post_count as usize,
        members,
        name: row.name,
        description: row.description,
        image: row.image,
        is_public: row.is_public,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    }
}

pub fn parse_category(raw: &str, community_id: &str) -> Category {
    raw.parse().unwrap_or_else(|e| {
        warn!("Community '{}': {}", community_id, e);
        Category::Other
    })
}

pub fn message_response(row: MessageRow) -> DirectMessageResponse {
    DirectMessageResponse {
        id: parse_id(&row.id),
        sender: summary(&row.sender_id, &row.sender_username, &row.sender_avatar_url),
        receiver: summary(&row.receiver_id, &row.receiver_username, &row.receiver_avatar_url),
        content: row.content,
        is_read: row.is_read,
        conversation: row.conversation,
        created_at: parse_timestamp(&row.created_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_values_fall_back() {
        assert_eq!(parse_id("not-a-uuid"), Uuid::default());
        assert_eq!(parse_timestamp("yesterday"), DateTime::<Utc>::default());
        assert_eq!(parse_category("comics", "c1"), Category::Other);
    }

    #[test]
    fn timestamp_parses_db_format() {
        let raw = hub_db::timestamp();
        let parsed = parse_timestamp(&raw);
        assert!(parsed > DateTime::<Utc>::default());
    }
}
