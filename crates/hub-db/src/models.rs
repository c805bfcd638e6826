/// Database row types, mapped directly from SQLite rows.
/// Kept apart from the hub-types API models so the DB layer stays independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub avatar_url: String,
    pub bio: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A post joined with its author's username and avatar.
pub struct PostRow {
    pub id: String,
    pub user_id: String,
    pub author_username: String,
    pub author_avatar_url: String,
    pub image_url: String,
    pub caption: String,
    pub community_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct LikeRow {
    pub post_id: String,
    pub user_id: String,
}

pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub username: String,
    pub avatar_url: String,
    pub text: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct NewCommunity<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    pub image: &'a str,
    pub creator_id: &'a str,
    pub category: &'a str,
    pub is_public: bool,
}

/// A community joined with its creator and member/post counts.
pub struct CommunityRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub image: String,
    pub creator_id: String,
    pub creator_username: String,
    pub creator_avatar_url: String,
    pub category: String,
    pub is_public: bool,
    pub member_count: i64,
    pub post_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

pub struct MemberRow {
    pub community_id: String,
    pub user_id: String,
    pub username: String,
    pub avatar_url: String,
}

/// A direct message joined with both participants' username and avatar.
pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub sender_username: String,
    pub sender_avatar_url: String,
    pub receiver_id: String,
    pub receiver_username: String,
    pub receiver_avatar_url: String,
    pub content: String,
    pub is_read: bool,
    pub conversation: String,
    pub created_at: String,
}
