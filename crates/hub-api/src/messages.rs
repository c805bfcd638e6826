use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;
use uuid::Uuid;

use hub_db::models::MessageRow;
use hub_types::api::{
    ConversationSummary, DirectMessageResponse, SendMessageRequest, StatusMessage,
};
use hub_types::conversation::conversation_id;

use crate::auth::{AppState, with_db};
use crate::convert::{message_response, parse_timestamp, summary};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::AuthUser;

pub const MAX_MESSAGE_LEN: usize = 1000;

/// GET /api/messages/conversations: one entry per conversation, most recent activity first.
pub async fn get_conversations(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<ConversationSummary>>> {
    let uid = user.id.to_string();
    let rows = with_db(&state, move |db| Ok(db.get_messages_for_user(&uid)?)).await?;

    Ok(Json(group_conversations(&user.id.to_string(), rows)))
}

/// Fold a newest-first message list into conversation summaries.
/// The first message seen for a key is that conversation's latest.
pub fn group_conversations(user_id: &str, rows: Vec<MessageRow>) -> Vec<ConversationSummary> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut conversations: Vec<ConversationSummary> = Vec::new();

    for row in rows {
        let slot = match index.get(&row.conversation) {
            Some(&i) => i,
            None => {
                let other = if row.sender_id == user_id {
                    summary(&row.receiver_id, &row.receiver_username, &row.receiver_avatar_url)
                } else {
                    summary(&row.sender_id, &row.sender_username, &row.sender_avatar_url)
                };
                conversations.push(ConversationSummary {
                    conversation_id: row.conversation.clone(),
                    user: other,
                    last_message: row.content.clone(),
                    timestamp: parse_timestamp(&row.created_at),
                    unread_count: 0,
                });
                index.insert(row.conversation.clone(), conversations.len() - 1);
                conversations.len() - 1
            }
        };

        if row.receiver_id == user_id && !row.is_read {
            conversations[slot].unread_count += 1;
        }
    }

    conversations
}

/// GET /api/messages/{user_id}: history with that user, oldest first.
/// Marks the caller's unread messages in the conversation as read.
pub async fn get_messages(
    State(state): State<AppState>,
    ApiPath(other_id): ApiPath<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<DirectMessageResponse>>> {
    let me = user.id.to_string();
    let key = conversation_id(&me, &other_id.to_string());

    let rows = with_db(&state, move |db| {
        let rows = db.get_conversation(&key)?;
        let marked = db.mark_conversation_read(&key, &me)?;
        if marked > 0 {
            debug!("Marked {} messages read in {}", marked, key);
        }
        Ok(rows)
    })
    .await?;

    Ok(Json(rows.into_iter().map(message_response).collect()))
}

/// POST /api/messages/{user_id}
pub async fn send_message(
    State(state): State<AppState>,
    ApiPath(receiver_id): ApiPath<Uuid>,
    Extension(user): Extension<AuthUser>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::bad_request("Message content is required."));
    }
    if content.chars().count() > MAX_MESSAGE_LEN {
        return Err(ApiError::bad_request(format!(
            "Message cannot exceed {} characters.",
            MAX_MESSAGE_LEN
        )));
    }

    let sender = user.id.to_string();
    let receiver = receiver_id.to_string();
    let message = with_db(&state, move |db| {
        if db.get_user_by_id(&receiver)?.is_none() {
            return Err(ApiError::not_found("Receiver not found."));
        }

        let id = Uuid::new_v4().to_string();
        let key = conversation_id(&sender, &receiver);
        db.insert_message(&id, &sender, &receiver, &content, &key)
            .map_err(|e| ApiError::missing_on_fk(e, "Receiver not found."))?;

        db.get_message(&id)?
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("message {} vanished after insert", id)))
    })
    .await?;

    Ok((StatusCode::CREATED, Json(message_response(message))))
}

/// DELETE /api/messages/{message_id}: sender only.
pub async fn delete_message(
    State(state): State<AppState>,
    ApiPath(message_id): ApiPath<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<StatusMessage>> {
    with_db(&state, move |db| {
        let message = db
            .get_message(&message_id.to_string())?
            .ok_or_else(|| ApiError::not_found("Message not found."))?;
        if message.sender_id != user.id.to_string() {
            return Err(ApiError::forbidden("Not authorized to delete this message."));
        }
        db.delete_message(&message.id)?;
        Ok(())
    })
    .await?;

    Ok(Json(StatusMessage::new("Message deleted successfully.")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, from: &str, to: &str, content: &str, is_read: bool) -> MessageRow {
        MessageRow {
            id: id.to_string(),
            sender_id: from.to_string(),
            sender_username: format!("user-{}", from),
            sender_avatar_url: String::new(),
            receiver_id: to.to_string(),
            receiver_username: format!("user-{}", to),
            receiver_avatar_url: String::new(),
            content: content.to_string(),
            is_read,
            conversation: conversation_id(from, to),
            created_at: hub_db::timestamp(),
        }
    }

    #[test]
    fn groups_by_conversation_keeping_latest() {
        let a = Uuid::new_v4().to_string();
        let b = Uuid::new_v4().to_string();
        let c = Uuid::new_v4().to_string();

        // Newest first, as the query returns them
        let rows = vec![
            row("m4", &c, &a, "from c", false),
            row("m3", &b, &a, "latest from b", false),
            row("m2", &a, &b, "reply to b", false),
            row("m1", &b, &a, "first from b", true),
        ];

        let conversations = group_conversations(&a, rows);
        assert_eq!(conversations.len(), 2);

        assert_eq!(conversations[0].conversation_id, conversation_id(&a, &c));
        assert_eq!(conversations[0].user.username, format!("user-{}", c));
        assert_eq!(conversations[0].unread_count, 1);

        assert_eq!(conversations[1].conversation_id, conversation_id(&a, &b));
        assert_eq!(conversations[1].last_message, "latest from b");
        // m2 was sent by a, m1 already read
        assert_eq!(conversations[1].unread_count, 1);
    }

    #[test]
    fn sender_side_sees_no_unread() {
        let a = Uuid::new_v4().to_string();
        let b = Uuid::new_v4().to_string();

        let conversations = group_conversations(&a, vec![row("m1", &a, &b, "hi", false)]);
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].unread_count, 0);
        assert_eq!(conversations[0].user.username, format!("user-{}", b));
    }
}
