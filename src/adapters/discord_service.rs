use futures::stream::BoxStream;
use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};
use tracing::warn;

use crate::rules::FilterableMessage;

/// Maximum number of messages accepted by a single bulk delete call
pub const MAX_BULK_DELETE: usize = 100;

/// Age in seconds beyond which the bulk delete endpoint rejects a message
///
/// A minute short of two weeks, so a message cannot age out while the call is in flight.
pub const BULK_DELETE_MAX_AGE_SECS: i64 = 14 * 24 * 60 * 60 - 60;

/// Whether a message can still go through the bulk delete endpoint at `now` (unix seconds)
pub fn is_bulk_deletable(message_id: MessageId, now: i64) -> bool {
    now - message_id.created_at().unix_timestamp() < BULK_DELETE_MAX_AGE_SECS
}

/// Failure of a Discord API call, classified by how the pipeline recovers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("Not found")]
    NotFound,

    #[error("Permission denied")]
    Forbidden,

    #[error("{0}")]
    Other(String),
}

impl From<serenity::Error> for ServiceError {
    fn from(err: serenity::Error) -> Self {
        use serenity::http::HttpError;

        if let serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) = &err {
            match response.status_code.as_u16() {
                403 => return ServiceError::Forbidden,
                404 => return ServiceError::NotFound,
                _ => {}
            }
        }

        ServiceError::Other(err.to_string())
    }
}

/// Guild reachable by the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildRef {
    pub id: GuildId,
    pub name: String,
}

/// Text channel within a guild
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    pub id: ChannelId,
    pub name: String,
}

/// Single forward pass over a channel's message history
pub type MessageStream<'a, M> = BoxStream<'a, Result<M, ServiceError>>;

/// Discord操作のインターフェース
#[async_trait]
pub trait DiscordService: Send + Sync {
    /// Message type yielded by history streams
    type Message: FilterableMessage + Send + Sync;

    /// Guilds the bot has joined
    async fn guilds(&self) -> Result<Vec<GuildRef>, ServiceError>;

    /// Text channels of a guild, in display order
    async fn text_channels(&self, guild_id: GuildId) -> Result<Vec<ChannelRef>, ServiceError>;

    /// Lazily fetch the message history of a channel
    ///
    /// The stream ends when the history is exhausted. Messages carry
    /// `guild_id` even when the API omits it.
    fn message_history(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> MessageStream<'_, Self::Message>;

    /// Role IDs of a guild member
    ///
    /// # Returns
    ///
    /// * `Ok(Some(roles))` - The user is a member of the guild
    /// * `Ok(None)` - The user is no longer a member
    async fn member_roles(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<Option<Vec<RoleId>>, ServiceError>;

    /// Delete up to [`MAX_BULK_DELETE`] messages in one call
    ///
    /// Every message must be younger than two weeks.
    ///
    /// # Returns
    ///
    /// Number of messages the API reports as removed
    async fn delete_messages(
        &self,
        channel_id: ChannelId,
        message_ids: &[MessageId],
    ) -> Result<usize, ServiceError>;

    /// Delete a single message
    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<(), ServiceError>;

    /// Delete a batch of messages of any age
    ///
    /// Messages young enough for the bulk endpoint go out in one call; older
    /// ones are deleted one at a time. A batch with no old messages behaves
    /// exactly like [`DiscordService::delete_messages`].
    ///
    /// # Returns
    ///
    /// Combined number of messages removed. An error is returned only when
    /// nothing was removed.
    async fn delete_batch(
        &self,
        channel_id: ChannelId,
        message_ids: &[MessageId],
    ) -> Result<usize, ServiceError> {
        let now = chrono::Utc::now().timestamp();
        let (recent, old): (Vec<MessageId>, Vec<MessageId>) = message_ids
            .iter()
            .copied()
            .partition(|message_id| is_bulk_deletable(*message_id, now));

        if old.is_empty() {
            return self.delete_messages(channel_id, &recent).await;
        }

        let mut deleted = 0;
        let mut failure = None;

        if !recent.is_empty() {
            match self.delete_messages(channel_id, &recent).await {
                Ok(count) => deleted += count,
                Err(ServiceError::NotFound) => deleted += recent.len(),
                Err(err) => failure = Some(err),
            }
        }

        for message_id in old {
            match self.delete_message(channel_id, message_id).await {
                // Already gone counts as removed
                Ok(()) | Err(ServiceError::NotFound) => deleted += 1,
                Err(ServiceError::Forbidden) => {
                    failure.get_or_insert(ServiceError::Forbidden);
                    break;
                }
                Err(err) => {
                    failure.get_or_insert(err);
                }
            }
        }

        match failure {
            Some(err) if deleted == 0 => Err(err),
            Some(err) => {
                warn!(
                    channel_id = %channel_id,
                    deleted,
                    requested = message_ids.len(),
                    error = %err,
                    "Batch partially deleted"
                );
                Ok(deleted)
            }
            None => Ok(deleted),
        }
    }
}
