use super::discord_service::{
    ChannelRef, DiscordService, GuildRef, MAX_BULK_DELETE, MessageStream, ServiceError,
};
use futures::StreamExt as _;
use serenity::async_trait;
use serenity::model::channel::{ChannelType, Message};
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};
use std::sync::Arc;
use tracing::debug;

/// Implementation for Discord operations via Serenity's REST client
pub struct SerenityDiscordService {
    http: Arc<serenity::http::Http>,
}

impl SerenityDiscordService {
    /// Create a new SerenityDiscordService
    ///
    /// # Arguments
    ///
    /// * `http` - The serenity HTTP client
    pub fn new(http: Arc<serenity::http::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl DiscordService for SerenityDiscordService {
    type Message = Message;

    async fn guilds(&self) -> Result<Vec<GuildRef>, ServiceError> {
        let guilds = self.http.get_guilds(None, None).await?;

        Ok(guilds
            .into_iter()
            .map(|guild| GuildRef {
                id: guild.id,
                name: guild.name,
            })
            .collect())
    }

    async fn text_channels(&self, guild_id: GuildId) -> Result<Vec<ChannelRef>, ServiceError> {
        let mut channels = self.http.get_channels(guild_id).await?;

        // Text and announcement channels hold deletable history
        channels.retain(|channel| matches!(channel.kind, ChannelType::Text | ChannelType::News));
        channels.sort_by_key(|channel| (channel.position, channel.id));

        debug!(
            guild_id = %guild_id,
            channel_count = channels.len(),
            "Text channels resolved"
        );

        Ok(channels
            .into_iter()
            .map(|channel| ChannelRef {
                id: channel.id,
                name: channel.name,
            })
            .collect())
    }

    fn message_history(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> MessageStream<'_, Message> {
        channel_id
            .messages_iter(Arc::clone(&self.http))
            .map(move |result| {
                result
                    .map(|mut message| {
                        message.guild_id.get_or_insert(guild_id);
                        message
                    })
                    .map_err(ServiceError::from)
            })
            .boxed()
    }

    async fn member_roles(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<Option<Vec<RoleId>>, ServiceError> {
        match self.http.get_member(guild_id, user_id).await {
            Ok(member) => Ok(Some(member.roles)),
            Err(err) => match ServiceError::from(err) {
                ServiceError::NotFound => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn delete_messages(
        &self,
        channel_id: ChannelId,
        message_ids: &[MessageId],
    ) -> Result<usize, ServiceError> {
        match message_ids {
            [] => Ok(0),
            // The bulk endpoint rejects fewer than two messages
            [message_id] => {
                self.delete_message(channel_id, *message_id).await?;
                Ok(1)
            }
            ids if ids.len() > MAX_BULK_DELETE => Err(ServiceError::Other(format!(
                "Bulk delete accepts at most {} messages, got {}",
                MAX_BULK_DELETE,
                ids.len()
            ))),
            ids => {
                let map = serde_json::json!({ "messages": ids });
                self.http.delete_messages(channel_id, &map, None).await?;
                Ok(ids.len())
            }
        }
    }

    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<(), ServiceError> {
        self.http
            .delete_message(channel_id, message_id, None)
            .await
            .map_err(ServiceError::from)
    }
}
