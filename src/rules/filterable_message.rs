use chrono::NaiveDateTime;
use serenity::model::channel::Message;
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};

/// Trait for filterable message objects
///
/// This trait abstracts the message attributes that rules can inspect,
/// allowing us to evaluate rules without depending on serenity's Message type.
pub trait FilterableMessage {
    fn message_id(&self) -> MessageId;
    fn guild_id(&self) -> Option<GuildId>;
    fn channel_id(&self) -> ChannelId;
    fn author_id(&self) -> UserId;

    /// Role IDs carried by the message itself (partial member data)
    ///
    /// `None` when the message was fetched without member information,
    /// which is the usual case for channel history.
    fn member_role_ids(&self) -> Option<&[RoleId]>;

    /// Creation time as naive UTC
    fn created_at(&self) -> Option<NaiveDateTime>;

    fn content(&self) -> &str;
}

impl FilterableMessage for Message {
    fn message_id(&self) -> MessageId {
        self.id
    }

    fn guild_id(&self) -> Option<GuildId> {
        self.guild_id
    }

    fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    fn author_id(&self) -> UserId {
        self.author.id
    }

    fn member_role_ids(&self) -> Option<&[RoleId]> {
        self.member.as_ref().map(|m| m.roles.as_slice())
    }

    fn created_at(&self) -> Option<NaiveDateTime> {
        // Keep sub-second precision; bounds are compared inclusively
        Some(self.timestamp.naive_utc())
    }

    fn content(&self) -> &str {
        &self.content
    }
}
