use futures::StreamExt as _;
use futures::stream;
use gatesweep::adapters::{ChannelRef, DiscordService, GuildRef, MessageStream, ServiceError};
use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};
use serenity::model::user::User;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, OnceLock};
use tokio_util::sync::CancellationToken;

const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

/// 2020-01-01T00:00:00Z, well past the bulk delete age limit
const OLD_MESSAGE_MS: u64 = 1_577_836_800_000;

fn snowflake(created_ms: u64, seq: u64) -> MessageId {
    MessageId::new(((created_ms - DISCORD_EPOCH_MS) << 22) | seq)
}

/// ID of a message posted an hour before the test run, numbered by `seq`
pub fn recent_message_id(seq: u64) -> MessageId {
    static BASE_MS: OnceLock<u64> = OnceLock::new();
    let base = *BASE_MS.get_or_init(|| {
        let now_ms = chrono::Utc::now().timestamp_millis() as u64;
        now_ms - 60 * 60 * 1000
    });
    snowflake(base, seq)
}

/// ID of a message too old for the bulk delete endpoint, numbered by `seq`
pub fn old_message_id(seq: u64) -> MessageId {
    snowflake(OLD_MESSAGE_MS, seq)
}

// Helper function to create a recent history message
pub fn create_test_message(seq: u64, channel_id: u64, author_id: u64, content: &str) -> Message {
    create_message_with_id(recent_message_id(seq), channel_id, author_id, content)
}

pub fn create_message_with_id(
    message_id: MessageId,
    channel_id: u64,
    author_id: u64,
    content: &str,
) -> Message {
    let mut message = Message::default();
    message.id = message_id;
    message.channel_id = ChannelId::new(channel_id);
    message.content = content.to_string();
    let mut author = User::default();
    author.id = UserId::new(author_id);
    message.author = author;
    message
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedDelete {
    pub channel_id: ChannelId,
    pub message_ids: Vec<MessageId>,
}

struct MockChannel {
    guild_id: GuildId,
    channel: ChannelRef,
    history: Vec<Result<Message, ServiceError>>,
}

/// In-memory Discord with scripted failures
pub struct MockDiscordService {
    guilds: Vec<GuildRef>,
    channels: Vec<MockChannel>,
    forbidden_guilds: Vec<GuildId>,
    members: HashMap<(GuildId, UserId), Vec<RoleId>>,
    delete_responses: Mutex<VecDeque<Result<usize, ServiceError>>>,
    cancel_after: Option<(usize, CancellationToken)>,
    pub deletes: Arc<Mutex<Vec<RecordedDelete>>>,
    pub single_deletes: Arc<Mutex<Vec<MessageId>>>,
    pub role_lookups: Arc<Mutex<Vec<UserId>>>,
}

impl Default for MockDiscordService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDiscordService {
    pub fn new() -> Self {
        Self {
            guilds: Vec::new(),
            channels: Vec::new(),
            forbidden_guilds: Vec::new(),
            members: HashMap::new(),
            delete_responses: Mutex::new(VecDeque::new()),
            cancel_after: None,
            deletes: Arc::new(Mutex::new(Vec::new())),
            single_deletes: Arc::new(Mutex::new(Vec::new())),
            role_lookups: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_guild(mut self, guild_id: u64, name: &str) -> Self {
        self.guilds.push(GuildRef {
            id: GuildId::new(guild_id),
            name: name.to_string(),
        });
        self
    }

    /// Add a channel whose history yields `messages` newest first
    pub fn with_channel(self, guild_id: u64, channel_id: u64, messages: Vec<Message>) -> Self {
        self.with_history(guild_id, channel_id, messages.into_iter().map(Ok).collect())
    }

    pub fn with_history(
        mut self,
        guild_id: u64,
        channel_id: u64,
        history: Vec<Result<Message, ServiceError>>,
    ) -> Self {
        self.channels.push(MockChannel {
            guild_id: GuildId::new(guild_id),
            channel: ChannelRef {
                id: ChannelId::new(channel_id),
                name: format!("channel-{channel_id}"),
            },
            history,
        });
        self
    }

    /// Listing channels of this guild answers 403
    pub fn with_forbidden_guild(mut self, guild_id: u64) -> Self {
        self.forbidden_guilds.push(GuildId::new(guild_id));
        self
    }

    pub fn with_member(mut self, guild_id: u64, user_id: u64, roles: &[u64]) -> Self {
        self.members.insert(
            (GuildId::new(guild_id), UserId::new(user_id)),
            roles.iter().copied().map(RoleId::new).collect(),
        );
        self
    }

    /// Answer the next bulk delete calls with these results, in order
    pub fn with_delete_responses(self, responses: Vec<Result<usize, ServiceError>>) -> Self {
        *self.delete_responses.lock().unwrap() = responses.into();
        self
    }

    /// Cancel `token` once `count` history messages have been handed out
    pub fn with_cancel_after(mut self, count: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((count, token));
        self
    }

    pub fn get_deletes(&self) -> Vec<RecordedDelete> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn get_single_deletes(&self) -> Vec<MessageId> {
        self.single_deletes.lock().unwrap().clone()
    }

    pub fn get_role_lookups(&self) -> Vec<UserId> {
        self.role_lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiscordService for MockDiscordService {
    type Message = Message;

    async fn guilds(&self) -> Result<Vec<GuildRef>, ServiceError> {
        Ok(self.guilds.clone())
    }

    async fn text_channels(&self, guild_id: GuildId) -> Result<Vec<ChannelRef>, ServiceError> {
        if self.forbidden_guilds.contains(&guild_id) {
            return Err(ServiceError::Forbidden);
        }
        Ok(self
            .channels
            .iter()
            .filter(|c| c.guild_id == guild_id)
            .map(|c| c.channel.clone())
            .collect())
    }

    fn message_history(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> MessageStream<'_, Message> {
        let history: Vec<_> = self
            .channels
            .iter()
            .find(|c| c.channel.id == channel_id)
            .map(|c| c.history.clone())
            .unwrap_or_default()
            .into_iter()
            .map(|item| {
                item.map(|mut message| {
                    message.guild_id = Some(guild_id);
                    message
                })
            })
            .collect();

        let cancel_after = self.cancel_after.clone();
        stream::iter(history)
            .enumerate()
            .map(move |(index, item)| {
                if let Some((count, token)) = &cancel_after {
                    if index + 1 == *count {
                        token.cancel();
                    }
                }
                item
            })
            .boxed()
    }

    async fn member_roles(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<Option<Vec<RoleId>>, ServiceError> {
        self.role_lookups.lock().unwrap().push(user_id);
        Ok(self.members.get(&(guild_id, user_id)).cloned())
    }

    async fn delete_messages(
        &self,
        channel_id: ChannelId,
        message_ids: &[MessageId],
    ) -> Result<usize, ServiceError> {
        self.deletes.lock().unwrap().push(RecordedDelete {
            channel_id,
            message_ids: message_ids.to_vec(),
        });
        self.delete_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(message_ids.len()))
    }

    async fn delete_message(
        &self,
        _channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<(), ServiceError> {
        self.single_deletes.lock().unwrap().push(message_id);
        Ok(())
    }
}
