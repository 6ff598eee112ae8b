//! Platform-agnostic interaction model.
//!
//! Platform-specific payload parsing lives in the adapter crate.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use serde_json::Value;

use crate::{
    domain::{ApplicationId, ChannelId, GuildId, InteractionId, MessageId, RoleId, UserId},
    messaging::{
        port::InteractionResponder,
        types::{AutocompleteChoice, Reply},
    },
    permissions::Permissions,
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionKind {
    Ping,
    /// Slash (chat input) command.
    Command,
    /// User or message context-menu command.
    ContextMenu,
    Autocomplete,
    Button,
    SelectMenu,
    ModalSubmit,
}

#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// Guild-member context. Absent for interactions in direct messages.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Member {
    pub roles: Vec<RoleId>,
    pub permissions: Permissions,
}

impl Member {
    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }
}

/// Command name path and flattened leaf options.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommandData {
    pub name: String,
    pub subcommand_group: Option<String>,
    pub subcommand: Option<String>,
    pub options: serde_json::Map<String, Value>,
    /// Option currently being typed (autocomplete only).
    pub focused: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ComponentData {
    pub custom_id: String,
    pub values: Vec<String>,
    /// Message the component is attached to.
    pub message_id: MessageId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Interaction {
    pub id: InteractionId,
    pub application_id: ApplicationId,
    pub token: String,
    pub kind: InteractionKind,
    pub guild_id: Option<GuildId>,
    pub channel_id: Option<ChannelId>,
    pub user: User,
    pub member: Option<Member>,
    pub command: Option<CommandData>,
    pub component: Option<ComponentData>,
}

impl Interaction {
    pub fn command_name(&self) -> Option<&str> {
        self.command.as_ref().map(|c| c.name.as_str())
    }

    pub fn subcommand_group(&self) -> Option<&str> {
        self.command.as_ref()?.subcommand_group.as_deref()
    }

    pub fn subcommand(&self) -> Option<&str> {
        self.command.as_ref()?.subcommand.as_deref()
    }

    pub fn custom_id(&self) -> Option<&str> {
        self.component.as_ref().map(|c| c.custom_id.as_str())
    }

    pub fn message_id(&self) -> Option<MessageId> {
        self.component.as_ref().map(|c| c.message_id)
    }
}

/// Which call a reply goes through, given what already happened this turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyChannel {
    Reply,
    EditReply,
    FollowUp,
}

/// An interaction plus the means to answer it.
///
/// Cheap to clone; commands receive one by value and may keep it (pagination
/// sessions do, to issue later updates).
#[derive(Clone)]
pub struct InteractionContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    interaction: Interaction,
    responder: Arc<dyn InteractionResponder>,
    long: Option<String>,
    deferred: AtomicBool,
    replied: AtomicBool,
}

impl std::fmt::Debug for InteractionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionContext")
            .field("interaction", &self.inner.interaction.id)
            .field("long", &self.inner.long)
            .field("deferred", &self.is_deferred())
            .field("replied", &self.is_replied())
            .finish()
    }
}

impl InteractionContext {
    pub fn new(interaction: Interaction, responder: Arc<dyn InteractionResponder>) -> Self {
        Self::build(interaction, responder, None)
    }

    /// Context for a resolved command; `long` is its space-joined qualified name.
    pub fn for_command(
        interaction: Interaction,
        responder: Arc<dyn InteractionResponder>,
        long: String,
    ) -> Self {
        Self::build(interaction, responder, Some(long))
    }

    fn build(
        interaction: Interaction,
        responder: Arc<dyn InteractionResponder>,
        long: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                interaction,
                responder,
                long,
                deferred: AtomicBool::new(false),
                replied: AtomicBool::new(false),
            }),
        }
    }

    pub fn interaction(&self) -> &Interaction {
        &self.inner.interaction
    }

    pub fn user_id(&self) -> UserId {
        self.inner.interaction.user.id
    }

    pub fn guild_id(&self) -> Option<GuildId> {
        self.inner.interaction.guild_id
    }

    /// Qualified command name, e.g. `"admin kick"`.
    pub fn long(&self) -> Option<&str> {
        self.inner.long.as_deref()
    }

    pub fn option(&self, name: &str) -> Option<&Value> {
        self.inner.interaction.command.as_ref()?.options.get(name)
    }

    pub fn option_str(&self, name: &str) -> Option<&str> {
        self.option(name).and_then(Value::as_str)
    }

    pub fn option_i64(&self, name: &str) -> Option<i64> {
        self.option(name).and_then(Value::as_i64)
    }

    pub fn is_deferred(&self) -> bool {
        self.inner.deferred.load(Ordering::SeqCst)
    }

    pub fn is_replied(&self) -> bool {
        self.inner.replied.load(Ordering::SeqCst)
    }

    pub fn reply_channel(&self) -> ReplyChannel {
        if self.is_deferred() {
            ReplyChannel::EditReply
        } else if self.is_replied() {
            ReplyChannel::FollowUp
        } else {
            ReplyChannel::Reply
        }
    }

    pub async fn defer(&self, ephemeral: bool) -> Result<()> {
        self.inner
            .responder
            .defer(&self.inner.interaction, ephemeral)
            .await?;
        self.inner.deferred.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub async fn reply(&self, reply: &Reply) -> Result<()> {
        self.inner
            .responder
            .reply(&self.inner.interaction, reply)
            .await?;
        self.inner.replied.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub async fn edit_reply(&self, reply: &Reply) -> Result<MessageId> {
        let id = self
            .inner
            .responder
            .edit_reply(&self.inner.interaction, reply)
            .await?;
        self.inner.replied.store(true, Ordering::SeqCst);
        Ok(id)
    }

    pub async fn follow_up(&self, reply: &Reply) -> Result<MessageId> {
        self.inner
            .responder
            .follow_up(&self.inner.interaction, reply)
            .await
    }

    pub async fn update(&self, reply: &Reply) -> Result<()> {
        self.inner
            .responder
            .update(&self.inner.interaction, reply)
            .await?;
        self.inner.replied.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub async fn respond(&self, choices: &[AutocompleteChoice]) -> Result<()> {
        self.inner
            .responder
            .autocomplete(&self.inner.interaction, choices)
            .await
    }

    /// Send through whichever channel is current.
    pub async fn send(&self, reply: &Reply) -> Result<()> {
        match self.reply_channel() {
            ReplyChannel::Reply => self.reply(reply).await,
            ReplyChannel::EditReply => self.edit_reply(reply).await.map(|_| ()),
            ReplyChannel::FollowUp => self.follow_up(reply).await.map(|_| ()),
        }
    }

    /// Like [`send`](Self::send) but also returns the id of the message that
    /// carries the reply.
    pub async fn send_tracked(&self, reply: &Reply) -> Result<MessageId> {
        match self.reply_channel() {
            ReplyChannel::Reply => {
                self.reply(reply).await?;
                self.inner
                    .responder
                    .fetch_reply(&self.inner.interaction)
                    .await
            }
            ReplyChannel::EditReply => self.edit_reply(reply).await,
            ReplyChannel::FollowUp => self.follow_up(reply).await,
        }
    }
}
