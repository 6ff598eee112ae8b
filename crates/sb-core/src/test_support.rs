//! Fakes and fixtures shared by the unit tests.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    domain::{ApplicationId, GuildId, InteractionId, MessageId, UserId},
    errors::Error,
    interaction::{CommandData, ComponentData, Interaction, InteractionKind, Member, User},
    messaging::{
        port::InteractionResponder,
        types::{AutocompleteChoice, Reply},
    },
    ports::RegistrationPort,
    Result,
};

pub fn scratch_dir(tag: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!("sb-core-{}-{tag}", std::process::id()));
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(&root).unwrap();
    root
}

pub fn write_file(root: &Path, rel: &str, body: &str) {
    let p = root.join(rel);
    fs::create_dir_all(p.parent().unwrap()).unwrap();
    fs::write(p, body).unwrap();
}

pub fn user(id: u64) -> User {
    User {
        id: UserId(id),
        username: format!("user{id}"),
    }
}

fn base(kind: InteractionKind, user_id: u64) -> Interaction {
    Interaction {
        id: InteractionId(1),
        application_id: ApplicationId(99),
        token: "tok".to_string(),
        kind,
        guild_id: Some(GuildId(500)),
        channel_id: None,
        user: user(user_id),
        member: Some(Member::default()),
        command: None,
        component: None,
    }
}

/// Slash command invocation; `path` is `["admin", "kick"]` style.
pub fn command(user_id: u64, path: &[&str]) -> Interaction {
    let mut i = base(InteractionKind::Command, user_id);
    i.command = Some(CommandData {
        name: path.first().copied().unwrap_or_default().to_string(),
        subcommand_group: if path.len() > 2 {
            Some(path[1].to_string())
        } else {
            None
        },
        subcommand: path.last().filter(|_| path.len() > 1).map(|s| s.to_string()),
        ..CommandData::default()
    });
    i
}

pub fn autocomplete(user_id: u64, path: &[&str], focused: &str) -> Interaction {
    let mut i = command(user_id, path);
    i.kind = InteractionKind::Autocomplete;
    if let Some(c) = i.command.as_mut() {
        c.focused = Some(focused.to_string());
    }
    i
}

pub fn button(user_id: u64, message: u64, custom_id: &str) -> Interaction {
    let mut i = base(InteractionKind::Button, user_id);
    i.component = Some(ComponentData {
        custom_id: custom_id.to_string(),
        values: Vec::new(),
        message_id: MessageId(message),
    });
    i
}

#[derive(Clone, Debug, PartialEq)]
pub enum Sent {
    Reply(Reply),
    Defer(bool),
    EditReply(Reply),
    FollowUp(Reply),
    Update(Reply),
    Autocomplete(Vec<AutocompleteChoice>),
}

/// Responder that records every call; sent messages get sequential ids from 1000.
#[derive(Default)]
pub struct RecordingResponder {
    sent: Mutex<Vec<Sent>>,
    next_id: Mutex<u64>,
}

impl RecordingResponder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn push(&self, s: Sent) {
        self.sent.lock().unwrap().push(s);
    }

    fn alloc(&self) -> MessageId {
        let mut guard = self.next_id.lock().unwrap();
        if *guard == 0 {
            *guard = 1000;
        }
        let id = *guard;
        *guard += 1;
        MessageId(id)
    }
}

#[async_trait]
impl InteractionResponder for RecordingResponder {
    async fn reply(&self, _i: &Interaction, reply: &Reply) -> Result<()> {
        self.push(Sent::Reply(reply.clone()));
        self.alloc();
        Ok(())
    }

    async fn defer(&self, _i: &Interaction, ephemeral: bool) -> Result<()> {
        self.push(Sent::Defer(ephemeral));
        self.alloc();
        Ok(())
    }

    async fn edit_reply(&self, _i: &Interaction, reply: &Reply) -> Result<MessageId> {
        self.push(Sent::EditReply(reply.clone()));
        Ok(MessageId(self.next_id.lock().unwrap().saturating_sub(1)))
    }

    async fn follow_up(&self, _i: &Interaction, reply: &Reply) -> Result<MessageId> {
        self.push(Sent::FollowUp(reply.clone()));
        Ok(self.alloc())
    }

    async fn update(&self, _i: &Interaction, reply: &Reply) -> Result<()> {
        self.push(Sent::Update(reply.clone()));
        Ok(())
    }

    async fn autocomplete(&self, _i: &Interaction, choices: &[AutocompleteChoice]) -> Result<()> {
        self.push(Sent::Autocomplete(choices.to_vec()));
        Ok(())
    }

    async fn fetch_reply(&self, _i: &Interaction) -> Result<MessageId> {
        Ok(MessageId(self.next_id.lock().unwrap().saturating_sub(1)))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Registered {
    Guild(GuildId, Vec<Value>),
    Global(Vec<Value>),
}

#[derive(Default)]
pub struct RecordingRegistrar {
    pub calls: Mutex<Vec<Registered>>,
    pub fail: bool,
}

impl RecordingRegistrar {
    pub fn calls(&self) -> Vec<Registered> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistrationPort for RecordingRegistrar {
    async fn register_guild_commands(
        &self,
        _app: ApplicationId,
        guild: GuildId,
        payload: &[Value],
    ) -> Result<()> {
        if self.fail {
            return Err(Error::External("registration rejected".to_string()));
        }
        self.calls
            .lock()
            .unwrap()
            .push(Registered::Guild(guild, payload.to_vec()));
        Ok(())
    }

    async fn register_global_commands(&self, _app: ApplicationId, payload: &[Value]) -> Result<()> {
        if self.fail {
            return Err(Error::External("registration rejected".to_string()));
        }
        self.calls
            .lock()
            .unwrap()
            .push(Registered::Global(payload.to_vec()));
        Ok(())
    }
}
