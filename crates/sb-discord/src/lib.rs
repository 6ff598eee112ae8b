//! Discord adapter.
//!
//! This crate implements the `sb-core` registration and reply ports over
//! serenity's HTTP client, and relays gateway frames into the core handler.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use serenity::{
    builder::{CreateInteractionResponse, CreateInteractionResponseMessage},
    http::{Http, HttpBuilder},
    model::id,
};

pub mod payload;
pub mod router;

use sb_core::{
    domain::{ApplicationId, GuildId, MessageId},
    errors::Error,
    interaction::Interaction,
    messaging::{
        port::InteractionResponder,
        types::{AutocompleteChoice, Reply},
    },
    ports::RegistrationPort,
    Result,
};

use crate::payload::{autocomplete_response, edit_response, followup_message, response_message};

/// Discord REST through serenity. Rate limits are handled by serenity's ratelimiter.
#[derive(Clone)]
pub struct DiscordHttp {
    http: Arc<Http>,
}

impl DiscordHttp {
    /// `proxy` replaces `https://discord.com` in every request URL.
    pub fn new(token: &str, proxy: Option<&str>) -> Self {
        let mut builder = HttpBuilder::new(token);
        if let Some(proxy) = proxy {
            builder = builder.proxy(proxy);
        }
        Self {
            http: Arc::new(builder.build()),
        }
    }

    pub fn http(&self) -> &Arc<Http> {
        &self.http
    }

    /// Application-scoped routes (commands, interaction webhooks) need the id set.
    fn bind(&self, app: ApplicationId) -> Result<()> {
        self.http.set_application_id(snowflake(app.0, "application")?);
        Ok(())
    }

    async fn respond(
        &self,
        interaction: &Interaction,
        response: &CreateInteractionResponse,
    ) -> Result<()> {
        let interaction_id: id::InteractionId = snowflake(interaction.id.0, "interaction")?;
        self.http
            .create_interaction_response(interaction_id, &interaction.token, response, Vec::new())
            .await
            .map_err(|e| failed("interaction response", e))
    }
}

/// Serenity ids reject zero; surface that as an error instead of a panic.
fn snowflake<T: From<u64>>(raw: u64, what: &str) -> Result<T> {
    if raw == 0 {
        return Err(Error::External(format!("{what} id must be non-zero")));
    }
    Ok(T::from(raw))
}

fn failed(what: &str, e: serenity::Error) -> Error {
    Error::External(format!("discord {what} failed: {e}"))
}

#[async_trait]
impl RegistrationPort for DiscordHttp {
    async fn register_guild_commands(
        &self,
        app: ApplicationId,
        guild: GuildId,
        payload: &[Value],
    ) -> Result<()> {
        self.bind(app)?;
        let guild: id::GuildId = snowflake(guild.0, "guild")?;
        self.http
            .create_guild_commands(guild, &payload)
            .await
            .map(|_| ())
            .map_err(|e| failed("guild command registration", e))
    }

    async fn register_global_commands(&self, app: ApplicationId, payload: &[Value]) -> Result<()> {
        self.bind(app)?;
        self.http
            .create_global_commands(&payload)
            .await
            .map(|_| ())
            .map_err(|e| failed("global command registration", e))
    }
}

#[async_trait]
impl InteractionResponder for DiscordHttp {
    async fn reply(&self, interaction: &Interaction, reply: &Reply) -> Result<()> {
        let response = CreateInteractionResponse::Message(response_message(reply));
        self.respond(interaction, &response).await
    }

    async fn defer(&self, interaction: &Interaction, ephemeral: bool) -> Result<()> {
        let mut msg = CreateInteractionResponseMessage::new();
        if ephemeral {
            msg = msg.ephemeral(true);
        }
        self.respond(interaction, &CreateInteractionResponse::Defer(msg))
            .await
    }

    async fn edit_reply(&self, interaction: &Interaction, reply: &Reply) -> Result<MessageId> {
        self.bind(interaction.application_id)?;
        let msg = self
            .http
            .edit_original_interaction_response(
                &interaction.token,
                &edit_response(reply),
                Vec::new(),
            )
            .await
            .map_err(|e| failed("edit original response", e))?;
        Ok(MessageId(msg.id.get()))
    }

    async fn follow_up(&self, interaction: &Interaction, reply: &Reply) -> Result<MessageId> {
        self.bind(interaction.application_id)?;
        let msg = self
            .http
            .create_followup_message(&interaction.token, &followup_message(reply), Vec::new())
            .await
            .map_err(|e| failed("follow-up", e))?;
        Ok(MessageId(msg.id.get()))
    }

    async fn update(&self, interaction: &Interaction, reply: &Reply) -> Result<()> {
        let response = CreateInteractionResponse::UpdateMessage(response_message(reply));
        self.respond(interaction, &response).await
    }

    async fn autocomplete(
        &self,
        interaction: &Interaction,
        choices: &[AutocompleteChoice],
    ) -> Result<()> {
        let response = CreateInteractionResponse::Autocomplete(autocomplete_response(choices));
        self.respond(interaction, &response).await
    }

    async fn fetch_reply(&self, interaction: &Interaction) -> Result<MessageId> {
        self.bind(interaction.application_id)?;
        let msg = self
            .http
            .get_original_interaction_response(&interaction.token)
            .await
            .map_err(|e| failed("fetch original response", e))?;
        Ok(MessageId(msg.id.get()))
    }
}
