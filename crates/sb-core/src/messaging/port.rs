use async_trait::async_trait;

use crate::{
    domain::MessageId,
    interaction::Interaction,
    messaging::types::{AutocompleteChoice, Reply},
    Result,
};

/// Transport for replying to an interaction.
///
/// The platform adapter implements this; the core only decides *which* call to
/// make (reply / edit deferred / follow-up / component update).
#[async_trait]
pub trait InteractionResponder: Send + Sync {
    /// Primary response to the interaction.
    async fn reply(&self, interaction: &Interaction, reply: &Reply) -> Result<()>;

    /// Acknowledge now, answer later through `edit_reply`.
    async fn defer(&self, interaction: &Interaction, ephemeral: bool) -> Result<()>;

    /// Edit the original (possibly deferred) response.
    async fn edit_reply(&self, interaction: &Interaction, reply: &Reply) -> Result<MessageId>;

    /// Send an additional message after the primary response.
    async fn follow_up(&self, interaction: &Interaction, reply: &Reply) -> Result<MessageId>;

    /// Update the message a component (button/select) is attached to.
    async fn update(&self, interaction: &Interaction, reply: &Reply) -> Result<()>;

    async fn autocomplete(
        &self,
        interaction: &Interaction,
        choices: &[AutocompleteChoice],
    ) -> Result<()>;

    /// Id of the message created by the primary response.
    async fn fetch_reply(&self, interaction: &Interaction) -> Result<MessageId>;
}
