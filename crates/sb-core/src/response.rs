//! Turning a command's result into a reply.

use std::sync::Arc;

use crate::{
    command::node::CommandNode,
    interaction::InteractionContext,
    messaging::types::{Embed, Reply},
    pagination::{page_reply, PaginationManager},
    Result,
};

/// What a command produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CommandOutput {
    /// The command answered on its own, or wants no answer.
    #[default]
    NoReply,
    Text(String),
    /// One embed per page; two or more get navigation controls.
    Pages(Vec<Embed>),
    Structured(Reply),
}

impl From<String> for CommandOutput {
    fn from(s: String) -> Self {
        CommandOutput::Text(s)
    }
}

impl From<&str> for CommandOutput {
    fn from(s: &str) -> Self {
        CommandOutput::Text(s.to_string())
    }
}

impl From<Reply> for CommandOutput {
    fn from(r: Reply) -> Self {
        CommandOutput::Structured(r)
    }
}

impl From<Vec<Embed>> for CommandOutput {
    fn from(pages: Vec<Embed>) -> Self {
        CommandOutput::Pages(pages)
    }
}

/// Sends command results through the current reply channel.
pub struct ResponseDispatcher {
    pagination: Arc<PaginationManager>,
}

impl ResponseDispatcher {
    pub fn new(pagination: Arc<PaginationManager>) -> Self {
        Self { pagination }
    }

    pub fn pagination(&self) -> &Arc<PaginationManager> {
        &self.pagination
    }

    pub async fn dispatch(
        &self,
        ctx: &InteractionContext,
        node: &CommandNode,
        output: CommandOutput,
    ) -> Result<()> {
        let ephemeral = node.is_ephemeral();
        match output {
            CommandOutput::NoReply => Ok(()),
            CommandOutput::Text(text) => ctx.send(&Reply::text(text).ephemeral(ephemeral)).await,
            CommandOutput::Structured(mut reply) => {
                reply.ephemeral.get_or_insert(ephemeral);
                ctx.send(&reply).await
            }
            CommandOutput::Pages(pages) => match pages.len() {
                0 => {
                    tracing::warn!(command = %node.name, "command returned no pages");
                    Ok(())
                }
                1 => {
                    let reply = pages
                        .into_iter()
                        .next()
                        .map(Reply::embed)
                        .unwrap_or_default()
                        .ephemeral(ephemeral);
                    ctx.send(&reply).await
                }
                _ => {
                    let reply = page_reply(&pages, 0).ephemeral(ephemeral);
                    let message = ctx.send_tracked(&reply).await?;
                    self.pagination.open(message, ctx.user_id(), pages);
                    Ok(())
                }
            },
        }
    }

    /// Report a failed command to its invoker.
    pub async fn report_error(&self, ctx: &InteractionContext, err: &anyhow::Error) -> Result<()> {
        ctx.send(&Reply::text(format!("Error:\n{err}")).ephemeral(true))
            .await
    }
}
