use std::{collections::BTreeMap, fmt, future::Future, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    interaction::InteractionContext, messaging::types::AutocompleteChoice,
    permissions::Permissions, response::CommandOutput,
};

/// Body of a leaf command.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(&self, ctx: InteractionContext) -> anyhow::Result<CommandOutput>;
}

/// Autocomplete suggestions for a command's focused option.
#[async_trait]
pub trait AutocompleteHandler: Send + Sync {
    async fn suggest(&self, ctx: InteractionContext) -> anyhow::Result<Vec<AutocompleteChoice>>;
}

/// Adapts an async closure into a [`CommandHandler`].
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F, Fut> CommandHandler for FnHandler<F>
where
    F: Fn(InteractionContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<CommandOutput>> + Send + 'static,
{
    async fn execute(&self, ctx: InteractionContext) -> anyhow::Result<CommandOutput> {
        (self.0)(ctx).await
    }
}

/// Adapts an async closure into an [`AutocompleteHandler`].
pub struct FnAutocomplete<F>(pub F);

#[async_trait]
impl<F, Fut> AutocompleteHandler for FnAutocomplete<F>
where
    F: Fn(InteractionContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Vec<AutocompleteChoice>>> + Send + 'static,
{
    async fn suggest(&self, ctx: InteractionContext) -> anyhow::Result<Vec<AutocompleteChoice>> {
        (self.0)(ctx).await
    }
}

pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn CommandHandler>
where
    F: Fn(InteractionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<CommandOutput>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

pub fn autocomplete_fn<F, Fut>(f: F) -> Arc<dyn AutocompleteHandler>
where
    F: Fn(InteractionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Vec<AutocompleteChoice>>> + Send + 'static,
{
    Arc::new(FnAutocomplete(f))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    TopLevel,
    Group,
    Subcommand,
}

/// A built, immutable node of the command tree.
#[derive(Clone)]
pub struct CommandNode {
    pub name: String,
    pub description: String,
    pub kind: NodeKind,
    /// Platform application-command type (1 = chat input).
    pub node_type: u8,
    pub permissions: Option<Permissions>,
    pub op_perms: Option<Vec<String>>,
    pub guild_only: Option<bool>,
    pub ephemeral: Option<bool>,
    pub owner_only: bool,
    pub dev_only: bool,
    /// Raw platform option schema, passed through on registration.
    pub options: Vec<Value>,
    pub subcommands: BTreeMap<String, Arc<CommandNode>>,
    pub execute: Option<Arc<dyn CommandHandler>>,
    pub auto: Option<Arc<dyn AutocompleteHandler>>,
}

impl CommandNode {
    /// A node with no restrictions, handlers, or children.
    pub fn bare(name: impl Into<String>, kind: NodeKind) -> Self {
        let name = name.into();
        Self {
            description: name.clone(),
            name,
            kind,
            node_type: 1,
            permissions: None,
            op_perms: None,
            guild_only: None,
            ephemeral: None,
            owner_only: false,
            dev_only: false,
            options: Vec::new(),
            subcommands: BTreeMap::new(),
            execute: None,
            auto: None,
        }
    }

    pub fn is_group(&self) -> bool {
        self.execute.is_none()
    }

    pub fn is_guild_only(&self) -> bool {
        self.guild_only.unwrap_or(false)
    }

    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral.unwrap_or(false)
    }

    pub fn subcommand(&self, name: &str) -> Option<&Arc<CommandNode>> {
        self.subcommands.get(name)
    }
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("node_type", &self.node_type)
            .field("permissions", &self.permissions)
            .field("op_perms", &self.op_perms)
            .field("guild_only", &self.guild_only)
            .field("ephemeral", &self.ephemeral)
            .field("owner_only", &self.owner_only)
            .field("dev_only", &self.dev_only)
            .field("subcommands", &self.subcommands.keys().collect::<Vec<_>>())
            .field("execute", &self.execute.is_some())
            .field("auto", &self.auto.is_some())
            .finish()
    }
}
