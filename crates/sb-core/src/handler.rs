//! The interaction handler: owns the live command tree and routes every
//! inbound interaction to a command, an autocomplete, or a pagination session.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::{
    command::{
        build_tree, registration::RegistrationPlan, resolve, CommandTree, DefinitionSource,
        Resolved,
    },
    config::Config,
    domain::ApplicationId,
    errors::Error,
    interaction::{Interaction, InteractionContext, InteractionKind},
    messaging::{port::InteractionResponder, types::Reply},
    pagination::PaginationManager,
    ports::{GuildConfig, GuildConfigStore, RegistrationPort},
    response::ResponseDispatcher,
    security::{self, Invoker},
    Result,
};

/// Everything the handler talks to.
pub struct HandlerDeps {
    pub cfg: Config,
    pub source: Arc<dyn DefinitionSource>,
    pub registrar: Arc<dyn RegistrationPort>,
    pub responder: Arc<dyn InteractionResponder>,
    pub configs: Option<Arc<dyn GuildConfigStore>>,
}

/// Inbound events the handler reacts to.
#[derive(Clone, Debug)]
pub enum GatewayEvent {
    Ready { application_id: ApplicationId },
    Interaction(Interaction),
}

pub struct InteractionHandler {
    cfg: Config,
    source: Arc<dyn DefinitionSource>,
    registrar: Arc<dyn RegistrationPort>,
    responder: Arc<dyn InteractionResponder>,
    configs: Option<Arc<dyn GuildConfigStore>>,
    tree: RwLock<Arc<CommandTree>>,
    app: Mutex<Option<ApplicationId>>,
    dispatcher: ResponseDispatcher,
}

impl InteractionHandler {
    pub fn new(deps: HandlerDeps) -> Arc<Self> {
        let pagination = Arc::new(PaginationManager::new(deps.cfg.pagination_timeout));
        Arc::new(Self {
            cfg: deps.cfg,
            source: deps.source,
            registrar: deps.registrar,
            responder: deps.responder,
            configs: deps.configs,
            tree: RwLock::new(Arc::new(CommandTree::default())),
            app: Mutex::new(None),
            dispatcher: ResponseDispatcher::new(pagination),
        })
    }

    pub fn pagination(&self) -> &Arc<PaginationManager> {
        self.dispatcher.pagination()
    }

    /// Snapshot of the live tree.
    pub async fn tree(&self) -> Arc<CommandTree> {
        Arc::clone(&*self.tree.read().await)
    }

    fn application_id(&self) -> Option<ApplicationId> {
        *self.app.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Build the tree, swap it in, then register it with the platform.
    ///
    /// On a build error the previous tree stays live.
    pub async fn load(&self, app: ApplicationId) -> Result<()> {
        *self.app.lock().unwrap_or_else(PoisonError::into_inner) = Some(app);

        let source = Arc::clone(&self.source);
        let tree = tokio::task::spawn_blocking(move || build_tree(source.as_ref()))
            .await
            .map_err(|e| Error::External(format!("tree build task failed: {e}")))?
            .inspect_err(|e| tracing::error!("command tree build failed: {e}"))?;

        let transmission = tree.transmission();
        tracing::info!(
            commands = tree.len(),
            dev_only = transmission.dev_only.len(),
            "command tree built"
        );
        *self.tree.write().await = Arc::new(tree);

        RegistrationPlan::new(&transmission, self.cfg.command_guild, self.cfg.dev_guild)
            .execute(self.registrar.as_ref(), app)
            .await
    }

    /// Rebuild from the source using the application id from the last load.
    pub async fn reload(&self) -> Result<()> {
        let app = self
            .application_id()
            .ok_or_else(|| Error::Config("reload requested before the bot was ready".into()))?;
        self.load(app).await
    }

    /// Consume events until the channel closes. The first `Ready` loads the
    /// tree; a load failure ends the loop with that error.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<GatewayEvent>) -> Result<()> {
        let cancel = CancellationToken::new();
        let sweeper = self
            .pagination()
            .spawn_sweeper(self.cfg.pagination_sweep_interval, cancel.clone());

        let mut ready = false;
        let result = loop {
            let Some(event) = rx.recv().await else {
                break Ok(());
            };
            match event {
                GatewayEvent::Ready { application_id } => {
                    if ready {
                        tracing::debug!("ignoring repeated ready");
                        continue;
                    }
                    ready = true;
                    tracing::info!(%application_id, "bot ready");
                    if let Err(e) = self.load(application_id).await {
                        break Err(e);
                    }
                }
                GatewayEvent::Interaction(interaction) => {
                    let this = Arc::clone(&self);
                    tokio::spawn(async move { this.handle(interaction).await });
                }
            }
        };

        cancel.cancel();
        let _ = sweeper.await;
        result
    }

    /// Route one interaction. Failures are logged, never returned.
    pub async fn handle(&self, interaction: Interaction) {
        let id = interaction.id;
        let res = match interaction.kind {
            InteractionKind::Autocomplete => self.handle_auto(interaction).await,
            InteractionKind::Command | InteractionKind::ContextMenu => {
                self.handle_command(interaction).await
            }
            InteractionKind::Button | InteractionKind::SelectMenu => {
                self.handle_component(interaction).await
            }
            kind => {
                tracing::debug!(%id, ?kind, "unhandled interaction kind");
                Ok(())
            }
        };
        if let Err(e) = res {
            tracing::error!(%id, "interaction handling failed: {e}");
        }
    }

    async fn guild_config(&self, interaction: &Interaction) -> Option<GuildConfig> {
        let (guild, store) = interaction.guild_id.zip(self.configs.as_ref())?;
        match store.get(guild).await {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(%guild, "guild config lookup failed: {e}");
                None
            }
        }
    }

    async fn handle_command(&self, interaction: Interaction) -> Result<()> {
        let tree = self.tree().await;
        let Some(Resolved { node, long }) = resolve(&tree, &interaction) else {
            tracing::debug!(command = ?interaction.command_name(), "no such command");
            return Ok(());
        };

        let cfg = self.guild_config(&interaction).await;
        let access = security::check(
            &node,
            Invoker {
                user: &interaction.user,
                member: interaction.member.as_ref(),
            },
            self.cfg.owner_id,
            cfg.as_ref(),
        );

        let ctx = InteractionContext::for_command(interaction, Arc::clone(&self.responder), long);
        if let Some(denial) = access.denial_message() {
            tracing::debug!(command = ?ctx.long(), ?access, user = %ctx.user_id(), "denied");
            return ctx.reply(&Reply::text(denial).ephemeral(true)).await;
        }

        let Some(exec) = node.execute.clone() else {
            return Ok(());
        };
        match exec.execute(ctx.clone()).await {
            Ok(output) => self.dispatcher.dispatch(&ctx, &node, output).await,
            Err(e) => {
                tracing::error!(command = ?ctx.long(), "command failed: {e:#}");
                self.dispatcher.report_error(&ctx, &e).await
            }
        }
    }

    async fn handle_auto(&self, interaction: Interaction) -> Result<()> {
        let tree = self.tree().await;
        let Some(Resolved { node, long }) = resolve(&tree, &interaction) else {
            return Ok(());
        };
        let ctx = InteractionContext::for_command(interaction, Arc::clone(&self.responder), long);

        let choices = match &node.auto {
            Some(auto) => auto.suggest(ctx.clone()).await.unwrap_or_else(|e| {
                tracing::warn!(command = ?ctx.long(), "autocomplete failed: {e:#}");
                Vec::new()
            }),
            None => Vec::new(),
        };
        ctx.respond(&choices).await
    }

    async fn handle_component(&self, interaction: Interaction) -> Result<()> {
        let ctx = InteractionContext::new(interaction, Arc::clone(&self.responder));
        self.pagination().handle(&ctx).await.map(|_| ())
    }
}
