use std::sync::Arc;

use sb_core::{
    command::FsDefinitionSource,
    config::Config,
    handler::{HandlerDeps, InteractionHandler},
    ports::MemoryGuildConfigStore,
};
use anyhow::Context;
use sb_discord::DiscordHttp;

mod builtins;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sb_core::logging::init("switchboard")?;

    let cfg = Config::load()?;
    tracing::info!(
        path = %cfg.command_path.display(),
        command_guild = ?cfg.command_guild,
        dev_guild = ?cfg.dev_guild,
        "switchboard starting"
    );

    let rest = Arc::new(DiscordHttp::new(&cfg.bot_token, cfg.discord_proxy.as_deref()));
    let source = Arc::new(FsDefinitionSource::new(
        cfg.command_path.clone(),
        Arc::new(builtins::catalog()),
    ));

    let handler = InteractionHandler::new(HandlerDeps {
        cfg,
        source,
        registrar: rest.clone(),
        responder: rest,
        configs: Some(Arc::new(MemoryGuildConfigStore::new())),
    });

    let input = tokio::io::BufReader::new(tokio::io::stdin());
    sb_discord::router::run_relay(handler, input)
        .await
        .context("gateway relay failed")?;

    Ok(())
}
