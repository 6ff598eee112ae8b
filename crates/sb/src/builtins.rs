//! Handlers shipped with the binary, bound by the manifests under `commands/`.

use sb_core::{
    command::{autocomplete_fn, handler_fn, HandlerCatalog},
    interaction::InteractionContext,
    messaging::types::{AutocompleteChoice, Embed},
    response::CommandOutput,
};

const PAGES_MAX: i64 = 10;

pub fn catalog() -> HandlerCatalog {
    HandlerCatalog::new()
        .with_command("ping", handler_fn(|_ctx| async { Ok("pong".into()) }))
        .with_command("echo", handler_fn(echo))
        .with_command("pages", handler_fn(pages))
        .with_autocomplete("pages", autocomplete_fn(page_counts))
}

async fn echo(ctx: InteractionContext) -> anyhow::Result<CommandOutput> {
    let Some(text) = ctx.option_str("text") else {
        anyhow::bail!("missing `text` option");
    };
    Ok(text.into())
}

async fn pages(ctx: InteractionContext) -> anyhow::Result<CommandOutput> {
    let count = ctx.option_i64("count").unwrap_or(3).clamp(1, PAGES_MAX);
    let pages = (1..=count)
        .map(|n| Embed::new(format!("Page {n}")).description(format!("{n} of {count}")))
        .collect::<Vec<_>>();
    Ok(pages.into())
}

async fn page_counts(_ctx: InteractionContext) -> anyhow::Result<Vec<AutocompleteChoice>> {
    Ok([2, 5, PAGES_MAX]
        .into_iter()
        .map(|n| AutocompleteChoice::new(n.to_string(), n))
        .collect())
}
