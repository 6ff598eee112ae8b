use std::sync::Arc;

use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::mpsc,
};

use sb_core::handler::{GatewayEvent, InteractionHandler};

use crate::payload::decode_frame;

const EVENT_BUFFER: usize = 256;

/// Feed newline-delimited gateway frames from `input` into `handler` until
/// the input ends or the handler stops.
pub async fn run_relay<R>(handler: Arc<InteractionHandler>, input: R) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let reader = tokio::spawn(pump(input, tx));

    let result = handler.run(rx).await;
    if result.is_err() {
        reader.abort();
    }

    let read = match reader.await {
        Ok(r) => r,
        Err(e) if e.is_cancelled() => Ok(()),
        Err(e) => Err(e.into()),
    };
    result?;
    read
}

async fn pump<R>(input: R, tx: mpsc::Sender<GatewayEvent>) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let event = match decode_frame(&line) {
            Ok(Some(ev)) => ev,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!("dropping malformed gateway frame: {e}");
                continue;
            }
        };
        if tx.send(event).await.is_err() {
            break; // handler gone
        }
    }
    tracing::info!("gateway input closed");
    Ok(())
}
