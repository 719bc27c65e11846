//! WebSocket log subscription feeding contract events into the refresh loop.

use crate::{
    Address,
    chain::{
        parse_h256,
        parse_hex_bytes,
    },
    contract::{
        ChainEvent,
        LogEntry,
        bets_placed_topic,
        decode_log,
        player_data_updated_topic,
    },
    refresh::RefreshTrigger,
    units::{
        format_address,
        parse_address,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use futures::{
    SinkExt,
    StreamExt,
};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::{
    sync::mpsc,
    time,
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::Message,
};
use tracing::{
    debug,
    info,
    warn,
};

#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    pub ws_url: String,
    pub game: Address,
    pub leaderboard: Address,
    pub reconnect_delay: Duration,
}

/// Keep a log subscription open until the trigger channel closes,
/// reconnecting after `reconnect_delay` whenever the socket drops.
pub async fn run_subscription(
    config: SubscriptionConfig,
    trigger_tx: mpsc::UnboundedSender<RefreshTrigger>,
) -> Result<()> {
    loop {
        match stream_logs(&config, &trigger_tx).await {
            Ok(()) => info!(url = %config.ws_url, "log subscription closed"),
            Err(e) => warn!(url = %config.ws_url, error = %e, "log subscription failed"),
        }
        if trigger_tx.is_closed() {
            return Ok(());
        }
        time::sleep(config.reconnect_delay).await;
    }
}

async fn stream_logs(
    config: &SubscriptionConfig,
    trigger_tx: &mpsc::UnboundedSender<RefreshTrigger>,
) -> Result<()> {
    let (mut ws, _) = connect_async(config.ws_url.as_str())
        .await
        .wrap_err("websocket connect failed")?;
    let request = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "eth_subscribe",
        "params": ["logs", {
            "address": [format_address(&config.game), format_address(&config.leaderboard)],
            "topics": [[
                format!("{:?}", bets_placed_topic()),
                format!("{:?}", player_data_updated_topic()),
            ]],
        }],
    });
    ws.send(Message::Text(request.to_string()))
        .await
        .wrap_err("failed to send eth_subscribe")?;
    info!(url = %config.ws_url, "log subscription opened");

    while let Some(message) = ws.next().await {
        match message.wrap_err("websocket read failed")? {
            Message::Text(text) => {
                let Some(event) = frame_event(config, &text) else {
                    continue;
                };
                debug!(?event, "contract event");
                if trigger_tx.send(RefreshTrigger::Chain(event)).is_err() {
                    return Ok(());
                }
            }
            Message::Ping(payload) => {
                ws.send(Message::Pong(payload))
                    .await
                    .wrap_err("failed to answer ping")?;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    Ok(())
}

#[derive(Deserialize)]
struct Frame {
    #[serde(default)]
    params: Option<FrameParams>,
    #[serde(default)]
    error: Option<FrameError>,
}

#[derive(Deserialize)]
struct FrameParams {
    result: LogDto,
}

#[derive(Deserialize)]
struct FrameError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct LogDto {
    address: String,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    data: String,
}

impl TryFrom<LogDto> for LogEntry {
    type Error = color_eyre::eyre::Report;

    fn try_from(dto: LogDto) -> Result<Self> {
        let topics = dto
            .topics
            .iter()
            .map(|topic| parse_h256(topic))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LogEntry {
            address: parse_address(&dto.address)?,
            topics,
            data: parse_hex_bytes(&dto.data)?,
        })
    }
}

/// Extract the log carried by an `eth_subscription` notification. Other
/// frames, such as the subscription id reply, yield `None`.
fn parse_frame(text: &str) -> Result<Option<LogEntry>> {
    let frame: Frame = serde_json::from_str(text).wrap_err("invalid websocket frame")?;
    if let Some(error) = frame.error {
        return Err(eyre!(
            "subscription error {}: {}",
            error.code,
            error.message
        ));
    }
    frame
        .params
        .map(|params| LogEntry::try_from(params.result))
        .transpose()
}

/// Contract event carried by a text frame, if any. A frame that cannot be
/// read is logged and dropped; the stream stays open.
fn frame_event(config: &SubscriptionConfig, text: &str) -> Option<ChainEvent> {
    match parse_frame(text) {
        Ok(Some(log)) => decode_log(&config.game, &config.leaderboard, &log),
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "skipping websocket frame");
            None
        }
    }
}
