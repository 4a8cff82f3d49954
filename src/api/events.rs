/// WebSocket stream of name resolution events
///
/// Every completed resolution is pushed to connected clients as a JSON text
/// frame:
/// - `#resolved`: `{ address, name, resolvedAt }`
/// - `#info`: control messages (connected, lagged)
///
/// Clients that fall behind the broadcast buffer skip the missed events and
/// receive a `Lagged` info frame. Idle connections are pinged every 30 seconds.
use crate::{context::AppContext, names::NameResolved};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Serialize;
use tokio::{
    sync::broadcast::error::RecvError,
    time::{interval, timeout, Duration, Instant},
};

const SEND_TIMEOUT_MS: u64 = 5000;
const PING_INTERVAL_SECS: u64 = 30;

/// Event stream frame
#[derive(Debug, Serialize)]
#[serde(tag = "$type")]
pub enum EventFrame {
    #[serde(rename = "#resolved")]
    Resolved(NameResolved),
    #[serde(rename = "#info")]
    Info(EventInfo),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInfo {
    pub name: String,
    pub message: Option<String>,
}

/// WebSocket handler for the resolution event stream
pub async fn subscribe_names(ws: WebSocketUpgrade, State(ctx): State<AppContext>) -> Response {
    ws.on_upgrade(move |socket| handle_subscription(socket, ctx))
}

async fn handle_subscription(socket: WebSocket, ctx: AppContext) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = ctx.resolver.events();

    let connected = EventFrame::Info(EventInfo {
        name: "Connected".to_string(),
        message: Some("Subscribed to name resolution events".to_string()),
    });
    if send_frame(&mut sender, &connected).await.is_err() {
        return;
    }

    let mut ping_interval = interval(Duration::from_secs(PING_INTERVAL_SECS));
    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            event = events.recv() => {
                let frame = match event {
                    Ok(event) => EventFrame::Resolved(event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Name event subscriber lagging");
                        EventFrame::Info(EventInfo {
                            name: "Lagged".to_string(),
                            message: Some(format!("Skipped {} events", skipped)),
                        })
                    }
                    Err(RecvError::Closed) => break,
                };

                if send_frame(&mut sender, &frame).await.is_err() {
                    tracing::debug!("Client disconnected during send");
                    break;
                }
                last_activity = Instant::now();
            }

            _ = ping_interval.tick() => {
                if last_activity.elapsed() > Duration::from_secs(PING_INTERVAL_SECS)
                    && sender.send(Message::Ping(vec![])).await.is_err()
                {
                    break;
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!("Client closed connection");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }
        }
    }
}

async fn send_frame<S>(sender: &mut S, frame: &EventFrame) -> Result<(), ()>
where
    S: SinkExt<Message> + Unpin,
{
    let json = serde_json::to_string(frame).map_err(|_| ())?;
    match timeout(
        Duration::from_millis(SEND_TIMEOUT_MS),
        sender.send(Message::Text(json)),
    )
    .await
    {
        Ok(Ok(())) => Ok(()),
        _ => Err(()),
    }
}

/// Build event stream routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/v1/events", get(subscribe_names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::WalletAddress;

    #[test]
    fn test_resolved_frame_shape() {
        let address = WalletAddress::normalize("0x1111111111111111111111111111111111111111").unwrap();
        let frame = EventFrame::Resolved(NameResolved::new(&address, None));
        let json = serde_json::to_value(&frame).unwrap();

        assert_eq!(json["$type"], "#resolved");
        assert_eq!(json["address"], "0x1111111111111111111111111111111111111111");
        assert!(json["name"].is_null());
        assert!(json["resolvedAt"].is_string());
    }

    #[test]
    fn test_info_frame_shape() {
        let frame = EventFrame::Info(EventInfo {
            name: "Lagged".to_string(),
            message: Some("Skipped 3 events".to_string()),
        });
        let json = serde_json::to_value(&frame).unwrap();

        assert_eq!(json["$type"], "#info");
        assert_eq!(json["name"], "Lagged");
    }
}
