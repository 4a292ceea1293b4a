//! Subscription to PocketBase realtime updates over server-sent events.
//!
//! PocketBase hands out a client id in a `PB_CONNECT` event, expects the
//! desired topics to be POSTed back, and then emits one SSE frame per record
//! change with the topic as the event name.

use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::{Method, StatusCode, header};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::dao::models::MatchRecord;

use super::{
    error::{PocketBaseDaoError, PocketBaseResult},
    store::PocketBaseStore,
};

const REALTIME_PATH: &str = "api/realtime";
const CONNECT_EVENT: &str = "PB_CONNECT";
const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Deserialize)]
struct ConnectPayload {
    #[serde(rename = "clientId")]
    client_id: String,
}

#[derive(Debug, Deserialize)]
struct RecordEventPayload {
    action: String,
    record: MatchRecord,
}

/// One parsed server-sent event frame.
#[derive(Debug, PartialEq, Eq)]
struct SseEvent {
    event: String,
    data: String,
}

/// Open the realtime stream, register the match collection topic, and return
/// a stream of externally-updated match records.
pub(super) async fn subscribe(
    store: PocketBaseStore,
) -> PocketBaseResult<BoxStream<'static, MatchRecord>> {
    let response = store
        .request(Method::GET, REALTIME_PATH)
        .header(header::ACCEPT, "text/event-stream")
        .send()
        .await
        .map_err(|source| PocketBaseDaoError::RequestSend {
            path: REALTIME_PATH.to_string(),
            source,
        })?;

    if !response.status().is_success() {
        return Err(PocketBaseDaoError::RequestStatus {
            path: REALTIME_PATH.to_string(),
            status: response.status(),
        });
    }

    let mut frames = response.bytes_stream();
    let mut buffer = String::new();

    // The first frame of interest carries the client id we must echo back.
    let client_id = loop {
        let chunk = match frames.next().await {
            Some(Ok(chunk)) => chunk,
            Some(Err(source)) => {
                return Err(PocketBaseDaoError::RequestSend {
                    path: REALTIME_PATH.to_string(),
                    source,
                });
            }
            None => return Err(PocketBaseDaoError::RealtimeHandshake),
        };
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        let mut client_id = None;
        while let Some(frame) = next_frame(&mut buffer) {
            let Some(event) = parse_frame(&frame) else {
                continue;
            };
            if event.event == CONNECT_EVENT {
                let payload: ConnectPayload =
                    serde_json::from_str(&event.data).map_err(|source| {
                        PocketBaseDaoError::RealtimePayload {
                            context: "PB_CONNECT",
                            source,
                        }
                    })?;
                client_id = Some(payload.client_id);
                break;
            }
        }
        if let Some(client_id) = client_id {
            break client_id;
        }
    };

    let topic = format!("{}/*", store.collection);
    register_subscription(&store, &client_id, &topic).await?;
    debug!(%topic, "registered PocketBase realtime subscription");

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    tokio::spawn(async move {
        while let Some(chunk) = frames.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    warn!(error = %err, "PocketBase realtime stream failed");
                    break;
                }
            };
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(frame) = next_frame(&mut buffer) {
                let Some(event) = parse_frame(&frame) else {
                    continue;
                };
                if event.event != topic {
                    continue;
                }
                match serde_json::from_str::<RecordEventPayload>(&event.data) {
                    // Creates and deletes happen through this server; only
                    // external edits to existing records need folding in.
                    Ok(payload) if payload.action == "update" => {
                        if tx.send(payload.record).await.is_err() {
                            return;
                        }
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, "ignoring malformed realtime record event");
                    }
                }
            }
        }
    });

    Ok(ReceiverStream::new(rx).boxed())
}

async fn register_subscription(
    store: &PocketBaseStore,
    client_id: &str,
    topic: &str,
) -> PocketBaseResult<()> {
    let response = store
        .request(Method::POST, REALTIME_PATH)
        .json(&json!({
            "clientId": client_id,
            "subscriptions": [topic],
        }))
        .send()
        .await
        .map_err(|source| PocketBaseDaoError::RequestSend {
            path: REALTIME_PATH.to_string(),
            source,
        })?;

    match response.status() {
        status if status.is_success() || status == StatusCode::NO_CONTENT => Ok(()),
        status => Err(PocketBaseDaoError::RequestStatus {
            path: REALTIME_PATH.to_string(),
            status,
        }),
    }
}

/// Pop the next complete frame (terminated by a blank line) off the buffer.
fn next_frame(buffer: &mut String) -> Option<String> {
    let end = buffer.find("\n\n")?;
    let frame = buffer[..end].to_string();
    buffer.drain(..end + 2);
    Some(frame)
}

/// Parse the `event:` and `data:` fields of an SSE frame; multiple data
/// lines are joined with newlines per the SSE specification.
fn parse_frame(frame: &str) -> Option<SseEvent> {
    let mut event = String::from("message");
    let mut data_lines = Vec::new();

    for line in frame.lines() {
        if let Some(value) = line.strip_prefix("event:") {
            event = value.trim_start().to_string();
        } else if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.trim_start().to_string());
        }
    }

    if data_lines.is_empty() {
        return None;
    }

    Some(SseEvent {
        event,
        data: data_lines.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_split_on_blank_lines() {
        let mut buffer = String::from("id:1\nevent:PB_CONNECT\ndata:{\"clientId\":\"c1\"}\n\nev");
        let frame = next_frame(&mut buffer).expect("one complete frame");
        assert_eq!(frame, "id:1\nevent:PB_CONNECT\ndata:{\"clientId\":\"c1\"}");
        assert_eq!(buffer, "ev");
        assert!(next_frame(&mut buffer).is_none());
    }

    #[test]
    fn parses_event_name_and_data() {
        let event = parse_frame("event: volleyball_matches/*\ndata: {\"action\":\"update\"}")
            .expect("frame parses");
        assert_eq!(event.event, "volleyball_matches/*");
        assert_eq!(event.data, "{\"action\":\"update\"}");
    }

    #[test]
    fn comment_only_frames_are_skipped() {
        assert!(parse_frame(":keepalive").is_none());
    }

    #[test]
    fn connect_payload_shape() {
        let payload: ConnectPayload =
            serde_json::from_str(r#"{"clientId":"abc123"}"#).expect("parses");
        assert_eq!(payload.client_id, "abc123");
    }

    #[test]
    fn record_event_payload_shape() {
        let payload: RecordEventPayload = serde_json::from_str(
            r#"{"action":"update","record":{"id":"rec1","homeTeam":"Eagles"}}"#,
        )
        .expect("parses");
        assert_eq!(payload.action, "update");
        assert_eq!(payload.record.home_team, "Eagles");
    }
}
