//! Axum SSE endpoint for the push stream.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::response::sse::{Event as SseFrame, Sse};
use futures_util::{Stream, StreamExt};

use super::channel::StreamChannel;
use crate::app_state::AppState;
use crate::domain::Event;

/// `GET /api/v1/events` — Open an unbounded push stream.
///
/// Each frame is one event serialized as `data: <json>\n\n`, with a
/// `type` field carrying the kind. No client→server messages travel on
/// this channel; heartbeats come from the channel itself rather than an
/// SSE comment keep-alive so clients see a real `ping` event.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Events",
    summary = "Subscribe to the live event stream",
    description = "Responds with an unbounded `text/event-stream`. The first frame is a synthetic `connected` event; a `ping` event follows at the configured heartbeat interval.",
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream"),
    )
)]
pub async fn events_handler(State(state): State<AppState>) -> impl IntoResponse {
    let channel = StreamChannel::open(state.relay_service.event_bus(), state.heartbeat_interval);
    Sse::new(frames(channel))
}

/// Maps domain events onto wire frames.
fn frames(
    channel: StreamChannel,
) -> impl Stream<Item = Result<SseFrame, Infallible>> {
    channel.map(|event: Event| {
        let json = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseFrame::default().data(json))
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{EventBus, EventKind};
    use std::time::Duration;

    #[tokio::test]
    async fn frames_serialize_events_with_type_field() {
        let bus = EventBus::new();
        let channel = StreamChannel::open(&bus, Duration::from_secs(25));
        let mut stream = frames(channel);

        let Some(Ok(_connected)) = stream.next().await else {
            panic!("expected connected frame");
        };

        let mut payload = serde_json::Map::new();
        payload.insert("job_id".to_string(), serde_json::json!("j-2"));
        bus.publish(&Event::new(EventKind::JobTimeout, payload));

        let Some(Ok(_frame)) = stream.next().await else {
            panic!("expected event frame");
        };
    }
}
