//! Change feed for dashboard clients: `GET /api/v1/events`.

use crate::events::ChangeEvent;
use crate::state::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

pub async fn change_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(json) => Some(Ok(Event::default().event(event.event_name()).data(json))),
            Err(_) => None,
        },
        // Lagged subscriber: tell the client to re-fetch everything.
        Err(_) => {
            let resync = ChangeEvent::Resync;
            Some(Ok(Event::default().event(resync.event_name()).data("{}")))
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    )
}
