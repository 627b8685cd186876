use std::convert::Infallible;
use std::pin::Pin;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};

use crate::api::live_stream;
use crate::engine::CoachObserver;

pub type LiveStream = Sse<Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>>;

/// Build a Server-Sent Events stream of live rep/feedback updates.
pub fn live(observer: &CoachObserver) -> LiveStream {
    let stream = live_stream(observer).filter_map(|update| async move {
        match serde_json::to_string(&update) {
            Ok(payload) => Some(Ok(Event::default().event("live").data(payload))),
            Err(_) => None,
        }
    });

    Sse::new(Box::pin(stream) as Pin<Box<_>>).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(5))
            .text("debug-keepalive"),
    )
}
