//! `GET /events/subscribe`: live stream of newly stored events over SSE.
//!
//! Each connection owns one hub [`Subscription`](xc_02_fanout_hub::Subscription).
//! The response stream ends when the client goes away, the hub drops the
//! subscriber for falling behind, or the gateway shuts down. Dropping the
//! stream drops the subscription, which unregisters it.

use crate::domain::error::ApiError;
use crate::router::AppState;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::future::BoxFuture;
use futures::{FutureExt, Stream, StreamExt};
use std::convert::Infallible;
use tracing::{info, warn};

pub async fn subscribe(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let subscription = state.hub.register().await.map_err(|e| {
        warn!(error = %e, "Live stream requested while hub is down");
        ApiError::unavailable("live stream unavailable")
    })?;
    let subscriber_id = subscription.id();
    info!(subscriber_id = %subscriber_id, "Live stream client connected");

    let stopped: BoxFuture<'static, ()> = match state.shutdown.clone() {
        Some(mut shutdown) => async move {
            loop {
                if *shutdown.borrow_and_update() {
                    break;
                }
                // Sender gone counts as shutdown too.
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        }
        .boxed(),
        None => futures::future::pending().boxed(),
    };

    let events = subscription
        .map(|message| Ok::<_, Infallible>(Event::default().data(message)))
        .take_until(stopped);

    Ok(Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(state.config.sse.keep_alive)
            .text("keep-alive"),
    ))
}
