//! Subscriber transport (spec §6 "Subscriber transport"): a long-lived
//! server-sent stream per subscription. axum's `Sse` response already frames
//! each yielded `Event` as `data: ...\n\n`; `:ping` comment events and the
//! terminal `server_shutdown` record follow the same framing.
//!
//! Grounded in the teacher's `dashboard/websocket.rs` `handle_socket`
//! fan-out loop, generalized from a `tokio::select!` over a websocket sink
//! to one over an SSE byte stream (Design Notes §9: "model as a
//! topic-per-tenant, subscriber-owned queue").

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde::Deserialize;
use tokio::sync::broadcast;

use crate::error_response::ApiError;
use crate::state::{authenticate, AppState};

#[derive(Debug, Deserialize)]
pub struct SubscribeQuery {
    access_token: Option<String>,
}

const IDLE_TIMEOUT: Duration = Duration::from_secs(300);
const PING_INTERVAL: Duration = Duration::from_secs(30);

pub async fn subscribe(
    State(state): State<AppState>,
    Query(query): Query<SubscribeQuery>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let tenant_id = authenticate(&state, &headers, query.access_token.as_deref()).await?;
    let rx = state.notifier.subscribe(&tenant_id);

    let stream = async_stream::stream! {
        let mut rx: broadcast::Receiver<fedmem_core::notifier::ChangeEvent> = rx;
        let idle = tokio::time::sleep(IDLE_TIMEOUT);
        tokio::pin!(idle);

        loop {
            tokio::select! {
                biased;

                event = rx.recv() => {
                    match event {
                        Ok(event) => {
                            idle.as_mut().reset(tokio::time::Instant::now() + IDLE_TIMEOUT);
                            let is_shutdown = matches!(event, fedmem_core::notifier::ChangeEvent::ServerShutdown { .. });
                            let payload = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
                            yield Ok(Event::default().data(payload));
                            if is_shutdown {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, %tenant_id, "SSE subscriber lagged, dropping missed events");
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = &mut idle => {
                    tracing::debug!(%tenant_id, "SSE subscriber idle for 5 minutes, closing");
                    break;
                }
            }
        }
    };

    // axum's keep-alive combinator supplies the spec's `:ping every 30s`
    // comment frame without a second timer in the stream above.
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(PING_INTERVAL).text("ping")))
}
