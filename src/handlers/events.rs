//! Server-Sent Events feed of room snapshots.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{
    future,
    stream::{self, Stream, StreamExt},
};
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use tracing::{debug, info, warn};

use crate::{error::AppError, models::room::RoomState, store::RoomStore};

use super::room::validate_room_id;

fn snapshot_event(snapshot: &RoomState) -> Option<Event> {
    Event::default()
        .event("room")
        .id(snapshot.version.to_string())
        .json_data(snapshot)
        .ok()
}

/// Forwards only snapshots newer than the last one forwarded.
///
/// Writers publish after committing, so two close commits can arrive out of
/// order; an older snapshot must never replace a newer one on screen.
fn newer_snapshots<S>(updates: S, mut last_version: u64, room: String) -> impl Stream<Item = RoomState>
where
    S: Stream<Item = Result<RoomState, BroadcastStreamRecvError>>,
{
    updates.filter_map(move |result| {
        let next = match result {
            Ok(snapshot) if snapshot.version > last_version => {
                last_version = snapshot.version;
                Some(snapshot)
            }
            Ok(snapshot) => {
                debug!(
                    "Room {} dropped stale v{} (already at v{})",
                    room, snapshot.version, last_version
                );
                None
            }
            Err(e) => {
                warn!("SSE subscriber of room {} lagged: {:?}", room, e);
                None
            }
        };
        future::ready(next)
    })
}

/// Streams the room: the current snapshot first, then every committed change.
///
/// A subscriber that falls behind skips the snapshots it missed; the next one
/// it receives is complete, so nothing needs replaying.
pub async fn room_events(
    State(store): State<Arc<dyn RoomStore>>,
    Path(room): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    validate_room_id(&room)?;

    // Subscribe before reading so no write can slip in between.
    let rx = store.subscribe(&room);
    let current = store.load(&room).await?;
    info!("SSE subscriber joined room {}", room);

    let initial = stream::iter(snapshot_event(&current).map(Ok));
    let updates = newer_snapshots(BroadcastStream::new(rx), current.version, room)
        .filter_map(|snapshot| future::ready(snapshot_event(&snapshot).map(Ok)));

    Ok(Sse::new(initial.chain(updates)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::room::GameMode;

    fn at(version: u64) -> Result<RoomState, BroadcastStreamRecvError> {
        let mut snapshot = RoomState::new(GameMode::MultiRound, 60);
        snapshot.version = version;
        Ok(snapshot)
    }

    #[tokio::test]
    async fn test_out_of_order_snapshots_are_dropped() {
        let updates = stream::iter(vec![
            at(5),
            at(7),
            at(6),
            Err(BroadcastStreamRecvError::Lagged(3)),
            at(7),
            at(9),
        ]);

        let versions: Vec<u64> = newer_snapshots(updates, 5, "room".to_string())
            .map(|snapshot| snapshot.version)
            .collect()
            .await;
        assert_eq!(versions, vec![7, 9]);
    }
}
