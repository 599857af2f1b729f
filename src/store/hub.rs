//! Per-room fan-out of committed snapshots.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::debug;

use crate::models::room::RoomState;

pub struct RoomHub {
    capacity: usize,
    channels: Mutex<HashMap<String, broadcast::Sender<RoomState>>>,
}

impl RoomHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self, room: &str) -> broadcast::Receiver<RoomState> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels.retain(|_, tx| tx.receiver_count() > 0);
        channels
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Sends `snapshot` to every subscriber of `room`. Rooms nobody listens to are skipped.
    pub fn publish(&self, room: &str, snapshot: &RoomState) {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let Some(tx) = channels.get(room) else {
            return;
        };
        match tx.send(snapshot.clone()) {
            Ok(count) => debug!("Room {} v{} sent to {} subscribers", room, snapshot.version, count),
            Err(_) => {
                // Every receiver is gone; drop the channel until someone subscribes again.
                channels.remove(room);
            }
        }
    }
}
