use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    game::Command,
    models::room::RoomStatus,
    store::{RoomStore, transact},
};

/// One countdown task per room, owned by the display that claimed it.
///
/// Each tick applies `Command::Tick`, which is a no-op outside PLAYING, so a
/// ticker that outlives its round never writes into a reset room.
#[derive(Clone)]
pub struct CountdownRegistry {
    store: Arc<dyn RoomStore>,
    tick_interval: Duration,
    max_retries: u32,
    tickers: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
}

impl CountdownRegistry {
    pub fn new(store: Arc<dyn RoomStore>, tick_interval: Duration, max_retries: u32) -> Self {
        Self {
            store,
            tick_interval,
            max_retries,
            tickers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Starts the room's ticker. A previous ticker for the same room is
    /// aborted first; returns whether one existed.
    pub async fn claim(&self, room: &str) -> bool {
        let handle = tokio::spawn(run_ticker(
            self.store.clone(),
            room.to_string(),
            self.tick_interval,
            self.max_retries,
        ));

        let previous = self.tickers.lock().await.insert(room.to_string(), handle);
        let replaced = match previous {
            Some(old) => {
                old.abort();
                true
            }
            None => false,
        };
        info!("Countdown claimed for room {} (replaced: {})", room, replaced);
        replaced
    }

    /// Stops the room's ticker. Returns whether one was running.
    pub async fn release(&self, room: &str) -> bool {
        match self.tickers.lock().await.remove(room) {
            Some(handle) => {
                handle.abort();
                info!("Countdown released for room {}", room);
                true
            }
            None => false,
        }
    }

    pub async fn release_all(&self) {
        let mut tickers = self.tickers.lock().await;
        for (room, handle) in tickers.drain() {
            debug!("Stopping countdown for room {}", room);
            handle.abort();
        }
    }

    pub async fn is_running(&self, room: &str) -> bool {
        self.tickers
            .lock()
            .await
            .get(room)
            .is_some_and(|handle| !handle.is_finished())
    }
}

async fn run_ticker(store: Arc<dyn RoomStore>, room: String, every: Duration, max_retries: u32) {
    let mut interval = time::interval_at(Instant::now() + every, every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let result = transact(store.as_ref(), &room, max_retries, |state| {
            state.apply(&Command::Tick, &[], &mut rand::thread_rng())
        })
        .await;

        match result {
            Ok((true, state)) => {
                debug!("Room {} tick: {}s left", room, state.time_left);
                if state.state != RoomStatus::Playing {
                    info!("Room {} round ended by countdown", room);
                }
            }
            Ok((false, _)) => {}
            Err(e) => warn!("Room {} tick failed: {}", room, e),
        }
    }
}
