//! Optional periodic reaping for servers whose clients rarely list

use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::debug;

use crate::domain::store::{Direction, Store};

pub fn spawn_sweeper(store: Arc<Store>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            sweep(&store).await;
        }
    })
}

pub async fn sweep(store: &Store) {
    for direction in Direction::ALL {
        let live = store.list_and_reap(direction).await.len();
        debug!(direction = direction.as_str(), live, "expiry sweep finished");
    }
}
