use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::routing::AVERAGE_SPEED_KMH;
use crate::geo::step_toward;
use crate::models::courier::{CourierLocation, GeoPoint};
use crate::models::route::RouteStatus;
use crate::state::AppState;

const JITTER_DEGREES: f64 = 0.0002;

/// Running movement simulation; dropping the handle leaves it running.
pub struct SimulationHandle {
    task: JoinHandle<()>,
}

impl SimulationHandle {
    pub fn stop(self) {
        self.task.abort();
    }
}

pub fn spawn_courier_simulation(state: Arc<AppState>, every: Duration) -> SimulationHandle {
    SimulationHandle {
        task: tokio::spawn(run_courier_simulation(state, every)),
    }
}

pub async fn run_courier_simulation(state: Arc<AppState>, every: Duration) {
    info!(interval_secs = every.as_secs_f64(), "courier simulation started");

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let moved = simulate_tick(&state, every);
        debug!(moved, "courier simulation tick");
    }
}

/// Moves every courier on an in-progress route toward its dropoff by the
/// distance covered at average speed in `elapsed`. Returns how many moved.
pub fn simulate_tick(state: &AppState, elapsed: Duration) -> usize {
    let legs: Vec<(Uuid, GeoPoint, GeoPoint)> = state
        .routes
        .iter()
        .filter(|entry| entry.status == RouteStatus::InProgress)
        .filter_map(|entry| {
            entry
                .courier_id
                .map(|courier_id| (courier_id, entry.pickup_location, entry.delivery_location))
        })
        .collect();

    let step_km = AVERAGE_SPEED_KMH * elapsed.as_secs_f64() / 3600.0;
    let mut rng = rand::thread_rng();
    let mut moved = 0;

    for (courier_id, pickup, dropoff) in legs {
        let Some(mut courier) = state.couriers.get_mut(&courier_id) else {
            continue;
        };

        let from = courier.location.map(|location| location.point).unwrap_or(pickup);
        let mut next = step_toward(&from, &dropoff, step_km);
        if next != dropoff {
            next.lat += rng.gen_range(-JITTER_DEGREES..=JITTER_DEGREES);
            next.lng += rng.gen_range(-JITTER_DEGREES..=JITTER_DEGREES);
        }

        let now = Utc::now();
        courier.location = Some(CourierLocation {
            point: next,
            timestamp: now,
            reported_at: now,
        });
        courier.updated_at = now;
        moved += 1;
    }

    moved
}
