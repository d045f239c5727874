//! Market price oracle.
//!
//! Production pushes the price down (more supply), purchases push it up
//! (more demand). The price is clamped to the configured band and the most
//! recent points are kept for charting.

use crate::config::OracleConfig;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// One observed market price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub time: DateTime<Utc>,
    pub price: f64,
}

struct PriceState {
    current: f64,
    history: VecDeque<PricePoint>,
}

/// Process-wide market price, shared behind an `Arc`.
///
/// One lock guards both the current price and the history, so readers never
/// see a price without its history entry.
pub struct PriceOracle {
    config: OracleConfig,
    state: Mutex<PriceState>,
}

impl PriceOracle {
    /// Create an oracle at `config.initial_price`, seeding the history with it.
    pub fn new(config: OracleConfig) -> Self {
        let current = config.initial_price.clamp(config.floor, config.ceiling);
        let mut history = VecDeque::with_capacity(config.history_len + 1);
        history.push_back(PricePoint {
            time: Utc::now(),
            price: current,
        });
        Self {
            config,
            state: Mutex::new(PriceState { current, history }),
        }
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// The latest price.
    pub fn current(&self) -> f64 {
        self.state.lock().current
    }

    /// Recent price points, oldest first.
    pub fn history(&self) -> Vec<PricePoint> {
        self.state.lock().history.iter().copied().collect()
    }

    /// Move the price by `volume * unit_adjustment`, up for demand and down
    /// for supply, and record the result. Returns the new price.
    ///
    /// Non-finite volumes leave the price where it is but are still recorded.
    pub fn update(&self, volume: f64, is_demand: bool) -> f64 {
        self.update_at(volume, is_demand, Utc::now())
    }

    /// Like [`PriceOracle::update`], but records the point at `time`.
    pub fn update_at(&self, volume: f64, is_demand: bool, time: DateTime<Utc>) -> f64 {
        let delta = if volume.is_finite() {
            volume * self.config.unit_adjustment
        } else {
            0.0
        };

        let mut state = self.state.lock();
        let moved = if is_demand {
            state.current + delta
        } else {
            state.current - delta
        };
        state.current = moved.clamp(self.config.floor, self.config.ceiling);

        let point = PricePoint {
            time,
            price: state.current,
        };
        state.history.push_back(point);
        while state.history.len() > self.config.history_len {
            state.history.pop_front();
        }

        debug!(volume, is_demand, price = state.current, "market price updated");
        state.current
    }
}

impl Default for PriceOracle {
    fn default() -> Self {
        Self::new(OracleConfig::default())
    }
}
