//! Aggregate simulation metrics

use serde::{Deserialize, Serialize};

use super::vehicle::SimVehicle;

/// Counters and averages recomputed at the end of every tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationMetrics {
    /// Vehicles ever spawned
    pub total_vehicles: usize,
    /// Vehicles culled after leaving the world
    pub vehicles_exited: usize,
    /// Live vehicles
    pub vehicle_count: usize,
    /// Final wait times of exited vehicles, summed
    pub total_wait_time: f32,
    /// Mean wait over live vehicles, 0 when there are none
    pub average_wait_time: f32,
    pub throughput_per_minute: f32,
}

impl SimulationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_spawn(&mut self) {
        self.total_vehicles += 1;
    }

    pub fn record_exit(&mut self, final_wait: f32) {
        self.vehicles_exited += 1;
        self.total_wait_time += final_wait;
    }

    /// Recompute the derived fields from the live set
    pub fn recompute<'a>(
        &mut self,
        live: impl IntoIterator<Item = &'a SimVehicle>,
        elapsed_secs: f32,
    ) {
        let (count, wait) = live
            .into_iter()
            .fold((0usize, 0.0f32), |(count, wait), vehicle| {
                (count + 1, wait + vehicle.wait_time)
            });
        self.vehicle_count = count;
        self.average_wait_time = if count == 0 { 0.0 } else { wait / count as f32 };
        self.throughput_per_minute = if elapsed_secs > 0.0 {
            self.vehicles_exited as f32 / (elapsed_secs / 60.0)
        } else {
            0.0
        };
    }

    /// Every spawned vehicle is either live or has exited
    pub fn is_consistent(&self) -> bool {
        self.vehicle_count + self.vehicles_exited == self.total_vehicles
    }
}
