//! Infection counts over simulated time, the data behind the line chart.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::world::SimulationState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfectionSample {
    pub tick: u64,
    pub day: u64,
    pub hour: u32,
    pub infected_agents: usize,
    pub infected_houses: usize,
    pub contaminated_water: usize,
}

impl InfectionSample {
    pub fn capture(state: &SimulationState) -> Self {
        Self {
            tick: state.tick(),
            day: state.time().current_day(),
            hour: state.time().current_hour(),
            infected_agents: state.infected_agents(),
            infected_houses: state.infected_houses(),
            contaminated_water: state.contaminated_water(),
        }
    }
}

/// One sample per simulated hour.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfectionSeries {
    samples: Vec<InfectionSample>,
}

impl InfectionSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `state` if the simulated hour moved since the last sample.
    pub fn record(&mut self, state: &SimulationState) -> bool {
        let sample = InfectionSample::capture(state);
        if let Some(last) = self.samples.last() {
            if last.day == sample.day && last.hour == sample.hour {
                return false;
            }
        }
        self.samples.push(sample);
        true
    }

    pub fn samples(&self) -> &[InfectionSample] {
        &self.samples
    }

    pub fn latest(&self) -> Option<&InfectionSample> {
        self.samples.last()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.samples).context("serialize infection series")
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write series to {}", path.display()))
    }
}
