use anyhow::Result;

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    rules,
    world::SimulationState,
};

/// Turns sustained water contamination into house infection.
pub struct ExposureSystem {
    infection_delay_ms: f64,
}

impl ExposureSystem {
    pub fn new(infection_delay_ms: f64) -> Self {
        Self { infection_delay_ms }
    }
}

impl Default for ExposureSystem {
    fn default() -> Self {
        Self::new(rules::DEFAULT_INFECTION_DELAY_MS)
    }
}

impl System for ExposureSystem {
    fn name(&self) -> &str {
        "exposure"
    }

    fn run(
        &mut self,
        ctx: &mut SystemContext,
        state: &mut SimulationState,
        _rng: &mut SystemRng,
    ) -> Result<()> {
        let events = rules::accumulate_exposure(state, ctx.delta_ms, self.infection_delay_ms);
        ctx.events.extend(events);
        Ok(())
    }
}
