use anyhow::Result;

use crate::{
    error::SimError,
    rng::{RngStreams, SystemRng},
    rules::RuleEvent,
    series::InfectionSeries,
    world::SimulationState,
};

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn build(self) -> Engine {
        let rng = RngStreams::new(self.settings.seed);
        tracing::info!(
            scenario = %self.settings.scenario_name,
            seed = rng.seed(),
            systems = self.systems.len(),
            "engine built"
        );
        Engine {
            rng,
            systems: self.systems,
            series: InfectionSeries::new(),
            settings: self.settings,
        }
    }
}

pub struct Engine {
    rng: RngStreams,
    systems: Vec<Box<dyn System>>,
    series: InfectionSeries,
    settings: EngineSettings,
}

impl Engine {
    /// Advances `state` by one frame of `delta_ms` real milliseconds.
    /// The clock never runs backwards: negative or non-finite deltas are
    /// rejected before anything changes.
    pub fn tick(&mut self, state: &mut SimulationState, delta_ms: f64) -> Result<TickSummary> {
        if !(delta_ms.is_finite() && delta_ms >= 0.0) {
            return Err(SimError::InvalidDelta(delta_ms).into());
        }
        state.advance(delta_ms);
        let mut ctx = SystemContext {
            tick: state.tick(),
            delta_ms,
            hour: state.time().current_hour(),
            day: state.time().current_day(),
            scenario_name: &self.settings.scenario_name,
            arrivals: 0,
            events: Vec::new(),
        };
        for system in &mut self.systems {
            let rng = self.rng.for_system(system.name());
            system.run(&mut ctx, state, rng)?;
        }
        self.series.record(state);

        Ok(TickSummary {
            tick: ctx.tick,
            day: ctx.day,
            hour: ctx.hour,
            arrivals: ctx.arrivals,
            events: ctx.events,
        })
    }

    pub fn run(&mut self, state: &mut SimulationState, ticks: u64, delta_ms: f64) -> Result<()> {
        self.run_with_hook(state, ticks, delta_ms, |_, _| {})
    }

    pub fn run_with_hook<F>(
        &mut self,
        state: &mut SimulationState,
        ticks: u64,
        delta_ms: f64,
        mut hook: F,
    ) -> Result<()>
    where
        F: FnMut(&TickSummary, &SimulationState),
    {
        for _ in 0..ticks {
            let summary = self.tick(state, delta_ms)?;
            hook(&summary, state);
        }
        Ok(())
    }

    /// Rewinds the RNG streams and forgets the recorded series.
    pub fn reset(&mut self) {
        self.rng.rewind();
        self.series.clear();
    }

    pub fn series(&self) -> &InfectionSeries {
        &self.series
    }

    pub fn scenario_name(&self) -> &str {
        &self.settings.scenario_name
    }

    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|system| system.name()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickSummary {
    pub tick: u64,
    pub day: u64,
    pub hour: u32,
    pub arrivals: usize,
    pub events: Vec<RuleEvent>,
}

pub struct SystemContext<'a> {
    pub tick: u64,
    pub delta_ms: f64,
    pub hour: u32,
    pub day: u64,
    pub scenario_name: &'a str,
    pub arrivals: usize,
    pub events: Vec<RuleEvent>,
}

pub trait System {
    fn name(&self) -> &str;
    fn run(
        &mut self,
        ctx: &mut SystemContext,
        state: &mut SimulationState,
        rng: &mut SystemRng,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{DayCounting, TimeManager};

    struct Counter;

    impl System for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn run(
            &mut self,
            ctx: &mut SystemContext,
            _state: &mut SimulationState,
            _rng: &mut SystemRng,
        ) -> Result<()> {
            ctx.arrivals += ctx.hour as usize;
            Ok(())
        }
    }

    fn settings() -> EngineSettings {
        EngineSettings {
            scenario_name: "test".into(),
            seed: 1,
        }
    }

    #[test]
    fn tick_advances_time_before_systems() {
        let mut state = SimulationState::new(TimeManager::new(1.0, 8.0, DayCounting::Floor));
        let mut engine = EngineBuilder::new(settings())
            .with_system(Counter)
            .build();

        let summary = engine.tick(&mut state, 1000.0).unwrap();
        assert_eq!(summary.tick, 1);
        assert_eq!(summary.hour, 9);
        assert_eq!(summary.arrivals, 9);
        assert_eq!(state.tick(), 1);
        assert_eq!(engine.system_names(), vec!["counter"]);
    }

    #[test]
    fn hook_sees_every_tick() {
        let mut state = SimulationState::new(TimeManager::new(1.0, 0.0, DayCounting::Floor));
        let mut engine = EngineBuilder::new(settings()).build();
        let mut ticks = Vec::new();
        engine
            .run_with_hook(&mut state, 6, 16.0, |summary, _| ticks.push(summary.tick))
            .unwrap();
        assert_eq!(ticks, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(engine.series().samples().len(), 1);
    }

    #[test]
    fn bad_deltas_leave_state_untouched() {
        let mut state = SimulationState::new(TimeManager::new(1.0, 6.0, DayCounting::Floor));
        let mut engine = EngineBuilder::new(settings()).with_system(Counter).build();
        engine.tick(&mut state, 16.0).unwrap();
        let before = state.clone();

        for delta in [f64::NAN, f64::INFINITY, -5_000.0] {
            let err = engine.tick(&mut state, delta).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<SimError>(),
                Some(SimError::InvalidDelta(_))
            ));
        }
        assert_eq!(state, before);
        assert!(engine.tick(&mut state, 0.0).is_ok());
        assert_eq!(state.tick(), 2);
    }

    #[test]
    fn reset_clears_series() {
        let mut state = SimulationState::new(TimeManager::new(1.0, 0.0, DayCounting::Floor));
        let mut engine = EngineBuilder::new(settings()).build();
        engine.run(&mut state, 3, 1000.0).unwrap();
        assert_eq!(engine.series().samples().len(), 3);
        engine.reset();
        assert!(engine.series().samples().is_empty());
    }
}
