//! Run/pause/reset lifecycle and the user-facing controls around one
//! simulation.

use anyhow::Result;

use crate::{
    engine::{Engine, TickSummary},
    error::{SimError, SimResult},
    frame::SceneFrame,
    location::Location,
    scenario::Scenario,
    series::InfectionSeries,
    world::{AgentId, SimulationState, WaterBodyId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Paused,
}

pub struct SimulationController {
    engine: Engine,
    initial: SimulationState,
    state: SimulationState,
    run_state: RunState,
    active_count: Option<usize>,
}

impl SimulationController {
    pub fn new(engine: Engine, state: SimulationState) -> SimResult<Self> {
        state.validate()?;
        Ok(Self {
            engine,
            initial: state.clone(),
            state,
            run_state: RunState::Idle,
            active_count: None,
        })
    }

    pub fn from_scenario(scenario: &Scenario) -> SimResult<Self> {
        let state = scenario.build_state()?;
        let engine = scenario.build_engine()?;
        Self::new(engine, state)
    }

    pub fn start(&mut self) {
        if self.run_state != RunState::Running {
            tracing::info!(scenario = %self.engine.scenario_name(), tick = self.state.tick(), "started");
            self.run_state = RunState::Running;
        }
    }

    pub fn pause(&mut self) {
        if self.run_state == RunState::Running {
            tracing::info!(tick = self.state.tick(), "paused");
            self.run_state = RunState::Paused;
        }
    }

    /// Restores the state the controller was built with and stops the loop.
    /// The population slider keeps its last setting.
    pub fn reset(&mut self) {
        self.state = self.initial.clone();
        self.engine.reset();
        self.run_state = RunState::Idle;
        if let Some(count) = self.active_count {
            self.apply_active_count(count);
        }
        tracing::info!(scenario = %self.engine.scenario_name(), "reset");
    }

    /// Advances one frame while running. Returns `None` when idle or paused.
    /// Deltas that are negative or not finite are rejected.
    pub fn tick(&mut self, delta_ms: f64) -> Result<Option<TickSummary>> {
        if self.run_state != RunState::Running {
            return Ok(None);
        }
        let summary = self.engine.tick(&mut self.state, delta_ms)?;
        Ok(Some(summary))
    }

    /// Activates the first `count` agents and parks the rest at home.
    /// Returns the number actually active.
    pub fn set_active_count(&mut self, count: usize) -> usize {
        self.active_count = Some(count);
        let active = self.apply_active_count(count);
        tracing::debug!(requested = count, active, "population slider moved");
        active
    }

    fn apply_active_count(&mut self, count: usize) -> usize {
        let active = count.min(self.state.agents.len());
        for (index, agent) in self.state.agents.iter_mut().enumerate() {
            agent.is_active = index < active;
            if !agent.is_active {
                agent.target_location = Location::House;
                agent.traveling_to_bathroom = false;
            }
        }
        active
    }

    /// Manual contamination switch. Clearing also forgets accumulated
    /// exposure and counted visits; infected houses stay infected.
    pub fn set_water_contamination(&mut self, id: WaterBodyId, contaminated: bool) -> SimResult<()> {
        let water = self
            .state
            .water_mut(id)
            .ok_or(SimError::UnknownWaterBody(id))?;
        if contaminated {
            if !water.is_contaminated {
                water.is_contaminated = true;
                water.exposure_ms = 0.0;
            }
        } else {
            water.clean();
        }
        tracing::info!(water = %id, contaminated, "water toggled");
        Ok(())
    }

    /// Cosmetic markers only; no rule reads them.
    pub fn set_agent_decorations(
        &mut self,
        id: AgentId,
        tested: bool,
        vaccinated: bool,
    ) -> SimResult<()> {
        let agent = self
            .state
            .agent_mut(id)
            .ok_or(SimError::UnknownAgent(id))?;
        agent.is_tested = tested;
        agent.is_vaccinated = vaccinated;
        Ok(())
    }

    pub fn frame(&self) -> SceneFrame {
        SceneFrame::capture(self.engine.scenario_name(), &self.state)
    }

    pub fn series(&self) -> &InfectionSeries {
        self.engine.series()
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::{EngineBuilder, EngineSettings},
        location::Point,
        scenario::Variant,
        time::{DayCounting, TimeManager},
        world::AgentSpawn,
    };

    fn controller(variant: Variant) -> SimulationController {
        SimulationController::from_scenario(&Scenario::preset(variant)).unwrap()
    }

    #[test]
    fn ticks_only_while_running() {
        let mut sim = controller(Variant::Sim1);
        assert_eq!(sim.run_state(), RunState::Idle);
        assert!(sim.tick(16.0).unwrap().is_none());
        assert_eq!(sim.state().tick(), 0);

        sim.start();
        assert_eq!(sim.tick(16.0).unwrap().unwrap().tick, 1);

        sim.pause();
        assert_eq!(sim.run_state(), RunState::Paused);
        assert!(sim.tick(16.0).unwrap().is_none());

        sim.start();
        assert_eq!(sim.tick(16.0).unwrap().unwrap().tick, 2);
    }

    #[test]
    fn pause_when_idle_stays_idle() {
        let mut sim = controller(Variant::Sim1);
        sim.pause();
        assert_eq!(sim.run_state(), RunState::Idle);
    }

    #[test]
    fn reset_restores_first_frame() {
        let mut sim = controller(Variant::Sim2);
        let first = sim.frame();
        sim.start();
        for _ in 0..200 {
            sim.tick(16.0).unwrap();
        }
        assert_ne!(sim.frame(), first);
        assert!(!sim.series().samples().is_empty());

        sim.reset();
        assert_eq!(sim.run_state(), RunState::Idle);
        assert_eq!(sim.frame(), first);
        assert!(sim.series().samples().is_empty());
    }

    #[test]
    fn slider_survives_reset() {
        let mut sim = controller(Variant::Sim2);
        sim.set_active_count(2);
        sim.start();
        for _ in 0..50 {
            sim.tick(16.0).unwrap();
        }
        sim.reset();
        assert_eq!(sim.state().active_agents(), 2);
        assert!(sim.state().agents()[2..].iter().all(|a| a.position == a.home));
    }

    #[test]
    fn rejects_bad_frame_deltas() {
        let mut sim = controller(Variant::Sim1);
        let water = sim.state().houses()[0].water;
        sim.set_water_contamination(water, true).unwrap();
        sim.start();
        sim.tick(16.0).unwrap();

        for delta in [f64::NAN, f64::NEG_INFINITY, -5_000.0] {
            let err = sim.tick(delta).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<SimError>(),
                Some(SimError::InvalidDelta(_))
            ));
        }
        assert_eq!(sim.state().tick(), 1);
        assert_eq!(sim.state().time().simulation_time(), 0.016);

        for _ in 0..93 {
            sim.tick(16.0).unwrap();
        }
        assert!(sim.state().houses()[0].is_infected);
    }

    #[test]
    fn hand_built_state_is_validated() {
        let mut state = SimulationState::new(TimeManager::new(1.0, 6.0, DayCounting::Floor));
        let village = state.spawn_community("village", None, None).unwrap();
        let house = state.spawn_house(village, Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        let agent = state.spawn_agent(house, AgentSpawn::default()).unwrap();
        let engine = || {
            EngineBuilder::new(EngineSettings {
                scenario_name: "hand".into(),
                seed: 1,
            })
            .build()
        };
        assert!(SimulationController::new(engine(), state.clone()).is_ok());

        state.agent_mut(agent).unwrap().speed = -1.5;
        assert!(matches!(
            SimulationController::new(engine(), state),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn slider_clamps_and_parks_agents() {
        let mut sim = controller(Variant::Sim2);
        assert_eq!(sim.set_active_count(100), 6);
        assert_eq!(sim.set_active_count(2), 2);
        assert_eq!(sim.state().active_agents(), 2);
        let parked = &sim.state().agents()[4];
        assert!(!parked.is_active);
        assert_eq!(parked.target_location, Location::House);
    }

    #[test]
    fn clearing_water_resets_counters() {
        let mut sim = controller(Variant::Sim3);
        let shared = sim.state().communities()[0].water.unwrap();
        sim.state.water_mut(shared).unwrap().infected_visits = 2;
        sim.set_water_contamination(shared, true).unwrap();
        assert!(sim.state().water(shared).unwrap().is_contaminated);

        sim.set_water_contamination(shared, false).unwrap();
        let water = sim.state().water(shared).unwrap();
        assert!(!water.is_contaminated);
        assert_eq!(water.infected_visits, 0);
        assert_eq!(water.exposure_ms, 0.0);
    }

    #[test]
    fn unknown_ids_are_reported() {
        let mut sim = controller(Variant::Sim1);
        assert_eq!(
            sim.set_water_contamination(WaterBodyId(40), true),
            Err(SimError::UnknownWaterBody(WaterBodyId(40)))
        );
        assert_eq!(
            sim.set_agent_decorations(AgentId(9), true, false),
            Err(SimError::UnknownAgent(AgentId(9)))
        );
    }

    #[test]
    fn decorations_show_in_frame() {
        let mut sim = controller(Variant::Sim1);
        sim.set_agent_decorations(AgentId(0), true, true).unwrap();
        let frame = sim.frame();
        assert!(frame.agents[0].tested);
        assert!(frame.agents[0].vaccinated);
        assert!(!frame.agents[0].infected);
    }
}
