use anyhow::Result;

use crate::{
    engine::{System, SystemContext},
    location::{Location, Point},
    rng::SystemRng,
    rules::{self, RuleEvent},
    world::{AgentId, SimulationState},
};

use super::ItineraryMode;

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Inactive, immobile, or already standing at its target.
    Idle,
    Moved,
    Arrived {
        location: Location,
        events: Vec<RuleEvent>,
    },
}

/// Next leg for the house/water shuttle.
pub fn toggle_target(arrived: Location) -> Location {
    match arrived {
        Location::House => Location::HouseWater,
        _ => Location::House,
    }
}

fn target_point(state: &SimulationState, id: AgentId) -> Option<Point> {
    let agent = state.agent(id)?;
    let point = state
        .resolve(agent, agent.target_location)
        .unwrap_or_else(|| {
            tracing::warn!(
                agent = %id,
                location = %agent.target_location,
                "location has no coordinates in this layout; using home"
            );
            agent.home
        });
    Some(point)
}

/// Advances one agent by one tick.
pub fn step_agent(state: &mut SimulationState, id: AgentId, mode: ItineraryMode) -> Step {
    let Some(target) = target_point(state, id) else {
        return Step::Idle;
    };
    let Some(agent) = state.agent_mut(id) else {
        return Step::Idle;
    };
    if !agent.is_active || !agent.is_mobile {
        return Step::Idle;
    }
    if agent.current_location == agent.target_location && agent.position == target {
        if mode == ItineraryMode::Toggle {
            agent.target_location = toggle_target(agent.current_location);
        }
        return Step::Idle;
    }

    let distance = agent.position.distance_to(target);
    if distance >= agent.speed {
        let dx = (target.x - agent.position.x) / distance;
        let dy = (target.y - agent.position.y) / distance;
        agent.position = agent.position.offset(dx * agent.speed, dy * agent.speed);
        return Step::Moved;
    }

    agent.position = target;
    agent.current_location = agent.target_location;
    let arrived = agent.current_location;
    let events = rules::on_arrival(state, id, arrived);

    if let Some(agent) = state.agent_mut(id) {
        match mode {
            ItineraryMode::Toggle => agent.target_location = toggle_target(arrived),
            ItineraryMode::Schedule => {
                if agent.traveling_to_bathroom {
                    agent.traveling_to_bathroom = false;
                    agent.bathroom.mark_visited(arrived);
                }
            }
        }
    }
    Step::Arrived {
        location: arrived,
        events,
    }
}

pub struct MovementSystem {
    mode: ItineraryMode,
}

impl MovementSystem {
    pub fn new(mode: ItineraryMode) -> Self {
        Self { mode }
    }
}

impl System for MovementSystem {
    fn name(&self) -> &str {
        "movement"
    }

    fn run(
        &mut self,
        ctx: &mut SystemContext,
        state: &mut SimulationState,
        _rng: &mut SystemRng,
    ) -> Result<()> {
        for index in 0..state.agents.len() {
            if let Step::Arrived { events, .. } = step_agent(state, AgentId(index), self.mode) {
                ctx.arrivals += 1;
                ctx.events.extend(events);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        time::{DayCounting, TimeManager},
        world::AgentSpawn,
    };

    fn shuttle(speed: f64, water: Point) -> (SimulationState, AgentId) {
        let mut state = SimulationState::new(TimeManager::new(1.0, 0.0, DayCounting::Floor));
        let village = state.spawn_community("village", None, None).unwrap();
        let house = state.spawn_house(village, Point::new(0.0, 0.0), water);
        let id = state
            .spawn_agent(
                house,
                AgentSpawn {
                    speed,
                    start_at: Location::HouseWater,
                    ..AgentSpawn::default()
                },
            )
            .unwrap();
        (state, id)
    }

    #[test]
    fn reaches_target_in_ceil_distance_over_speed_ticks() {
        let (mut state, id) = shuttle(1.5, Point::new(100.0, 0.0));
        let mut ticks = 0;
        loop {
            ticks += 1;
            let step = step_agent(&mut state, id, ItineraryMode::Toggle);
            if let Step::Arrived { location, .. } = step {
                assert_eq!(location, Location::HouseWater);
                break;
            }
            assert!(ticks < 1_000, "agent never arrived");
        }
        assert_eq!(ticks, 67);
        assert_eq!(state.agent(id).unwrap().position, Point::new(100.0, 0.0));
    }

    #[test]
    fn never_overshoots_on_a_diagonal() {
        let water = Point::new(30.0, 40.0);
        let (mut state, id) = shuttle(7.0, water);
        let mut last = state.agent(id).unwrap().position.distance_to(water);
        loop {
            let step = step_agent(&mut state, id, ItineraryMode::Toggle);
            let position = state.agent(id).unwrap().position;
            let remaining = position.distance_to(water);
            assert!(remaining <= last + 1e-9);
            assert!(position.x <= water.x + 1e-9 && position.y <= water.y + 1e-9);
            last = remaining;
            if matches!(step, Step::Arrived { .. }) {
                assert_eq!(position, water);
                break;
            }
        }
    }

    #[test]
    fn toggle_mode_shuttles_back_home() {
        let (mut state, id) = shuttle(10.0, Point::new(5.0, 0.0));
        assert!(matches!(
            step_agent(&mut state, id, ItineraryMode::Toggle),
            Step::Arrived { location: Location::HouseWater, .. }
        ));
        assert_eq!(state.agent(id).unwrap().target_location, Location::House);
        assert!(matches!(
            step_agent(&mut state, id, ItineraryMode::Toggle),
            Step::Arrived { location: Location::House, .. }
        ));
        assert_eq!(state.agent(id).unwrap().target_location, Location::HouseWater);
    }

    #[test]
    fn parked_toggle_agent_sets_off_again() {
        let (mut state, id) = shuttle(10.0, Point::new(50.0, 0.0));
        state.agent_mut(id).unwrap().target_location = Location::House;
        assert_eq!(step_agent(&mut state, id, ItineraryMode::Toggle), Step::Idle);
        assert_eq!(state.agent(id).unwrap().target_location, Location::HouseWater);
        assert_eq!(step_agent(&mut state, id, ItineraryMode::Toggle), Step::Moved);
    }

    #[test]
    fn parked_scheduled_agent_fires_no_repeat_arrivals() {
        let (mut state, id) = shuttle(10.0, Point::new(5.0, 0.0));
        assert!(matches!(
            step_agent(&mut state, id, ItineraryMode::Schedule),
            Step::Arrived { .. }
        ));
        for _ in 0..5 {
            assert_eq!(step_agent(&mut state, id, ItineraryMode::Schedule), Step::Idle);
        }
    }

    #[test]
    fn inactive_and_immobile_agents_stay_put() {
        let (mut state, id) = shuttle(2.0, Point::new(40.0, 0.0));
        let start = state.agent(id).unwrap().position;

        state.agent_mut(id).unwrap().is_mobile = false;
        for _ in 0..10 {
            assert_eq!(step_agent(&mut state, id, ItineraryMode::Toggle), Step::Idle);
        }
        assert_eq!(state.agent(id).unwrap().position, start);

        let agent = state.agent_mut(id).unwrap();
        agent.is_mobile = true;
        agent.is_active = false;
        for _ in 0..10 {
            assert_eq!(step_agent(&mut state, id, ItineraryMode::Toggle), Step::Idle);
        }
        assert_eq!(state.agent(id).unwrap().position, start);
    }

    #[test]
    fn unresolvable_target_falls_back_home() {
        let (mut state, id) = shuttle(10.0, Point::new(50.0, 0.0));
        let agent = state.agent_mut(id).unwrap();
        agent.position = Point::new(3.0, 4.0);
        agent.target_location = Location::School;
        assert!(matches!(
            step_agent(&mut state, id, ItineraryMode::Schedule),
            Step::Arrived { location: Location::School, .. }
        ));
        assert_eq!(state.agent(id).unwrap().position, Point::new(0.0, 0.0));
    }

    #[test]
    fn bathroom_arrival_clears_the_trip() {
        let (mut state, id) = shuttle(10.0, Point::new(5.0, 0.0));
        state.agent_mut(id).unwrap().traveling_to_bathroom = true;
        step_agent(&mut state, id, ItineraryMode::Schedule);
        let agent = state.agent(id).unwrap();
        assert!(!agent.traveling_to_bathroom);
        assert!(agent.bathroom.visited_house);
        assert!(!agent.bathroom.visited_school);
    }
}
