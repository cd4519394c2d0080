//! Contamination and infection transitions.
//!
//! Every transition here is one-way (clean to contaminated, healthy to
//! infected). Only an explicit reset or manual water toggle goes back.

use serde::Serialize;

use crate::{
    location::Location,
    world::{AgentId, HouseId, SimulationState, WaterBodyId, WaterKind},
};

pub const DEFAULT_INFECTION_DELAY_MS: f64 = 1500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum RuleEvent {
    AgentInfected { agent: AgentId, water: WaterBodyId },
    WaterContaminated { water: WaterBodyId, by: AgentId },
    HouseInfected { house: HouseId },
}

/// Applies the arrival rules for `agent` reaching `location`.
pub fn on_arrival(state: &mut SimulationState, agent: AgentId, location: Location) -> Vec<RuleEvent> {
    let mut events = Vec::new();
    let Some(visitor) = state.agent(agent) else {
        return events;
    };
    let Some(water_id) = state.water_for(visitor, location) else {
        return events;
    };
    let own_house = visitor.house;
    let visitor_infected = visitor.is_infected;

    let Some(water) = state.water_mut(water_id) else {
        return events;
    };
    if water.is_contaminated {
        if !visitor_infected {
            if let Some(visitor) = state.agent_mut(agent) {
                visitor.is_infected = true;
            }
            tracing::debug!(%agent, %water_id, "agent infected by contaminated water");
            events.push(RuleEvent::AgentInfected {
                agent,
                water: water_id,
            });
        }
        return events;
    }
    if !visitor_infected {
        return events;
    }

    match water.kind {
        WaterKind::Household(house) if house == own_house => {
            water.is_contaminated = true;
            water.exposure_ms = 0.0;
        }
        _ => {
            water.infected_visits += 1;
            if water.infected_visits < water.threshold {
                tracing::debug!(
                    %water_id,
                    visits = water.infected_visits,
                    threshold = water.threshold,
                    "infected visit recorded"
                );
                return events;
            }
            water.is_contaminated = true;
        }
    }
    tracing::debug!(%water_id, %agent, "water contaminated");
    events.push(RuleEvent::WaterContaminated {
        water: water_id,
        by: agent,
    });
    events
}

/// Accumulates exposure for houses whose water is contaminated and infects
/// them once `delay_ms` has elapsed.
pub fn accumulate_exposure(
    state: &mut SimulationState,
    delta_ms: f64,
    delay_ms: f64,
) -> Vec<RuleEvent> {
    let mut events = Vec::new();
    for house in state.houses.iter_mut().filter(|h| !h.is_infected) {
        let Some(water) = state.water_bodies.get_mut(house.water.raw()) else {
            continue;
        };
        if !water.is_contaminated {
            continue;
        }
        water.exposure_ms += delta_ms;
        if water.exposure_ms >= delay_ms {
            house.is_infected = true;
            tracing::debug!(house = %house.id, exposure_ms = water.exposure_ms, "house infected");
            events.push(RuleEvent::HouseInfected { house: house.id });
        }
    }
    events
}
