use anyhow::Result;
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

use crate::{
    engine::{System, SystemContext},
    location::Location,
    rng::SystemRng,
    world::{Agent, BathroomPlan, SimulationState},
};

use super::ItineraryMode;

/// Half-open hour window `[from, to)`. A window with `from > to` wraps past
/// midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    pub from: u32,
    pub to: u32,
    pub location: Location,
}

impl ScheduleWindow {
    pub fn new(from: u32, to: u32, location: Location) -> Self {
        Self { from, to, location }
    }

    pub fn contains(&self, hour: u32) -> bool {
        if self.from <= self.to {
            (self.from..self.to).contains(&hour)
        } else {
            hour >= self.from || hour < self.to
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScheduleTable {
    pub windows: Vec<ScheduleWindow>,
}

impl ScheduleTable {
    pub fn new(windows: Vec<ScheduleWindow>) -> Self {
        Self { windows }
    }

    /// School from 8 to 17, home otherwise.
    pub fn school_day() -> Self {
        Self::new(vec![ScheduleWindow::new(8, 17, Location::School)])
    }

    /// First matching window wins; uncovered hours mean home.
    pub fn location_at(&self, hour: u32) -> Location {
        self.windows
            .iter()
            .find(|window| window.contains(hour))
            .map(|window| window.location)
            .unwrap_or(Location::House)
    }
}

/// Candidate hours a bathroom visit can be drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BathroomHours {
    #[serde(default = "default_house_hours")]
    pub house: Vec<u32>,
    #[serde(default = "default_school_hours")]
    pub school: Vec<u32>,
}

fn default_house_hours() -> Vec<u32> {
    vec![6, 7, 18, 19, 20, 21]
}

fn default_school_hours() -> Vec<u32> {
    vec![9, 10, 11, 13, 14, 15, 16]
}

impl Default for BathroomHours {
    fn default() -> Self {
        Self {
            house: default_house_hours(),
            school: default_school_hours(),
        }
    }
}

/// Draws fresh bathroom hours when `day` differs from the plan's day.
/// Returns whether a draw happened.
pub fn assign_bathroom_hours<R: Rng + ?Sized>(
    plan: &mut BathroomPlan,
    day: u64,
    hours: &BathroomHours,
    rng: &mut R,
) -> bool {
    if plan.day == Some(day) {
        return false;
    }
    *plan = BathroomPlan {
        day: Some(day),
        house_hour: hours.house.choose(rng).copied(),
        school_hour: hours.school.choose(rng).copied(),
        visited_house: false,
        visited_school: false,
    };
    true
}

/// Where an active agent following the timetable should head at `hour`, and
/// whether that trip is a bathroom visit.
pub fn scheduled_target(
    agent: &Agent,
    hour: u32,
    table: &ScheduleTable,
    bathrooms: bool,
) -> (Location, bool) {
    if agent.traveling_to_bathroom {
        return (agent.target_location, true);
    }
    let base = match table.location_at(hour) {
        Location::VisitOtherCommunity if agent.target_community.is_none() => Location::House,
        location => location,
    };
    if bathrooms {
        let plan = &agent.bathroom;
        match base {
            Location::House if plan.house_hour == Some(hour) && !plan.visited_house => {
                return (Location::HouseWater, true);
            }
            Location::School if plan.school_hour == Some(hour) && !plan.visited_school => {
                return (Location::SchoolWater, true);
            }
            _ => {}
        }
    }
    (base, false)
}

pub struct ScheduleSystem {
    mode: ItineraryMode,
    table: ScheduleTable,
    bathrooms: Option<BathroomHours>,
}

impl ScheduleSystem {
    pub fn new(mode: ItineraryMode, table: ScheduleTable, bathrooms: Option<BathroomHours>) -> Self {
        Self {
            mode,
            table,
            bathrooms,
        }
    }
}

impl System for ScheduleSystem {
    fn name(&self) -> &str {
        "schedule"
    }

    fn run(
        &mut self,
        ctx: &mut SystemContext,
        state: &mut SimulationState,
        rng: &mut SystemRng,
    ) -> Result<()> {
        for agent in state.agents.iter_mut() {
            if let Some(hours) = &self.bathrooms {
                if assign_bathroom_hours(&mut agent.bathroom, ctx.day, hours, rng) {
                    tracing::trace!(
                        agent = %agent.id,
                        day = ctx.day,
                        house_hour = ?agent.bathroom.house_hour,
                        school_hour = ?agent.bathroom.school_hour,
                        "bathroom hours drawn"
                    );
                }
            }

            if !agent.is_active {
                agent.target_location = Location::House;
                agent.traveling_to_bathroom = false;
                continue;
            }
            if self.mode == ItineraryMode::Toggle {
                continue;
            }

            let (target, bathroom) =
                scheduled_target(agent, ctx.hour, &self.table, self.bathrooms.is_some());
            if target != agent.target_location {
                tracing::trace!(agent = %agent.id, from = %agent.target_location, to = %target, "retarget");
                agent.target_location = target;
            }
            agent.traveling_to_bathroom = bathroom;
        }
        Ok(())
    }
}
