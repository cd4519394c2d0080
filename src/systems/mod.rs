mod exposure;
mod movement;
mod schedule;

use serde::{Deserialize, Serialize};

pub use exposure::ExposureSystem;
pub use movement::{step_agent, toggle_target, MovementSystem, Step};
pub use schedule::{
    assign_bathroom_hours, scheduled_target, BathroomHours, ScheduleSystem, ScheduleTable,
    ScheduleWindow,
};

/// How agents pick their next destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItineraryMode {
    /// Shuttle between house and house water, retargeting on arrival.
    #[default]
    Toggle,
    /// Follow the hourly timetable.
    Schedule,
}
