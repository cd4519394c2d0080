pub mod controller;
pub mod engine;
pub mod error;
pub mod frame;
pub mod location;
pub mod rng;
pub mod rules;
pub mod scenario;
pub mod series;
pub mod systems;
pub mod time;
pub mod world;

pub use controller::{RunState, SimulationController};
pub use engine::{Engine, EngineBuilder, EngineSettings, TickSummary};
pub use error::{SimError, SimResult};
pub use location::{Location, Point};
pub use scenario::{Scenario, ScenarioLoader, Variant};
pub use world::SimulationState;
