use std::{
    collections::HashMap,
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    engine::{Engine, EngineBuilder, EngineSettings},
    error::{SimError, SimResult},
    location::{Location, Point},
    rules::DEFAULT_INFECTION_DELAY_MS,
    systems::{
        BathroomHours, ExposureSystem, ItineraryMode, MovementSystem, ScheduleSystem,
        ScheduleTable, ScheduleWindow,
    },
    time::{DayCounting, TimeManager},
    world::{AgentSpawn, SimulationState},
};

fn default_seed() -> u64 {
    7
}

fn default_frame_ms() -> f64 {
    16.0
}

fn default_time_scale() -> f64 {
    1.0
}

fn default_start_hour() -> f64 {
    6.0
}

fn default_infection_delay() -> f64 {
    DEFAULT_INFECTION_DELAY_MS
}

fn default_threshold() -> u32 {
    3
}

fn default_speed() -> f64 {
    1.5
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Real milliseconds per frame when the scenario is run headless.
    #[serde(default = "default_frame_ms")]
    pub frame_ms: f64,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default)]
    pub time: TimeConfig,
    #[serde(default)]
    pub rules: RuleConfig,
    #[serde(default)]
    pub itinerary: ItineraryMode,
    /// Hour windows for `schedule` itineraries. Empty means school 8 to 17.
    #[serde(default)]
    pub schedule: Vec<ScheduleWindow>,
    #[serde(default)]
    pub bathrooms: Option<BathroomHours>,
    pub communities: Vec<CommunityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeConfig {
    /// Simulated hours per real second.
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,
    #[serde(default = "default_start_hour")]
    pub start_hour: f64,
    #[serde(default)]
    pub day_counting: DayCounting,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            time_scale: default_time_scale(),
            start_hour: default_start_hour(),
            day_counting: DayCounting::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default = "default_infection_delay")]
    pub infection_delay_ms: f64,
    /// Infected arrivals needed to contaminate a shared water body.
    #[serde(default = "default_threshold")]
    pub shared_water_threshold: u32,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            infection_delay_ms: default_infection_delay(),
            shared_water_threshold: default_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityConfig {
    pub name: String,
    #[serde(default)]
    pub school: Option<Point>,
    #[serde(default)]
    pub school_water: Option<Point>,
    /// Overrides `rules.shared_water_threshold` for this community.
    #[serde(default)]
    pub water_threshold: Option<u32>,
    pub houses: Vec<HouseConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseConfig {
    pub position: Point,
    pub water: Point,
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default)]
    pub infected: bool,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_true")]
    pub mobile: bool,
    #[serde(default)]
    pub tested: bool,
    #[serde(default)]
    pub vaccinated: bool,
    /// Location label of the first destination.
    #[serde(default)]
    pub start_at: Option<String>,
    /// Name of the community this agent visits in travel windows.
    #[serde(default)]
    pub travels_to: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            infected: false,
            active: true,
            mobile: true,
            tested: false,
            vaccinated: false,
            start_at: None,
            travels_to: None,
        }
    }
}

fn check_hour(value: u32, what: &str) -> SimResult<()> {
    if value > 23 {
        return Err(SimError::invalid(format!(
            "{what} hour {value} is outside 0..=23"
        )));
    }
    Ok(())
}

impl Scenario {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.frame_ms.is_finite() && self.frame_ms > 0.0) {
            return Err(SimError::invalid("frame_ms must be greater than zero"));
        }
        if !(self.time.time_scale.is_finite() && self.time.time_scale > 0.0) {
            return Err(SimError::invalid("time_scale must be greater than zero"));
        }
        if !(0.0..24.0).contains(&self.time.start_hour) {
            return Err(SimError::invalid("start_hour must be within 0..24"));
        }
        if !(self.rules.infection_delay_ms.is_finite() && self.rules.infection_delay_ms > 0.0) {
            return Err(SimError::invalid(
                "infection_delay_ms must be greater than zero",
            ));
        }
        if self.rules.shared_water_threshold == 0 {
            return Err(SimError::invalid(
                "shared_water_threshold must be at least 1",
            ));
        }
        for window in &self.schedule {
            check_hour(window.from, "schedule window start")?;
            check_hour(window.to, "schedule window end")?;
            if window.from == window.to {
                return Err(SimError::invalid(format!(
                    "schedule window {}..{} is empty",
                    window.from, window.to
                )));
            }
        }
        if let Some(hours) = &self.bathrooms {
            if hours.house.is_empty() || hours.school.is_empty() {
                return Err(SimError::invalid(
                    "bathroom candidate hours must not be empty",
                ));
            }
            for hour in hours.house.iter().chain(&hours.school) {
                check_hour(*hour, "bathroom")?;
            }
        }

        if self.communities.is_empty() {
            return Err(SimError::invalid(
                "scenario must define at least one community",
            ));
        }
        let mut names = Vec::new();
        for community in &self.communities {
            if names.contains(&community.name.as_str()) {
                return Err(SimError::invalid(format!(
                    "community '{}' defined more than once",
                    community.name
                )));
            }
            names.push(community.name.as_str());
        }

        let schedule_mode = self.itinerary == ItineraryMode::Schedule;
        let mut houses = 0;
        for community in &self.communities {
            if community.water_threshold == Some(0) {
                return Err(SimError::invalid(format!(
                    "community '{}' water_threshold must be at least 1",
                    community.name
                )));
            }
            if schedule_mode && community.school.is_none() {
                return Err(SimError::invalid(format!(
                    "community '{}' needs a school for a scheduled itinerary",
                    community.name
                )));
            }
            for house in &community.houses {
                houses += 1;
                for agent in &house.agents {
                    if !(agent.speed.is_finite() && agent.speed > 0.0) {
                        return Err(SimError::invalid(format!(
                            "agent speed {} in community '{}' must be greater than zero",
                            agent.speed, community.name
                        )));
                    }
                    if let Some(target) = &agent.travels_to {
                        if target == &community.name {
                            return Err(SimError::invalid(format!(
                                "agent in '{}' cannot travel to its own community",
                                community.name
                            )));
                        }
                        let known = self
                            .communities
                            .iter()
                            .find(|c| &c.name == target)
                            .ok_or_else(|| {
                                SimError::invalid(format!(
                                    "agent travels to unknown community '{target}'"
                                ))
                            })?;
                        if known.school_water.is_none() {
                            return Err(SimError::invalid(format!(
                                "community '{target}' has no shared water to visit"
                            )));
                        }
                    }
                }
            }
        }
        if houses == 0 {
            return Err(SimError::invalid("scenario must define at least one house"));
        }
        Ok(())
    }

    pub fn total_agents(&self) -> usize {
        self.communities
            .iter()
            .flat_map(|c| &c.houses)
            .map(|h| h.agents.len())
            .sum()
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or(3_600)
    }

    pub fn schedule_table(&self) -> ScheduleTable {
        if self.schedule.is_empty() {
            ScheduleTable::school_day()
        } else {
            ScheduleTable::new(self.schedule.clone())
        }
    }

    pub fn build_state(&self) -> SimResult<SimulationState> {
        self.validate()?;
        let time = TimeManager::new(
            self.time.time_scale,
            self.time.start_hour,
            self.time.day_counting,
        );
        let mut state = SimulationState::new(time);

        let mut ids = HashMap::new();
        for community in &self.communities {
            let threshold = community
                .water_threshold
                .unwrap_or(self.rules.shared_water_threshold);
            let id = state.spawn_community(
                community.name.clone(),
                community.school,
                community.school_water.map(|p| (p, threshold)),
            )?;
            ids.insert(community.name.as_str(), id);
        }

        let first_leg = match self.itinerary {
            ItineraryMode::Toggle => Location::HouseWater,
            ItineraryMode::Schedule => Location::House,
        };
        for community in &self.communities {
            let community_id = ids[community.name.as_str()];
            for house in &community.houses {
                let house_id = state.spawn_house(community_id, house.position, house.water);
                for agent in &house.agents {
                    let start_at = agent
                        .start_at
                        .as_deref()
                        .map(Location::from_label_or_home)
                        .unwrap_or(first_leg);
                    state.spawn_agent(
                        house_id,
                        AgentSpawn {
                            speed: agent.speed,
                            infected: agent.infected,
                            active: agent.active,
                            mobile: agent.mobile,
                            tested: agent.tested,
                            vaccinated: agent.vaccinated,
                            start_at,
                            target_community: agent
                                .travels_to
                                .as_deref()
                                .and_then(|name| ids.get(name).copied()),
                        },
                    )?;
                }
            }
        }
        Ok(state)
    }

    pub fn build_engine(&self) -> SimResult<Engine> {
        self.validate()?;
        let settings = EngineSettings {
            scenario_name: self.name.clone(),
            seed: self.seed,
        };
        Ok(EngineBuilder::new(settings)
            .with_system(ScheduleSystem::new(
                self.itinerary,
                self.schedule_table(),
                self.bathrooms.clone(),
            ))
            .with_system(MovementSystem::new(self.itinerary))
            .with_system(ExposureSystem::new(self.rules.infection_delay_ms))
            .build())
    }
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        scenario
            .validate()
            .with_context(|| format!("Invalid scenario {}", path.display()))?;
        Ok(scenario)
    }
}

/// The five built-in layouts, each adding one feature to the previous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// One agent shuttling between its house and its water.
    Sim1,
    /// A row of houses with a population slider.
    Sim2,
    /// Day/night timetable with a shared school water.
    Sim3,
    /// Randomly drawn bathroom visits at home and at school.
    Sim4,
    /// Two communities with visits between them.
    Sim5,
}

impl Variant {
    pub const ALL: [Variant; 5] = [
        Variant::Sim1,
        Variant::Sim2,
        Variant::Sim3,
        Variant::Sim4,
        Variant::Sim5,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Variant::Sim1 => "sim1",
            Variant::Sim2 => "sim2",
            Variant::Sim3 => "sim3",
            Variant::Sim4 => "sim4",
            Variant::Sim5 => "sim5",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL
            .into_iter()
            .find(|variant| variant.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SimError::invalid(format!("unknown variant '{s}'")))
    }
}

fn row_of_houses(count: usize, origin: Point, infected: &[usize], speed: f64) -> Vec<HouseConfig> {
    (0..count)
        .map(|i| {
            let position = origin.offset(110.0 * i as f64, 0.0);
            HouseConfig {
                position,
                water: position.offset(0.0, 140.0),
                agents: vec![AgentConfig {
                    speed,
                    infected: infected.contains(&i),
                    ..AgentConfig::default()
                }],
            }
        })
        .collect()
}

fn school_community(name: &str, origin: Point, infected: &[usize]) -> CommunityConfig {
    CommunityConfig {
        name: name.to_string(),
        school: Some(origin.offset(220.0, 300.0)),
        school_water: Some(origin.offset(290.0, 300.0)),
        water_threshold: None,
        houses: row_of_houses(5, origin, infected, 2.0),
    }
}

impl Scenario {
    pub fn preset(variant: Variant) -> Scenario {
        let base = Scenario {
            name: variant.name().to_string(),
            description: None,
            seed: default_seed(),
            frame_ms: default_frame_ms(),
            ticks: None,
            time: TimeConfig::default(),
            rules: RuleConfig::default(),
            itinerary: ItineraryMode::Toggle,
            schedule: Vec::new(),
            bathrooms: None,
            communities: Vec::new(),
        };
        match variant {
            Variant::Sim1 => Scenario {
                description: Some("one agent, one house, one water source".into()),
                communities: vec![CommunityConfig {
                    name: "village".into(),
                    school: None,
                    school_water: None,
                    water_threshold: None,
                    houses: vec![HouseConfig {
                        position: Point::new(120.0, 200.0),
                        water: Point::new(320.0, 200.0),
                        agents: vec![AgentConfig::default()],
                    }],
                }],
                ..base
            },
            Variant::Sim2 => Scenario {
                description: Some("several households, adjustable population".into()),
                communities: vec![CommunityConfig {
                    name: "village".into(),
                    school: None,
                    school_water: None,
                    water_threshold: None,
                    houses: row_of_houses(6, Point::new(80.0, 120.0), &[0], 1.5),
                }],
                ..base
            },
            Variant::Sim3 => Scenario {
                description: Some("school by day, home by night".into()),
                time: TimeConfig {
                    time_scale: 0.5,
                    start_hour: 6.0,
                    day_counting: DayCounting::Ceil,
                },
                itinerary: ItineraryMode::Schedule,
                schedule: vec![
                    ScheduleWindow::new(7, 8, Location::HouseWater),
                    ScheduleWindow::new(8, 12, Location::School),
                    ScheduleWindow::new(12, 13, Location::SchoolWater),
                    ScheduleWindow::new(13, 17, Location::School),
                ],
                communities: vec![school_community("village", Point::new(80.0, 120.0), &[0])],
                ..base
            },
            Variant::Sim4 => Scenario {
                description: Some("bathroom visits drawn once per day".into()),
                time: TimeConfig {
                    time_scale: 0.5,
                    start_hour: 6.0,
                    day_counting: DayCounting::Floor,
                },
                itinerary: ItineraryMode::Schedule,
                schedule: ScheduleTable::school_day().windows,
                bathrooms: Some(BathroomHours::default()),
                communities: vec![school_community("village", Point::new(80.0, 120.0), &[0])],
                ..base
            },
            Variant::Sim5 => {
                let mut north = school_community("north", Point::new(80.0, 60.0), &[0]);
                let mut south = school_community("south", Point::new(80.0, 460.0), &[]);
                north.houses[1].agents[0].travels_to = Some("south".into());
                south.houses[2].agents[0].travels_to = Some("north".into());
                Scenario {
                    description: Some("two communities visiting each other's water".into()),
                    time: TimeConfig {
                        time_scale: 0.5,
                        start_hour: 6.0,
                        day_counting: DayCounting::Floor,
                    },
                    itinerary: ItineraryMode::Schedule,
                    schedule: vec![
                        ScheduleWindow::new(8, 17, Location::School),
                        ScheduleWindow::new(17, 19, Location::VisitOtherCommunity),
                    ],
                    bathrooms: Some(BathroomHours::default()),
                    communities: vec![north, south],
                    ..base
                }
            }
        }
    }
}
