use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::{SimError, SimResult},
    location::{Location, Point},
    time::TimeManager,
};

macro_rules! entity_id {
    ($name:ident, $prefix:literal) => {
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub usize);

        impl $name {
            pub fn raw(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

entity_id!(AgentId, "agent");
entity_id!(HouseId, "house");
entity_id!(WaterBodyId, "water");
entity_id!(CommunityId, "community");

/// Bathroom hours drawn for one simulated day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BathroomPlan {
    pub day: Option<u64>,
    pub house_hour: Option<u32>,
    pub school_hour: Option<u32>,
    pub visited_house: bool,
    pub visited_school: bool,
}

impl BathroomPlan {
    pub fn mark_visited(&mut self, location: Location) {
        match location {
            Location::HouseWater => self.visited_house = true,
            Location::SchoolWater => self.visited_school = true,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub id: AgentId,
    pub community: CommunityId,
    pub house: HouseId,
    pub position: Point,
    pub home: Point,
    pub speed: f64,
    pub current_location: Location,
    pub target_location: Location,
    pub is_infected: bool,
    pub is_active: bool,
    pub is_mobile: bool,
    pub is_tested: bool,
    pub is_vaccinated: bool,
    pub bathroom: BathroomPlan,
    pub traveling_to_bathroom: bool,
    pub target_community: Option<CommunityId>,
}

impl Agent {
    pub fn is_moving(&self) -> bool {
        self.is_active && self.is_mobile && self.current_location != self.target_location
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterKind {
    Household(HouseId),
    Shared(CommunityId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaterBody {
    pub id: WaterBodyId,
    pub kind: WaterKind,
    pub position: Point,
    pub is_contaminated: bool,
    pub exposure_ms: f64,
    pub infected_visits: u32,
    pub threshold: u32,
}

impl WaterBody {
    /// Clears contamination and the counters that lead to it.
    pub fn clean(&mut self) {
        self.is_contaminated = false;
        self.exposure_ms = 0.0;
        self.infected_visits = 0;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct House {
    pub id: HouseId,
    pub community: CommunityId,
    pub position: Point,
    pub water: WaterBodyId,
    pub is_infected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Community {
    pub id: CommunityId,
    pub name: String,
    pub school: Option<Point>,
    pub water: Option<WaterBodyId>,
    pub houses: Vec<HouseId>,
}

pub struct AgentSpawn {
    pub speed: f64,
    pub infected: bool,
    pub active: bool,
    pub mobile: bool,
    pub tested: bool,
    pub vaccinated: bool,
    pub start_at: Location,
    pub target_community: Option<CommunityId>,
}

impl Default for AgentSpawn {
    fn default() -> Self {
        Self {
            speed: 1.5,
            infected: false,
            active: true,
            mobile: true,
            tested: false,
            vaccinated: false,
            start_at: Location::House,
            target_community: None,
        }
    }
}

fn check_speed(speed: f64) -> SimResult<()> {
    if speed.is_finite() && speed > 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid(format!(
            "agent speed {speed} must be finite and greater than zero"
        )))
    }
}

/// Everything a running simulation mutates, owned by one controller.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    pub(crate) agents: Vec<Agent>,
    pub(crate) houses: Vec<House>,
    pub(crate) water_bodies: Vec<WaterBody>,
    pub(crate) communities: Vec<Community>,
    pub(crate) time: TimeManager,
    tick: u64,
}

impl SimulationState {
    pub fn new(time: TimeManager) -> Self {
        Self {
            agents: Vec::new(),
            houses: Vec::new(),
            water_bodies: Vec::new(),
            communities: Vec::new(),
            time,
            tick: 0,
        }
    }

    pub fn spawn_community(
        &mut self,
        name: impl Into<String>,
        school: Option<Point>,
        school_water: Option<(Point, u32)>,
    ) -> SimResult<CommunityId> {
        let name = name.into();
        if let Some((_, 0)) = school_water {
            return Err(SimError::invalid(format!(
                "shared water of '{name}' needs a threshold of at least 1"
            )));
        }
        let id = CommunityId(self.communities.len());
        let water = school_water.map(|(position, threshold)| {
            self.spawn_water(WaterKind::Shared(id), position, threshold)
        });
        self.communities.push(Community {
            id,
            name,
            school,
            water,
            houses: Vec::new(),
        });
        Ok(id)
    }

    pub fn spawn_house(
        &mut self,
        community: CommunityId,
        position: Point,
        water_position: Point,
    ) -> HouseId {
        let id = HouseId(self.houses.len());
        let water = self.spawn_water(WaterKind::Household(id), water_position, 1);
        self.houses.push(House {
            id,
            community,
            position,
            water,
            is_infected: false,
        });
        if let Some(community) = self.communities.get_mut(community.0) {
            community.houses.push(id);
        }
        id
    }

    pub fn spawn_agent(&mut self, house: HouseId, spawn: AgentSpawn) -> SimResult<AgentId> {
        check_speed(spawn.speed)?;
        let id = AgentId(self.agents.len());
        let (home, community) = self
            .houses
            .get(house.0)
            .map(|h| (h.position, h.community))
            .ok_or(SimError::UnknownHouse(house))?;
        let mut agent = Agent {
            id,
            community,
            house,
            position: home,
            home,
            speed: spawn.speed,
            current_location: Location::House,
            target_location: spawn.start_at,
            is_infected: spawn.infected,
            is_active: spawn.active,
            is_mobile: spawn.mobile,
            is_tested: spawn.tested,
            is_vaccinated: spawn.vaccinated,
            bathroom: BathroomPlan::default(),
            traveling_to_bathroom: false,
            target_community: spawn.target_community,
        };
        if !agent.is_active {
            agent.target_location = Location::House;
        }
        self.agents.push(agent);
        Ok(id)
    }

    fn spawn_water(&mut self, kind: WaterKind, position: Point, threshold: u32) -> WaterBodyId {
        let id = WaterBodyId(self.water_bodies.len());
        self.water_bodies.push(WaterBody {
            id,
            kind,
            position,
            is_contaminated: false,
            exposure_ms: 0.0,
            infected_visits: 0,
            threshold,
        });
        id
    }

    /// Rejects layouts the movement and threshold rules cannot run on.
    pub fn validate(&self) -> SimResult<()> {
        for agent in &self.agents {
            check_speed(agent.speed)
                .map_err(|_| SimError::invalid(format!("{} has speed {}", agent.id, agent.speed)))?;
        }
        if let Some(water) = self.water_bodies.iter().find(|w| w.threshold == 0) {
            return Err(SimError::invalid(format!(
                "{} has a contamination threshold of 0",
                water.id
            )));
        }
        Ok(())
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn advance(&mut self, delta_ms: f64) {
        self.tick += 1;
        self.time.advance(delta_ms);
    }

    pub fn time(&self) -> &TimeManager {
        &self.time
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn houses(&self) -> &[House] {
        &self.houses
    }

    pub fn water_bodies(&self) -> &[WaterBody] {
        &self.water_bodies
    }

    pub fn communities(&self) -> &[Community] {
        &self.communities
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id.0)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(id.0)
    }

    pub fn house(&self, id: HouseId) -> Option<&House> {
        self.houses.get(id.0)
    }

    pub fn water(&self, id: WaterBodyId) -> Option<&WaterBody> {
        self.water_bodies.get(id.0)
    }

    pub fn water_mut(&mut self, id: WaterBodyId) -> Option<&mut WaterBody> {
        self.water_bodies.get_mut(id.0)
    }

    pub fn community(&self, id: CommunityId) -> Option<&Community> {
        self.communities.get(id.0)
    }

    /// Water body an agent would touch by arriving at `location`.
    pub fn water_for(&self, agent: &Agent, location: Location) -> Option<WaterBodyId> {
        match location {
            Location::House | Location::School => None,
            Location::HouseWater => self.house(agent.house).map(|h| h.water),
            Location::SchoolWater => self.community(agent.community).and_then(|c| c.water),
            Location::VisitOtherCommunity => agent
                .target_community
                .and_then(|id| self.community(id))
                .and_then(|c| c.water),
        }
    }

    /// Coordinates of `location` for `agent`, `None` when the layout has no
    /// such place for it.
    pub fn resolve(&self, agent: &Agent, location: Location) -> Option<Point> {
        match location {
            Location::House => Some(agent.home),
            Location::School => self.community(agent.community).and_then(|c| c.school),
            Location::HouseWater | Location::SchoolWater | Location::VisitOtherCommunity => self
                .water_for(agent, location)
                .and_then(|id| self.water(id))
                .map(|w| w.position),
        }
    }

    pub fn infected_agents(&self) -> usize {
        self.agents.iter().filter(|a| a.is_infected).count()
    }

    pub fn infected_houses(&self) -> usize {
        self.houses.iter().filter(|h| h.is_infected).count()
    }

    pub fn contaminated_water(&self) -> usize {
        self.water_bodies.iter().filter(|w| w.is_contaminated).count()
    }

    pub fn active_agents(&self) -> usize {
        self.agents.iter().filter(|a| a.is_active).count()
    }
}
