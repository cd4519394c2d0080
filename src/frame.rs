use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    location::{Location, Point},
    world::{AgentId, HouseId, SimulationState, WaterBodyId, WaterKind},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    pub id: AgentId,
    pub position: Point,
    pub location: Location,
    pub moving: bool,
    pub infected: bool,
    pub active: bool,
    pub mobile: bool,
    pub tested: bool,
    pub vaccinated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseView {
    pub id: HouseId,
    pub position: Point,
    pub infected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterView {
    pub id: WaterBodyId,
    pub kind: WaterKind,
    pub position: Point,
    pub contaminated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolView {
    pub community: String,
    pub position: Point,
}

/// Everything a renderer needs to draw one frame. Built from state, never
/// written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneFrame {
    pub scenario: String,
    pub tick: u64,
    pub day: u64,
    pub hour: u32,
    pub clock: String,
    pub agents: Vec<AgentView>,
    pub houses: Vec<HouseView>,
    pub water: Vec<WaterView>,
    pub schools: Vec<SchoolView>,
}

impl SceneFrame {
    pub fn capture(scenario: &str, state: &SimulationState) -> Self {
        let time = state.time();
        Self {
            scenario: scenario.to_string(),
            tick: state.tick(),
            day: time.current_day(),
            hour: time.current_hour(),
            clock: time.clock_label(),
            agents: state
                .agents()
                .iter()
                .map(|agent| AgentView {
                    id: agent.id,
                    position: agent.position,
                    location: agent.current_location,
                    moving: agent.is_moving(),
                    infected: agent.is_infected,
                    active: agent.is_active,
                    mobile: agent.is_mobile,
                    tested: agent.is_tested,
                    vaccinated: agent.is_vaccinated,
                })
                .collect(),
            houses: state
                .houses()
                .iter()
                .map(|house| HouseView {
                    id: house.id,
                    position: house.position,
                    infected: house.is_infected,
                })
                .collect(),
            water: state
                .water_bodies()
                .iter()
                .map(|water| WaterView {
                    id: water.id,
                    kind: water.kind,
                    position: water.position,
                    contaminated: water.is_contaminated,
                })
                .collect(),
            schools: state
                .communities()
                .iter()
                .filter_map(|community| {
                    community.school.map(|position| SchoolView {
                        community: community.name.clone(),
                        position,
                    })
                })
                .collect(),
        }
    }
}

/// Drawing sink. Implementations must only read the frame.
pub trait Renderer {
    fn render(&mut self, frame: &SceneFrame) -> Result<()>;

    /// Pushes out anything still buffered. Call once after the last frame.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes one JSON frame per line.
pub struct JsonLinesRenderer<W: Write> {
    out: W,
    interval: u64,
    written: u64,
}

impl<W: Write> JsonLinesRenderer<W> {
    /// `interval` is in ticks; frames whose tick is not a multiple are
    /// skipped, except tick 0 which is always written.
    pub fn new(out: W, interval: u64) -> Self {
        Self {
            out,
            interval: interval.max(1),
            written: 0,
        }
    }

    pub fn frames_written(&self) -> u64 {
        self.written
    }

    /// Flushes and hands back the writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.finish()?;
        Ok(self.out)
    }
}

impl JsonLinesRenderer<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>, interval: u64) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create frame file {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file), interval))
    }
}

impl<W: Write> Renderer for JsonLinesRenderer<W> {
    fn render(&mut self, frame: &SceneFrame) -> Result<()> {
        if frame.tick % self.interval != 0 {
            return Ok(());
        }
        serde_json::to_writer(&mut self.out, frame).context("serialize frame")?;
        self.out.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush().context("flush frames")
    }
}
