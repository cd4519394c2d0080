use thiserror::Error;

use crate::world::{AgentId, HouseId, WaterBodyId};

pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("invalid scenario configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown location label '{0}'")]
    UnknownLocationLabel(String),

    #[error("agent {0} does not exist")]
    UnknownAgent(AgentId),

    #[error("house {0} does not exist")]
    UnknownHouse(HouseId),

    #[error("water body {0} does not exist")]
    UnknownWaterBody(WaterBodyId),

    #[error("frame delta {0} ms must be finite and not negative")]
    InvalidDelta(f64),
}

impl SimError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        SimError::InvalidConfig(msg.into())
    }
}
