use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn offset(self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

/// Named place an agent can be heading to. Coordinates are looked up per
/// agent, so `HouseWater` means the agent's own house water and
/// `SchoolWater` its community's shared water.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Location {
    House,
    School,
    HouseWater,
    SchoolWater,
    VisitOtherCommunity,
}

impl Location {
    pub const ALL: [Location; 5] = [
        Location::House,
        Location::School,
        Location::HouseWater,
        Location::SchoolWater,
        Location::VisitOtherCommunity,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Location::House => "house",
            Location::School => "school",
            Location::HouseWater => "houseWater",
            Location::SchoolWater => "schoolWater",
            Location::VisitOtherCommunity => "visitOtherCommunity",
        }
    }

    /// Parses a label, falling back to `House` when it is not recognised.
    pub fn from_label_or_home(label: &str) -> Location {
        label.parse().unwrap_or_else(|err: SimError| {
            tracing::warn!("{err}; routing to house");
            Location::House
        })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Location {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Location::ALL
            .into_iter()
            .find(|location| location.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| SimError::UnknownLocationLabel(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_back() {
        for location in Location::ALL {
            assert_eq!(location.label().parse::<Location>().unwrap(), location);
        }
        assert_eq!("SchoolWater".parse::<Location>().unwrap(), Location::SchoolWater);
    }

    #[test]
    fn unknown_label_is_an_error() {
        let err = "river".parse::<Location>().unwrap_err();
        assert_eq!(err, SimError::UnknownLocationLabel("river".into()));
    }

    #[test]
    fn unknown_label_falls_back_home() {
        assert_eq!(Location::from_label_or_home("market"), Location::House);
        assert_eq!(Location::from_label_or_home("school"), Location::School);
    }

    #[test]
    fn distance_is_euclidean() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance_to(b), 5.0);
    }
}
