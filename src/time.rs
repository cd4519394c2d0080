//! Simulated clock driven by real elapsed milliseconds.

use serde::{Deserialize, Serialize};

/// How the day counter rounds the elapsed simulated hours.
///
/// `Ceil` makes the first partial day read as day 1, `Floor` as day 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayCounting {
    #[default]
    Floor,
    Ceil,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeManager {
    current_simulation_time: f64,
    time_scale: f64,
    schedule_start_time: f64,
    day_counting: DayCounting,
    current_day: u64,
}

impl TimeManager {
    /// `time_scale` is simulated hours per real second, `schedule_start_time`
    /// the hour of day the clock shows at zero elapsed time.
    pub fn new(time_scale: f64, schedule_start_time: f64, day_counting: DayCounting) -> Self {
        let mut time = Self {
            current_simulation_time: 0.0,
            time_scale,
            schedule_start_time,
            day_counting,
            current_day: 0,
        };
        time.refresh_day();
        time
    }

    pub fn advance(&mut self, delta_ms: f64) {
        self.current_simulation_time += delta_ms / 1000.0;
        self.refresh_day();
    }

    pub fn reset(&mut self) {
        self.current_simulation_time = 0.0;
        self.refresh_day();
    }

    fn refresh_day(&mut self) {
        let days = self.total_hours() / 24.0;
        let rounded = match self.day_counting {
            DayCounting::Floor => days.floor(),
            DayCounting::Ceil => days.ceil(),
        };
        self.current_day = rounded.max(0.0) as u64;
    }

    /// Elapsed real time in seconds.
    pub fn simulation_time(&self) -> f64 {
        self.current_simulation_time
    }

    pub fn total_hours(&self) -> f64 {
        self.current_simulation_time * self.time_scale + self.schedule_start_time
    }

    pub fn current_hour(&self) -> u32 {
        (self.total_hours().floor() as i64).rem_euclid(24) as u32
    }

    pub fn current_day(&self) -> u64 {
        self.current_day
    }

    pub fn day_counting(&self) -> DayCounting {
        self.day_counting
    }

    pub fn clock_label(&self) -> String {
        format!("{:02}:00", self.current_hour())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hour_wraps_past_midnight() {
        let mut time = TimeManager::new(1.0, 8.0, DayCounting::Floor);
        time.advance(16_500.0);
        assert_eq!(time.total_hours(), 24.5);
        assert_eq!(time.current_hour(), 0);
        assert_eq!(time.current_day(), 1);
    }

    #[test]
    fn hour_stays_in_range() {
        let mut time = TimeManager::new(3.0, 22.0, DayCounting::Floor);
        for _ in 0..200 {
            time.advance(250.0);
            assert!(time.current_hour() < 24);
        }
    }

    #[test]
    fn ceil_counting_starts_at_day_one() {
        let mut floor = TimeManager::new(1.0, 8.0, DayCounting::Floor);
        let mut ceil = TimeManager::new(1.0, 8.0, DayCounting::Ceil);
        floor.advance(1_000.0);
        ceil.advance(1_000.0);
        assert_eq!(floor.current_day(), 0);
        assert_eq!(ceil.current_day(), 1);
    }

    #[test]
    fn day_is_known_before_the_first_tick() {
        let mut time = TimeManager::new(1.0, 6.0, DayCounting::Ceil);
        assert_eq!(time.current_day(), 1);
        time.advance(16.0);
        assert_eq!(time.current_day(), 1);
        time.advance(30_000.0);
        time.reset();
        assert_eq!(time.current_day(), 1);
        assert_eq!(TimeManager::new(1.0, 6.0, DayCounting::Floor).current_day(), 0);
    }

    #[test]
    fn reset_rewinds_time_and_day() {
        let mut time = TimeManager::new(1.0, 0.0, DayCounting::Ceil);
        time.advance(30_000.0);
        assert_eq!(time.current_day(), 2);
        time.reset();
        assert_eq!(time.simulation_time(), 0.0);
        assert_eq!(time.current_day(), 0);
        assert_eq!(time.current_hour(), 0);
    }

    #[test]
    fn clock_label_is_zero_padded() {
        let mut time = TimeManager::new(1.0, 6.0, DayCounting::Floor);
        assert_eq!(time.clock_label(), "06:00");
        time.advance(7_000.0);
        assert_eq!(time.clock_label(), "13:00");
    }
}
