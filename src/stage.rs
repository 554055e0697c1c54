use crate::units::round_to;

// Reference elevations (feet) stepped from start to end, rounded every step
#[derive(Debug, Clone)]
pub struct StageSeries {
    next: f64,
    end: f64,
    increment: f64,
    decimals: u32,
}

impl StageSeries {
    pub fn new(start: f64, end: f64, increment: f64, decimals: u32) -> Self {
        StageSeries {
            next: round_to(start, decimals),
            end,
            increment: round_to(increment, decimals),
            decimals,
        }
    }

    /// Number of stages the series will yield, without consuming it.
    pub fn count_stages(&self) -> usize {
        self.clone().count()
    }
}

/// Whether one rounded increment moves `stage` upward at this precision.
/// Fails for NaN increments and for increments below the float spacing at
/// `stage`.
pub fn step_advances(stage: f64, increment: f64, decimals: u32) -> bool {
    let stage = round_to(stage, decimals);
    let increment = round_to(increment, decimals);
    increment > 0.0 && round_to(stage + increment, decimals) > stage
}

impl Iterator for StageSeries {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        // NaN in any field compares false and ends the series
        if !(self.next <= self.end) || !(self.increment > 0.0) {
            return None;
        }
        let stage = self.next;
        let next = round_to(stage + self.increment, self.decimals);
        // A step that does not advance would repeat `stage` forever
        self.next = if next > stage { next } else { f64::NAN };
        Some(stage)
    }
}
