//! Smooth visibility transitions.

/// Time-based fade between hidden (0) and shown (1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fader {
    target: bool,
    value: f64,
    /// Seconds for a full transition.
    duration: f64,
}

impl Fader {
    pub const DEFAULT_DURATION: f64 = 1.0;

    /// A fader already settled on `visible`.
    pub fn new(visible: bool) -> Self {
        Self {
            target: visible,
            value: if visible { 1.0 } else { 0.0 },
            duration: Self::DEFAULT_DURATION,
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = seconds.max(0.0);
        self
    }

    pub fn target(&self) -> bool {
        self.target
    }

    pub fn set_target(&mut self, visible: bool) {
        self.target = visible;
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Advance by `dt` seconds. Returns whether the value changed.
    pub fn update(&mut self, dt: f64) -> bool {
        let goal = if self.target { 1.0 } else { 0.0 };
        if self.value == goal {
            return false;
        }
        let step = if self.duration > 0.0 {
            dt.max(0.0) / self.duration
        } else {
            1.0
        };
        self.value = if goal > self.value {
            (self.value + step).min(goal)
        } else {
            (self.value - step).max(goal)
        };
        true
    }
}

impl Default for Fader {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Hermite interpolation between `edge0` and `edge1`.
pub fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fade_out_and_in() {
        let mut fader = Fader::new(true).with_duration(2.0);
        assert!(!fader.update(0.5));

        fader.set_target(false);
        assert!(fader.update(0.5));
        assert!((fader.value() - 0.75).abs() < 1e-12);
        fader.update(10.0);
        assert_eq!(fader.value(), 0.0);
        assert!(!fader.update(1.0));

        fader.set_target(true);
        fader.update(1.0);
        assert!((fader.value() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_duration_is_instant() {
        let mut fader = Fader::new(false).with_duration(0.0);
        fader.set_target(true);
        fader.update(0.0);
        assert_eq!(fader.value(), 1.0);
    }

    #[test]
    fn test_smoothstep() {
        assert_eq!(smoothstep(10.0, 20.0, 5.0), 0.0);
        assert_eq!(smoothstep(10.0, 20.0, 25.0), 1.0);
        assert!((smoothstep(10.0, 20.0, 15.0) - 0.5).abs() < 1e-12);
    }
}
