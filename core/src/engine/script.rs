//! Scripts: ordered steps the engine walks through

use crate::error::{Result, SimError};
use std::fmt;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Accepted playback speed factors
pub const SPEED_RANGE: RangeInclusive<f64> = 0.01..=100.0;

/// Reject speeds outside [`SPEED_RANGE`], NaN included
pub fn check_speed(speed: f64) -> Result<()> {
    if SPEED_RANGE.contains(&speed) {
        Ok(())
    } else {
        Err(SimError::InvalidSpeed { speed })
    }
}

/// `duration` played back at `speed`
pub fn scale_duration(duration: Duration, speed: f64) -> Result<Duration> {
    check_speed(speed)?;
    Duration::try_from_secs_f64(duration.as_secs_f64() / speed)
        .map_err(|_| SimError::InvalidSpeed { speed })
}

/// A simulation state vocabulary.
///
/// Implemented by each simulation's closed phase enum (or frame struct for
/// multi-lane simulations).
pub trait Phase: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Short label used in logs and analytics
    fn label(&self) -> String;
}

/// One step of a script: enter `phase`, emit `logs`, then hold
#[derive(Debug, Clone, PartialEq)]
pub struct Step<P> {
    pub phase: P,
    pub hold: Duration,
    pub logs: Vec<String>,
}

impl<P: Phase> Step<P> {
    pub fn new(phase: P, hold_ms: u64) -> Self {
        Self {
            phase,
            hold: Duration::from_millis(hold_ms),
            logs: Vec::new(),
        }
    }

    /// Terminal step with no hold
    pub fn terminal(phase: P) -> Self {
        Self::new(phase, 0)
    }

    pub fn log(mut self, line: impl Into<String>) -> Self {
        self.logs.push(line.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Script<P> {
    name: String,
    steps: Vec<Step<P>>,
    repeat: bool,
}

impl<P: Phase> Script<P> {
    pub fn new(name: impl Into<String>, steps: Vec<Step<P>>) -> Result<Self> {
        let name = name.into();
        if steps.is_empty() {
            return Err(SimError::EmptyScript { name });
        }
        Ok(Self {
            name,
            steps,
            repeat: false,
        })
    }

    /// Loop back to the first step after the last hold, until reset
    pub fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    /// Divide every hold by `speed`
    pub fn scaled(mut self, speed: f64) -> Result<Self> {
        check_speed(speed)?;
        for step in &mut self.steps {
            step.hold = scale_duration(step.hold, speed)?;
        }
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Step<P>] {
        &self.steps
    }

    pub fn is_repeating(&self) -> bool {
        self.repeat
    }

    /// State the engine settles in once the script completes
    pub fn terminal(&self) -> &P {
        // Script::new rejects empty step lists
        &self.steps[self.steps.len() - 1].phase
    }

    /// Sum of all holds in one pass
    pub fn duration(&self) -> Duration {
        self.steps.iter().map(|s| s.hold).sum()
    }

    /// Total log lines emitted in one pass
    pub fn log_lines(&self) -> usize {
        self.steps.iter().map(|s| s.logs.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Light {
        Red,
        Green,
    }

    impl Phase for Light {
        fn label(&self) -> String {
            format!("{:?}", self).to_lowercase()
        }
    }

    #[test]
    fn test_empty_script_rejected() {
        let result = Script::<Light>::new("lights", Vec::new());
        assert!(matches!(result, Err(SimError::EmptyScript { .. })));
    }

    #[test]
    fn test_terminal_is_last_step() {
        let script = Script::new(
            "lights",
            vec![Step::new(Light::Red, 500).log("stop"), Step::terminal(Light::Green)],
        )
        .unwrap();
        assert_eq!(script.terminal(), &Light::Green);
        assert_eq!(script.duration(), Duration::from_millis(500));
        assert_eq!(script.log_lines(), 1);
    }

    #[test]
    fn test_scaled_divides_holds() {
        let script = Script::new("lights", vec![Step::new(Light::Red, 1000), Step::terminal(Light::Green)])
            .unwrap()
            .scaled(4.0)
            .unwrap();
        assert_eq!(script.steps()[0].hold, Duration::from_millis(250));

        let bad = script.clone().scaled(0.0);
        assert!(matches!(bad, Err(SimError::InvalidSpeed { .. })));
        let bad = script.scaled(f64::NAN);
        assert!(matches!(bad, Err(SimError::InvalidSpeed { .. })));
    }

    #[test]
    fn test_extreme_speeds_rejected_without_panic() {
        let script = Script::new("lights", vec![Step::new(Light::Red, 1200), Step::terminal(Light::Green)])
            .unwrap();
        for speed in [1e-300, 1e-3, 1e300, f64::INFINITY, -1.0] {
            let result = script.clone().scaled(speed);
            assert!(matches!(result, Err(SimError::InvalidSpeed { .. })), "speed {}", speed);
        }

        let slowest = script.clone().scaled(*SPEED_RANGE.start()).unwrap();
        assert!((slowest.steps()[0].hold.as_secs_f64() - 120.0).abs() < 1e-6);
        let fastest = script.scaled(*SPEED_RANGE.end()).unwrap();
        assert!((fastest.steps()[0].hold.as_secs_f64() - 0.012).abs() < 1e-6);
    }

    #[test]
    fn test_scale_duration() {
        assert_eq!(
            scale_duration(Duration::from_millis(12_000), 2.0).unwrap(),
            Duration::from_millis(6000)
        );
        assert!(scale_duration(Duration::from_millis(12_000), 1e-300).is_err());
    }
}
