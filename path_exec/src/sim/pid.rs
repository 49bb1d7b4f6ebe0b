//! # PID controller
//!
//! A discrete PID controller running at the fixed simulation timestep, with a
//! minimum and maximum output magnitude and an optional completion rule:
//!
//! - Tolerance: done once the error has stayed within the tolerance for a
//!   number of consecutive ticks.
//! - Overshoot: done as soon as the error changes sign from the first tick,
//!   i.e. the target has been passed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gains, limits and completion rule of a PID controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidConfig {
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Derivative gain
    pub k_d: f64,

    /// Minimum magnitude of a non-zero output
    pub min_output: f64,

    /// Maximum magnitude of the output
    pub max_output: f64,

    /// Error magnitude within which the controller is considered on target
    pub tolerance: Option<f64>,

    /// Number of consecutive ticks the error must be within tolerance
    pub tolerance_repeated: usize,

    /// If true the controller is done once the error changes sign
    pub overshoot: bool,
}

/// A PID controller.
///
/// Controllers are built fresh for each command execution and dropped when it
/// completes.
#[derive(Debug, Clone, Serialize)]
pub struct Pid {
    config: PidConfig,

    /// Tick duration
    dt_s: f64,

    /// The integral accumulation
    integral: f64,

    /// Previous error
    prev_error: f64,

    /// Number of consecutive ticks within tolerance
    num_in_tolerance: usize,

    /// Sign of the error on the first tick
    first_error_sign: Option<f64>,

    /// Sign of the most recent error
    last_error_sign: Option<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PidError {
    #[error("The controller has no completion rule")]
    NoCompletionRule,

    #[error("The controller has both a tolerance and an overshoot completion rule")]
    ConflictingCompletionRules,

    #[error("Invalid timestep {0} s, the timestep must be positive")]
    InvalidTimestep(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidConfig {
    /// Configuration with the given gains, no limits and no completion rule.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            min_output: 0.0,
            max_output: std::f64::INFINITY,
            tolerance: None,
            tolerance_repeated: 1,
            overshoot: false,
        }
    }

    pub fn with_limits(mut self, min_output: f64, max_output: f64) -> Self {
        self.min_output = min_output.abs();
        self.max_output = max_output.abs();
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64, repeated: usize) -> Self {
        self.tolerance = Some(tolerance.abs());
        self.tolerance_repeated = repeated.max(1);
        self
    }

    pub fn with_overshoot(mut self) -> Self {
        self.overshoot = true;
        self
    }
}

impl Pid {
    /// Create a new controller without checking its completion rule.
    pub fn new(config: PidConfig, dt_s: f64) -> Self {
        Self {
            config,
            dt_s,
            integral: 0.0,
            prev_error: 0.0,
            num_in_tolerance: 0,
            first_error_sign: None,
            last_error_sign: None,
        }
    }

    /// Create a new controller which must have exactly one completion rule.
    pub fn with_completion(config: PidConfig, dt_s: f64) -> Result<Self, PidError> {
        if !(dt_s > 0.0) {
            return Err(PidError::InvalidTimestep(dt_s));
        }

        match (config.tolerance.is_some(), config.overshoot) {
            (false, false) => Err(PidError::NoCompletionRule),
            (true, true) => Err(PidError::ConflictingCompletionRules),
            _ => Ok(Self::new(config, dt_s)),
        }
    }

    pub fn config(&self) -> &PidConfig {
        &self.config
    }

    /// Run the controller for one tick, returning the output.
    pub fn tick(&mut self, error: f64) -> f64 {
        self.integral += error * self.dt_s;
        let derivative = (error - self.prev_error) / self.dt_s;
        self.prev_error = error;

        // Completion tracking
        if let Some(tol) = self.config.tolerance {
            if error.abs() <= tol {
                self.num_in_tolerance += 1;
            }
            else {
                self.num_in_tolerance = 0;
            }
        }
        if error != 0.0 {
            let sign = error.signum();
            if self.first_error_sign.is_none() {
                self.first_error_sign = Some(sign);
            }
            self.last_error_sign = Some(sign);
        }

        let raw = self.config.k_p * error
            + self.config.k_i * self.integral
            + self.config.k_d * derivative;

        limit_output(raw, self.config.min_output, self.config.max_output)
    }

    /// Determine if the controller has reached its target.
    pub fn is_done(&self) -> Result<bool, PidError> {
        if self.config.tolerance.is_some() {
            return Ok(self.num_in_tolerance >= self.config.tolerance_repeated);
        }

        if self.config.overshoot {
            return Ok(match (self.first_error_sign, self.last_error_sign) {
                (Some(first), Some(last)) => first != last,
                _ => false,
            });
        }

        Err(PidError::NoCompletionRule)
    }

    /// Clear all accumulated state.
    pub fn reset(&mut self) {
        *self = Self::new(self.config, self.dt_s);
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Limit the magnitude of a value to `[min, max]`, preserving its sign. Zero
/// is left at zero.
pub fn limit_output(value: f64, min: f64, max: f64) -> f64 {
    if value == 0.0 || value.is_nan() {
        return 0.0;
    }

    value.signum() * value.abs().max(min).min(max)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_output_terms() {
        let mut pid = Pid::new(PidConfig::new(2.0, 1.0, 0.5), 0.1);

        // p = 2 * 1, i = 1 * 0.1, d = 0.5 * (1 - 0) / 0.1
        assert_abs_diff_eq!(pid.tick(1.0), 2.0 + 0.1 + 5.0, epsilon = 1e-12);

        // p = 2 * 0.5, i = 1 * 0.15, d = 0.5 * (0.5 - 1) / 0.1
        assert_abs_diff_eq!(pid.tick(0.5), 1.0 + 0.15 - 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_limits() {
        assert_eq!(limit_output(0.0, 1.0, 5.0), 0.0);
        assert_eq!(limit_output(0.2, 1.0, 5.0), 1.0);
        assert_eq!(limit_output(-0.2, 1.0, 5.0), -1.0);
        assert_eq!(limit_output(-20.0, 1.0, 5.0), -5.0);
        assert_eq!(limit_output(3.0, 1.0, 5.0), 3.0);

        let mut pid = Pid::new(PidConfig::new(1.0, 0.0, 0.0).with_limits(1.25, 25.0), 0.05);
        assert_eq!(pid.tick(0.0), 0.0);
        assert_eq!(pid.tick(0.5), 1.25);
        assert_eq!(pid.tick(100.0), 25.0);
    }

    #[test]
    fn test_tolerance_debounce() {
        let config = PidConfig::new(1.0, 0.0, 0.0).with_tolerance(0.5, 3);
        let mut pid = Pid::with_completion(config, 0.05).unwrap();

        for e in [0.1, 0.2].iter() {
            pid.tick(*e);
            assert!(!pid.is_done().unwrap());
        }

        // A violation resets the count
        pid.tick(1.0);
        assert!(!pid.is_done().unwrap());

        pid.tick(0.1);
        assert!(!pid.is_done().unwrap());
        pid.tick(-0.1);
        assert!(!pid.is_done().unwrap());
        pid.tick(0.0);
        assert!(pid.is_done().unwrap());
    }

    #[test]
    fn test_instances_independent() {
        let config = PidConfig::new(1.0, 0.0, 0.0).with_tolerance(0.5, 2);
        let mut a = Pid::with_completion(config, 0.05).unwrap();
        let mut b = Pid::with_completion(config, 0.05).unwrap();

        a.tick(0.1);
        a.tick(0.1);
        assert!(a.is_done().unwrap());
        assert!(!b.is_done().unwrap());

        b.tick(0.1);
        assert!(!b.is_done().unwrap());

        a.reset();
        assert!(!a.is_done().unwrap());
    }

    #[test]
    fn test_overshoot() {
        let config = PidConfig::new(1.0, 0.0, 0.0).with_overshoot();
        let mut pid = Pid::with_completion(config, 0.05).unwrap();

        pid.tick(10.0);
        pid.tick(2.0);
        pid.tick(0.0);
        assert!(!pid.is_done().unwrap());
        pid.tick(-0.5);
        assert!(pid.is_done().unwrap());
    }

    #[test]
    fn test_completion_rule_errors() {
        let none = PidConfig::new(1.0, 0.0, 0.0);
        assert_eq!(Pid::with_completion(none, 0.05).err(), Some(PidError::NoCompletionRule));
        assert_eq!(Pid::new(none, 0.05).is_done(), Err(PidError::NoCompletionRule));

        let both = none.with_tolerance(1.0, 1).with_overshoot();
        assert_eq!(
            Pid::with_completion(both, 0.05).err(),
            Some(PidError::ConflictingCompletionRules)
        );

        let tol = none.with_tolerance(1.0, 1);
        assert_eq!(Pid::with_completion(tol, 0.0).err(), Some(PidError::InvalidTimestep(0.0)));
    }
}
