//! Shared high/low thresholds for CPU and memory

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    pub cpu_high: f64,
    pub cpu_low: f64,
    pub mem_high: f64,
    pub mem_low: f64,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            cpu_high: 50.0,
            cpu_low: 10.0,
            mem_high: 70.0,
            mem_low: 30.0,
        }
    }
}

/// Partial update: absent fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_low: Option<f64>,
}

impl ThresholdSet {
    pub fn merged(&self, update: &ThresholdUpdate) -> Self {
        Self {
            cpu_high: update.cpu_high.unwrap_or(self.cpu_high),
            cpu_low: update.cpu_low.unwrap_or(self.cpu_low),
            mem_high: update.mem_high.unwrap_or(self.mem_high),
            mem_low: update.mem_low.unwrap_or(self.mem_low),
        }
    }

    /// Rejects non-finite or negative values and inverted low/high pairs.
    pub fn validate(&self) -> Result<(), ThresholdError> {
        for (field, value) in [
            ("cpu_high", self.cpu_high),
            ("cpu_low", self.cpu_low),
            ("mem_high", self.mem_high),
            ("mem_low", self.mem_low),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ThresholdError::OutOfRange { field, value });
            }
        }
        if self.cpu_low > self.cpu_high {
            return Err(ThresholdError::Inverted {
                metric: "cpu",
                low: self.cpu_low,
                high: self.cpu_high,
            });
        }
        if self.mem_low > self.mem_high {
            return Err(ThresholdError::Inverted {
                metric: "mem",
                low: self.mem_low,
                high: self.mem_high,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdError {
    #[error("{field} must be a finite, non-negative number (got {value})")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("{metric}_low ({low}) must not exceed {metric}_high ({high})")]
    Inverted {
        metric: &'static str,
        low: f64,
        high: f64,
    },
}

/// Process-wide threshold state. Readers always get a consistent copy; updates
/// replace the whole set under one write lock.
#[derive(Debug)]
pub struct ThresholdStore {
    current: RwLock<ThresholdSet>,
    validate: bool,
}

impl ThresholdStore {
    pub fn new(initial: ThresholdSet, validate: bool) -> Self {
        Self {
            current: RwLock::new(initial),
            validate,
        }
    }

    pub fn get(&self) -> ThresholdSet {
        *self.current.read()
    }

    /// Applies the supplied fields and returns the resulting set. With
    /// validation on, an invalid result leaves the store untouched.
    pub fn update(&self, update: &ThresholdUpdate) -> Result<ThresholdSet, ThresholdError> {
        let mut current = self.current.write();
        let next = current.merged(update);
        if self.validate {
            next.validate()?;
        }
        *current = next;
        Ok(next)
    }
}

impl Default for ThresholdStore {
    fn default() -> Self {
        Self::new(ThresholdSet::default(), true)
    }
}
