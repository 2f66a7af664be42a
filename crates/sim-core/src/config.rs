//! Run configuration and validation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::model::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    Fifo,
    Stf,
    Rl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrivalModel {
    Fixed,
    Poisson,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    pub cpu_capacity: u32,
    pub ram_capacity_mb: u32,
    pub gpu_capacity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub runtime_seconds: f64,
    pub arrival_rate: f64,
    pub arrival_model: ArrivalModel,
    pub duration_range: (f64, f64),
    pub cpu_range: (u32, u32),
    pub ram_range_mb: (u32, u32),
    pub gpu_range: (u32, u32),
    pub priority_distribution: HashMap<String, f64>,
    pub tenants: Vec<String>,
    pub nodes: Vec<NodeSpec>,
    pub scheduler_choice: SchedulerKind,
    pub preemption_enabled: bool,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SimulationConfig {
    /// Validates field constraints and normalizes `priority_distribution` to
    /// sum to `1.0` in place. Returns every violation found, not just the
    /// first, matching the field-constraint table this config is grounded on.
    pub fn validate(&mut self) -> Result<(), SimError> {
        let mut errors = Vec::new();

        if self.runtime_seconds <= 0.0 {
            errors.push("runtime_seconds must be > 0".to_string());
        }
        if self.arrival_rate <= 0.0 {
            errors.push("arrival_rate must be > 0".to_string());
        }
        check_range(&mut errors, "duration_range", self.duration_range);
        check_range(&mut errors, "cpu_range", self.cpu_range);
        check_range(&mut errors, "ram_range_mb", self.ram_range_mb);
        check_range(&mut errors, "gpu_range", self.gpu_range);

        if self.tenants.is_empty() {
            errors.push("tenants must not be empty".to_string());
        }
        if self.nodes.is_empty() {
            errors.push("nodes must not be empty".to_string());
        }

        if self.priority_distribution.is_empty() {
            errors.push("priority_distribution must not be empty".to_string());
        } else {
            for key in self.priority_distribution.keys() {
                if Priority::parse(key).is_none() {
                    errors.push(format!("unknown priority in distribution: {key}"));
                }
            }
            let sum: f64 = self.priority_distribution.values().sum();
            if sum <= 0.0 {
                errors.push("priority_distribution weights must sum to > 0".to_string());
            } else {
                for w in self.priority_distribution.values_mut() {
                    *w /= sum;
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SimError::ConfigInvalid(errors.join("; ")))
        }
    }
}

fn check_range<T: PartialOrd + std::fmt::Display>(errors: &mut Vec<String>, name: &str, range: (T, T)) {
    if !(range.0 <= range.1) {
        errors.push(format!("{name} must satisfy min <= max, got ({}, {})", range.0, range.1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> SimulationConfig {
        SimulationConfig {
            runtime_seconds: 60.0,
            arrival_rate: 2.0,
            arrival_model: ArrivalModel::Poisson,
            duration_range: (1.0, 5.0),
            cpu_range: (1, 4),
            ram_range_mb: (512, 2048),
            gpu_range: (0, 1),
            priority_distribution: HashMap::from([
                ("low".to_string(), 1.0),
                ("high".to_string(), 1.0),
            ]),
            tenants: vec!["a".to_string()],
            nodes: vec![NodeSpec {
                id: "n0".to_string(),
                cpu_capacity: 8,
                ram_capacity_mb: 8192,
                gpu_capacity: 2,
            }],
            scheduler_choice: SchedulerKind::Fifo,
            preemption_enabled: true,
            seed: Some(1),
        }
    }

    #[test]
    fn normalizes_weights() {
        let mut cfg = base_config();
        cfg.validate().unwrap();
        let sum: f64 = cfg.priority_distribution.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_inverted_range() {
        let mut cfg = base_config();
        cfg.cpu_range = (4, 1);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_empty_tenants() {
        let mut cfg = base_config();
        cfg.tenants.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_unknown_priority_key() {
        let mut cfg = base_config();
        cfg.priority_distribution.insert("urgent".to_string(), 1.0);
        assert!(cfg.validate().is_err());
    }
}
