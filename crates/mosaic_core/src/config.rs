//! # Engine Configuration
//!
//! Tuning knobs for the storage core, loaded once at startup.
//!
//! ```toml
//! default_pool_capacity = 32
//! max_component_types = 16
//! entity_capacity_hint = 1024
//!
//! [growth]
//! policy = "linear"
//! step = 64
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ecs::MAX_COMPONENT_TYPES;
use crate::error::{EcsError, EcsResult};

/// How a pool picks its next capacity when it runs out of slots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum GrowthPolicy {
    /// Double the capacity.
    #[default]
    Double,
    /// Add a fixed number of slots.
    Linear {
        /// Slots added per growth step.
        step: u32,
    },
}

impl GrowthPolicy {
    /// Capacity after one growth step from `current`, saturating at `u32::MAX`.
    #[inline]
    #[must_use]
    pub fn next_capacity(self, current: u32) -> u32 {
        match self {
            Self::Double => current.saturating_mul(2).max(current.saturating_add(1)),
            Self::Linear { step } => current.saturating_add(step.max(1)),
        }
    }
}

/// Configuration for an [`EcsContext`](crate::EcsContext).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Initial pool capacity used by registrations that do not pass one.
    pub default_pool_capacity: u32,
    /// Number of component type bits the registry hands out (1-64).
    pub max_component_types: u32,
    /// Expected number of live entities, reserved up front.
    pub entity_capacity_hint: usize,
    /// Pool growth policy.
    pub growth: GrowthPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_pool_capacity: 10,
            max_component_types: MAX_COMPONENT_TYPES,
            entity_capacity_hint: 0,
            growth: GrowthPolicy::Double,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidConfig`] if the document does not parse or fails
    /// [`validate`](Self::validate).
    pub fn from_toml_str(source: &str) -> EcsResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| EcsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`EcsError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn from_toml_file(path: impl AsRef<Path>) -> EcsResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| EcsError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Serializes to TOML.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidConfig`] if serialization fails.
    pub fn to_toml_string(&self) -> EcsResult<String> {
        toml::to_string(self).map_err(|e| EcsError::InvalidConfig(e.to_string()))
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidConfig`] if `max_component_types` is outside 1-64 or
    /// a linear growth step is zero.
    pub fn validate(&self) -> EcsResult<()> {
        if self.max_component_types == 0 || self.max_component_types > MAX_COMPONENT_TYPES {
            return Err(EcsError::InvalidConfig(format!(
                "max_component_types must be within 1..={MAX_COMPONENT_TYPES}, got {}",
                self.max_component_types
            )));
        }
        if let GrowthPolicy::Linear { step: 0 } = self.growth {
            return Err(EcsError::InvalidConfig("linear growth step must be non-zero".to_owned()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_growth() {
        assert_eq!(GrowthPolicy::Double.next_capacity(0), 1);
        assert_eq!(GrowthPolicy::Double.next_capacity(2), 4);
        assert_eq!(GrowthPolicy::Double.next_capacity(u32::MAX), u32::MAX);
    }

    #[test]
    fn test_linear_growth() {
        let policy = GrowthPolicy::Linear { step: 8 };
        assert_eq!(policy.next_capacity(0), 8);
        assert_eq!(policy.next_capacity(8), 16);
    }

    #[test]
    fn test_parse_full_document() {
        let config = EngineConfig::from_toml_str(
            r#"
            default_pool_capacity = 32
            max_component_types = 16
            entity_capacity_hint = 1024

            [growth]
            policy = "linear"
            step = 64
            "#,
        )
        .unwrap();

        assert_eq!(config.default_pool_capacity, 32);
        assert_eq!(config.max_component_types, 16);
        assert_eq!(config.entity_capacity_hint, 1024);
        assert_eq!(config.growth, GrowthPolicy::Linear { step: 64 });
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = EngineConfig::from_toml_str("default_pool_capacity = 4").unwrap();
        assert_eq!(config.default_pool_capacity, 4);
        assert_eq!(config.max_component_types, 64);
        assert_eq!(config.growth, GrowthPolicy::Double);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(EngineConfig::from_toml_str("max_component_types = 65").is_err());
        assert!(EngineConfig::from_toml_str("max_component_types = 0").is_err());
        assert!(EngineConfig::from_toml_str("[growth]\npolicy = \"linear\"\nstep = 0").is_err());
        assert!(EngineConfig::from_toml_str("unknown_key = 1").is_err());
    }

    #[test]
    fn test_toml_roundtrip_of_defaults() {
        let text = EngineConfig::default().to_toml_string().unwrap();
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), EngineConfig::default());
    }
}
