//! Configuration for batch resolution

use crate::{DanglingPolicy, ResolveOptions};
use serde::{Deserialize, Serialize};

/// Process-wide defaults for batch resolution
///
/// # Examples
///
/// ```
/// use polyrel_relations::{DanglingPolicy, ResolveConfig};
///
/// let config = ResolveConfig::default();
/// assert_eq!(config.dangling_policy, DanglingPolicy::Report);
///
/// let config = ResolveConfig::strict();
/// assert_eq!(config.dangling_policy, DanglingPolicy::Fail);
///
/// let config = ResolveConfig::lenient();
/// assert_eq!(config.dangling_policy, DanglingPolicy::Skip);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveConfig {
    /// Handling of references whose entity no longer exists
    /// Default: report and omit the row
    #[serde(default)]
    pub dangling_policy: DanglingPolicy,

    /// Log a warning for every reported dangling reference
    /// Default: true
    #[serde(default = "default_warn_on_dangling")]
    pub warn_on_dangling: bool,
}

fn default_warn_on_dangling() -> bool {
    true
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            dangling_policy: DanglingPolicy::Report,
            warn_on_dangling: true,
        }
    }
}

impl ResolveConfig {
    /// Abort resolution on the first dangling reference
    pub fn strict() -> Self {
        Self {
            dangling_policy: DanglingPolicy::Fail,
            warn_on_dangling: false,
        }
    }

    /// Drop dangling rows without a trace
    pub fn lenient() -> Self {
        Self {
            dangling_policy: DanglingPolicy::Skip,
            warn_on_dangling: false,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.warn_on_dangling && self.dangling_policy != DanglingPolicy::Report {
            return Err(format!(
                "warn_on_dangling only applies to the report policy, not {:?}",
                self.dangling_policy
            ));
        }
        Ok(())
    }

    /// Resolution options carrying these defaults
    pub fn to_options(&self) -> ResolveOptions {
        ResolveOptions {
            dangling: self.dangling_policy,
            warn_on_dangling: self.warn_on_dangling,
            ..ResolveOptions::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(ResolveConfig::default().validate().is_ok());
        assert!(ResolveConfig::strict().validate().is_ok());
        assert!(ResolveConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_warning_requires_report_policy() {
        let config = ResolveConfig {
            dangling_policy: DanglingPolicy::Skip,
            warn_on_dangling: true,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_defaults() {
        let config = ResolveConfig::from_toml("").unwrap();
        assert_eq!(config, ResolveConfig::default());

        let config = ResolveConfig::from_toml("dangling_policy = \"fail\"\nwarn_on_dangling = false").unwrap();
        assert_eq!(config, ResolveConfig::strict());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ResolveConfig::lenient();
        let parsed = ResolveConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_to_options() {
        let options = ResolveConfig::strict().to_options();
        assert_eq!(options.dangling, DanglingPolicy::Fail);
        assert!(!options.warn_on_dangling);
        assert!(options.field.is_none());
        assert!(options.type_filter.is_none());
    }
}
