/*!
# Alignment Configuration

Configuration structures and loading for the alignment engine.
Supports TOML and YAML files; every field has a default so an empty
file (or no file at all) yields a usable configuration.

```toml
max_line_length = 100
max_passes = 10

[rules."Layout/CondenseWhen"]
enabled = true
severity = "info"

[rules."Style/EndlessMethod"]
enabled = false
```
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::Policy;
use crate::core::errors::{AlignError, AlignResult};
use crate::diagnostics::DiagnosticLevel;

pub const DEFAULT_MAX_LINE_LENGTH: usize = 120;
pub const DEFAULT_MAX_PASSES: usize = 10;

/// Rule severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    Error,
    Warning,
    /// Layout rewrites are informational unless configured otherwise
    #[default]
    Info,
    Hint,
}

impl std::fmt::Display for RuleSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleSeverity::Error => write!(f, "error"),
            RuleSeverity::Warning => write!(f, "warning"),
            RuleSeverity::Info => write!(f, "info"),
            RuleSeverity::Hint => write!(f, "hint"),
        }
    }
}

impl From<RuleSeverity> for DiagnosticLevel {
    fn from(severity: RuleSeverity) -> Self {
        match severity {
            RuleSeverity::Error => DiagnosticLevel::Error,
            RuleSeverity::Warning => DiagnosticLevel::Warning,
            RuleSeverity::Info => DiagnosticLevel::Info,
            RuleSeverity::Hint => DiagnosticLevel::Hint,
        }
    }
}

/// Configuration for a single rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Whether the rule is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Severity of the diagnostics the rule reports
    #[serde(default)]
    pub severity: RuleSeverity,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self { enabled: true, severity: RuleSeverity::Info, description: None }
    }
}

/// Resolved engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignConfig {
    /// No line the engine rewrites may exceed this many characters.
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,

    /// Pass cap for `converge`.
    #[serde(default = "default_max_passes")]
    pub max_passes: usize,

    /// Rule configurations keyed by rule id; absent rules are enabled.
    #[serde(default)]
    pub rules: HashMap<String, RuleConfig>,
}

fn default_max_line_length() -> usize {
    DEFAULT_MAX_LINE_LENGTH
}

fn default_max_passes() -> usize {
    DEFAULT_MAX_PASSES
}

impl Default for AlignConfig {
    fn default() -> Self {
        let mut rules = HashMap::new();
        for policy in Policy::ALL {
            rules.insert(
                policy.rule_id().to_string(),
                RuleConfig { description: Some(policy.description().to_string()), ..RuleConfig::default() },
            );
        }
        Self { max_line_length: DEFAULT_MAX_LINE_LENGTH, max_passes: DEFAULT_MAX_PASSES, rules }
    }
}

impl AlignConfig {
    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Enable or disable one policy.
    pub fn with_policy(mut self, policy: Policy, enabled: bool) -> Self {
        self.rules.entry(policy.rule_id().to_string()).or_default().enabled = enabled;
        self
    }

    /// Only the given policies stay enabled.
    pub fn only(mut self, policies: &[Policy]) -> Self {
        for policy in Policy::ALL {
            self = self.with_policy(policy, policies.contains(&policy));
        }
        self
    }

    /// Parse TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML alignment config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).with_context(|| {
            format!("Failed to read alignment config from {}", path.as_ref().display())
        })?;

        let config: Self = toml::from_str(&content).with_context(|| {
            format!("Failed to parse TOML config from {}", path.as_ref().display())
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from YAML file
    pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).with_context(|| {
            format!("Failed to read alignment config from {}", path.as_ref().display())
        })?;

        let config: Self = serde_yaml::from_str(&content).with_context(|| {
            format!("Failed to parse YAML config from {}", path.as_ref().display())
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize alignment config to TOML")?;

        std::fs::write(&path, content).with_context(|| {
            format!("Failed to write alignment config to {}", path.as_ref().display())
        })?;

        Ok(())
    }

    pub fn get_rule(&self, rule_id: &str) -> Option<&RuleConfig> {
        self.rules.get(rule_id)
    }

    pub fn is_enabled(&self, policy: Policy) -> bool {
        self.get_rule(policy.rule_id()).map_or(true, |rule| rule.enabled)
    }

    pub fn severity(&self, policy: Policy) -> RuleSeverity {
        self.get_rule(policy.rule_id()).map(|rule| rule.severity).unwrap_or_default()
    }

    /// Enabled policies in their fixed execution order.
    pub fn enabled_policies(&self) -> Vec<Policy> {
        Policy::ALL.into_iter().filter(|policy| self.is_enabled(*policy)).collect()
    }

    /// Fail fast on structurally invalid values; returns non-fatal warnings.
    pub fn validate(&self) -> AlignResult<Vec<String>> {
        if self.max_line_length == 0 {
            return Err(AlignError::InvalidMaxLineLength(self.max_line_length));
        }
        if self.max_passes == 0 {
            return Err(AlignError::InvalidPassLimit(self.max_passes));
        }

        let mut warnings = Vec::new();
        let mut unknown: Vec<&String> =
            self.rules.keys().filter(|id| Policy::from_rule_id(id).is_none()).collect();
        unknown.sort();
        for rule_id in unknown {
            tracing::warn!(rule = %rule_id, "unknown rule in alignment config");
            warnings.push(format!("Unknown rule '{}'", rule_id));
        }
        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AlignConfig::default();
        assert_eq!(config.max_line_length, 120);
        assert_eq!(config.max_passes, 10);
        assert_eq!(config.enabled_policies(), Policy::ALL.to_vec());
        assert!(config.validate().unwrap().is_empty());
    }

    #[test]
    fn test_zero_width_fails_fast() {
        let config = AlignConfig::default().with_max_line_length(0);
        assert!(matches!(config.validate(), Err(AlignError::InvalidMaxLineLength(0))));

        let config = AlignConfig::default().with_max_passes(0);
        assert!(matches!(config.validate(), Err(AlignError::InvalidPassLimit(0))));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AlignConfig::from_toml_str(
            "max_line_length = 80\n[rules.\"Style/EndlessMethod\"]\nenabled = false\n",
        )
        .unwrap();
        assert_eq!(config.max_line_length, 80);
        assert_eq!(config.max_passes, DEFAULT_MAX_PASSES);
        assert!(!config.is_enabled(Policy::EndlessMethod));
        assert!(config.is_enabled(Policy::CondenseWhen));
    }

    #[test]
    fn test_unknown_rule_is_a_warning() {
        let config = AlignConfig::from_toml_str("[rules.\"Layout/Nope\"]\nenabled = true\n").unwrap();
        let warnings = config.validate().unwrap();
        assert_eq!(warnings, vec!["Unknown rule 'Layout/Nope'".to_string()]);
    }

    #[test]
    fn test_invalid_file_reports_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"max_line_length = 0\n").unwrap();
        let err = AlignConfig::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("max_line_length must be positive"));
    }

    #[test]
    fn test_config_file_roundtrip() {
        let config = AlignConfig::default().with_max_line_length(90).with_policy(Policy::AlignAssignments, false);
        let temp_file = NamedTempFile::new().unwrap();
        config.save_to_file(temp_file.path()).unwrap();

        let loaded = AlignConfig::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_yaml_config() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"max_line_length: 100\nrules:\n  Layout/AlignAssignments:\n    severity: warning\n")
            .unwrap();
        let config = AlignConfig::load_from_yaml(file.path()).unwrap();
        assert_eq!(config.max_line_length, 100);
        assert_eq!(config.severity(Policy::AlignAssignments), RuleSeverity::Warning);
        assert_eq!(config.severity(Policy::CondenseWhen), RuleSeverity::Info);
    }

    #[test]
    fn test_only() {
        let config = AlignConfig::default().only(&[Policy::CondenseWhen]);
        assert_eq!(config.enabled_policies(), vec![Policy::CondenseWhen]);
    }
}
