//! Expander settings.
//!
//! Everything has a default, so an empty document is a valid configuration:
//!
//! ```yaml
//! color: never          # auto | always | never
//! warn_on_fallback: true
//! tree_style: ascii     # unicode | ascii
//! ```

use serde::{Deserialize, Serialize};

use crate::ast::TreeStyle;
use crate::err_msg;
use crate::MactenError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExpanderConfig {
    /// Coloring of diagnostics written to a terminal.
    pub color: ColorMode,
    /// Emit a warning when a construct has no handler and is printed instead.
    pub warn_on_fallback: bool,
    /// Connectors used by the fallback tree printer.
    pub tree_style: TreeStyle,
}

impl Default for ExpanderConfig {
    fn default() -> Self {
        Self {
            color: ColorMode::Auto,
            warn_on_fallback: true,
            tree_style: TreeStyle::Unicode,
        }
    }
}

impl ExpanderConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, MactenError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
            .map_err(|e| err_msg!(Config, "Invalid YAML configuration: {}", e).with_source(e))
    }

    pub fn from_json_str(text: &str) -> Result<Self, MactenError> {
        serde_json::from_str(text)
            .map_err(|e| err_msg!(Config, "Invalid JSON configuration: {}", e).with_source(e))
    }

    pub fn to_yaml_string(&self) -> Result<String, MactenError> {
        serde_yaml::to_string(self)
            .map_err(|e| err_msg!(Config, "Could not write configuration: {}", e).with_source(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorType;

    #[test]
    fn empty_documents_give_defaults() {
        assert_eq!(ExpanderConfig::from_yaml_str("").unwrap(), ExpanderConfig::default());
        assert_eq!(ExpanderConfig::from_json_str("{}").unwrap(), ExpanderConfig::default());
        assert!(ExpanderConfig::default().warn_on_fallback);
    }

    #[test]
    fn reads_yaml() {
        let config =
            ExpanderConfig::from_yaml_str("color: never\ntree_style: ascii\nwarn_on_fallback: false\n")
                .unwrap();
        assert_eq!(config.color, ColorMode::Never);
        assert_eq!(config.tree_style, TreeStyle::Ascii);
        assert!(!config.warn_on_fallback);
    }

    #[test]
    fn reads_json() {
        let config = ExpanderConfig::from_json_str(r#"{"color": "always"}"#).unwrap();
        assert_eq!(config.color, ColorMode::Always);
        assert_eq!(config.tree_style, TreeStyle::Unicode);
    }

    #[test]
    fn rejects_unknown_keys_and_values() {
        let err = ExpanderConfig::from_yaml_str("colour: never").unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
        assert!(ExpanderConfig::from_json_str(r#"{"color": "sometimes"}"#).is_err());
    }

    #[test]
    fn yaml_survives_a_write_and_read() {
        let config = ExpanderConfig {
            color: ColorMode::Never,
            ..ExpanderConfig::default()
        };
        let text = config.to_yaml_string().unwrap();
        assert_eq!(ExpanderConfig::from_yaml_str(&text).unwrap(), config);
    }
}
