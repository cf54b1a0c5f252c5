//! 配置文件格式
//!
//! `ConfigFormat` owns everything format specific: detection from a path,
//! decoding into `RelayConfig` and encoding back. TOML is the primary format.

use std::fmt;
use std::path::Path;

use contracts::{ContractError, RelayConfig};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// Format for a file extension, case-insensitive
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    /// Format of a config file, from its extension
    ///
    /// # Errors
    /// `ConfigParse` if the path has no extension or an unsupported one
    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse(format!(
                "cannot determine config format of '{}'",
                path.display()
            ))
        })?;
        Self::from_extension(ext)
            .ok_or_else(|| ContractError::config_parse(format!("unsupported config format: .{ext}")))
    }

    /// Decode a configuration; no validation beyond the schema
    pub fn decode(self, content: &str) -> Result<RelayConfig, ContractError> {
        match self {
            Self::Toml => toml::from_str(content).map_err(|e| self.decode_error(e)),
            Self::Json => serde_json::from_str(content).map_err(|e| self.decode_error(e)),
        }
    }

    /// Encode a configuration in this format
    pub fn encode(self, config: &RelayConfig) -> Result<String, ContractError> {
        let encoded = match self {
            Self::Toml => toml::to_string_pretty(config).map_err(|e| e.to_string()),
            Self::Json => serde_json::to_string_pretty(config).map_err(|e| e.to_string()),
        };
        encoded.map_err(|e| ContractError::config_parse(format!("{self} serialize error: {e}")))
    }

    fn decode_error(self, e: impl std::error::Error + Send + Sync + 'static) -> ContractError {
        ContractError::ConfigParse {
            message: format!("{self} parse error: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{FormatTag, OrderingMode, SenderType, ShutdownPolicy};

    #[test]
    fn test_decode_toml_full() {
        let content = r#"
[pipeline]
worker_count = 4
queue_capacity = 16
ordering = "submission"
shutdown = "abandon"

[input]
format = "csv"

[[routes]]
kind = "email"
sender = "log"

[[routes]]
kind = "telegram"
sender = "log"
params = { channel = "tg-bot" }
"#;
        let config = ConfigFormat::Toml.decode(content).unwrap();
        assert_eq!(config.pipeline.worker_count, 4);
        assert_eq!(config.pipeline.queue_capacity, 16);
        assert_eq!(config.pipeline.ordering, OrderingMode::Submission);
        assert_eq!(config.pipeline.shutdown, ShutdownPolicy::Abandon);
        assert_eq!(config.input.format, FormatTag::Tabular);
        assert_eq!(config.routes.len(), 2);
        assert_eq!(config.routes[1].params["channel"], "tg-bot");
    }

    #[test]
    fn test_decode_json_defaults() {
        let content = r#"{ "routes": [{ "kind": "sms", "sender": "discard" }] }"#;
        let config = ConfigFormat::Json.decode(content).unwrap();
        assert_eq!(config.pipeline.worker_count, 1);
        assert_eq!(config.input.format, FormatTag::Structured);
        assert_eq!(config.routes[0].sender, SenderType::Discard);
    }

    #[test]
    fn test_decode_errors_name_the_format() {
        let err = ConfigFormat::Toml.decode("invalid toml [[[").unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { source: Some(_), .. }));
        assert!(err.to_string().contains("TOML parse error"));

        let pigeon = "[[routes]]\nkind = \"pager\"\nsender = \"carrier_pigeon\"\n";
        assert!(ConfigFormat::Toml.decode(pigeon).is_err());
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);

        assert_eq!(
            ConfigFormat::from_path(Path::new("conf/relay.json")).unwrap(),
            ConfigFormat::Json
        );
        assert!(ConfigFormat::from_path(Path::new("relay")).is_err());
    }
}
