//! Runtime configuration

use serde::{Deserialize, Serialize};

/// What happens when the serial thread queue drains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    /// The program completes and stays stopped
    #[default]
    Halt,
    /// The root program is reinstalled and runs again
    Restart,
}

/// Program-level tunables, deserializable from embedder config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramConfig {
    /// Upper bound on transfer operations per transfer command activation
    pub max_transfers: usize,
    pub on_complete: CompletionPolicy,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        ProgramConfig {
            max_transfers: 10,
            on_complete: CompletionPolicy::Halt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProgramConfig::default();
        assert_eq!(config.max_transfers, 10);
        assert_eq!(config.on_complete, CompletionPolicy::Halt);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: ProgramConfig =
            serde_json::from_value(serde_json::json!({ "on_complete": "restart" })).unwrap();
        assert_eq!(config.max_transfers, 10);
        assert_eq!(config.on_complete, CompletionPolicy::Restart);
    }

    #[test]
    fn test_roundtrip() {
        let config = ProgramConfig {
            max_transfers: 3,
            on_complete: CompletionPolicy::Restart,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<ProgramConfig>(&json).unwrap(), config);
    }
}
