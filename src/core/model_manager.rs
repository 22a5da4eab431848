//! Model name mapping between client-facing and upstream models
//!
//! Clients name models in their own dialect's vocabulary; the configured
//! upstream serves its own. Claude tier names (haiku, sonnet, opus) map to
//! the configured small/middle/big models; anything else passes through
//! unchanged.

use crate::core::config::Config;

/// Maps inbound model names to upstream model names
pub struct ModelManager {
    config: Config,
}

impl ModelManager {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Map an inbound model name to the configured upstream model.
    pub fn map_model(&self, model: &str) -> String {
        let model_lower = model.to_lowercase();
        if model_lower.contains("haiku") {
            self.config.small_model.clone()
        } else if model_lower.contains("sonnet") {
            self.config.middle_model.clone()
        } else if model_lower.contains("opus") {
            self.config.big_model.clone()
        } else {
            model.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::Dialect;

    fn create_test_config() -> Config {
        Config {
            client_api_key: None,
            upstream_dialect: Dialect::Chat,
            upstream_base_url: "https://api.openai.com/v1".to_string(),
            upstream_api_key: "sk-test".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8084,
            log_level: "info".to_string(),
            request_timeout: 90,
            big_model: "gpt-4o".to_string(),
            middle_model: "gpt-4o".to_string(),
            small_model: "gpt-4o-mini".to_string(),
        }
    }

    #[test]
    fn test_map_haiku_model() {
        let manager = ModelManager::new(create_test_config());
        assert_eq!(manager.map_model("claude-3-haiku-20240307"), "gpt-4o-mini");
    }

    #[test]
    fn test_map_sonnet_model() {
        let manager = ModelManager::new(create_test_config());
        assert_eq!(manager.map_model("claude-3-5-sonnet-20241022"), "gpt-4o");
    }

    #[test]
    fn test_map_opus_model() {
        let manager = ModelManager::new(create_test_config());
        assert_eq!(manager.map_model("claude-3-opus-20240229"), "gpt-4o");
    }

    #[test]
    fn test_passthrough_unknown_model() {
        let manager = ModelManager::new(create_test_config());
        assert_eq!(manager.map_model("gpt-4-turbo"), "gpt-4-turbo");
        assert_eq!(manager.map_model("deepseek-chat"), "deepseek-chat");
    }
}
