use crate::config::{Endpoint, LlmConfig};

/// Model-name-prefix to provider-endpoint lookup table.
///
/// Several hosted providers expose the same OpenAI-compatible wire format at
/// different base URLs, and which one serves a request is decided purely by
/// the model name (e.g. `gpt-*`, `gemini-*`, `typhoon-*`). Routes are checked
/// in configuration order; anything unmatched goes to the default endpoint.
pub struct LlmRouter {
    routes: Vec<(String, Endpoint)>,
    default_endpoint: Endpoint,
}

impl LlmRouter {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            routes: config.routes.clone(),
            default_endpoint: config.default_endpoint.clone(),
        }
    }

    pub fn endpoint_for(&self, model: &str) -> &Endpoint {
        self.routes
            .iter()
            .find(|(prefix, _)| model.starts_with(prefix.as_str()))
            .map(|(_, endpoint)| endpoint)
            .unwrap_or(&self.default_endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> LlmRouter {
        LlmRouter {
            routes: vec![
                (
                    "gpt-".to_string(),
                    Endpoint {
                        base_url: "https://api.openai.com/v1".to_string(),
                        api_key: Some("k1".to_string()),
                    },
                ),
                (
                    "gemini-".to_string(),
                    Endpoint {
                        base_url: "https://gemini.example/v1".to_string(),
                        api_key: Some("k2".to_string()),
                    },
                ),
            ],
            default_endpoint: Endpoint {
                base_url: "http://localhost:11434/v1".to_string(),
                api_key: None,
            },
        }
    }

    #[test]
    fn test_prefix_match_selects_route() {
        let r = router();
        assert_eq!(r.endpoint_for("gpt-4o").base_url, "https://api.openai.com/v1");
        assert_eq!(
            r.endpoint_for("gemini-2.5-flash").base_url,
            "https://gemini.example/v1"
        );
    }

    #[test]
    fn test_unmatched_model_falls_back_to_default() {
        let r = router();
        assert_eq!(r.endpoint_for("llama3.2").base_url, "http://localhost:11434/v1");
        assert!(r.endpoint_for("llama3.2").api_key.is_none());
    }

    #[test]
    fn test_first_matching_route_wins() {
        let r = router();
        // "gpt-" is listed before "gemini-"; a model matching both would take
        // the first, and exact ordering is part of the contract.
        assert_eq!(r.endpoint_for("gpt-gemini-hybrid").base_url, "https://api.openai.com/v1");
    }
}
