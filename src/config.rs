use crate::classifier::ModelVariant;
use crate::reasons::ReasonStrategy;
use serde::Deserialize;
use std::path::PathBuf;

const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub model_dir: PathBuf,
    pub model_variant: ModelVariant,
    pub reason_strategy: ReasonStrategy,
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    /// Requests per second per client IP. 0 disables rate limiting.
    pub rate_limit_per_second: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            model_dir: std::env::var("MODEL_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("models")),
            model_variant: std::env::var("MODEL_VARIANT")
                .unwrap_or_else(|_| ModelVariant::RandomForestCreditScore.name().to_string())
                .parse()
                .map_err(|e: String| anyhow::anyhow!("MODEL_VARIANT: {}", e))?,
            reason_strategy: std::env::var("REASON_STRATEGY")
                .unwrap_or_else(|_| "rules".to_string())
                .parse()
                .map_err(|e: String| anyhow::anyhow!("REASON_STRATEGY: {}", e))?,
            llm_api_key: std::env::var("LLM_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .ok()
                .filter(|s| !s.trim().is_empty()),
            llm_base_url: std::env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_LLM_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            llm_model: std::env::var("LLM_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            llm_timeout_secs: std::env::var("LLM_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("LLM_TIMEOUT_SECS must be a whole number of seconds"))?,
            rate_limit_per_second: std::env::var("RATE_LIMIT_PER_SECOND")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("RATE_LIMIT_PER_SECOND must be a whole number"))?,
        };

        config.validate()?;

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Model: {} in {}", config.model_variant, config.model_dir.display());
        tracing::debug!("Reason strategy: {}", config.reason_strategy);
        tracing::debug!("LLM Base URL: {}", config.llm_base_url);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// Cross-field checks shared by `from_env` and hand-built configs.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.llm_base_url.starts_with("http://") && !self.llm_base_url.starts_with("https://") {
            anyhow::bail!("LLM_BASE_URL must start with http:// or https://");
        }
        if self.llm_timeout_secs == 0 {
            anyhow::bail!("LLM_TIMEOUT_SECS must be greater than zero");
        }
        if self.reason_strategy == ReasonStrategy::Model && self.llm_api_key.is_none() {
            anyhow::bail!("LLM_API_KEY or OPENAI_API_KEY is required when REASON_STRATEGY=model");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            port: 3000,
            model_dir: PathBuf::from("models"),
            model_variant: ModelVariant::XgboostOneHotNoCreditScore,
            reason_strategy: ReasonStrategy::Rules,
            llm_api_key: None,
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_timeout_secs: 30,
            rate_limit_per_second: 10,
        }
    }

    #[test]
    fn test_model_strategy_requires_key() {
        let mut config = base();
        config.reason_strategy = ReasonStrategy::Model;
        assert!(config.validate().is_err());

        config.llm_api_key = Some("sk-test".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_base_url_scheme() {
        let mut config = base();
        config.llm_base_url = "api.openai.com".to_string();
        assert!(config.validate().is_err());
    }
}
