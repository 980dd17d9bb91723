use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    pub leads_base_url: String,
    pub crm_base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    pub directory: String,
    pub lead_ttl_minutes: u64,
    pub max_entry_age_hours: u64,
    pub disk_budget_bytes: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub directory: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                leads_base_url: "http://localhost:9000".to_string(),
                crm_base_url: "http://localhost:8003".to_string(),
                timeout_seconds: 10,
            },
            cache: CacheConfig {
                directory: "data/cache".to_string(),
                lead_ttl_minutes: 30,
                max_entry_age_hours: 24,
                disk_budget_bytes: 5 * 1024 * 1024,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            output: OutputConfig {
                directory: "out".to_string(),
            },
        }
    }
}

pub async fn load_config(
    path: &str,
) -> std::result::Result<Config, Box<dyn std::error::Error + Send + Sync>> {
    let content = tokio::fs::read_to_string(path).await?;
    let config: Config = serde_yaml::from_str(&content)?;

    // Fail early on malformed base URLs instead of at the first request.
    url::Url::parse(&config.api.leads_base_url)
        .map_err(|e| format!("invalid leads_base_url: {}", e))?;
    url::Url::parse(&config.api.crm_base_url)
        .map_err(|e| format!("invalid crm_base_url: {}", e))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_local_backends() {
        let config = Config::default();
        assert_eq!(config.api.leads_base_url, "http://localhost:9000");
        assert_eq!(config.api.crm_base_url, "http://localhost:8003");
        assert_eq!(config.cache.lead_ttl_minutes, 30);
        assert_eq!(config.cache.max_entry_age_hours, 24);
    }
}
