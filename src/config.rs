use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub enable: bool,
    pub merge_json_url: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            enable: false,
            merge_json_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpiderConfig {
    pub enable: bool,
    /// URL of the remote friend roster JSON.
    pub json_url: String,
    /// Per-friend article cap; 0 keeps everything the feed returned.
    pub article_count: usize,
    pub merge_result: MergeConfig,
}

impl Default for SpiderConfig {
    fn default() -> Self {
        Self {
            enable: false,
            json_url: String::new(),
            article_count: 0,
            merge_result: MergeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub concurrency: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            read_timeout_secs: 15,
            concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: String,
    pub level: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: "logs/friend-circle.log".to_string(),
            level: Some("info".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub spider: SpiderConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load the configuration from `CONFIG_FILE` or `conf.yaml`. A missing
    /// or unreadable file is the one fatal error of the whole program.
    pub fn from_env() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("conf.yaml"));
        if !path.exists() {
            return Err(anyhow!("config file {:?} not found", path));
        }
        let config = Self::load_from_file(&path)?;
        Self::apply_env_overrides(config)
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse config file {:?}", path))?;
        Ok(config)
    }

    fn apply_env_overrides(mut config: AppConfig) -> anyhow::Result<AppConfig> {
        if let Ok(url) = std::env::var("FRIENDS_JSON_URL") {
            config.spider.json_url = url;
        }

        if let Ok(url) = std::env::var("MERGE_JSON_URL") {
            config.spider.merge_result.merge_json_url = url;
        }

        if let Some(count) = parse_optional_env("ARTICLE_COUNT")? {
            config.spider.article_count = count;
        }

        if let Some(timeout) = parse_optional_env("FETCH_CONNECT_TIMEOUT_SECS")? {
            config.http.connect_timeout_secs = timeout;
        }

        if let Some(timeout) = parse_optional_env("FETCH_READ_TIMEOUT_SECS")? {
            config.http.read_timeout_secs = timeout;
        }

        if let Some(concurrency) = parse_optional_env("FETCH_CONCURRENCY")? {
            config.http.concurrency = concurrency;
        }

        if let Ok(log_file) = std::env::var("LOG_FILE_PATH") {
            config.logging.file = log_file;
        }

        if let Ok(log_level) = std::env::var("LOG_LEVEL") {
            config.logging.level = Some(log_level);
        }

        Ok(config)
    }
}

fn parse_optional_env<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => Ok(Some(
            v.parse::<T>()
                .with_context(|| format!("{key} must be a valid value"))?,
        )),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parses_full_spider_section() {
        let yaml = r#"
spider:
  enable: true
  json_url: "https://example.com/friends.json"
  article_count: 5
  merge_result:
    enable: true
    merge_json_url: "https://example.com/friend_data.json"
http:
  concurrency: 2
logging:
  level: debug
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.spider.enable);
        assert_eq!(config.spider.json_url, "https://example.com/friends.json");
        assert_eq!(config.spider.article_count, 5);
        assert!(config.spider.merge_result.enable);
        assert_eq!(
            config.spider.merge_result.merge_json_url,
            "https://example.com/friend_data.json"
        );
        assert_eq!(config.http.concurrency, 2);
        assert_eq!(config.http.connect_timeout_secs, 10);
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config: AppConfig = serde_yaml::from_str("spider:\n  enable: false\n").unwrap();
        assert!(!config.spider.enable);
        assert_eq!(config.spider.article_count, 0);
        assert_eq!(config.http.read_timeout_secs, 15);
        assert!(!config.spider.merge_result.enable);
    }

    #[test]
    fn load_from_file_round_trip() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "spider:\n  enable: true\n  json_url: http://x/f.json").unwrap();
        let config = AppConfig::load_from_file(file.path()).unwrap();
        assert!(config.spider.enable);
        assert_eq!(config.spider.json_url, "http://x/f.json");
    }

    #[test]
    fn load_from_missing_file_fails() {
        assert!(AppConfig::load_from_file(Path::new("/nonexistent/conf.yaml")).is_err());
    }
}
