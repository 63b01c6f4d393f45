use alignment_render_client::{CacheConfig, ClientConfig, DispatcherConfig};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use getset::Getters;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use strum_macros::Display;

const ENV_PREFIX: &str = "ALNVIEW_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Serialize, Deserialize, Getters)]
#[get = "pub"]
pub struct RendererSettings {
    url: String,
    path: String,
    timeout_secs: u64,
    max_concurrent: usize,
}

impl Default for RendererSettings {
    fn default() -> Self {
        let defaults = DispatcherConfig::default();
        Self {
            url: defaults.base_url,
            path: defaults.alignment_path,
            timeout_secs: defaults.timeout.as_secs(),
            max_concurrent: defaults.max_concurrent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Getters)]
#[get = "pub"]
pub struct CacheSettings {
    backend: CacheBackend,
    redis_url: String,
    key_prefix: String,
    ttl_minutes: i64,
    max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let defaults = CacheConfig::default();
        Self {
            backend: CacheBackend::Memory,
            redis_url: "redis://localhost:6379/3".to_string(),
            key_prefix: "alignment-image:".to_string(),
            ttl_minutes: defaults.ttl.num_minutes(),
            max_entries: defaults.max_entries,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Getters)]
#[get = "pub"]
pub struct Config {
    address: String,
    port: u16,
    log_level: String,
    renderer: RendererSettings,
    cache: CacheSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8000,
            log_level: "info".to_string(),
            renderer: RendererSettings::default(),
            cache: CacheSettings::default(),
        }
    }
}

impl Config {
    /// Defaults, overridden by the YAML file at `path` (if present), overridden
    /// by `ALNVIEW_*` environment variables.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        Self::from_figment(
            Figment::from(Serialized::defaults(Config::default()))
                .merge(Yaml::file(path))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self, figment::Error> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), figment::Error> {
        let ttl = self.cache.ttl_minutes;
        if ttl < 1 || chrono::Duration::try_minutes(ttl).is_none() {
            return Err(figment::Error::from(format!(
                "cache.ttl_minutes out of range: {}",
                ttl
            )));
        }
        if self.cache.backend == CacheBackend::Redis && self.cache.key_prefix.is_empty() {
            return Err(figment::Error::from(
                "cache.key_prefix must not be empty with the redis backend".to_string(),
            ));
        }
        Ok(())
    }

    pub fn log_level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(self.log_level.trim()).unwrap_or(LevelFilter::Info)
    }

    /// The single configuration handed to the render client.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            cache: CacheConfig::new(
                chrono::Duration::try_minutes(self.cache.ttl_minutes.max(1))
                    .unwrap_or(CacheConfig::default().ttl),
                self.cache.max_entries,
            ),
            dispatcher: DispatcherConfig {
                base_url: self.renderer.url.clone(),
                alignment_path: self.renderer.path.clone(),
                timeout: std::time::Duration::from_secs(self.renderer.timeout_secs.max(1)),
                max_concurrent: self.renderer.max_concurrent,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempdir::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let config = Config::from_figment(Figment::from(Serialized::defaults(Config::default())))
            .unwrap();

        assert_eq!(*config.port(), 8000);
        assert_eq!(*config.cache().backend(), CacheBackend::Memory);
        assert_eq!(*config.cache().ttl_minutes(), 60);
        assert_eq!(config.log_level_filter(), LevelFilter::Info);
    }

    #[test]
    fn test_yaml_overrides_defaults() {
        let dir = TempDir::new("api-server-config").unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "port: 9000\nlog_level: debug\nrenderer:\n  url: http://renderer:5000\ncache:\n  backend: redis\n  ttl_minutes: 5\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(*config.port(), 9000);
        assert_eq!(config.log_level_filter(), LevelFilter::Debug);
        assert_eq!(*config.cache().backend(), CacheBackend::Redis);
        // Keys missing from the file keep their defaults.
        assert_eq!(config.renderer().path(), "generate_fig");
        assert_eq!(*config.cache().max_entries(), 1000);

        let client_config = config.client_config();
        assert_eq!(client_config.cache.ttl, chrono::Duration::minutes(5));
        assert_eq!(client_config.dispatcher.base_url, "http://renderer:5000");
        assert_eq!(client_config.dispatcher.timeout.as_secs(), 120);
    }

    #[test]
    fn test_unknown_log_level_falls_back_to_info() {
        let config = Config::from_figment(
            Figment::from(Serialized::defaults(Config::default()))
                .merge(Yaml::string("log_level: chatty")),
        )
        .unwrap();
        assert_eq!(config.log_level_filter(), LevelFilter::Info);
    }

    #[test]
    fn test_rejects_out_of_range_ttl() {
        for ttl in ["0", "-5", "9223372036854775807"] {
            let result = Config::from_figment(
                Figment::from(Serialized::defaults(Config::default()))
                    .merge(Yaml::string(&format!("cache:\n  ttl_minutes: {}\n", ttl))),
            );
            assert!(result.is_err(), "ttl_minutes {} accepted", ttl);
        }
    }

    #[test]
    fn test_rejects_empty_redis_prefix() {
        let result = Config::from_figment(
            Figment::from(Serialized::defaults(Config::default()))
                .merge(Yaml::string("cache:\n  backend: redis\n  key_prefix: \"\"\n")),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_unknown_backend() {
        let result = Config::from_figment(
            Figment::from(Serialized::defaults(Config::default()))
                .merge(Yaml::string("cache:\n  backend: memcached\n")),
        );
        assert!(result.is_err());
    }
}
