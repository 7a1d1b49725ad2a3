// lib/src/config/mod.rs
// Layered configuration: serde defaults, then an optional YAML/TOML file, then
// HMS__SECTION__KEY environment variables.

pub mod config_defaults;
pub mod config_structs;

pub use config_defaults::*;
pub use config_structs::{
    AppConfig, AuthConfig, BootstrapConfig, ServerConfig, StorageConfig, StorageEngineType,
};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ::config::{Config, ConfigError, Environment, File as ConfigFile};
use log::{info, warn};

impl AppConfig {
    /// Loads configuration from `path` (or `config/hms.yaml`) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
        Self::load_from(path, None)
    }

    /// As [`AppConfig::load`], reading environment overrides from `env` instead of the process.
    pub fn load_from(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<AppConfig, ConfigError> {
        let file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config_builder = Config::builder();
        if file.exists() {
            info!("Loading configuration from {:?}", file);
            config_builder = config_builder.add_source(ConfigFile::from(file.as_path()));
        } else if path.is_some() {
            return Err(ConfigError::NotFound(file.display().to_string()));
        }

        config_builder = config_builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(env),
        );

        let mut app_config: AppConfig = config_builder.build()?.try_deserialize()?;
        if app_config.auth.jwt_secret.trim().is_empty() {
            warn!("No JWT secret configured (HMS__AUTH__JWT_SECRET); using the development secret");
            app_config.auth.jwt_secret = DEVELOPMENT_JWT_SECRET.to_string();
        }
        Ok(app_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn should_fall_back_to_defaults() {
        let missing = PathBuf::from("/nonexistent/hms.yaml");
        assert!(AppConfig::load_from(Some(&missing), Some(HashMap::new())).is_err());

        let config = AppConfig::load_from(None, Some(HashMap::new())).unwrap();
        assert_eq!(config.server.port, 8082);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.storage.engine, StorageEngineType::Sled);
        assert_eq!(config.auth.access_token_ttl_minutes, 15);
        assert_eq!(config.auth.jwt_secret, DEVELOPMENT_JWT_SECRET);
        assert_eq!(config.bootstrap.email, "system.admin@hospital.com");
    }

    #[test]
    fn should_layer_file_and_environment() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "server:\n  port: 9000\nstorage:\n  engine: in_memory\nauth:\n  jwt_secret: from-file"
        )
        .unwrap();

        let env = HashMap::from([
            ("HMS__SERVER__PORT".to_string(), "9090".to_string()),
            ("HMS__AUTH__REFRESH_TOKEN_TTL_HOURS".to_string(), "24".to_string()),
        ]);
        let config = AppConfig::load_from(Some(file.path()), Some(env)).unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.storage.engine, StorageEngineType::InMemory);
        assert_eq!(config.auth.jwt_secret, "from-file");
        assert_eq!(config.auth.refresh_token_ttl_hours, 24);
        assert_eq!(config.auth.access_token_ttl_minutes, 15);
    }
}
