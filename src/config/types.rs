use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::store::StoreConfig;

/// Prefix for environment overrides, e.g. `GYMTRON_JWT__SECRET`.
pub const ENV_PREFIX: &str = "GYMTRON_";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0, containing store, token signing, hashing and logging.
#[derive(Deserialize, Serialize, Debug, JsonSchema)]
pub struct ConfigV1 {
    pub store: StoreConfig,
    pub bind_address: String,
    pub jwt: JWTConfig,
    #[serde(default)]
    pub password: PasswordConfig,
    pub logging: LoggingConfig,
}

/// Load config from `./config.yaml` (or the file named by `GYMTRON_CONFIG_FILE`),
/// with `GYMTRON_`-prefixed environment variables layered on top.
pub fn load_config() -> ConfigV1 {
    let path =
        std::env::var("GYMTRON_CONFIG_FILE").unwrap_or_else(|_| "./config.yaml".to_string());
    let figment = Figment::new()
        .merge(Yaml::file(&path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["config_file"]).split("__"));
    let config = match figment.extract::<Config>() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration from {}: {}", path, e);
            std::process::exit(1);
        }
    };
    match config {
        Config::ConfigV1(c) => c,
    }
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() {
    let schema = schema_for!(Config);
    match serde_json::to_string_pretty(&schema) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Failed to render config schema: {}", e),
    }
}

/// Signing settings for issued bearer tokens.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct JWTConfig {
    pub iss: String,
    /// Token lifetime in seconds.
    #[serde(default = "default_token_lifetime")]
    pub exp: i64,
    pub secret: String,
}

fn default_token_lifetime() -> i64 {
    3600
}

/// Argon2id cost parameters used when hashing new passwords.
///
/// Stored hashes carry their own parameters, so raising these values
/// never invalidates existing credentials.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(default)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        PasswordConfig {
            memory_kib: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
version: "1.0.0"
bind_address: 127.0.0.1:3000
store:
  enabled: false
jwt:
  iss: gymtron
  secret: s3cret
logging:
  level: info
  format: console
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config: Config = Figment::new()
            .merge(Yaml::string(MINIMAL))
            .extract()
            .expect("config should parse");
        let Config::ConfigV1(cfg) = config;

        assert_eq!(cfg.jwt.exp, 3600);
        assert_eq!(cfg.password.iterations, 2);
        assert_eq!(cfg.logging.service_name, "gymtron");
        assert!(!cfg.store.enabled);
        assert!(cfg.store.backend.is_none());
    }

    #[test]
    fn test_mongo_backend_parses() {
        let yaml = r#"
version: "1.0.0"
bind_address: 0.0.0.0:3000
store:
  enabled: true
  type: mongo
  uri: mongodb://localhost:27017
  database: gym
jwt:
  iss: gymtron
  exp: 600
  secret: s3cret
password:
  iterations: 3
logging:
  level: debug
  format: json
"#;
        let config: Config = Figment::new()
            .merge(Yaml::string(yaml))
            .extract()
            .expect("config should parse");
        let Config::ConfigV1(cfg) = config;

        assert_eq!(cfg.jwt.exp, 600);
        assert_eq!(cfg.password.iterations, 3);
        assert_eq!(cfg.password.memory_kib, 19456);
        match cfg.store.backend {
            Some(crate::config::StoreBackend::MongoDB(m)) => assert_eq!(m.database, "gym"),
            None => panic!("expected a mongo backend"),
        }
    }
}
