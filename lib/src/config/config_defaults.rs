// lib/src/config/config_defaults.rs
use std::path::PathBuf;

use crate::config::config_structs::StorageEngineType;

pub const DEFAULT_CONFIG_FILE: &str = "config/hms.yaml";
pub const DEFAULT_DATA_DIRECTORY: &str = "/tmp/hms_data";
pub const DEFAULT_REST_API_PORT: u16 = 8082;
pub const ENV_PREFIX: &str = "HMS";
pub const ENV_SEPARATOR: &str = "__";
/// Used only when no secret is configured; never fit for production.
pub const DEVELOPMENT_JWT_SECRET: &str = "hms-development-secret-change-me";

pub fn default_host() -> String { "127.0.0.1".to_string() }
pub fn default_port() -> u16 { DEFAULT_REST_API_PORT }
pub fn default_jwt_secret() -> String { String::new() }
pub fn default_access_token_ttl_minutes() -> i64 { 15 }
pub fn default_refresh_token_ttl_hours() -> i64 { 168 }
pub fn default_storage_engine_type() -> StorageEngineType { StorageEngineType::Sled }
pub fn default_data_directory() -> PathBuf { PathBuf::from(DEFAULT_DATA_DIRECTORY) }
pub fn default_admin_email() -> String { "system.admin@hospital.com".to_string() }
pub fn default_admin_password() -> String { "Admin@12345".to_string() }
pub fn default_admin_employee_id() -> String { "ADM0001".to_string() }
pub fn default_admin_first_name() -> String { "System".to_string() }
pub fn default_admin_last_name() -> String { "Admin".to_string() }
pub fn default_admin_phone_number() -> String { "+0000000000".to_string() }
