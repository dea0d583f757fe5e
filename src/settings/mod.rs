use std::{env, path::PathBuf};
use tracing::debug;

mod error;
mod gateway;
pub mod logging;
mod schema;
mod validator;

pub use error::SettingsError;
pub use gateway::{BasicAuthOptions, GatewayConfig, ProxyInformation};
pub use logging::{LogFormat, LogOutput, LogSettings};
pub use schema::GATEWAY_CONFIG_SCHEMA;
pub use validator::ConfigValidator;

pub type Result<T> = std::result::Result<T, SettingsError>;

pub const CONFIG_FILE_ENV: &str = "GATEWAY_CONFIG_FILE";
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone)]
pub struct Settings {
    pub gateway: GatewayConfig,
    pub logging: LogSettings,
}

impl Settings {
    /// 환경 변수에서 설정 파일 경로와 로깅 설정을 읽어 전체 설정을 로드합니다.
    pub async fn load() -> Result<Self> {
        let logging = LogSettings::from_env()?;
        let path = Self::config_path();
        debug!(path = %path.display(), "설정 로드");

        Ok(Self {
            gateway: GatewayConfig::from_file(&path).await?,
            logging,
        })
    }

    pub fn config_path() -> PathBuf {
        env::var(CONFIG_FILE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

pub fn parse_env_var<T: std::str::FromStr, F: FnOnce() -> T>(name: &str, default: F) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val.parse().map_err(|e: T::Err| SettingsError::EnvVarInvalid {
            var_name: name.to_string(),
            value: val,
            reason: e.to_string(),
        }),
        Err(env::VarError::NotPresent) => Ok(default()),
        Err(e) => Err(SettingsError::EnvVarInvalid {
            var_name: name.to_string(),
            value: "".to_string(),
            reason: e.to_string(),
        }),
    }
}
