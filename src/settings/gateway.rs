use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use regex_lite as regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::routing::{Protocol, Route, RouteTable};
use super::validator::ConfigValidator;
use super::{Result, SettingsError};

/// 라우트 한 건에 대한 설정 항목입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyInformation {
    pub proxy_type: Protocol,
    pub proxy_sub_domain: String,
    pub proxy_endpoint: String,
    #[serde(default)]
    pub proxy_notes: String,
    /// TCP 라우트 전용. 없으면 `<subdomain>.<listeningDomain>:<listeningTCPPort>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_listen_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicAuthOptions {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
}

/// 게이트웨이 설정입니다.
///
/// 시작 시 한 번 로드된 뒤 변경되지 않으며, 필요한 컴포넌트의 생성자로 전달됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    pub listening_domain: String,
    #[serde(rename = "listeningHTTPPort", default = "default_http_port")]
    pub listening_http_port: String,
    #[serde(rename = "listeningTLSPort", default = "default_tls_port")]
    pub listening_tls_port: String,
    #[serde(rename = "listeningTCPPort", default = "default_tcp_port")]
    pub listening_tcp_port: String,
    #[serde(default)]
    pub proxy_information: Vec<ProxyInformation>,
    #[serde(default)]
    pub basic_auth_options: BasicAuthOptions,
    #[serde(default)]
    pub tls_cert: String,
    #[serde(default)]
    pub tls_key: String,
    #[serde(default = "default_tcp_timeout_seconds")]
    pub tcp_timeout_seconds: u64,
    #[serde(default = "default_drain_timeout_seconds")]
    pub drain_timeout_seconds: u64,
}

fn default_http_port() -> String { "8080".to_string() }
fn default_tls_port() -> String { "8443".to_string() }
fn default_tcp_port() -> String { "9000".to_string() }
fn default_tcp_timeout_seconds() -> u64 { 600 }
fn default_drain_timeout_seconds() -> u64 { 0 }

fn subdomain_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$")
            .expect("subdomain pattern is a valid regex")
    })
}

impl GatewayConfig {
    /// 설정 파일을 읽어 스키마 검증과 값 검증을 거친 설정을 반환합니다.
    ///
    /// 확장자가 `.toml`이면 TOML로, 그 외에는 JSON으로 파싱합니다.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.to_string_lossy().to_string();
        debug!(path = %path_str, "게이트웨이 설정 파일 로드");

        let content = tokio::fs::read_to_string(path).await.map_err(|e| SettingsError::FileError {
            path: path_str.clone(),
            error: e,
        })?;

        let config = Self::from_document(&path_str, &content, is_toml(path))?;
        info!(
            path = %path_str,
            routes = config.proxy_information.len(),
            "게이트웨이 설정 로드 완료"
        );
        Ok(config)
    }

    /// 문자열 설정 문서를 파싱합니다. `origin`은 오류 메시지에만 사용됩니다.
    pub fn from_document(origin: &str, content: &str, toml_format: bool) -> Result<Self> {
        let document: Value = if toml_format {
            let value: toml::Value = toml::from_str(content).map_err(|e| SettingsError::ParseError {
                path: origin.to_string(),
                reason: e.to_string(),
            })?;
            serde_json::to_value(value).map_err(|e| SettingsError::ParseError {
                path: origin.to_string(),
                reason: e.to_string(),
            })?
        } else {
            serde_json::from_str(content).map_err(|e| SettingsError::ParseError {
                path: origin.to_string(),
                reason: e.to_string(),
            })?
        };

        ConfigValidator::new()?.validate(origin, &document)?;

        let config: Self = serde_json::from_value(document).map_err(|e| SettingsError::ParseError {
            path: origin.to_string(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// `write_default`가 기록하는 예제 설정
    pub fn sample() -> Self {
        Self {
            listening_domain: "4gr8.local".to_string(),
            listening_http_port: default_http_port(),
            listening_tls_port: default_tls_port(),
            listening_tcp_port: default_tcp_port(),
            proxy_information: vec![
                ProxyInformation {
                    proxy_type: Protocol::Https,
                    proxy_sub_domain: "api".to_string(),
                    proxy_endpoint: "http://localhost:8000".to_string(),
                    proxy_notes: "This is a test proxy".to_string(),
                    proxy_listen_address: None,
                },
                ProxyInformation {
                    proxy_type: Protocol::Http,
                    proxy_sub_domain: "app".to_string(),
                    proxy_endpoint: "http://localhost:8000".to_string(),
                    proxy_notes: "This is a test proxy".to_string(),
                    proxy_listen_address: None,
                },
                ProxyInformation {
                    proxy_type: Protocol::Tcp,
                    proxy_sub_domain: "tcp".to_string(),
                    proxy_endpoint: "localhost:18000".to_string(),
                    proxy_notes: "This is a test proxy".to_string(),
                    proxy_listen_address: None,
                },
            ],
            basic_auth_options: BasicAuthOptions::default(),
            tls_cert: "keys/tls.crt".to_string(),
            tls_key: "keys/tls.key".to_string(),
            tcp_timeout_seconds: default_tcp_timeout_seconds(),
            drain_timeout_seconds: default_drain_timeout_seconds(),
        }
    }

    /// 예제 설정을 JSON 파일로 기록합니다. 상위 디렉터리가 없으면 생성합니다.
    pub async fn write_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let path_str = path.to_string_lossy().to_string();

        let content = serde_json::to_string_pretty(&Self::sample())
            .map_err(|e| SettingsError::InvalidConfig(format!("예제 설정 직렬화 실패: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| SettingsError::FileError {
                path: parent.to_string_lossy().to_string(),
                error: e,
            })?;
        }

        tokio::fs::write(path, content).await.map_err(|e| SettingsError::FileError {
            path: path_str,
            error: e,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.listening_domain.trim().is_empty() {
            return Err(SettingsError::InvalidConfig("listeningDomain이 비어 있습니다".to_string()));
        }

        parse_port("listeningHTTPPort", &self.listening_http_port)?;
        parse_port("listeningTLSPort", &self.listening_tls_port)?;
        parse_port("listeningTCPPort", &self.listening_tcp_port)?;

        for info in &self.proxy_information {
            if !subdomain_pattern().is_match(&info.proxy_sub_domain) {
                return Err(SettingsError::InvalidConfig(format!(
                    "유효하지 않은 서브도메인: {}",
                    info.proxy_sub_domain
                )));
            }

            match info.proxy_type {
                Protocol::Http | Protocol::Https => validate_backend_url(&info.proxy_endpoint)?,
                Protocol::Tcp => {
                    validate_socket_address("proxyEndpoint", &info.proxy_endpoint, false)?;
                    if let Some(listen) = &info.proxy_listen_address {
                        validate_socket_address("proxyListenAddress", listen, true)?;
                    }
                }
            }
        }

        let auth = &self.basic_auth_options;
        if auth.enabled && (auth.username.is_empty() || auth.password.is_empty()) {
            return Err(SettingsError::InvalidConfig(
                "basicAuthOptions가 활성화되었지만 username/password가 비어 있습니다".to_string(),
            ));
        }

        if self.has_routes(Protocol::Https) && self.tls_paths().is_none() {
            return Err(SettingsError::InvalidConfig(
                "https 라우트에는 tlsCert와 tlsKey가 필요합니다".to_string(),
            ));
        }

        Ok(())
    }

    pub fn has_routes(&self, protocol: Protocol) -> bool {
        self.proxy_information.iter().any(|info| info.proxy_type == protocol)
    }

    pub fn http_listen_address(&self) -> String {
        format!("{}:{}", self.listening_domain, self.listening_http_port)
    }

    pub fn https_listen_address(&self) -> String {
        format!("{}:{}", self.listening_domain, self.listening_tls_port)
    }

    /// TCP 라우트의 리슨 주소
    pub fn tcp_listen_address(&self, info: &ProxyInformation) -> String {
        info.proxy_listen_address.clone().unwrap_or_else(|| {
            format!(
                "{}.{}:{}",
                info.proxy_sub_domain, self.listening_domain, self.listening_tcp_port
            )
        })
    }

    pub fn tls_paths(&self) -> Option<(PathBuf, PathBuf)> {
        if self.tls_cert.trim().is_empty() || self.tls_key.trim().is_empty() {
            return None;
        }
        Some((PathBuf::from(&self.tls_cert), PathBuf::from(&self.tls_key)))
    }

    /// 0이면 타임아웃 없음
    pub fn tcp_timeout(&self) -> Option<Duration> {
        match self.tcp_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// 종료 시 진행 중인 연결을 기다리는 상한. 0이면 각 연결이 스스로 끝날 때까지 기다립니다.
    pub fn drain_timeout(&self) -> Option<Duration> {
        match self.drain_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// 설정 순서대로 라우트를 추가해 불변 라우트 테이블을 만듭니다.
    pub fn route_table(&self) -> Result<RouteTable> {
        let mut table = RouteTable::new();

        for info in &self.proxy_information {
            let listen_address = match info.proxy_type {
                Protocol::Tcp => Some(self.tcp_listen_address(info)),
                Protocol::Http | Protocol::Https => None,
            };

            let route = Route {
                protocol: info.proxy_type,
                subdomain: info.proxy_sub_domain.clone(),
                backend_endpoint: info.proxy_endpoint.clone(),
                notes: info.proxy_notes.clone(),
                listen_address,
            };

            table
                .add_route(route)
                .map_err(|e| SettingsError::InvalidConfig(e.to_string()))?;
        }

        if table.is_empty() {
            warn!("설정된 라우트가 없습니다");
        }

        Ok(table)
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("toml"))
}

pub(crate) fn parse_port(name: &str, value: &str) -> Result<u16> {
    value.trim().parse::<u16>().map_err(|_| SettingsError::InvalidConfig(format!(
        "{} 값 {}: 포트는 0-65535 범위의 숫자여야 합니다",
        name, value
    )))
}

fn validate_backend_url(endpoint: &str) -> Result<()> {
    let url = Url::parse(endpoint).map_err(|e| SettingsError::InvalidConfig(format!(
        "유효하지 않은 백엔드 URL {}: {}",
        endpoint, e
    )))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(SettingsError::InvalidConfig(format!(
            "지원하지 않는 백엔드 스킴 {} ({}): http 또는 https만 지원합니다",
            url.scheme(),
            endpoint
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(SettingsError::InvalidConfig(format!("백엔드 URL에 호스트가 없습니다: {}", endpoint)));
    }

    Ok(())
}

fn validate_socket_address(field: &str, value: &str, allow_zero_port: bool) -> Result<()> {
    let invalid = |reason: &str| {
        SettingsError::InvalidConfig(format!("{} 값 {}: {}", field, value, reason))
    };

    let (host, port) = value.rsplit_once(':').ok_or_else(|| invalid("host:port 형식이어야 합니다"))?;
    if host.is_empty() {
        return Err(invalid("호스트가 비어 있습니다"));
    }

    let port = port.parse::<u16>().map_err(|_| invalid("포트가 숫자가 아닙니다"))?;
    if port == 0 && !allow_zero_port {
        return Err(invalid("포트는 0이 될 수 없습니다"));
    }

    Ok(())
}
