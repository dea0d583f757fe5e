use std::fmt;

use crate::proxy::ProxyError;
use crate::settings::SettingsError;
use crate::tls::TlsError;
use crate::tunnel::TunnelError;

#[derive(Debug)]
pub enum Error {
    Settings(SettingsError),
    Tls(TlsError),
    Tunnel(TunnelError),
    Proxy(ProxyError),
    Bind {
        listener: String,
        address: String,
        error: std::io::Error,
    },
    IoError(std::io::Error),
    /// 시작할 리스너가 하나도 없거나 모두 실패함
    NoListenerStarted {
        failures: Vec<String>,
    },
}

impl From<SettingsError> for Error {
    fn from(err: SettingsError) -> Self {
        Error::Settings(err)
    }
}

impl From<TlsError> for Error {
    fn from(err: TlsError) -> Self {
        Error::Tls(err)
    }
}

impl From<TunnelError> for Error {
    fn from(err: TunnelError) -> Self {
        Error::Tunnel(err)
    }
}

impl From<ProxyError> for Error {
    fn from(err: ProxyError) -> Self {
        Error::Proxy(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Settings(e) => write!(f, "Settings Error: {}", e),
            Error::Tls(e) => write!(f, "TLS Error: {}", e),
            Error::Tunnel(e) => write!(f, "Tunnel Error: {}", e),
            Error::Proxy(e) => write!(f, "Proxy Error: {}", e),
            Error::Bind { listener, address, error } =>
                write!(f, "{} 리스너 {} 바인딩 실패: {}", listener, address, error),
            Error::IoError(e) => write!(f, "IO Error: {}", e),
            Error::NoListenerStarted { failures } if failures.is_empty() =>
                write!(f, "시작할 리스너가 없습니다 (라우트 없음)"),
            Error::NoListenerStarted { failures } =>
                write!(f, "시작된 리스너가 없습니다: {}", failures.join("; ")),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Settings(e) => Some(e),
            Error::Tls(e) => Some(e),
            Error::Tunnel(e) => Some(e),
            Error::Proxy(e) => Some(e),
            Error::Bind { error, .. } => Some(error),
            Error::IoError(e) => Some(e),
            Error::NoListenerStarted { .. } => None,
        }
    }
}
