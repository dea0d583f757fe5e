use std::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
    Tcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Https => write!(f, "https"),
            Protocol::Tcp => write!(f, "tcp"),
        }
    }
}

/// 설정에서 만들어지는 라우트 한 건입니다. 프로세스 수명 동안 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub protocol: Protocol,
    pub subdomain: String,
    /// HTTP/HTTPS는 백엔드 URL, TCP는 `host:port`
    pub backend_endpoint: String,
    pub notes: String,
    /// TCP 라우트의 리슨 주소
    pub listen_address: Option<String>,
}

impl Route {
    pub fn http(subdomain: impl Into<String>, backend_endpoint: impl Into<String>) -> Self {
        Self::new(Protocol::Http, subdomain, backend_endpoint, None)
    }

    pub fn https(subdomain: impl Into<String>, backend_endpoint: impl Into<String>) -> Self {
        Self::new(Protocol::Https, subdomain, backend_endpoint, None)
    }

    pub fn tcp(
        subdomain: impl Into<String>,
        backend_endpoint: impl Into<String>,
        listen_address: impl Into<String>,
    ) -> Self {
        Self::new(Protocol::Tcp, subdomain, backend_endpoint, Some(listen_address.into()))
    }

    fn new(
        protocol: Protocol,
        subdomain: impl Into<String>,
        backend_endpoint: impl Into<String>,
        listen_address: Option<String>,
    ) -> Self {
        Self {
            protocol,
            subdomain: subdomain.into(),
            backend_endpoint: backend_endpoint.into(),
            notes: String::new(),
            listen_address,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}
