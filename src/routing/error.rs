use std::fmt;

/// 라우팅 관련 에러를 표현하는 열거형입니다.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingError {
    /// Host 헤더 누락
    MissingHost,
    /// 헤더 파싱 에러
    HeaderParseError {
        header_name: String,
        error: String,
    },
    /// 유효하지 않은 호스트 이름
    InvalidHost {
        host: String,
        reason: String,
    },
    /// 유효하지 않은 포트 번호
    InvalidPort {
        port: String,
        reason: String,
    },
    /// 서브도메인에 대한 라우트가 없음
    SubdomainNotFound {
        subdomain: String,
        available_routes: Vec<String>,
    },
    /// TCP 라우트에 리슨 주소가 없음
    MissingListenAddress {
        subdomain: String,
    },
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingError::MissingHost =>
                write!(f, "Host 헤더가 누락됨"),
            RoutingError::HeaderParseError { header_name, error } =>
                write!(f, "{} 헤더 파싱 실패: {}", header_name, error),
            RoutingError::InvalidHost { host, reason } =>
                write!(f, "유효하지 않은 호스트 {}: {}", host, reason),
            RoutingError::InvalidPort { port, reason } =>
                write!(f, "유효하지 않은 포트 {}: {}", port, reason),
            RoutingError::SubdomainNotFound { subdomain, available_routes } =>
                write!(f, "서브도메인 {}에 대한 라우트를 찾을 수 없음 (사용 가능한 라우트: {:?})", subdomain, available_routes),
            RoutingError::MissingListenAddress { subdomain } =>
                write!(f, "TCP 라우트 {}에 리슨 주소가 없음", subdomain),
        }
    }
}

impl std::error::Error for RoutingError {}
