use std::fmt;
use std::time::Duration;

/// 릴레이 방향
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToBackend,
    BackendToClient,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ClientToBackend => write!(f, "client->backend"),
            Direction::BackendToClient => write!(f, "backend->client"),
        }
    }
}

#[derive(Debug)]
pub enum TunnelError {
    /// TCP 라우트에 리슨 주소가 지정되지 않음
    MissingListenAddress {
        subdomain: String,
    },
    Bind {
        address: String,
        error: std::io::Error,
    },
    Accept(std::io::Error),
    Dial {
        backend: String,
        error: std::io::Error,
    },
    DialTimeout {
        backend: String,
        timeout: Duration,
    },
    Io {
        direction: Direction,
        error: std::io::Error,
    },
    DeadlineExceeded {
        direction: Direction,
    },
}

impl fmt::Display for TunnelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TunnelError::MissingListenAddress { subdomain } =>
                write!(f, "TCP 라우트 {}에 리슨 주소가 없습니다", subdomain),
            TunnelError::Bind { address, error } =>
                write!(f, "TCP 리스너 {} 바인딩 실패: {}", address, error),
            TunnelError::Accept(e) => write!(f, "TCP 연결 수락 실패: {}", e),
            TunnelError::Dial { backend, error } =>
                write!(f, "백엔드 {} 연결 실패: {}", backend, error),
            TunnelError::DialTimeout { backend, timeout } =>
                write!(f, "백엔드 {} 연결 타임아웃 ({}초)", backend, timeout.as_secs()),
            TunnelError::Io { direction, error } =>
                write!(f, "{} 전송 중 I/O 오류: {}", direction, error),
            TunnelError::DeadlineExceeded { direction } =>
                write!(f, "{} 전송이 세션 데드라인을 초과했습니다", direction),
        }
    }
}

impl std::error::Error for TunnelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TunnelError::Bind { error, .. }
            | TunnelError::Dial { error, .. }
            | TunnelError::Io { error, .. } => Some(error),
            TunnelError::Accept(e) => Some(e),
            _ => None,
        }
    }
}
