//! 바이트 단위로 투명한 TCP 터널입니다.
//!
//! TCP 라우트마다 리스너 하나를 띄우고, 수락한 연결마다 백엔드로 새 연결을 맺어
//! 양방향으로 중계합니다. 세션 데드라인은 연결 시점부터의 절대 시간입니다.

mod error;
mod session;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use crate::routing::Route;
use crate::shutdown::{drain_tasks, ShutdownSignal};

pub use error::{Direction, TunnelError};
pub use session::{relay, RelayStats};

pub const DEFAULT_TCP_TIMEOUT: Duration = Duration::from_secs(600);
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// TCP 라우트 하나의 불변 상태. 수락된 모든 세션이 `Arc`로 공유합니다.
#[derive(Debug, Clone)]
pub struct TcpTunnel {
    listen_addr: String,
    backend_addr: String,
    timeout: Option<Duration>,
    drain_timeout: Option<Duration>,
}

impl TcpTunnel {
    pub fn new(
        listen_addr: impl Into<String>,
        backend_addr: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            backend_addr: backend_addr.into(),
            timeout,
            drain_timeout: None,
        }
    }

    /// 종료 후 세션을 기다리는 상한. 기본값 `None`은 세션이 자기 데드라인까지 끝나길 기다립니다.
    pub fn with_drain_timeout(mut self, drain_timeout: Option<Duration>) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    pub fn from_route(route: &Route, timeout: Option<Duration>) -> Result<Self, TunnelError> {
        let listen_addr = route.listen_address.clone().ok_or_else(|| TunnelError::MissingListenAddress {
            subdomain: route.subdomain.clone(),
        })?;
        Ok(Self::new(listen_addr, route.backend_endpoint.clone(), timeout))
    }

    pub fn listen_addr(&self) -> &str {
        &self.listen_addr
    }

    pub fn backend_addr(&self) -> &str {
        &self.backend_addr
    }

    /// 리슨 주소에 바인딩합니다. 실패하면 이 터널만 시작되지 않습니다.
    pub async fn bind(self) -> Result<TunnelListener, TunnelError> {
        let listener = TcpListener::bind(&self.listen_addr).await.map_err(|error| {
            error!(address = %self.listen_addr, error = %error, "TCP 리스너 바인딩 실패");
            TunnelError::Bind {
                address: self.listen_addr.clone(),
                error,
            }
        })?;
        let local_addr = listener.local_addr().map_err(|error| TunnelError::Bind {
            address: self.listen_addr.clone(),
            error,
        })?;

        info!(
            listen = %self.listen_addr,
            local_addr = %local_addr,
            backend = %self.backend_addr,
            timeout_secs = ?self.timeout.map(|t| t.as_secs()),
            "TCP 터널 리스너 시작"
        );

        Ok(TunnelListener {
            listener,
            local_addr,
            tunnel: Arc::new(self),
        })
    }

    /// 바인딩 후 종료 신호가 올 때까지 연결을 처리합니다.
    pub async fn start(self, shutdown: ShutdownSignal) -> Result<(), TunnelError> {
        self.bind().await?.run(shutdown).await;
        Ok(())
    }

    async fn handle_client(self: Arc<Self>, client: TcpStream, peer: SocketAddr) {
        let deadline = self.timeout.map(|t| Instant::now() + t);

        let backend = match self.dial().await {
            Ok(backend) => backend,
            Err(e) => {
                error!(peer = %peer, error = %e, "백엔드 연결 실패, 클라이언트 연결 종료");
                return;
            }
        };
        debug!(peer = %peer, "백엔드 연결 완료, 중계 시작");

        match relay(client, backend, deadline).await {
            Ok(stats) => info!(
                peer = %peer,
                client_to_backend = stats.client_to_backend,
                backend_to_client = stats.backend_to_client,
                "TCP 세션 종료"
            ),
            Err(TunnelError::DeadlineExceeded { direction }) => warn!(
                peer = %peer,
                direction = %direction,
                "세션 데드라인 초과로 연결 종료"
            ),
            Err(e) => error!(peer = %peer, error = %e, "TCP 세션 오류"),
        }
    }

    async fn dial(&self) -> Result<TcpStream, TunnelError> {
        let connect = TcpStream::connect(&self.backend_addr);
        let result = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, connect)
                .await
                .map_err(|_| TunnelError::DialTimeout {
                    backend: self.backend_addr.clone(),
                    timeout,
                })?,
            None => connect.await,
        };

        result.map_err(|error| TunnelError::Dial {
            backend: self.backend_addr.clone(),
            error,
        })
    }
}

/// 바인딩이 끝난 TCP 터널 리스너
#[derive(Debug)]
pub struct TunnelListener {
    listener: TcpListener,
    local_addr: SocketAddr,
    tunnel: Arc<TcpTunnel>,
}

impl TunnelListener {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn tunnel(&self) -> &TcpTunnel {
        &self.tunnel
    }

    /// 수락 루프. 종료 신호를 받으면 리스너를 닫고, 진행 중인 세션은 끊지 않고 끝날 때까지 기다립니다.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        let Self { listener, local_addr, tunnel } = self;
        let mut sessions = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.wait() => {
                    info!(listen = %local_addr, "종료 신호 수신, TCP 리스너 종료");
                    break;
                }
                Some(_) = sessions.join_next(), if !sessions.is_empty() => {}
                accepted = listener.accept() => match accepted {
                    Ok((client, peer)) => {
                        let session_id = Uuid::new_v4().to_string();
                        let span = tracing::info_span!(
                            "tcp_session",
                            session_id = %session_id,
                            listen = %tunnel.listen_addr,
                            backend = %tunnel.backend_addr
                        );
                        debug!(parent: &span, peer = %peer, "TCP 연결 수락");
                        sessions.spawn(tunnel.clone().handle_client(client, peer).instrument(span));
                    }
                    Err(e) => {
                        let err = TunnelError::Accept(e);
                        warn!(listen = %local_addr, error = %err, "일시적인 수락 오류, 재시도");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }

        drop(listener);
        drain_tasks(sessions, tunnel.drain_timeout, &local_addr.to_string()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::shutdown_channel;

    #[test]
    fn test_from_route() {
        let route = Route::tcp("db", "127.0.0.1:5432", "127.0.0.1:15432");
        let tunnel = TcpTunnel::from_route(&route, Some(DEFAULT_TCP_TIMEOUT)).unwrap();
        assert_eq!(tunnel.listen_addr(), "127.0.0.1:15432");
        assert_eq!(tunnel.backend_addr(), "127.0.0.1:5432");

        let mut route = route;
        route.listen_address = None;
        assert!(matches!(
            TcpTunnel::from_route(&route, None),
            Err(TunnelError::MissingListenAddress { subdomain }) if subdomain == "db"
        ));
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = occupied.local_addr().unwrap().to_string();

        let result = TcpTunnel::new(addr, "127.0.0.1:1", None).bind().await;
        assert!(matches!(result, Err(TunnelError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let listener = TcpTunnel::new("127.0.0.1:0", "127.0.0.1:1", None)
            .bind()
            .await
            .unwrap();
        let addr = listener.local_addr();
        let (trigger, signal) = shutdown_channel();

        let task = tokio::spawn(listener.run(signal));
        trigger.trigger();
        tokio::time::timeout(Duration::from_secs(2), task).await.unwrap().unwrap();

        assert!(TcpStream::connect(addr).await.is_err());
    }
}
