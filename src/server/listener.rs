use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

use crate::routing::Protocol;
use crate::shutdown::{drain_tasks, ShutdownSignal};
use super::error::Error;
use super::handler::RequestHandler;
use super::Result;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// HTTP 또는 HTTPS 리스너. TLS acceptor가 있으면 연결마다 핸드셰이크 후 요청을 처리합니다.
pub struct HttpListener {
    listener: TcpListener,
    local_addr: SocketAddr,
    handler: Arc<RequestHandler>,
    tls: Option<TlsAcceptor>,
    drain_timeout: Option<Duration>,
}

impl HttpListener {
    pub async fn bind(
        address: &str,
        handler: RequestHandler,
        tls: Option<TlsAcceptor>,
        drain_timeout: Option<Duration>,
    ) -> Result<Self> {
        let name = handler.protocol().to_string();
        let bind_error = |error: std::io::Error| {
            error!(listener = %name, address = %address, error = %error, "리스너 바인딩 실패");
            Error::Bind {
                listener: name.clone(),
                address: address.to_string(),
                error,
            }
        };

        let listener = TcpListener::bind(address).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        info!(listener = %name, address = %address, local_addr = %local_addr, "리스너 시작");

        Ok(Self {
            listener,
            local_addr,
            handler: Arc::new(handler),
            tls,
            drain_timeout,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn protocol(&self) -> Protocol {
        self.handler.protocol()
    }

    pub async fn run(self, mut shutdown: ShutdownSignal) {
        let Self { listener, local_addr, handler, tls, drain_timeout } = self;
        let name = handler.protocol().to_string();
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.wait() => {
                    info!(listener = %name, address = %local_addr, "종료 신호 수신, 새 연결 수락 중단");
                    break;
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        debug!(listener = %name, peer = %remote_addr, "연결 수락");
                        let handler = handler.clone();
                        let tls = tls.clone();
                        let shutdown = shutdown.clone();
                        connections.spawn(serve(stream, remote_addr, handler, tls, shutdown));
                    }
                    Err(e) => {
                        warn!(listener = %name, error = %e, "연결 수락 실패, 재시도");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }

        drop(listener);
        drain_tasks(connections, drain_timeout, &name).await;
        info!(listener = %name, "리스너 종료");
    }
}

async fn serve(
    stream: tokio::net::TcpStream,
    remote_addr: SocketAddr,
    handler: Arc<RequestHandler>,
    tls: Option<TlsAcceptor>,
    shutdown: ShutdownSignal,
) {
    let result = match tls {
        Some(acceptor) => match acceptor.accept(stream).await {
            Ok(tls_stream) => {
                handler
                    .handle_connection(TokioIo::new(tls_stream), remote_addr, shutdown)
                    .await
            }
            Err(e) => {
                warn!(peer = %remote_addr, error = %e, "TLS 핸드셰이크 실패");
                return;
            }
        },
        None => {
            handler
                .handle_connection(TokioIo::new(stream), remote_addr, shutdown)
                .await
        }
    };

    if let Err(err) = result {
        debug!(peer = %remote_addr, error = %err, "연결 처리 종료");
    }
}
