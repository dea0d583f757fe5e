use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use crate::middleware::BasicAuth;
use crate::proxy::ProxyConfig;
use crate::routing::{Protocol, Route, RouteTable};
use crate::settings::{GatewayConfig, SettingsError};
use crate::shutdown::ShutdownSignal;
use crate::tls::load_tls_acceptor;
use crate::tunnel::{TcpTunnel, TunnelListener};
use super::error::Error;
use super::handler::RequestHandler;
use super::listener::HttpListener;
use super::Result;

/// 바인딩이 끝나 실행만 남은 리스너
#[async_trait]
pub trait Listener: Send {
    fn name(&self) -> String;
    fn protocol(&self) -> Protocol;
    fn local_addr(&self) -> SocketAddr;
    async fn run(self: Box<Self>, shutdown: ShutdownSignal);
}

#[async_trait]
impl Listener for HttpListener {
    fn name(&self) -> String {
        self.protocol().to_string()
    }

    fn protocol(&self) -> Protocol {
        HttpListener::protocol(self)
    }

    fn local_addr(&self) -> SocketAddr {
        HttpListener::local_addr(self)
    }

    async fn run(self: Box<Self>, shutdown: ShutdownSignal) {
        HttpListener::run(*self, shutdown).await
    }
}

#[async_trait]
impl Listener for TunnelListener {
    fn name(&self) -> String {
        format!("tcp {} -> {}", self.tunnel().listen_addr(), self.tunnel().backend_addr())
    }

    fn protocol(&self) -> Protocol {
        Protocol::Tcp
    }

    fn local_addr(&self) -> SocketAddr {
        TunnelListener::local_addr(self)
    }

    async fn run(self: Box<Self>, shutdown: ShutdownSignal) {
        TunnelListener::run(*self, shutdown).await
    }
}

/// 게이트웨이 수명 주기 관리자.
///
/// 라우트를 프로토콜별로 나눠 HTTPS 리스너, HTTP 리스너, TCP 라우트마다 터널 리스너를
/// 띄웁니다. 리스너는 서로 독립적으로 시작되며, 하나가 실패해도 나머지는 계속 동작합니다.
pub struct Gateway {
    config: Arc<GatewayConfig>,
    routes: RouteTable,
    proxy_config: ProxyConfig,
}

impl Gateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let routes = config.route_table()?;
        Ok(Self {
            config: Arc::new(config),
            routes,
            proxy_config: ProxyConfig::new()?,
        })
    }

    /// 백엔드 클라이언트를 교체합니다. 사설 CA를 신뢰해야 할 때 사용합니다.
    pub fn with_proxy_config(mut self, proxy_config: ProxyConfig) -> Self {
        self.proxy_config = proxy_config;
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// 시작 전에 라우트를 추가합니다. 이미 실행 중인 리스너에는 반영되지 않습니다.
    pub fn add_route(&mut self, route: Route) -> Result<()> {
        self.routes
            .add_route(route)
            .map_err(|e| Error::Settings(SettingsError::InvalidConfig(e.to_string())))
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// 모든 리스너를 바인딩하고 실행합니다. 하나도 시작하지 못하면 에러를 반환합니다.
    #[instrument(skip(self, shutdown), fields(domain = %self.config.listening_domain))]
    pub async fn start(&self, shutdown: ShutdownSignal) -> Result<RunningGateway> {
        let mut listeners: Vec<Box<dyn Listener>> = Vec::new();
        let mut failures = Vec::new();

        if self.routes.has_routes(Protocol::Https) {
            match self.bind_https().await {
                Ok(listener) => listeners.push(Box::new(listener)),
                Err(e) => {
                    error!(error = %e, "HTTPS 리스너 시작 실패");
                    failures.push(format!("https: {}", e));
                }
            }
        }

        if self.routes.has_routes(Protocol::Http) {
            match self.bind_http().await {
                Ok(listener) => listeners.push(Box::new(listener)),
                Err(e) => {
                    error!(error = %e, "HTTP 리스너 시작 실패");
                    failures.push(format!("http: {}", e));
                }
            }
        }

        for route in self.routes.tcp_routes() {
            match self.bind_tcp(route).await {
                Ok(listener) => listeners.push(Box::new(listener)),
                Err(e) => {
                    error!(subdomain = %route.subdomain, error = %e, "TCP 터널 시작 실패");
                    failures.push(format!("tcp {}: {}", route.subdomain, e));
                }
            }
        }

        if listeners.is_empty() {
            return Err(Error::NoListenerStarted { failures });
        }

        let mut started = Vec::with_capacity(listeners.len());
        let mut tasks = Vec::with_capacity(listeners.len());
        for listener in listeners {
            let info = ListenerInfo {
                name: listener.name(),
                protocol: listener.protocol(),
                local_addr: listener.local_addr(),
            };
            info!(listener = %info.name, local_addr = %info.local_addr, "리스너 실행");
            tasks.push(tokio::spawn(listener.run(shutdown.clone())));
            started.push(info);
        }

        if !failures.is_empty() {
            warn!(started = started.len(), failed = failures.len(), "일부 리스너만 시작됨");
        }

        Ok(RunningGateway {
            listeners: started,
            failures,
            tasks,
        })
    }

    async fn bind_https(&self) -> Result<HttpListener> {
        let (cert, key) = self.config.tls_paths().ok_or_else(|| {
            SettingsError::InvalidConfig("https 라우트에는 tlsCert와 tlsKey가 필요합니다".to_string())
        })?;
        let acceptor = load_tls_acceptor(&cert, &key)?;
        let handler = self.request_handler(Protocol::Https)?;

        HttpListener::bind(
            &self.config.https_listen_address(),
            handler,
            Some(acceptor),
            self.config.drain_timeout(),
        )
        .await
    }

    async fn bind_http(&self) -> Result<HttpListener> {
        let handler = self.request_handler(Protocol::Http)?;
        HttpListener::bind(
            &self.config.http_listen_address(),
            handler,
            None,
            self.config.drain_timeout(),
        )
        .await
    }

    async fn bind_tcp(&self, route: &Route) -> Result<TunnelListener> {
        let tunnel = TcpTunnel::from_route(route, self.config.tcp_timeout())?
            .with_drain_timeout(self.config.drain_timeout());
        Ok(tunnel.bind().await?)
    }

    fn request_handler(&self, protocol: Protocol) -> Result<RequestHandler> {
        let routes = self.routes.subdomain_map(protocol).ok_or_else(|| {
            SettingsError::InvalidConfig(format!("{} 프로토콜에는 서브도메인 라우트가 없습니다", protocol))
        })?;

        Ok(RequestHandler::new(
            protocol,
            routes,
            &self.proxy_config,
            BasicAuth::from_options(&self.config.basic_auth_options),
        )?)
    }
}

#[derive(Debug, Clone)]
pub struct ListenerInfo {
    pub name: String,
    pub protocol: Protocol,
    pub local_addr: SocketAddr,
}

/// 실행 중인 게이트웨이. `wait`는 모든 리스너가 종료될 때까지 기다립니다.
#[derive(Debug)]
pub struct RunningGateway {
    listeners: Vec<ListenerInfo>,
    failures: Vec<String>,
    tasks: Vec<JoinHandle<()>>,
}

impl RunningGateway {
    pub fn listeners(&self) -> &[ListenerInfo] {
        &self.listeners
    }

    pub fn addresses(&self, protocol: Protocol) -> Vec<SocketAddr> {
        self.listeners
            .iter()
            .filter(|l| l.protocol == protocol)
            .map(|l| l.local_addr)
            .collect()
    }

    /// 시작에 실패한 리스너의 진단 메시지
    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    pub async fn wait(self) {
        for result in join_all(self.tasks).await {
            if let Err(e) = result {
                error!(error = %e, "리스너 태스크 비정상 종료");
            }
        }
        info!("모든 리스너 종료");
    }
}
