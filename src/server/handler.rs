use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use tracing::{debug, error};
use uuid::Uuid;

use crate::logging::{log_request, RequestLog};
use crate::middleware::BasicAuth;
use crate::proxy::{self, Forwarder, ProxyConfig, ProxyError};
use crate::routing::{Protocol, Route, RoutingError, SubdomainMap};
use crate::shutdown::ShutdownSignal;

/// 한 프로토콜(HTTP 또는 HTTPS)의 요청 처리기.
///
/// 라우트마다 시작 시 만들어 둔 포워더 풀을 서브도메인으로 조회해 요청을 전달합니다.
pub struct RequestHandler {
    protocol: Protocol,
    forwarders: SubdomainMap<Forwarder>,
    basic_auth: Option<BasicAuth>,
}

impl RequestHandler {
    pub fn new(
        protocol: Protocol,
        routes: &SubdomainMap<Route>,
        proxy_config: &ProxyConfig,
        basic_auth: Option<BasicAuth>,
    ) -> Result<Self, ProxyError> {
        let forwarders = routes.try_map(|subdomain, route| {
            debug!(protocol = %protocol, subdomain = %subdomain, backend = %route.backend_endpoint, "포워더 생성");
            Forwarder::new(&route.backend_endpoint, proxy_config)
        })?;

        Ok(Self {
            protocol,
            forwarders,
            basic_auth,
        })
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub async fn handle_request(
        &self,
        req: Request<Incoming>,
        remote_addr: SocketAddr,
    ) -> Result<Response<Full<Bytes>>, Infallible> {
        let request_id = Uuid::new_v4().to_string();
        let start_time = Instant::now();
        let mut log = RequestLog::new(request_id.clone(), self.protocol.to_string());
        log.with_request(&req);

        let response = self.dispatch(req, remote_addr, &request_id, &mut log).await;

        log.with_response(response.status());
        log.duration_ms = start_time.elapsed().as_millis() as u64;
        log_request(&log);

        Ok(response)
    }

    async fn dispatch(
        &self,
        mut req: Request<Incoming>,
        remote_addr: SocketAddr,
        request_id: &str,
        log: &mut RequestLog,
    ) -> Response<Full<Bytes>> {
        // 1. 라우팅
        let (host, forwarder) = match self.forwarders.route_request(&req) {
            Ok(found) => found,
            Err(e) => return routing_error_response(&e),
        };
        log.with_route(&host.subdomain, forwarder.endpoint());

        // 2. Basic 인증
        if let Some(auth) = &self.basic_auth {
            if let Err(e) = auth.authorize(&mut req) {
                debug!(request_id = %request_id, error = %e, "인증 실패");
                return auth.unauthorized_response();
            }
        }

        // 3. 프록시 요청
        match forwarder.forward(req, remote_addr, request_id).await {
            Ok(response) => response,
            Err(e) => {
                log.with_error(&e);
                proxy::error_response(&e)
            }
        }
    }

    /// 연결 하나를 HTTP/1.1로 처리합니다. 종료 신호를 받으면 진행 중인 요청을 마친 뒤 연결을 닫습니다.
    pub async fn handle_connection<I>(
        self: Arc<Self>,
        io: I,
        remote_addr: SocketAddr,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error>
    where
        I: hyper::rt::Read + hyper::rt::Write + Send + Unpin + 'static,
    {
        let service = service_fn(move |req| {
            let handler = self.clone();
            async move { handler.handle_request(req, remote_addr).await }
        });

        let conn = http1::Builder::new().serve_connection(io, service);
        tokio::pin!(conn);

        let mut shutting_down = false;
        loop {
            tokio::select! {
                result = conn.as_mut() => return result,
                _ = shutdown.wait(), if !shutting_down => {
                    debug!(peer = %remote_addr, "종료 신호 수신, 연결 정리 시작");
                    conn.as_mut().graceful_shutdown();
                    shutting_down = true;
                }
            }
        }
    }
}

fn routing_error_response(error: &RoutingError) -> Response<Full<Bytes>> {
    let status = match error {
        RoutingError::MissingHost
        | RoutingError::InvalidHost { .. }
        | RoutingError::InvalidPort { .. }
        | RoutingError::HeaderParseError { .. } => StatusCode::BAD_REQUEST,
        RoutingError::SubdomainNotFound { .. } => StatusCode::NOT_FOUND,
        RoutingError::MissingListenAddress { .. } => {
            error!(error = %error, "HTTP 요청에서 예상하지 못한 라우팅 오류");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    proxy::build_error_response(status, format!("Error: {}", error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_error_status() {
        let resp = routing_error_response(&RoutingError::MissingHost);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = routing_error_response(&RoutingError::InvalidHost {
            host: "localhost".to_string(),
            reason: "서브도메인 없음".to_string(),
        });
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = routing_error_response(&RoutingError::SubdomainNotFound {
            subdomain: "unknown".to_string(),
            available_routes: vec!["app".to_string()],
        });
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_handler_rejects_invalid_backend() {
        let mut routes = SubdomainMap::new();
        routes.insert("app", Route::http("app", "ftp://127.0.0.1:21"));

        let result = RequestHandler::new(Protocol::Http, &routes, &ProxyConfig::new().unwrap(), None);
        assert!(matches!(result, Err(ProxyError::InvalidEndpoint { .. })));
    }
}
