use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::header::{self, HeaderMap, HeaderName, HeaderValue};
use hyper::{Request, Response, StatusCode, Uri};
use hyper::body::{Bytes, Incoming};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use rustls::pki_types::CertificateDer;
use rustls::{ClientConfig, RootCertStore};
use tracing::{debug, instrument};
use url::Url;

use crate::logging::{log_request_headers, log_response_headers};

const BACKEND_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// 요청/응답 사이에서 제거하는 hop-by-hop 헤더
const HOP_BY_HOP_HEADERS: [&str; 9] = [
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub type HttpClient = legacy::Client<HttpsConnector<HttpConnector>, Incoming>;

#[derive(Debug)]
pub enum ProxyError {
    InvalidEndpoint {
        endpoint: String,
        reason: String,
    },
    RequestBuild(String),
    TlsConfig(String),
    BackendRequest {
        backend: String,
        error: String,
    },
    ResponseBody {
        backend: String,
        error: String,
    },
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::BackendRequest { .. } | ProxyError::ResponseBody { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::InvalidEndpoint { .. }
            | ProxyError::RequestBuild(_)
            | ProxyError::TlsConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyError::InvalidEndpoint { endpoint, reason } =>
                write!(f, "유효하지 않은 백엔드 엔드포인트 {}: {}", endpoint, reason),
            ProxyError::RequestBuild(msg) =>
                write!(f, "프록시 요청 생성 실패: {}", msg),
            ProxyError::TlsConfig(msg) =>
                write!(f, "백엔드 TLS 설정 실패: {}", msg),
            ProxyError::BackendRequest { backend, error } =>
                write!(f, "백엔드 {} 요청 실패: {}", backend, error),
            ProxyError::ResponseBody { backend, error } =>
                write!(f, "백엔드 {} 응답 본문 수신 실패: {}", backend, error),
        }
    }
}

impl std::error::Error for ProxyError {}

// 모든 포워더가 공유하는 불변 HTTP 클라이언트. http와 https 백엔드를 모두 처리합니다.
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    client: HttpClient,
}

impl ProxyConfig {
    /// 공개 루트 인증서(webpki-roots)로 https 백엔드를 검증합니다.
    pub fn new() -> Result<Self, ProxyError> {
        Self::with_root_certificates(Vec::new())
    }

    /// 공개 루트에 더해 `extra_roots`도 신뢰합니다. 사설 CA로 서명된 백엔드용입니다.
    pub fn with_root_certificates(extra_roots: Vec<CertificateDer<'static>>) -> Result<Self, ProxyError> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        for cert in extra_roots {
            roots
                .add(cert)
                .map_err(|e| ProxyError::TlsConfig(format!("루트 인증서 추가 실패: {}", e)))?;
        }

        let tls = ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()
            .map_err(|e| ProxyError::TlsConfig(e.to_string()))?
            .with_root_certificates(roots)
            .with_no_client_auth();

        let mut http = HttpConnector::new();
        http.set_connect_timeout(Some(BACKEND_CONNECT_TIMEOUT));
        http.enforce_http(false);

        let connector = HttpsConnectorBuilder::new()
            .with_tls_config(tls)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);
        let client = legacy::Client::builder(TokioExecutor::new())
            .build::<_, Incoming>(connector);

        Ok(Self { client })
    }
}

/// 라우트 하나에 묶인 리버스 프록시 포워더입니다.
///
/// 시작 시 라우트마다 한 번 만들어지고 요청마다 조회만 됩니다. 요청 URI를 백엔드
/// 기준으로 다시 쓰고, Host 헤더를 백엔드 호스트로 바꿔 전달합니다.
#[derive(Clone, Debug)]
pub struct Forwarder {
    endpoint: String,
    scheme: String,
    authority: String,
    base_path: String,
    base_query: Option<String>,
    client: HttpClient,
}

impl Forwarder {
    pub fn new(endpoint: &str, config: &ProxyConfig) -> Result<Self, ProxyError> {
        let invalid = |reason: String| ProxyError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason,
        };

        let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("지원하지 않는 스킴: {}", url.scheme())));
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("호스트가 없습니다".to_string()))?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self {
            endpoint: endpoint.to_string(),
            scheme: url.scheme().to_string(),
            authority,
            base_path: url.path().to_string(),
            base_query: url.query().filter(|q| !q.is_empty()).map(str::to_string),
            client: config.client.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 백엔드 Host 헤더 값 (host[:port])
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// 요청을 백엔드로 전달하고 응답을 그대로 돌려줍니다.
    #[instrument(skip(self, req), fields(backend = %self.endpoint))]
    pub async fn forward(
        &self,
        req: Request<Incoming>,
        client_addr: SocketAddr,
        request_id: &str,
    ) -> Result<Response<Full<Bytes>>, ProxyError> {
        log_request_headers(request_id, req.headers());

        let proxied_req = self.build_proxied_request(req, client_addr)?;
        debug!(uri = %proxied_req.uri(), "백엔드로 요청 전달");

        let res = self.client.request(proxied_req).await.map_err(|e| ProxyError::BackendRequest {
            backend: self.endpoint.clone(),
            error: e.to_string(),
        })?;

        log_response_headers(request_id, res.headers());

        let (mut parts, body) = res.into_parts();
        remove_hop_by_hop_headers(&mut parts.headers);

        let bytes = body
            .collect()
            .await
            .map_err(|e| ProxyError::ResponseBody {
                backend: self.endpoint.clone(),
                error: e.to_string(),
            })?
            .to_bytes();

        debug!(status = %parts.status, bytes_size = bytes.len(), "백엔드 응답 수신");
        Ok(Response::from_parts(parts, Full::new(bytes)))
    }

    fn build_proxied_request(
        &self,
        req: Request<Incoming>,
        client_addr: SocketAddr,
    ) -> Result<Request<Incoming>, ProxyError> {
        let (parts, body) = req.into_parts();

        let path = join_paths(&self.base_path, parts.uri.path());
        let query = merge_queries(self.base_query.as_deref(), parts.uri.query());
        let uri_str = match query {
            Some(query) => format!("{}://{}{}?{}", self.scheme, self.authority, path, query),
            None => format!("{}://{}{}", self.scheme, self.authority, path),
        };
        let uri: Uri = uri_str
            .parse()
            .map_err(|e: hyper::http::uri::InvalidUri| ProxyError::RequestBuild(format!("{}: {}", uri_str, e)))?;

        let mut headers = parts.headers;
        remove_hop_by_hop_headers(&mut headers);
        append_forwarded_for(&mut headers, client_addr);

        let host = HeaderValue::from_str(&self.authority)
            .map_err(|e| ProxyError::RequestBuild(format!("Host 헤더 생성 실패: {}", e)))?;
        headers.insert(header::HOST, host);

        let mut proxied = Request::builder()
            .method(parts.method)
            .uri(uri)
            .body(body)
            .map_err(|e| ProxyError::RequestBuild(e.to_string()))?;
        *proxied.headers_mut() = headers;

        Ok(proxied)
    }
}

/// 오류를 클라이언트 응답으로 변환합니다.
pub fn error_response(error: &ProxyError) -> Response<Full<Bytes>> {
    let status = error.status_code();
    let message = match status {
        StatusCode::BAD_GATEWAY => "Bad Gateway",
        _ => "Internal Server Error",
    };
    build_error_response(status, message.to_string())
}

pub fn build_error_response(status: StatusCode, message: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(message)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// `Connection` 헤더에 나열된 헤더와 고정 hop-by-hop 헤더를 제거합니다.
pub fn remove_hop_by_hop_headers(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, client_addr: SocketAddr) {
    let client_ip = client_addr.ip().to_string();
    let prior: Vec<String> = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_string)
        .collect();

    let value = if prior.is_empty() {
        client_ip
    } else {
        format!("{}, {}", prior.join(", "), client_ip)
    };

    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert("x-forwarded-for", value);
    }
}

// 슬래시가 정확히 하나가 되도록 경로를 잇는다
fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

fn merge_queries(base: Option<&str>, query: Option<&str>) -> Option<String> {
    let query = query.filter(|q| !q.is_empty());
    match (base, query) {
        (Some(base), Some(query)) => Some(format!("{}&{}", base, query)),
        (Some(base), None) => Some(base.to_string()),
        (None, Some(query)) => Some(query.to_string()),
        (None, None) => None,
    }
}
