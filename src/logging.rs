use std::path::Path;
use hyper::HeaderMap;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, error, info, warn, Level, span};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt::time::UtcTime, EnvFilter};

use crate::settings::{LogFormat, LogOutput, LogSettings};

/// 전역 tracing 구독자를 설치합니다.
///
/// 반환되는 `WorkerGuard`는 프로세스가 끝날 때까지 유지해야 버퍼가 비워집니다.
pub fn init_logging(settings: &LogSettings) -> WorkerGuard {
    let mut filter = EnvFilter::from_default_env()
        .add_directive(settings.level.into());
    if settings.level >= Level::DEBUG {
        if let Ok(directive) = "subdomain_gateway=debug".parse() {
            filter = filter.add_directive(directive);
        }
    }

    let (writer, guard) = match &settings.output {
        LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogOutput::File(path) => {
            let path = Path::new(path);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let file_name = path.file_name().unwrap_or(path.as_os_str());
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name))
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::new(Rfc3339))
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(matches!(settings.output, LogOutput::Stdout));

    let installed = match settings.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    if let Err(e) = installed {
        eprintln!("로깅 초기화 실패: {}", e);
    }

    guard
}

/// 요청 한 건의 처리 결과를 모아 완료 시점에 한 번 기록합니다.
#[derive(Debug)]
pub struct RequestLog {
    pub request_id: String,
    pub protocol: String,
    pub method: String,
    pub path: String,
    pub host: String,
    pub subdomain: Option<String>,
    pub status_code: u16,
    pub duration_ms: u64,
    pub backend: Option<String>,
    pub error: Option<String>,
}

impl RequestLog {
    pub fn new(request_id: String, protocol: impl Into<String>) -> Self {
        Self {
            request_id,
            protocol: protocol.into(),
            method: String::new(),
            path: String::new(),
            host: String::new(),
            subdomain: None,
            status_code: 0,
            duration_ms: 0,
            backend: None,
            error: None,
        }
    }

    pub fn with_request<B>(&mut self, req: &hyper::Request<B>) {
        self.method = req.method().to_string();
        self.path = req.uri().path().to_string();
        if let Some(host) = req.headers().get(hyper::header::HOST) {
            self.host = String::from_utf8_lossy(host.as_bytes()).into_owned();
        }

        info!(
            request_id = %self.request_id,
            protocol = %self.protocol,
            method = %self.method,
            path = %self.path,
            host = %self.host,
            "Received request"
        );
    }

    pub fn with_route(&mut self, subdomain: &str, backend: &str) {
        self.subdomain = Some(subdomain.to_string());
        self.backend = Some(backend.to_string());
        debug!(
            request_id = %self.request_id,
            subdomain = %subdomain,
            backend = %backend,
            "Selected backend"
        );
    }

    pub fn with_response(&mut self, status: hyper::StatusCode) {
        self.status_code = status.as_u16();
    }

    pub fn with_error(&mut self, error: impl std::fmt::Display) {
        let error_msg = error.to_string();
        error!(
            request_id = %self.request_id,
            error = %error_msg,
            "Request error occurred"
        );
        self.error = Some(error_msg);
    }
}

pub fn log_request(log: &RequestLog) {
    let level = if log.error.is_some() {
        Level::ERROR
    } else if log.status_code >= 400 {
        Level::WARN
    } else {
        Level::INFO
    };

    let span = span!(
        Level::INFO,
        "request",
        request_id = %log.request_id,
        protocol = %log.protocol,
        method = %log.method,
        path = %log.path,
        host = %log.host,
        status = %log.status_code,
        duration_ms = %log.duration_ms
    );
    let _enter = span.enter();

    match level {
        Level::ERROR => error!(
            subdomain = ?log.subdomain,
            backend = ?log.backend,
            error = ?log.error,
            "Request failed"
        ),
        Level::WARN => warn!(
            subdomain = ?log.subdomain,
            backend = ?log.backend,
            "Request completed with warning"
        ),
        _ => info!(
            subdomain = ?log.subdomain,
            backend = ?log.backend,
            "Request completed successfully"
        ),
    }
}

/// 클라이언트가 보낸 요청 헤더를 모두 기록합니다. 값이 UTF-8이 아니어도 손실 변환해 기록합니다.
pub fn log_request_headers(request_id: &str, headers: &HeaderMap) {
    for (name, value) in headers {
        info!(
            request_id = %request_id,
            header = %name,
            value = %String::from_utf8_lossy(value.as_bytes()),
            "Request header"
        );
    }
}

pub fn log_response_headers(request_id: &str, headers: &HeaderMap) {
    for (name, value) in headers {
        info!(
            request_id = %request_id,
            header = %name,
            value = %String::from_utf8_lossy(value.as_bytes()),
            "Response header"
        );
    }
}
