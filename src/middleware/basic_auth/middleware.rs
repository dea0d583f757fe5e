use std::fmt;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use bytes::Bytes;
use http_body_util::Full;
use hyper::{header, HeaderMap, Request, Response, StatusCode};
use hyper::header::HeaderValue;
use tracing::{debug, warn};

use crate::middleware::AuthError;
use crate::settings::BasicAuthOptions;
use super::auth::{Authenticator, SingleUserAuthenticator};

pub const DEFAULT_REALM: &str = "gateway";

/// HTTP/HTTPS 요청에 적용되는 Basic 인증
#[derive(Clone)]
pub struct BasicAuth {
    realm: String,
    authenticator: Arc<dyn Authenticator>,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth").field("realm", &self.realm).finish_non_exhaustive()
    }
}

impl BasicAuth {
    pub fn new(realm: impl Into<String>, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            realm: realm.into(),
            authenticator,
        }
    }

    /// 비활성화되어 있으면 `None`
    pub fn from_options(options: &BasicAuthOptions) -> Option<Self> {
        if !options.enabled {
            return None;
        }

        let realm = options
            .realm
            .clone()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REALM.to_string());

        Some(Self::new(
            realm,
            Arc::new(SingleUserAuthenticator::new(&options.username, &options.password)),
        ))
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// 자격증명을 검증하고, 성공하면 백엔드로 전달되지 않도록 Authorization 헤더를 제거합니다.
    pub fn authorize<B>(&self, req: &mut Request<B>) -> Result<(), AuthError> {
        let (username, password) = extract_credentials(req.headers())?;

        if !self.authenticator.verify_credentials(&username, &password) {
            warn!(username = %username, realm = %self.realm, "Basic 인증 실패");
            return Err(AuthError::InvalidCredentials { username });
        }

        debug!(username = %username, "Basic 인증 성공");
        req.headers_mut().remove(header::AUTHORIZATION);
        Ok(())
    }

    /// 401 Unauthorized 응답을 생성합니다.
    pub fn unauthorized_response(&self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(Bytes::from("Unauthorized")));
        *response.status_mut() = StatusCode::UNAUTHORIZED;

        let challenge = format!("Basic realm=\"{}\"", self.realm.replace('"', "'"));
        let challenge = HeaderValue::from_str(&challenge)
            .unwrap_or_else(|_| HeaderValue::from_static("Basic realm=\"gateway\""));
        response.headers_mut().insert(header::WWW_AUTHENTICATE, challenge);
        response
    }
}

/// Authorization 헤더에서 자격증명을 추출합니다.
pub(crate) fn extract_credentials(headers: &HeaderMap) -> Result<(String, String), AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|e| AuthError::MalformedHeader(e.to_string()))?;

    let (scheme, encoded) = value
        .trim()
        .split_once(' ')
        .ok_or_else(|| AuthError::MalformedHeader("스킴이 없습니다".to_string()))?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(AuthError::MalformedHeader(format!("지원하지 않는 스킴: {}", scheme)));
    }

    let decoded = BASE64
        .decode(encoded.trim())
        .map_err(|e| AuthError::MalformedHeader(e.to_string()))?;
    let pair = String::from_utf8(decoded).map_err(|e| AuthError::MalformedHeader(e.to_string()))?;

    let (username, password) = pair
        .split_once(':')
        .ok_or_else(|| AuthError::MalformedHeader("구분자 ':'가 없습니다".to_string()))?;
    Ok((username.to_string(), password.to_string()))
}
