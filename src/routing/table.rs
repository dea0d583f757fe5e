use std::collections::{BTreeMap, HashMap};
use hyper::header;
use tracing::{debug, info, warn};

use crate::routing::{HostInfo, Protocol, Route, RoutingError};

/// 서브도메인을 키로 하는 맵입니다.
///
/// 라우트 테이블은 `SubdomainMap<Route>`를, 요청 처리기는 라우트마다 미리 만든
/// 포워더를 담은 `SubdomainMap<Forwarder>`를 사용합니다. 시작 시 한 번 만들어진 뒤
/// 읽기 전용으로만 공유되므로 잠금이 필요 없습니다.
#[derive(Debug, Clone)]
pub struct SubdomainMap<T> {
    entries: HashMap<String, T>,
}

impl<T> Default for SubdomainMap<T> {
    fn default() -> Self {
        Self { entries: HashMap::new() }
    }
}

impl<T> SubdomainMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 같은 서브도메인이 이미 있으면 교체하고 이전 값을 반환합니다.
    pub fn insert(&mut self, subdomain: &str, value: T) -> Option<T> {
        self.entries.insert(subdomain.to_ascii_lowercase(), value)
    }

    pub fn get(&self, subdomain: &str) -> Option<&T> {
        self.entries.get(&subdomain.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn subdomains(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// 각 값을 변환한 새 맵을 만듭니다. 하나라도 실패하면 에러를 반환합니다.
    pub fn try_map<U, E, F>(&self, mut f: F) -> Result<SubdomainMap<U>, E>
    where
        F: FnMut(&str, &T) -> Result<U, E>,
    {
        let mut entries = HashMap::with_capacity(self.entries.len());
        for (subdomain, value) in &self.entries {
            entries.insert(subdomain.clone(), f(subdomain, value)?);
        }
        Ok(SubdomainMap { entries })
    }

    /// HTTP 요청의 Host 헤더에서 서브도메인을 추출하고 해당하는 값을 찾습니다.
    ///
    /// # 반환
    ///
    /// 성공 시 추출한 `HostInfo`와 값에 대한 참조를 반환하고,
    /// Host 헤더가 잘못되었거나 서브도메인이 없으면 `RoutingError`를 반환합니다.
    pub fn route_request<B>(&self, req: &hyper::Request<B>) -> Result<(HostInfo, &T), RoutingError> {
        let host_info = Self::extract_host(req)?;
        debug!(host = %host_info.name, subdomain = %host_info.subdomain, "라우팅 요청 처리");

        match self.get(&host_info.subdomain) {
            Some(value) => Ok((host_info, value)),
            None => {
                let available_routes = self.subdomains();
                warn!(
                    subdomain = %host_info.subdomain,
                    available_routes = ?available_routes,
                    "서브도메인에 대한 라우트를 찾을 수 없음"
                );
                Err(RoutingError::SubdomainNotFound {
                    subdomain: host_info.subdomain,
                    available_routes,
                })
            }
        }
    }

    /// HTTP 요청에서 호스트 정보를 추출합니다.
    ///
    /// HTTP/1.1 요청은 Host 헤더를, 절대 URI 형식 요청은 URI의 authority를 사용합니다.
    pub fn extract_host<B>(req: &hyper::Request<B>) -> Result<HostInfo, RoutingError> {
        let host_str = match req.headers().get(header::HOST) {
            Some(value) => value.to_str().map_err(|e| RoutingError::HeaderParseError {
                header_name: "Host".to_string(),
                error: e.to_string(),
            })?,
            None => match req.uri().authority() {
                Some(authority) => authority.as_str(),
                None => return Err(RoutingError::MissingHost),
            },
        };

        HostInfo::from_header_value(host_str)
    }
}

/// 프로토콜별로 분할된 라우트 테이블입니다.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    http: SubdomainMap<Route>,
    https: SubdomainMap<Route>,
    // 리슨 주소 -> 라우트
    tcp: BTreeMap<String, Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 라우트를 프로토콜에 맞는 그룹에 추가합니다.
    ///
    /// HTTP와 HTTPS 맵은 서로 독립적이므로 같은 서브도메인을 각각 다른 백엔드로
    /// 설정할 수 있습니다. 같은 그룹 안에서 키가 겹치면 나중 라우트가 이깁니다.
    pub fn add_route(&mut self, route: Route) -> Result<(), RoutingError> {
        let replaced = match route.protocol {
            Protocol::Http => self.http.insert(&route.subdomain, route.clone()),
            Protocol::Https => self.https.insert(&route.subdomain, route.clone()),
            Protocol::Tcp => {
                let listen_address = route.listen_address.clone().ok_or_else(|| {
                    RoutingError::MissingListenAddress {
                        subdomain: route.subdomain.clone(),
                    }
                })?;
                self.tcp.insert(listen_address, route.clone())
            }
        };

        match replaced {
            Some(previous) => warn!(
                protocol = %route.protocol,
                subdomain = %route.subdomain,
                previous = %previous.backend_endpoint,
                backend = %route.backend_endpoint,
                "중복 라우트를 나중 설정으로 교체"
            ),
            None => info!(
                protocol = %route.protocol,
                subdomain = %route.subdomain,
                backend = %route.backend_endpoint,
                "라우트 추가"
            ),
        }

        Ok(())
    }

    /// HTTP 또는 HTTPS 서브도메인 맵. TCP에는 서브도메인 맵이 없습니다.
    pub fn subdomain_map(&self, protocol: Protocol) -> Option<&SubdomainMap<Route>> {
        match protocol {
            Protocol::Http => Some(&self.http),
            Protocol::Https => Some(&self.https),
            Protocol::Tcp => None,
        }
    }

    pub fn tcp_routes(&self) -> impl Iterator<Item = &Route> {
        self.tcp.values()
    }

    pub fn has_routes(&self, protocol: Protocol) -> bool {
        match protocol {
            Protocol::Http => !self.http.is_empty(),
            Protocol::Https => !self.https.is_empty(),
            Protocol::Tcp => !self.tcp.is_empty(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.http.is_empty() && self.https.is_empty() && self.tcp.is_empty()
    }
}
