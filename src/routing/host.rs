use crate::routing::error::RoutingError;

/// Host 헤더에서 추출한 호스트 정보를 담는 불변 데이터 구조입니다.
///
/// # 필드
///
/// * `name` - 포트를 제외한 호스트 이름 (예: "app.4gr8.local")
/// * `port` - 선택적 포트 번호
/// * `subdomain` - 첫 번째 라벨 (예: "app")
#[derive(Clone, Debug, PartialEq)]
pub struct HostInfo {
    pub name: String,
    pub port: Option<u16>,
    pub subdomain: String,
}

impl HostInfo {
    /// 호스트 헤더 값에서 HostInfo를 생성합니다.
    ///
    /// 호스트 이름을 `.`으로 나눈 라벨이 두 개 미만이면 서브도메인을 정할 수 없으므로
    /// `InvalidHost`를 반환합니다.
    ///
    /// # 예제
    ///
    /// ```
    /// use subdomain_gateway::routing::HostInfo;
    ///
    /// let host_info = HostInfo::from_header_value("app.4gr8.local:8080").unwrap();
    /// assert_eq!(host_info.subdomain, "app");
    /// assert_eq!(host_info.port, Some(8080));
    ///
    /// assert!(HostInfo::from_header_value("localhost").is_err());
    /// ```
    pub fn from_header_value(value: &str) -> Result<Self, RoutingError> {
        let invalid = |reason: &str| RoutingError::InvalidHost {
            host: value.to_string(),
            reason: reason.to_string(),
        };

        let value = value.trim();
        if value.is_empty() {
            return Err(invalid("Invalid format"));
        }

        let (name, port) = match value.split_once(':') {
            None => (value, None),
            Some((name, port)) => {
                if name.is_empty() || port.contains(':') {
                    return Err(invalid("Invalid format"));
                }

                let port = port.parse::<u16>().map_err(|_| RoutingError::InvalidPort {
                    port: port.to_string(),
                    reason: "Invalid format".to_string(),
                })?;

                (name, Some(port))
            }
        };

        let mut labels = name.split('.');
        let subdomain = labels.next().unwrap_or_default();
        if labels.next().is_none() {
            return Err(invalid("서브도메인과 도메인을 구분할 수 없음"));
        }
        if subdomain.is_empty() {
            return Err(invalid("서브도메인이 비어 있음"));
        }

        Ok(HostInfo {
            name: name.to_string(),
            port,
            subdomain: subdomain.to_ascii_lowercase(),
        })
    }
}
