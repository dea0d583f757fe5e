use hyper::Request;
use subdomain_gateway::routing::{Protocol, Route, RouteTable, RoutingError, SubdomainMap};

#[cfg(test)]
mod tests {
    use super::*;

    fn request(host: Option<&str>) -> Request<()> {
        let mut builder = Request::builder().uri("/health");
        if let Some(host) = host {
            builder = builder.header("Host", host);
        }
        builder.body(()).unwrap()
    }

    fn http_map() -> SubdomainMap<Route> {
        let mut map = SubdomainMap::new();
        map.insert("app", Route::http("app", "http://127.0.0.1:9001"));
        map.insert("api", Route::http("api", "http://127.0.0.1:9002"));
        map
    }

    #[test]
    fn test_route_request_by_subdomain() {
        let map = http_map();

        let (host, route) = map.route_request(&request(Some("app.4gr8.local"))).unwrap();
        assert_eq!(host.subdomain, "app");
        assert_eq!(route.backend_endpoint, "http://127.0.0.1:9001");

        let (host, route) = map.route_request(&request(Some("API.4gr8.local:8443"))).unwrap();
        assert_eq!(host.subdomain, "api");
        assert_eq!(host.port, Some(8443));
        assert_eq!(route.backend_endpoint, "http://127.0.0.1:9002");
    }

    #[test]
    fn test_route_request_errors() {
        let map = http_map();

        assert_eq!(map.route_request(&request(None)).unwrap_err(), RoutingError::MissingHost);
        assert!(matches!(
            map.route_request(&request(Some("localhost"))),
            Err(RoutingError::InvalidHost { .. })
        ));

        match map.route_request(&request(Some("unknown.4gr8.local"))) {
            Err(RoutingError::SubdomainNotFound { subdomain, available_routes }) => {
                assert_eq!(subdomain, "unknown");
                assert_eq!(available_routes, vec!["api".to_string(), "app".to_string()]);
            }
            other => panic!("SubdomainNotFound를 기대했지만 {:?}", other.map(|(h, _)| h)),
        }
    }

    #[test]
    fn test_absolute_uri_without_host_header() {
        let map = http_map();
        let req = Request::builder()
            .uri("http://app.4gr8.local/health")
            .body(())
            .unwrap();

        let (host, _) = map.route_request(&req).unwrap();
        assert_eq!(host.subdomain, "app");
    }

    #[test]
    fn test_route_table_partitions_by_protocol() {
        let mut table = RouteTable::new();
        table.add_route(Route::http("app", "http://127.0.0.1:9001")).unwrap();
        table.add_route(Route::https("app", "http://127.0.0.1:9101")).unwrap();
        table.add_route(Route::tcp("db", "127.0.0.1:5432", "127.0.0.1:15432")).unwrap();

        // 같은 서브도메인이라도 HTTP와 HTTPS는 서로 다른 백엔드를 가진다
        let http = table.subdomain_map(Protocol::Http).unwrap();
        let https = table.subdomain_map(Protocol::Https).unwrap();
        assert_eq!(http.get("app").unwrap().backend_endpoint, "http://127.0.0.1:9001");
        assert_eq!(https.get("app").unwrap().backend_endpoint, "http://127.0.0.1:9101");

        assert!(table.subdomain_map(Protocol::Tcp).is_none());
        assert_eq!(table.tcp_routes().count(), 1);
    }

    #[test]
    fn test_duplicate_subdomain_last_wins() {
        let mut table = RouteTable::new();
        table.add_route(Route::http("app", "http://127.0.0.1:9001")).unwrap();
        table.add_route(Route::http("APP", "http://127.0.0.1:9002").with_notes("second")).unwrap();

        let http = table.subdomain_map(Protocol::Http).unwrap();
        assert_eq!(http.len(), 1);
        assert_eq!(http.get("app").unwrap().backend_endpoint, "http://127.0.0.1:9002");
        assert_eq!(http.get("app").unwrap().notes, "second");
    }

    #[test]
    fn test_tcp_route_requires_listen_address() {
        let mut table = RouteTable::new();
        let mut route = Route::tcp("db", "127.0.0.1:5432", "127.0.0.1:15432");
        route.listen_address = None;

        assert_eq!(
            table.add_route(route),
            Err(RoutingError::MissingListenAddress { subdomain: "db".to_string() })
        );
        assert!(table.is_empty());
    }

    #[test]
    fn test_try_map_builds_parallel_map() {
        let map = http_map();
        let lengths: SubdomainMap<usize> = map
            .try_map(|_, route| Ok::<_, String>(route.backend_endpoint.len()))
            .unwrap();
        assert_eq!(lengths.get("app"), Some(&"http://127.0.0.1:9001".len()));

        let failed: Result<SubdomainMap<usize>, String> =
            map.try_map(|subdomain, _| Err(format!("{} 실패", subdomain)));
        assert!(failed.is_err());
    }
}
