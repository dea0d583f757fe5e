//! Subdomain Gateway는 서브도메인 기반 라우팅을 지원하는 경량 멀티 프로토콜 게이트웨이입니다.
//!
//! # 주요 기능
//!
//! - Host 헤더의 첫 번째 라벨로 백엔드를 고르는 HTTP/HTTPS 리버스 프록시
//! - 라우트마다 리스너를 띄우는 바이트 투명 TCP 터널
//! - Basic 인증, 요청/응답 헤더 로깅
//! - 명시적 종료 토큰과 연결 드레인
//!
//! # 예제
//!
//! ```
//! use subdomain_gateway::routing::{Protocol, Route, RouteTable};
//!
//! let mut table = RouteTable::new();
//! table.add_route(Route::http("app", "http://127.0.0.1:9001")).unwrap();
//! table.add_route(Route::https("api", "http://127.0.0.1:9002")).unwrap();
//! table.add_route(Route::tcp("db", "127.0.0.1:5432", "0.0.0.0:15432")).unwrap();
//!
//! let http = table.subdomain_map(Protocol::Http).unwrap();
//! assert_eq!(http.get("APP").unwrap().backend_endpoint, "http://127.0.0.1:9001");
//! assert!(table.has_routes(Protocol::Tcp));
//! ```
//!
//! # 설정으로 게이트웨이 실행
//!
//! ```no_run
//! use subdomain_gateway::server::Gateway;
//! use subdomain_gateway::settings::GatewayConfig;
//! use subdomain_gateway::shutdown::{shutdown_channel, wait_for_os_signal};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::from_file("config.json").await?;
//! let (trigger, signal) = shutdown_channel();
//!
//! let running = Gateway::new(config)?.start(signal).await?;
//! wait_for_os_signal().await;
//! trigger.trigger();
//! running.wait().await;
//! # Ok(())
//! # }
//! ```

pub mod logging;
pub mod middleware;
pub mod proxy;
pub mod routing;
pub mod server;
pub mod settings;
pub mod shutdown;
pub mod tls;
pub mod tunnel;
