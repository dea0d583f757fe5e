use std::time::Duration;

use subdomain_gateway::routing::Protocol;
use subdomain_gateway::settings::{
    GatewayConfig, LogFormat, LogOutput, Settings, SettingsError, CONFIG_FILE_ENV,
};

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    // 테스트 전후 환경변수 초기화를 위한 헬퍼 함수
    fn cleanup_env() {
        std::env::remove_var(CONFIG_FILE_ENV);
        std::env::remove_var("GATEWAY_LOG_LEVEL");
        std::env::remove_var("GATEWAY_LOG_FORMAT");
        std::env::remove_var("GATEWAY_LOG_OUTPUT");
    }

    fn write_config(name: &str, content: &str) -> (String, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join(name);
        std::fs::write(&file_path, content).unwrap();
        (file_path.to_str().unwrap().to_string(), dir)
    }

    const JSON_CONFIG: &str = r#"{
        "listeningDomain": "4gr8.local",
        "listeningHTTPPort": "8080",
        "listeningTLSPort": "8443",
        "listeningTCPPort": "9000",
        "proxyInformation": [
            {"proxyType": "http", "proxySubDomain": "app", "proxyEndpoint": "http://127.0.0.1:9001", "proxyNotes": "web"},
            {"proxyType": "tcp", "proxySubDomain": "db", "proxyEndpoint": "127.0.0.1:5432", "proxyNotes": "", "proxyListenAddress": "0.0.0.0:15432"}
        ],
        "basicAuthOptions": {"enabled": false, "username": "", "password": ""},
        "tlsCert": "",
        "tlsKey": "",
        "tcpTimeoutSeconds": 30
    }"#;

    #[tokio::test]
    #[serial]
    async fn test_load_from_env_path() {
        cleanup_env();
        let (path, _dir) = write_config("gateway.json", JSON_CONFIG);
        std::env::set_var(CONFIG_FILE_ENV, &path);
        std::env::set_var("GATEWAY_LOG_FORMAT", "json");
        std::env::set_var("GATEWAY_LOG_LEVEL", "debug");
        std::env::set_var("GATEWAY_LOG_OUTPUT", "/tmp/gateway.log");

        let settings = Settings::load().await.unwrap();
        assert_eq!(settings.gateway.listening_domain, "4gr8.local");
        assert_eq!(settings.gateway.tcp_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.logging.level, tracing::Level::DEBUG);
        assert_eq!(settings.logging.output, LogOutput::File("/tmp/gateway.log".to_string()));

        let table = settings.gateway.route_table().unwrap();
        assert!(table.has_routes(Protocol::Http));
        assert!(!table.has_routes(Protocol::Https));
        let tcp: Vec<_> = table.tcp_routes().collect();
        assert_eq!(tcp[0].listen_address.as_deref(), Some("0.0.0.0:15432"));

        cleanup_env();
    }

    #[tokio::test]
    #[serial]
    async fn test_invalid_log_format_env() {
        cleanup_env();
        let (path, _dir) = write_config("gateway.json", JSON_CONFIG);
        std::env::set_var(CONFIG_FILE_ENV, &path);
        std::env::set_var("GATEWAY_LOG_FORMAT", "xml");

        let result = Settings::load().await;
        assert!(matches!(result, Err(SettingsError::EnvVarInvalid { .. })));

        cleanup_env();
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_config_file() {
        cleanup_env();
        std::env::set_var(CONFIG_FILE_ENV, "/nonexistent/gateway.json");

        let result = Settings::load().await;
        assert!(matches!(result, Err(SettingsError::FileError { .. })));

        cleanup_env();
    }

    #[tokio::test]
    async fn test_toml_config_file() {
        let (path, _dir) = write_config(
            "gateway.toml",
            r#"
                listeningDomain = "4gr8.local"
                listeningHTTPPort = "8081"

                [[proxyInformation]]
                proxyType = "https"
                proxySubDomain = "api"
                proxyEndpoint = "http://127.0.0.1:9002"
                proxyNotes = ""

                tlsCert = "keys/tls.crt"
                tlsKey = "keys/tls.key"
            "#,
        );

        // 테이블 배열 뒤의 키는 배열 항목에 속하므로 TLS 경로가 없는 것으로 처리된다
        let result = GatewayConfig::from_file(&path).await;
        assert!(matches!(result, Err(SettingsError::InvalidConfig(_))));

        let (path, _dir) = write_config(
            "gateway.toml",
            r#"
                listeningDomain = "4gr8.local"
                listeningHTTPPort = "8081"
                tlsCert = "keys/tls.crt"
                tlsKey = "keys/tls.key"

                [[proxyInformation]]
                proxyType = "https"
                proxySubDomain = "api"
                proxyEndpoint = "http://127.0.0.1:9002"
                proxyNotes = ""
            "#,
        );

        let config = GatewayConfig::from_file(&path).await.unwrap();
        assert_eq!(config.http_listen_address(), "4gr8.local:8081");
        assert_eq!(config.https_listen_address(), "4gr8.local:8443");
        assert!(config.has_routes(Protocol::Https));
    }

    #[tokio::test]
    async fn test_schema_violation_is_reported() {
        let (path, _dir) = write_config(
            "gateway.json",
            r#"{
                "listeningDomain": "4gr8.local",
                "proxyInformation": [
                    {"proxyType": "udp", "proxySubDomain": "app", "proxyEndpoint": "127.0.0.1:53"}
                ]
            }"#,
        );

        match GatewayConfig::from_file(&path).await {
            Err(SettingsError::SchemaViolation { errors, .. }) => assert!(!errors.is_empty()),
            other => panic!("SchemaViolation을 기대했지만 {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_write_default_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        GatewayConfig::write_default(&path).await.unwrap();
        let config = GatewayConfig::from_file(&path).await.unwrap();

        assert_eq!(config, GatewayConfig::sample());
        assert_eq!(config.proxy_information.len(), 3);
        assert!(config.has_routes(Protocol::Tcp));
    }
}
