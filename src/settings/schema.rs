//! 게이트웨이 설정 스키마 정의
//!
//! 설정 파일(JSON 또는 TOML)을 역직렬화하기 전에 구조를 검증합니다.
//! 스키마는 JSON Schema Draft 7을 따릅니다.

/// 게이트웨이 설정 스키마 상수
pub const GATEWAY_CONFIG_SCHEMA: &str = r#"{
    "$schema": "http://json-schema.org/draft-07/schema#",
    "type": "object",
    "required": ["listeningDomain", "proxyInformation"],
    "properties": {
        "listeningDomain": {"type": "string", "minLength": 1},
        "listeningHTTPPort": {"type": "string", "pattern": "^[0-9]{1,5}$"},
        "listeningTLSPort": {"type": "string", "pattern": "^[0-9]{1,5}$"},
        "listeningTCPPort": {"type": "string", "pattern": "^[0-9]{1,5}$"},
        "proxyInformation": {
            "type": "array",
            "items": {
                "type": "object",
                "required": ["proxyType", "proxySubDomain", "proxyEndpoint"],
                "properties": {
                    "proxyType": {
                        "type": "string",
                        "enum": ["http", "https", "tcp"]
                    },
                    "proxySubDomain": {"type": "string", "minLength": 1},
                    "proxyEndpoint": {"type": "string", "minLength": 1},
                    "proxyNotes": {"type": "string"},
                    "proxyListenAddress": {"type": "string", "minLength": 1}
                }
            }
        },
        "basicAuthOptions": {
            "type": "object",
            "properties": {
                "enabled": {"type": "boolean"},
                "username": {"type": "string"},
                "password": {"type": "string"},
                "realm": {"type": "string"}
            }
        },
        "tlsCert": {"type": "string"},
        "tlsKey": {"type": "string"},
        "tcpTimeoutSeconds": {"type": "integer", "minimum": 0},
        "drainTimeoutSeconds": {"type": "integer", "minimum": 0}
    }
}"#;
