use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use tracing::debug;

use super::error::SettingsError;
use super::schema::GATEWAY_CONFIG_SCHEMA;
use super::Result;

/// 설정 문서를 스키마로 검증하는 구조체
pub struct ConfigValidator {
    schema: JSONSchema,
}

impl ConfigValidator {
    pub fn new() -> Result<Self> {
        let schema_value: Value = serde_json::from_str(GATEWAY_CONFIG_SCHEMA)
            .map_err(|e| SettingsError::SchemaCompileError {
                reason: format!("스키마 파싱 오류: {}", e),
            })?;

        let schema = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema_value)
            .map_err(|e| SettingsError::SchemaCompileError {
                reason: format!("스키마 컴파일 오류: {}", e),
            })?;

        debug!("설정 스키마 컴파일 성공");
        Ok(Self { schema })
    }

    /// 문서가 스키마를 위반하면 위반 위치와 메시지를 모두 모아 반환합니다.
    pub fn validate(&self, path: &str, document: &Value) -> Result<()> {
        if let Err(errors) = self.schema.validate(document) {
            let errors = errors
                .map(|error| {
                    let location = error.instance_path.to_string();
                    if location.is_empty() {
                        error.to_string()
                    } else {
                        format!("{}: {}", location, error)
                    }
                })
                .collect::<Vec<_>>();

            return Err(SettingsError::SchemaViolation {
                path: path.to_string(),
                errors,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_document() {
        let validator = ConfigValidator::new().unwrap();
        let doc = json!({
            "listeningDomain": "4gr8.local",
            "listeningHTTPPort": "8080",
            "proxyInformation": [
                {"proxyType": "http", "proxySubDomain": "app", "proxyEndpoint": "http://127.0.0.1:9001"}
            ]
        });
        assert!(validator.validate("test.json", &doc).is_ok());
    }

    #[test]
    fn test_unknown_proxy_type_rejected() {
        let validator = ConfigValidator::new().unwrap();
        let doc = json!({
            "listeningDomain": "4gr8.local",
            "proxyInformation": [
                {"proxyType": "udp", "proxySubDomain": "dns", "proxyEndpoint": "127.0.0.1:53"}
            ]
        });

        match validator.validate("test.json", &doc) {
            Err(SettingsError::SchemaViolation { errors, .. }) => {
                assert!(errors.iter().any(|e| e.contains("/proxyInformation/0/proxyType")));
            }
            other => panic!("스키마 위반이 보고되어야 함: {:?}", other),
        }
    }

    #[test]
    fn test_port_must_be_numeric_string() {
        let validator = ConfigValidator::new().unwrap();
        let doc = json!({
            "listeningDomain": "4gr8.local",
            "listeningHTTPPort": 8080,
            "proxyInformation": []
        });
        assert!(validator.validate("test.json", &doc).is_err());
    }
}
