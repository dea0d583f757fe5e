use std::fmt;

#[derive(Debug)]
pub enum SettingsError {
    EnvVarInvalid {
        var_name: String,
        value: String,
        reason: String,
    },
    FileError {
        path: String,
        error: std::io::Error,
    },
    ParseError {
        path: String,
        reason: String,
    },
    SchemaCompileError {
        reason: String,
    },
    SchemaViolation {
        path: String,
        errors: Vec<String>,
    },
    InvalidConfig(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnvVarInvalid { var_name, value, reason } =>
                write!(f, "환경 변수 {} 값 {} 오류: {}", var_name, value, reason),
            Self::FileError { path, error } =>
                write!(f, "설정 파일 {} 오류: {}", path, error),
            Self::ParseError { path, reason } =>
                write!(f, "설정 파일 {} 파싱 오류: {}", path, reason),
            Self::SchemaCompileError { reason } =>
                write!(f, "설정 스키마 컴파일 오류: {}", reason),
            Self::SchemaViolation { path, errors } =>
                write!(f, "설정 파일 {} 스키마 검증 실패: {}", path, errors.join("; ")),
            Self::InvalidConfig(msg) =>
                write!(f, "잘못된 설정: {}", msg),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FileError { error, .. } => Some(error),
            _ => None,
        }
    }
}
