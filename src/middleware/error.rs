use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Authorization 헤더 없음
    MissingCredentials,
    /// Basic 스킴이 아니거나 base64/UTF-8 디코딩 실패
    MalformedHeader(String),
    InvalidCredentials {
        username: String,
    },
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingCredentials => write!(f, "Authorization 헤더가 없습니다"),
            AuthError::MalformedHeader(reason) => write!(f, "잘못된 Authorization 헤더: {}", reason),
            AuthError::InvalidCredentials { username } => write!(f, "사용자 {} 인증 실패", username),
        }
    }
}

impl std::error::Error for AuthError {}
