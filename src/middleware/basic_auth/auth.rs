use subtle::ConstantTimeEq;

/// Basic 인증을 위한 인증기 트레이트
///
/// # 지원하는 비밀번호 형식
/// - bcrypt ($2a$, $2b$, $2y$ 접두사)
/// - 평문 (상수 시간 비교)
pub trait Authenticator: Send + Sync {
    fn verify_credentials(&self, username: &str, password: &str) -> bool;
}

/// 설정 파일의 사용자 한 명만 허용하는 인증기
pub struct SingleUserAuthenticator {
    username: String,
    password: String,
}

impl SingleUserAuthenticator {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Authenticator for SingleUserAuthenticator {
    fn verify_credentials(&self, username: &str, password: &str) -> bool {
        // 사용자 이름이 달라도 비밀번호 검증은 수행한다
        let user_ok = constant_time_eq(username.as_bytes(), self.username.as_bytes());
        let password_ok = verify_password(password, &self.password);
        user_ok && password_ok
    }
}

/// 비밀번호 검증 함수
pub fn verify_password(password: &str, stored: &str) -> bool {
    if stored.starts_with("$2") {
        bcrypt::verify(password, stored).unwrap_or(false)
    } else {
        constant_time_eq(password.as_bytes(), stored.as_bytes())
    }
}

// 비교 시간은 저장된 값 `b`의 길이에만 의존한다
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let padded: Vec<u8> = (0..b.len()).map(|i| a.get(i).copied().unwrap_or(0)).collect();
    let same_len = (a.len() as u64).ct_eq(&(b.len() as u64));
    (padded.ct_eq(b) & same_len).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bcrypt::DEFAULT_COST;

    #[test]
    fn test_plain_password() {
        let authenticator = SingleUserAuthenticator::new("admin", "secret");
        assert!(authenticator.verify_credentials("admin", "secret"));
        assert!(!authenticator.verify_credentials("admin", "secre"));
        assert!(!authenticator.verify_credentials("root", "secret"));
    }

    #[test]
    fn test_bcrypt_verify() {
        let hash = bcrypt::hash("password", DEFAULT_COST).unwrap();
        assert!(verify_password("password", &hash));
        assert!(!verify_password("wrong", &hash));

        let authenticator = SingleUserAuthenticator::new("admin", hash);
        assert!(authenticator.verify_credentials("admin", "password"));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));

        assert!(verify_password("secret", "secret"));
        assert!(!verify_password("x", "secret"));
        assert!(!verify_password("secret-but-longer", "secret"));
        assert!(!verify_password("secret\0", "secret"));
        assert!(!verify_password("", "secret"));
    }
}
