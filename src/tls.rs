use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::rustls::{self, Certificate, PrivateKey};
use tokio_rustls::TlsAcceptor;
use tracing::info;

#[derive(Debug)]
pub enum TlsError {
    Io {
        path: String,
        error: std::io::Error,
    },
    NoCertificates {
        path: String,
    },
    NoPrivateKey {
        path: String,
    },
    Config(rustls::Error),
}

impl fmt::Display for TlsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsError::Io { path, error } => write!(f, "TLS 파일 {} 읽기 실패: {}", path, error),
            TlsError::NoCertificates { path } => write!(f, "{}에서 인증서를 찾을 수 없음", path),
            TlsError::NoPrivateKey { path } => write!(f, "{}에서 개인키를 찾을 수 없음", path),
            TlsError::Config(e) => write!(f, "TLS 설정 오류: {}", e),
        }
    }
}

impl std::error::Error for TlsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TlsError::Io { error, .. } => Some(error),
            TlsError::Config(e) => Some(e),
            _ => None,
        }
    }
}

/// PEM 인증서 체인과 개인키로 TLS acceptor를 만듭니다.
///
/// 개인키는 PKCS#8, PKCS#1(RSA), SEC1(EC) 형식을 지원하며 파일의 첫 번째 키를 사용합니다.
pub fn load_tls_acceptor(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor, TlsError> {
    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;

    let mut config = rustls::ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(TlsError::Config)?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    info!(cert = %cert_path.display(), key = %key_path.display(), "TLS 인증서 로드 완료");
    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|error| TlsError::Io {
            path: path.display().to_string(),
            error,
        })
}

fn load_certs(path: &Path) -> Result<Vec<Certificate>, TlsError> {
    let mut reader = open(path)?;
    let certs: Vec<Certificate> = rustls_pemfile::certs(&mut reader)
        .map_err(|error| TlsError::Io {
            path: path.display().to_string(),
            error,
        })?
        .into_iter()
        .map(Certificate)
        .collect();

    if certs.is_empty() {
        return Err(TlsError::NoCertificates {
            path: path.display().to_string(),
        });
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKey, TlsError> {
    let mut reader = open(path)?;
    let items = rustls_pemfile::read_all(&mut reader).map_err(|error| TlsError::Io {
        path: path.display().to_string(),
        error,
    })?;

    items
        .into_iter()
        .find_map(|item| match item {
            rustls_pemfile::Item::PKCS8Key(key)
            | rustls_pemfile::Item::RSAKey(key)
            | rustls_pemfile::Item::ECKey(key) => Some(PrivateKey(key)),
            _ => None,
        })
        .ok_or_else(|| TlsError::NoPrivateKey {
            path: path.display().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_certificate_file() {
        let result = load_tls_acceptor(Path::new("/nonexistent/tls.crt"), Path::new("/nonexistent/tls.key"));
        assert!(matches!(result, Err(TlsError::Io { .. })));
    }

    #[test]
    fn test_file_without_pem_blocks() -> Result<(), Box<dyn std::error::Error>> {
        let mut cert = NamedTempFile::new()?;
        writeln!(cert, "not a certificate")?;

        let result = load_certs(cert.path());
        assert!(matches!(result, Err(TlsError::NoCertificates { .. })));

        let result = load_private_key(cert.path());
        assert!(matches!(result, Err(TlsError::NoPrivateKey { .. })));
        Ok(())
    }
}
