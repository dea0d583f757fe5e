use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::debug;

use super::error::{Direction, TunnelError};

/// 세션 한 건의 방향별 전송량
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub client_to_backend: u64,
    pub backend_to_client: u64,
}

/// 두 소켓 사이에서 양방향으로 바이트를 중계합니다.
///
/// 한 방향이 EOF에 도달하면 목적지 소켓의 쓰기 쪽만 닫아(half-close) 반대 방향의
/// 데이터는 계속 흐르게 합니다. 두 방향이 모두 끝나야 세션이 완료되고, 한 방향에서
/// 오류나 데드라인 초과가 발생하면 다른 방향도 중단되고 두 소켓이 닫힙니다.
pub async fn relay(
    client: TcpStream,
    backend: TcpStream,
    deadline: Option<Instant>,
) -> Result<RelayStats, TunnelError> {
    let (client_read, client_write) = client.into_split();
    let (backend_read, backend_write) = backend.into_split();

    let (client_to_backend, backend_to_client) = tokio::try_join!(
        pump(client_read, backend_write, deadline, Direction::ClientToBackend),
        pump(backend_read, client_write, deadline, Direction::BackendToClient),
    )?;

    Ok(RelayStats {
        client_to_backend,
        backend_to_client,
    })
}

async fn pump<R, W>(
    mut reader: R,
    mut writer: W,
    deadline: Option<Instant>,
    direction: Direction,
) -> Result<u64, TunnelError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let copy = tokio::io::copy(&mut reader, &mut writer);
    let copied = match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, copy)
            .await
            .map_err(|_| TunnelError::DeadlineExceeded { direction })?,
        None => copy.await,
    }
    .map_err(|error| TunnelError::Io { direction, error })?;

    // 상대가 이미 닫았을 수 있으므로 실패해도 세션 오류로 보지 않는다
    if let Err(e) = writer.shutdown().await {
        debug!(direction = %direction, error = %e, "half-close 실패");
    }

    debug!(direction = %direction, bytes = copied, "방향 전송 완료");
    Ok(copied)
}
