use std::net::SocketAddr;
use std::time::Duration;

use subdomain_gateway::shutdown::{shutdown_channel, ShutdownTrigger};
use subdomain_gateway::tunnel::TcpTunnel;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[cfg(test)]
mod tests {
    use super::*;

    async fn spawn_echo_backend() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let (mut reader, mut writer) = stream.into_split();
                    let _ = tokio::io::copy(&mut reader, &mut writer).await;
                    let _ = writer.shutdown().await;
                });
            }
        });

        addr
    }

    // 클라이언트가 쓰기를 닫을 때까지 모두 읽은 뒤 받은 바이트 수로 응답하는 백엔드
    async fn spawn_collecting_backend() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut received = Vec::new();
                    if stream.read_to_end(&mut received).await.is_ok() {
                        let reply = format!("received {} bytes", received.len());
                        let _ = stream.write_all(reply.as_bytes()).await;
                        let _ = stream.shutdown().await;
                    }
                });
            }
        });

        addr
    }

    async fn start_tunnel(
        backend: SocketAddr,
        timeout: Option<Duration>,
    ) -> (ShutdownTrigger, JoinHandle<()>, SocketAddr) {
        spawn_tunnel(TcpTunnel::new("127.0.0.1:0", backend.to_string(), timeout)).await
    }

    async fn spawn_tunnel(tunnel: TcpTunnel) -> (ShutdownTrigger, JoinHandle<()>, SocketAddr) {
        let listener = tunnel.bind().await.unwrap();
        let addr = listener.local_addr();
        let (trigger, signal) = shutdown_channel();
        let task = tokio::spawn(listener.run(signal));
        (trigger, task, addr)
    }

    fn payload(len: usize, seed: u8) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
    }

    // 불규칙한 크기로 나눠 쓰면서 동시에 응답을 모두 읽는다
    async fn round_trip(addr: SocketAddr, data: Vec<u8>) -> Vec<u8> {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (mut reader, mut writer) = stream.into_split();

        let writer_task = tokio::spawn(async move {
            let chunk_sizes = [1usize, 7, 512, 3, 4096, 100, 1500];
            let mut offset = 0;
            let mut i = 0;
            while offset < data.len() {
                let end = (offset + chunk_sizes[i % chunk_sizes.len()]).min(data.len());
                writer.write_all(&data[offset..end]).await.unwrap();
                offset = end;
                i += 1;
            }
            writer.shutdown().await.unwrap();
        });

        let mut received = Vec::new();
        reader.read_to_end(&mut received).await.unwrap();
        writer_task.await.unwrap();
        received
    }

    #[tokio::test]
    async fn test_round_trip_preserves_order() {
        let backend = spawn_echo_backend().await;
        let (trigger, task, addr) = start_tunnel(backend, Some(Duration::from_secs(10))).await;

        let data = payload(16 * 1024, 7);
        let received = tokio::time::timeout(Duration::from_secs(5), round_trip(addr, data.clone()))
            .await
            .unwrap();
        assert_eq!(received, data);

        trigger.trigger();
        tokio::time::timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_half_close_does_not_truncate() {
        let backend = spawn_collecting_backend().await;
        let (trigger, _task, addr) = start_tunnel(backend, Some(Duration::from_secs(10))).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(&payload(20_000, 1)).await.unwrap();
        client.shutdown().await.unwrap();

        let mut reply = String::new();
        tokio::time::timeout(Duration::from_secs(5), client.read_to_string(&mut reply))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply, "received 20000 bytes");

        trigger.trigger();
    }

    #[tokio::test]
    async fn test_concurrent_sessions_are_independent() {
        let backend = spawn_echo_backend().await;
        let (trigger, _task, addr) = start_tunnel(backend, Some(Duration::from_secs(10))).await;

        let first = payload(12_000, 3);
        let second = payload(30_000, 200);
        let (got_first, got_second) = tokio::time::timeout(
            Duration::from_secs(5),
            async { tokio::join!(round_trip(addr, first.clone()), round_trip(addr, second.clone())) },
        )
        .await
        .unwrap();

        assert_eq!(got_first, first);
        assert_eq!(got_second, second);

        trigger.trigger();
    }

    #[tokio::test]
    async fn test_idle_session_is_closed_after_timeout() {
        let backend = spawn_echo_backend().await;
        let (trigger, _task, addr) = start_tunnel(backend, Some(Duration::from_millis(200))).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut buf = [0u8; 16];
        let read = tokio::time::timeout(Duration::from_secs(3), client.read(&mut buf))
            .await
            .expect("프록시가 유휴 세션을 닫아야 함");
        // EOF 또는 연결 리셋
        assert!(matches!(read, Ok(0) | Err(_)));

        trigger.trigger();
    }

    #[tokio::test]
    async fn test_dial_failure_closes_client() {
        let dead = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let (trigger, _task, addr) = start_tunnel(dead, Some(Duration::from_secs(2))).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut buf = [0u8; 16];
        let read = tokio::time::timeout(Duration::from_secs(3), client.read(&mut buf))
            .await
            .expect("백엔드 연결 실패 시 클라이언트 연결이 닫혀야 함");
        assert!(matches!(read, Ok(0) | Err(_)));

        trigger.trigger();
    }

    #[tokio::test]
    async fn test_shutdown_keeps_active_session_alive() {
        let backend = spawn_echo_backend().await;
        let (trigger, task, addr) = start_tunnel(backend, None).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"hello").await.unwrap();
        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");

        trigger.trigger();
        tokio::time::sleep(Duration::from_millis(200)).await;

        // 새 연결은 받지 않는다
        assert!(TcpStream::connect(addr).await.is_err());

        // 이미 수락된 세션은 종료 신호 이후에도 계속 중계된다
        client.write_all(b"still").await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), client.read_exact(&mut buf))
            .await
            .expect("종료 신호 이후에도 세션이 응답해야 함")
            .unwrap();
        assert_eq!(&buf, b"still");
        assert!(!task.is_finished());

        // 세션이 스스로 끝나면 리스너 태스크도 끝난다
        client.shutdown().await.unwrap();
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
        tokio::time::timeout(Duration::from_secs(3), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_drain_timeout_aborts_remaining_sessions() {
        let backend = spawn_echo_backend().await;
        let tunnel = TcpTunnel::new("127.0.0.1:0", backend.to_string(), None)
            .with_drain_timeout(Some(Duration::from_millis(300)));
        let (trigger, task, addr) = spawn_tunnel(tunnel).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"hello").await.unwrap();
        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).await.unwrap();

        // 상한을 지정한 경우에만 남은 세션을 중단한다
        trigger.trigger();
        tokio::time::timeout(Duration::from_secs(3), task).await.unwrap().unwrap();

        let read = tokio::time::timeout(Duration::from_secs(2), client.read(&mut buf))
            .await
            .expect("중단된 세션은 닫혀야 함");
        assert!(matches!(read, Ok(0) | Err(_)));
    }
}
