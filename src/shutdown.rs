//! 리스너와 세션에 전달되는 명시적 종료 토큰입니다.
//!
//! OS 시그널 처리는 바이너리에서만 `wait_for_os_signal`로 연결하므로, 테스트에서는
//! 시그널 없이 `ShutdownTrigger::trigger`만으로 종료를 재현할 수 있습니다.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// 종료를 알리는 쪽
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

/// 종료를 기다리는 쪽. 리스너마다 복제해서 전달합니다.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownSignal { rx })
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal { rx: self.tx.subscribe() }
    }
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// 종료가 요청될 때까지 기다립니다. 트리거가 드롭된 경우도 종료로 봅니다.
    ///
    /// 취소되어도 안전하므로 `tokio::select!` 안에서 반복 호출할 수 있습니다.
    pub async fn wait(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// SIGINT(Ctrl+C) 또는 SIGTERM을 받을 때까지 기다립니다.
pub async fn wait_for_os_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C 핸들러 등록 실패");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM 핸들러 등록 실패");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT 수신"),
        _ = terminate => info!("SIGTERM 수신"),
    }
}

/// 리스너가 멈춘 뒤 진행 중인 연결 태스크가 끝날 때까지 기다립니다.
///
/// 종료 신호는 진행 중인 세션을 끊지 않습니다. `timeout`이 주어진 경우에만 그 시간이
/// 지난 뒤 남은 태스크를 중단합니다.
pub async fn drain_tasks(mut tasks: JoinSet<()>, timeout: Option<Duration>, listener: &str) {
    if tasks.is_empty() {
        return;
    }

    info!(listener = %listener, active = tasks.len(), "진행 중인 연결 종료 대기");

    let Some(timeout) = timeout else {
        while tasks.join_next().await.is_some() {}
        return;
    };

    let drained = tokio::time::timeout(timeout, async {
        while tasks.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        warn!(
            listener = %listener,
            remaining = tasks.len(),
            timeout_secs = timeout.as_secs(),
            "드레인 타임아웃, 남은 연결을 중단합니다"
        );
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
    }
}
