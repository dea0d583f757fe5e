use std::process::ExitCode;

use subdomain_gateway::logging::init_logging;
use subdomain_gateway::server::Gateway;
use subdomain_gateway::settings::{GatewayConfig, Settings};
use subdomain_gateway::shutdown::{shutdown_channel, wait_for_os_signal};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = Settings::config_path();
    if !config_path.exists() {
        // 설정 파일이 없으면 예제 설정을 만들어 두고 종료
        return match GatewayConfig::write_default(&config_path).await {
            Ok(()) => {
                eprintln!(
                    "설정 파일 {}이(가) 없어 예제 설정을 생성했습니다. 내용을 수정한 뒤 다시 실행하세요.",
                    config_path.display()
                );
                ExitCode::FAILURE
            }
            Err(e) => {
                eprintln!("예제 설정 생성 실패: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let settings = match Settings::load().await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("설정 로드 실패: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let _guard = init_logging(&settings.logging);
    info!(
        config = %config_path.display(),
        domain = %settings.gateway.listening_domain,
        routes = settings.gateway.proxy_information.len(),
        "게이트웨이 시작"
    );

    let gateway = match Gateway::new(settings.gateway) {
        Ok(gateway) => gateway,
        Err(e) => {
            error!(error = %e, "게이트웨이 초기화 실패");
            return ExitCode::FAILURE;
        }
    };

    let (trigger, signal) = shutdown_channel();
    let running = match gateway.start(signal).await {
        Ok(running) => running,
        Err(e) => {
            error!(error = %e, "게이트웨이 시작 실패");
            return ExitCode::FAILURE;
        }
    };

    wait_for_os_signal().await;
    info!("종료 시작, 진행 중인 연결을 정리합니다");
    trigger.trigger();
    running.wait().await;

    info!("게이트웨이 종료");
    ExitCode::SUCCESS
}
