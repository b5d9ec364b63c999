//! 고정 간격 시세 폴링.

use std::time::Duration;

use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use feed_core::AppConfig;
use feed_exchange::{PollEvent, Poller};

/// 폴링 설정.
#[derive(Debug)]
pub struct WatchConfig {
    /// 폴링할 거래 쌍 식별자 목록
    pub pairs: Vec<String>,
    /// 폴링 간격 (초)
    pub interval_secs: u64,
}

/// 주기적으로 시세를 조회해 출력합니다. Ctrl-C로 종료합니다.
pub async fn watch(config: &AppConfig, watch_config: WatchConfig) -> Result<()> {
    if watch_config.pairs.is_empty() {
        bail!("No pairs to watch. Use --pairs or set poll.pairs in the config file");
    }
    if watch_config.interval_secs == 0 {
        bail!("Poll interval must be at least 1 second");
    }

    let ctx = super::connect(config).await?;

    println!(
        "\n시세 폴링 시작: {} ({}초 간격, Ctrl-C로 종료)\n",
        watch_config.pairs.join(", "),
        watch_config.interval_secs
    );

    let token = CancellationToken::new();
    let (handle, mut rx) = Poller::spawn(
        ctx.client,
        watch_config.pairs,
        Duration::from_secs(watch_config.interval_secs),
        token.clone(),
    );

    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping poller");
            signal_token.cancel();
        }
    });

    while let Some(event) = rx.recv().await {
        match event {
            PollEvent::Tick(tickers) => {
                for t in tickers {
                    println!(
                        "[{}] {:<16} {} ({}%)",
                        t.timestamp.format("%H:%M:%S"),
                        t.pair_id,
                        t.last,
                        t.change_24h_percent.round_dp(2)
                    );
                }
            }
            PollEvent::Error(msg) => {
                println!("폴링 실패: {} (다음 주기에 재시도)", msg);
            }
        }
    }

    handle.await?;
    ctx.manager.disconnect().await;
    println!("\n폴링 종료");

    Ok(())
}
