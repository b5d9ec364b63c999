//! 고정 간격 시세 폴링 루프.
//!
//! Fetcher 위에 독립적으로 얹히는 타이머 루프입니다. 실패한 폴은
//! 이벤트로 보고만 하고, 다음 주기에 같은 endpoint로 다시 시도합니다.
//! 폴링 중에는 어떤 failover도 일어나지 않습니다.
//!
//! 취소는 `CancellationToken`으로 합니다. 취소 시 새 폴은 더 이상
//! 예약되지 않지만, 이미 진행 중인 요청은 완료(또는 실패)까지
//! 독립적으로 수행되고 그 결과도 전달됩니다.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use feed_core::Ticker;

use crate::kraken::MarketClient;

/// 폴링 루프가 내보내는 이벤트.
#[derive(Debug, Clone)]
pub enum PollEvent {
    /// 주기 폴 성공 - 시세 묶음
    Tick(Vec<Ticker>),
    /// 주기 폴 실패 - 에러 메시지 (다음 주기에 재시도)
    Error(String),
}

/// 시세 폴링 루프.
pub struct Poller;

impl Poller {
    /// 폴링 태스크를 시작합니다.
    ///
    /// 반환된 수신 채널로 `PollEvent`가 전달됩니다. `token`을 취소하면
    /// 루프가 종료됩니다. 수신 측이 채널을 닫아도 루프는 종료됩니다.
    /// 간격이 0이면 최소 1ms로 올립니다.
    pub fn spawn(
        client: Arc<MarketClient>,
        pairs: Vec<String>,
        interval: Duration,
        token: CancellationToken,
    ) -> (JoinHandle<()>, mpsc::Receiver<PollEvent>) {
        let (tx, rx) = mpsc::channel(16);

        // tokio::time::interval은 0 간격에서 panic
        let interval = interval.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Poller cancelled");
                        break;
                    }
                    _ = ticker.tick() => {}
                }

                // 진행 중인 폴은 취소 없이 완료까지 수행
                let event = match client.fetch_tickers(&pairs).await {
                    Ok(tickers) => {
                        debug!(count = tickers.len(), "Poll tick");
                        PollEvent::Tick(tickers)
                    }
                    Err(e) => {
                        warn!(error = %e, "Poll failed, retrying on next interval");
                        PollEvent::Error(e.to_string())
                    }
                };

                if tx.send(event).await.is_err() {
                    debug!("Poll receiver dropped, stopping");
                    break;
                }
            }
        });

        (handle, rx)
    }
}
