//! 계좌 잔고 조회 (private API).

use anyhow::Result;
use rust_decimal::Decimal;

use feed_core::AppConfig;

/// 계좌 잔고를 조회해 출력합니다.
///
/// `KRAKEN_API_KEY`/`KRAKEN_API_SECRET` 환경 변수가 필요합니다.
pub async fn show_balance(config: &AppConfig) -> Result<()> {
    let ctx = super::connect(config).await?;
    let balances = ctx.client.fetch_balance().await?;

    println!("\n계좌 잔고: {}개 자산", balances.len());
    println!("{}", "-".repeat(32));
    for (asset, amount) in &balances {
        if *amount > Decimal::ZERO {
            println!("{:<8} {}", asset, amount);
        }
    }

    Ok(())
}
