//! 거래 가능 쌍 목록 조회.

use anyhow::Result;
use tracing::info;

use feed_core::AppConfig;

/// 호가 통화로 필터링된 거래 가능 쌍을 출력합니다.
pub async fn list_pairs(config: &AppConfig) -> Result<usize> {
    let ctx = super::connect(config).await?;
    let pairs = ctx.client.list_tradable_pairs().await?;

    println!(
        "\n연결: {} ({})",
        ctx.snapshot.status,
        ctx.snapshot.active_endpoint.as_deref().unwrap_or("-")
    );
    println!(
        "\n거래 가능 쌍 ({} 기준): {}개\n",
        config.exchange.quote_currency,
        pairs.len()
    );
    println!("{:<16} {:<8} {:<8} {}", "ID", "BASE", "QUOTE", "NAME");
    println!("{}", "-".repeat(48));
    for pair in &pairs {
        println!(
            "{:<16} {:<8} {:<8} {}",
            pair.id, pair.base, pair.quote, pair.display_name
        );
    }

    info!(count = pairs.len(), "Listed tradable pairs");
    Ok(pairs.len())
}
