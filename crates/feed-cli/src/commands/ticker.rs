//! 단일 거래 쌍 시세 조회.

use anyhow::Result;

use feed_core::AppConfig;

/// 거래 쌍의 시세를 조회해 출력합니다.
pub async fn show_ticker(config: &AppConfig, pair_id: &str) -> Result<()> {
    let ctx = super::connect(config).await?;
    let ticker = ctx.client.fetch_ticker(pair_id).await?;

    println!(
        "\n연결: {} ({})",
        ctx.snapshot.status,
        ctx.snapshot.active_endpoint.as_deref().unwrap_or("-")
    );
    println!("\n시세: {}", ticker.pair_id);
    println!("{}", "-".repeat(40));
    println!("현재가:       {}", ticker.last);
    println!("24h 시가:     {}", ticker.open_24h);
    println!("24h 고가:     {}", ticker.high_24h);
    println!("24h 저가:     {}", ticker.low_24h);
    println!("24h 거래량:   {}", ticker.volume_24h);
    println!("24h 변동률:   {}%", ticker.change_24h_percent.round_dp(2));
    println!("조회 시각:    {}", ticker.timestamp.to_rfc3339());

    Ok(())
}
