//! 호가창 조회.

use anyhow::Result;

use feed_core::AppConfig;

/// 거래 쌍의 호가창을 조회해 출력합니다.
pub async fn show_book(config: &AppConfig, pair_id: &str, depth: u32) -> Result<()> {
    let ctx = super::connect(config).await?;
    let book = ctx.client.fetch_order_book(pair_id, depth).await?;

    println!(
        "\n연결: {} ({})",
        ctx.snapshot.status,
        ctx.snapshot.active_endpoint.as_deref().unwrap_or("-")
    );
    println!("\n호가창: {} (깊이 {})", book.pair_id, depth);
    println!("{}", "-".repeat(48));
    println!("{:<24} {}", "매도 (가격 x 수량)", "매수 (가격 x 수량)");

    let rows = book.asks.len().max(book.bids.len());
    for i in 0..rows {
        let ask = book
            .asks
            .get(i)
            .map(|l| format!("{} x {}", l.price, l.quantity))
            .unwrap_or_default();
        let bid = book
            .bids
            .get(i)
            .map(|l| format!("{} x {}", l.price, l.quantity))
            .unwrap_or_default();
        println!("{:<24} {}", ask, bid);
    }

    if let Some(spread) = book.spread() {
        println!("\n스프레드: {}", spread);
    }
    if let Some(mid) = book.mid_price() {
        println!("중간 가격: {}", mid);
    }

    Ok(())
}
