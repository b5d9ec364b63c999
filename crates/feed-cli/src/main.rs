//! 시장 데이터 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 거래 가능 쌍 목록 (USD 기준)
//! feed pairs
//!
//! # BTC/USD 시세 조회
//! feed ticker -p XXBTZUSD
//!
//! # 호가창 조회 (깊이 10)
//! feed book -p XXBTZUSD -d 10
//!
//! # 10초 간격 시세 폴링
//! feed watch -p XXBTZUSD,XETHZUSD -i 10
//!
//! # 연결 상태 확인
//! feed status
//! ```

use std::path::Path;

use clap::{Parser, Subcommand};
use tracing::{error, warn};

use feed_core::{init_logging, AppConfig};

mod commands;

use commands::watch::WatchConfig;

#[derive(Parser)]
#[command(name = "feed")]
#[command(about = "Market data CLI - Kraken endpoint failover 기반 시세 조회", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일 경로
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 거래 가능 쌍 목록 조회
    Pairs,

    /// 단일 거래 쌍 시세 조회
    Ticker {
        /// 거래 쌍 식별자 (예: XXBTZUSD)
        #[arg(short, long)]
        pair: String,
    },

    /// 호가창 조회
    Book {
        /// 거래 쌍 식별자 (예: XXBTZUSD)
        #[arg(short, long)]
        pair: String,

        /// 호가 깊이 (기본: 설정 파일 값)
        #[arg(short, long)]
        depth: Option<u32>,
    },

    /// 계좌 잔고 조회 (KRAKEN_API_KEY/KRAKEN_API_SECRET 환경 변수 필요)
    Balance,

    /// 연결 상태 확인
    Status,

    /// 고정 간격 시세 폴링 (Ctrl-C로 종료)
    Watch {
        /// 거래 쌍 식별자 목록, 쉼표 구분 (기본: 설정 파일 값)
        #[arg(short, long)]
        pairs: Option<String>,

        /// 폴링 간격 (초, 기본: 설정 파일 값)
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // 설정 파일이 없으면 기본값 사용
    let config = if Path::new(&cli.config).exists() {
        AppConfig::load(&cli.config)?
    } else {
        AppConfig::default()
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if !Path::new(&cli.config).exists() {
        warn!(path = %cli.config, "Config file not found, using defaults");
    }

    let result = match cli.command {
        Commands::Pairs => commands::pairs::list_pairs(&config).await.map(|_| ()),

        Commands::Ticker { pair } => commands::ticker::show_ticker(&config, &pair).await,

        Commands::Book { pair, depth } => {
            let depth = depth.unwrap_or(config.exchange.default_depth);
            commands::book::show_book(&config, &pair, depth).await
        }

        Commands::Balance => commands::balance::show_balance(&config).await,

        Commands::Status => commands::status::show_status(&config).await,

        Commands::Watch { pairs, interval } => {
            let pairs = pairs
                .map(|p| {
                    p.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_else(|| config.poll.pairs.clone());
            let watch_config = WatchConfig {
                pairs,
                interval_secs: interval.unwrap_or(config.poll.interval_secs),
            };
            commands::watch::watch(&config, watch_config).await
        }
    };

    if let Err(e) = &result {
        error!("Command failed: {}", e);
    }

    result
}
