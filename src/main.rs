use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tower::Service;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wine_scraper::output::load_links;
use wine_scraper::{ScrapeMode, ScrapeRequest, ScraperConfig, ScraperError, ScraperService};

#[derive(Parser)]
#[command(name = "wine-scraper", version, about = "ワインショップの商品リンクと商品データを収集する")]
struct Cli {
    /// 設定ファイル（TOML）
    #[arg(long, global = true, env = "WINE_SCRAPER_CONFIG")]
    config: Option<PathBuf>,

    /// 巡回する一覧ページの上限
    #[arg(long, global = true)]
    max_pages: Option<u32>,

    /// ブラウザを表示する
    #[arg(long, global = true)]
    show_browser: bool,

    /// デバッグログと失敗時のスクリーンショット
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// 一覧ページを巡回して商品リンクを保存
    Links {
        /// 既存のリンクファイルから再開
        #[arg(long)]
        resume: bool,
    },
    /// リンクファイルの商品ページをCSVに書き出す
    Products {
        /// 入力リンクファイル（省略時は設定値）
        #[arg(long)]
        links: Option<PathBuf>,
    },
    /// リンク収集と商品取得を続けて実行
    Run {
        #[arg(long)]
        resume: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "wine_scraper=debug"
    } else {
        "wine_scraper=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode, ScraperError> {
    let mut config = match &cli.config {
        Some(path) => ScraperConfig::from_toml_file(path)?,
        None => ScraperConfig::default(),
    };
    if let Some(max_pages) = cli.max_pages {
        config = config.with_page_limit(max_pages);
    }
    if cli.show_browser {
        config = config.with_headless(false);
    }
    if cli.debug {
        config = config.with_debug(true);
    }
    config.validate()?;

    let command = cli.command.unwrap_or(Command::Run { resume: false });
    let (mode, known_links) = match command {
        Command::Links { resume } => (ScrapeMode::Links, resume_links(&config, resume)?),
        Command::Run { resume } => (ScrapeMode::Full, resume_links(&config, resume)?),
        Command::Products { links } => {
            let path = links.unwrap_or_else(|| config.output.links.clone());
            info!("Loading links from {:?}", path);
            (ScrapeMode::Products, load_links(&path)?)
        }
    };

    let request = ScrapeRequest::new(config)
        .with_mode(mode)
        .with_known_links(known_links);
    let result = ScraperService::new().call(request).await?;

    if result.links.is_empty() {
        error!("No links were collected");
        return Ok(ExitCode::from(1));
    }

    match &result.batch {
        Some(batch) => info!(
            "Done: {} links, {} of {} products scraped",
            result.links.len(),
            batch.succeeded,
            batch.attempted
        ),
        None => info!("Done: {} links", result.links.len()),
    }
    Ok(ExitCode::SUCCESS)
}

fn resume_links(config: &ScraperConfig, resume: bool) -> Result<Vec<String>, ScraperError> {
    if !resume {
        return Ok(Vec::new());
    }
    if !config.output.links.exists() {
        warn!(
            "No links file at {:?}; starting from scratch",
            config.output.links
        );
        return Ok(Vec::new());
    }
    let links = load_links(&config.output.links)?;
    info!("Resuming with {} links from {:?}", links.len(), config.output.links);
    Ok(links)
}
