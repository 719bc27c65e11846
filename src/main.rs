use clap::{
    ArgGroup,
    Parser,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use jdb_raffle::{
    client,
    config::{
        AppConfig,
        APP_DIR,
        NetworkConfig,
        RefreshTimings,
        WalletConfig,
        default_preferences_path,
    },
    units::parse_address,
    wallets::KeystoreDir,
};
use std::path::PathBuf;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};
use url::Url;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Terminal client for the Jogo do Bicho raffle on Monad testnet",
    long_about = None,
    group(ArgGroup::new("signer").args(["wallet", "signer_url"]))
)]
struct Args {
    #[arg(long)]
    rpc_url: Option<Url>,

    /// WebSocket endpoint for live events; `none` disables the subscription.
    #[arg(long)]
    ws_url: Option<String>,

    #[arg(long)]
    game: Option<String>,

    #[arg(long)]
    leaderboard: Option<String>,

    #[arg(long)]
    api_url: Option<Url>,

    #[arg(long)]
    game_id: Option<String>,

    /// Keystore file name (without `.json`) or its address, under the wallet
    /// directory.
    #[arg(short, long)]
    wallet: Option<String>,

    #[arg(long)]
    wallet_dir: Option<String>,

    /// JSON-RPC endpoint of a custodial signer exposing `eth_accounts`.
    #[arg(long)]
    signer_url: Option<Url>,

    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn init_tracing(log_dir: PathBuf) -> WorkerGuard {
    let appender = rolling::daily(log_dir, "jdb.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    guard
}

fn app_config(args: Args) -> Result<AppConfig> {
    let mut network = NetworkConfig::monad_testnet()?;
    if let Some(url) = args.rpc_url {
        network.rpc_url = url.to_string();
    }
    match args.ws_url.as_deref() {
        Some("none") => network.ws_url = None,
        Some(raw) => {
            let url = Url::parse(raw).wrap_err_with(|| format!("invalid --ws-url '{raw}'"))?;
            network.ws_url = Some(url.to_string());
        }
        None => {}
    }
    if let Some(raw) = args.game.as_deref() {
        network.game = parse_address(raw).wrap_err("invalid --game address")?;
    }
    if let Some(raw) = args.leaderboard.as_deref() {
        network.leaderboard = parse_address(raw).wrap_err("invalid --leaderboard address")?;
    }
    if let Some(url) = args.api_url {
        network.api_url = url.to_string();
    }
    if let Some(game_id) = args.game_id {
        network.game_id = game_id;
    }

    let wallet = match (args.wallet, args.signer_url) {
        (Some(name), _) => WalletConfig::Keystore {
            name,
            dir: KeystoreDir::resolve(args.wallet_dir.as_deref())?
                .path()
                .to_path_buf(),
        },
        (None, Some(url)) => WalletConfig::Custodial {
            signer_url: url.to_string(),
        },
        (None, None) => WalletConfig::ReadOnly,
    };

    Ok(AppConfig {
        network,
        wallet,
        timings: RefreshTimings::default(),
        preferences_path: default_preferences_path()?,
    })
}

fn default_log_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(APP_DIR).join("logs"))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let mut args = Args::parse();
    let log_dir = match args.log_dir.take() {
        Some(dir) => dir,
        None => default_log_dir()?,
    };
    let _guard = init_tracing(log_dir);
    tracing::info!("starting jdb client");
    let config = app_config(args)?;
    client::run_app(config).await
}
