use clap::{
    ArgGroup,
    Parser,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use gamble_sui::{
    chain::OracleConfig,
    deployment::{
        self,
        DeploymentEnv,
        DeploymentRecord,
        DeploymentStore,
    },
    gateway::DEFAULT_REQUEST_TIMEOUT,
    signer::{
        DEFAULT_GAS_BUDGET,
        DEFAULT_SUI_BIN,
    },
};
use std::{
    path::PathBuf,
    sync::OnceLock,
    time::Duration,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};
use url::Url;

mod client;
mod ui;

const DEFAULT_LOG_DIR: &str = "~/.gamble-sui/logs";
const LOG_FILE_PREFIX: &str = "gamble-sui.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(
    name = "gamble-sui",
    about = "Terminal client for SUI price prediction pools",
    version,
    group(
        ArgGroup::new("network")
            .args(["devnet", "testnet", "mainnet", "local"])
    )
)]
struct Args {
    /// Connect to Sui devnet
    #[arg(long)]
    devnet: bool,

    /// Connect to Sui testnet (default)
    #[arg(long)]
    testnet: bool,

    /// Connect to Sui mainnet
    #[arg(long)]
    mainnet: bool,

    /// Connect to a local Sui node with GraphQL enabled
    #[arg(long)]
    local: bool,

    /// Override the GraphQL endpoint for the selected network
    #[arg(long)]
    graphql_url: Option<Url>,

    /// Package id of the prediction contract (defaults to the latest deployment record)
    #[arg(long)]
    package: Option<String>,

    /// Shared object holding the price oracle
    #[arg(long, requires = "oracle_id")]
    oracle_holder: Option<String>,

    /// Feed id inside the oracle holder
    #[arg(long, requires = "oracle_holder")]
    oracle_id: Option<u32>,

    /// `sui` binary used to sign and execute transactions
    #[arg(long, default_value = DEFAULT_SUI_BIN)]
    sui_bin: PathBuf,

    /// Gas budget in MIST for each transaction
    #[arg(long, default_value_t = DEFAULT_GAS_BUDGET)]
    gas_budget: u64,

    /// GraphQL request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    timeout_secs: u64,

    /// Seconds between pool refreshes
    #[arg(long, default_value_t = 5)]
    poll_secs: u64,

    /// Run against generated pools and tickets without touching the network
    #[arg(long)]
    demo: bool,

    /// Open on the admin screen
    #[arg(long)]
    admin: bool,

    /// Directory for daily rolling log files
    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    log_dir: String,

    /// Root of the per-network deployment records
    #[arg(long, default_value = deployment::DEPLOYMENTS_ROOT)]
    deployments_dir: String,
}

impl Args {
    fn env(&self) -> DeploymentEnv {
        if self.devnet {
            DeploymentEnv::Dev
        } else if self.mainnet {
            DeploymentEnv::Main
        } else if self.local {
            DeploymentEnv::Local
        } else {
            DeploymentEnv::Test
        }
    }
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

/// Logs go to a file; the terminal belongs to the UI.
fn init_tracing(log_dir: &str) -> Result<()> {
    let dir = expand_path(log_dir);
    std::fs::create_dir_all(&dir)
        .wrap_err_with(|| format!("Failed to create log directory {}", dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(dir, LOG_FILE_PREFIX));
    let _ = LOG_GUARD.set(guard);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    Ok(())
}

/// Latest record for the network, with command-line overrides applied. A
/// differing `--package` is appended so the next run picks it up.
fn resolve_record(args: &Args, store: &DeploymentStore) -> Result<DeploymentRecord> {
    let env = args.env();
    let latest = store.latest().wrap_err("reading deployment records")?;
    let mut record = match (&args.package, latest) {
        (Some(package), Some(latest)) if &latest.package_id == package => latest,
        (Some(package), _) => {
            let record = DeploymentRecord::new(package.clone(), env.default_graphql_url());
            store
                .append(record.clone())
                .wrap_err("recording package override")?;
            tracing::info!(%package, %env, "recorded package override");
            record
        }
        (None, Some(latest)) => latest,
        (None, None) => deployment::default_record(env),
    };
    if let Some(url) = &args.graphql_url {
        record.graphql_url = url.to_string();
    }
    if let (Some(holder), Some(feed_id)) = (&args.oracle_holder, args.oracle_id) {
        record.oracle_holder = Some(holder.clone());
        record.oracle_id = Some(feed_id);
    }
    Ok(record)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    color_eyre::install()?;
    init_tracing(&args.log_dir)?;
    tracing::info!("starting gamble-sui client");

    let root = expand_path(&args.deployments_dir);
    deployment::ensure_structure(&root).wrap_err("initializing deployment directories")?;
    let env = args.env();
    let store = DeploymentStore::new(&root, env).wrap_err("opening deployment store")?;
    let record = resolve_record(&args, &store)?;
    let contract = record.contract_config()?;
    if let Some(OracleConfig { holder, feed_id }) = &contract.oracle {
        tracing::info!(%holder, feed_id, "using price oracle");
    }
    tracing::info!(package = %contract.package, url = %record.graphql_url, "resolved deployment");

    let config = client::AppConfig {
        env,
        graphql_url: record.graphql_url,
        contract,
        sui_bin: args.sui_bin,
        gas_budget: args.gas_budget,
        request_timeout: Duration::from_secs(args.timeout_secs.max(1)),
        poll_interval: Duration::from_secs(args.poll_secs.max(1)),
        demo: args.demo,
        start_screen: if args.admin {
            client::Screen::Admin
        } else {
            client::Screen::Tickets
        },
    };
    client::run_app(config).await
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["gamble-sui"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn args__defaults_to_testnet() {
        let args = parse(&[]);
        assert_eq!(args.env(), DeploymentEnv::Test);
        assert_eq!(args.gas_budget, DEFAULT_GAS_BUDGET);
        assert_eq!(args.deployments_dir, deployment::DEPLOYMENTS_ROOT);
    }

    #[test]
    fn args__two_networks__are_rejected() {
        assert!(Args::try_parse_from(["gamble-sui", "--devnet", "--local"]).is_err());
    }

    #[test]
    fn args__oracle_holder_alone__is_rejected() {
        assert!(Args::try_parse_from(["gamble-sui", "--oracle-holder", "0x1"]).is_err());
    }

    #[test]
    fn args__bad_graphql_url__is_rejected() {
        assert!(Args::try_parse_from(["gamble-sui", "--graphql-url", "not a url"]).is_err());
    }

    #[test]
    fn resolve_record__package_override__is_appended_once() {
        // given
        let dir = TempDir::new("deployments").unwrap();
        let store = DeploymentStore::new(dir.path(), DeploymentEnv::Local).unwrap();
        let args = parse(&["--local", "--package", "0xabc"]);

        // when
        let first = resolve_record(&args, &store).unwrap();
        let second = resolve_record(&args, &store).unwrap();

        // then
        assert_eq!(first.package_id, "0xabc");
        assert_eq!(second.package_id, "0xabc");
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn resolve_record__empty_store__uses_builtin_package() {
        // given
        let dir = TempDir::new("deployments").unwrap();
        let store = DeploymentStore::new(dir.path(), DeploymentEnv::Test).unwrap();
        let args = parse(&["--graphql-url", "http://127.0.0.1:9000/graphql"]);

        // when
        let record = resolve_record(&args, &store).unwrap();

        // then
        assert_eq!(record.package_id, gamble_sui::chain::DEFAULT_PACKAGE);
        assert_eq!(record.graphql_url, "http://127.0.0.1:9000/graphql");
        assert!(store.load().unwrap().is_empty());
    }
}
