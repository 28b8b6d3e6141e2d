use crate::chain::{
    ContractConfig,
    DEFAULT_PACKAGE,
    OracleConfig,
};
use chrono::Utc;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    fs,
    io::Write,
    path::{
        Path,
        PathBuf,
    },
};

pub const DEPLOYMENTS_ROOT: &str = ".deployments";
const DEPLOYMENTS_FILE: &str = "deployments.json";

pub const DEFAULT_TESTNET_GRAPHQL_URL: &str = "https://sui-testnet.mystenlabs.com/graphql";
pub const DEFAULT_DEVNET_GRAPHQL_URL: &str = "https://sui-devnet.mystenlabs.com/graphql";
pub const DEFAULT_MAINNET_GRAPHQL_URL: &str = "https://sui-mainnet.mystenlabs.com/graphql";
pub const DEFAULT_LOCAL_GRAPHQL_URL: &str = "http://127.0.0.1:9125/graphql";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeploymentEnv {
    Dev,
    Test,
    Main,
    Local,
}

impl DeploymentEnv {
    pub const ALL: [DeploymentEnv; 4] = [
        DeploymentEnv::Dev,
        DeploymentEnv::Test,
        DeploymentEnv::Main,
        DeploymentEnv::Local,
    ];

    pub fn dir_name(self) -> &'static str {
        match self {
            DeploymentEnv::Dev => "dev",
            DeploymentEnv::Test => "test",
            DeploymentEnv::Main => "main",
            DeploymentEnv::Local => "local",
        }
    }

    pub fn default_graphql_url(self) -> &'static str {
        match self {
            DeploymentEnv::Dev => DEFAULT_DEVNET_GRAPHQL_URL,
            DeploymentEnv::Test => DEFAULT_TESTNET_GRAPHQL_URL,
            DeploymentEnv::Main => DEFAULT_MAINNET_GRAPHQL_URL,
            DeploymentEnv::Local => DEFAULT_LOCAL_GRAPHQL_URL,
        }
    }
}

impl fmt::Display for DeploymentEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentEnv::Dev => "Devnet",
            DeploymentEnv::Test => "Testnet",
            DeploymentEnv::Main => "Mainnet",
            DeploymentEnv::Local => "Local",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub deployed_at: String,
    pub package_id: String,
    pub graphql_url: String,
    #[serde(default)]
    pub oracle_holder: Option<String>,
    #[serde(default)]
    pub oracle_id: Option<u32>,
}

impl DeploymentRecord {
    pub fn new(package_id: impl Into<String>, graphql_url: impl Into<String>) -> Self {
        Self {
            deployed_at: Utc::now().to_rfc3339(),
            package_id: package_id.into(),
            graphql_url: graphql_url.into(),
            oracle_holder: None,
            oracle_id: None,
        }
    }

    pub fn contract_config(&self) -> Result<ContractConfig> {
        let package = self
            .package_id
            .parse()
            .wrap_err_with(|| format!("Invalid package id in deployment record: {}", self.package_id))?;
        let mut config = ContractConfig::new(package);
        match (&self.oracle_holder, self.oracle_id) {
            (Some(holder), Some(feed_id)) => {
                let holder = holder
                    .parse()
                    .wrap_err_with(|| format!("Invalid oracle holder in deployment record: {holder}"))?;
                config = config.with_oracle(OracleConfig { holder, feed_id });
            }
            (None, None) => {}
            _ => {
                return Err(eyre!(
                    "Deployment record must set both oracle_holder and oracle_id, or neither"
                ));
            }
        }
        Ok(config)
    }
}

/// Records for the package deployed on one network, oldest first.
#[derive(Debug)]
pub struct DeploymentStore {
    path: PathBuf,
}

impl DeploymentStore {
    pub fn new(root: impl AsRef<Path>, env: DeploymentEnv) -> Result<Self> {
        let path = ensure_store(root.as_ref(), env)?;
        Ok(Self { path })
    }

    pub fn load(&self) -> Result<Vec<DeploymentRecord>> {
        read_records(&self.path)
    }

    pub fn latest(&self) -> Result<Option<DeploymentRecord>> {
        Ok(self.load()?.pop())
    }

    pub fn append(&self, record: DeploymentRecord) -> Result<()> {
        let mut records = self.load()?;
        records.push(record);
        write_records(&self.path, &records)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// The built-in testnet package, used when nothing has been recorded.
pub fn default_record(env: DeploymentEnv) -> DeploymentRecord {
    DeploymentRecord::new(DEFAULT_PACKAGE, env.default_graphql_url())
}

pub fn ensure_structure(root: impl AsRef<Path>) -> Result<()> {
    for env in DeploymentEnv::ALL {
        let _ = ensure_store(root.as_ref(), env)?;
    }
    Ok(())
}

fn ensure_store(root: &Path, env: DeploymentEnv) -> Result<PathBuf> {
    if !root.exists() {
        fs::create_dir_all(root)
            .wrap_err_with(|| format!("Failed to create {} directory", root.display()))?;
    }

    let env_dir = root.join(env.dir_name());
    if !env_dir.exists() {
        fs::create_dir_all(&env_dir).wrap_err_with(|| {
            format!("Failed to create {}/{} directory", root.display(), env.dir_name())
        })?;
    }

    let file_path = env_dir.join(DEPLOYMENTS_FILE);
    if !file_path.exists() {
        let mut file = fs::File::create(&file_path).wrap_err_with(|| {
            format!(
                "Failed to create deployment record file for {} at {:?}",
                env, file_path
            )
        })?;
        file.write_all(b"[]").wrap_err_with(|| {
            format!("Failed to initialize deployment record file for {}", env)
        })?;
    }

    Ok(file_path)
}

fn read_records(path: impl AsRef<Path>) -> Result<Vec<DeploymentRecord>> {
    let data = fs::read(path.as_ref()).wrap_err("Failed to read deployment records")?;
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let records = serde_json::from_slice::<Vec<DeploymentRecord>>(&data)
        .wrap_err("Failed to parse deployment records JSON")?;
    Ok(records)
}

fn write_records(path: impl AsRef<Path>, records: &[DeploymentRecord]) -> Result<()> {
    let json = serde_json::to_vec_pretty(records)
        .wrap_err("Failed to serialize deployment records")?;
    fs::write(path.as_ref(), json).wrap_err("Failed to write deployment records")?;
    Ok(())
}
