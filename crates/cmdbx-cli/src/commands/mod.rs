pub mod definition;
pub mod inst;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use cmdbx_core::logging_facility;
use cmdbx_core::{CoreConfig, InstanceService, MapStr};
use cmdbx_core_types::{RequestContext, RequestId};
use cmdbx_store::SqliteBackend;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database path; overrides `store.path` from the configuration
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Correlation id for log events; generated when absent
    #[arg(long, global = true)]
    pub request_id: Option<String>,
}

impl GlobalArgs {
    pub fn context(&self) -> RequestContext {
        match &self.request_id {
            Some(id) => RequestContext::with_request_id(RequestId::from_string(id.clone())),
            None => RequestContext::new(),
        }
    }
}

/// Configured store and service for one invocation
pub struct Runtime {
    pub backend: Arc<SqliteBackend>,
    pub service: InstanceService,
}

impl Runtime {
    pub fn open(global: &GlobalArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let config = match &global.config {
            Some(path) => CoreConfig::load(path)?,
            None => CoreConfig::default(),
        };
        logging_facility::init(config.logging.profile);

        let path = global.db.clone().unwrap_or_else(|| config.store.path.clone());
        let backend = Arc::new(SqliteBackend::open(&path)?);
        let service = InstanceService::from_config(backend.clone(), backend.clone(), &config);
        Ok(Self { backend, service })
    }
}

/// Parse a JSON object argument into a field map
pub fn parse_fields(raw: &str) -> Result<MapStr, Box<dyn std::error::Error>> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    Ok(MapStr::from_json(value)?)
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
