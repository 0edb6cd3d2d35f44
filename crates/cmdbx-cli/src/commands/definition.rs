//! Definition commands
//!
//! Usage: cmdbx definition add --tenant <T> --obj-id <ID> [--name <N>] [--metadata <JSON>]
//!        cmdbx definition list --tenant <T> [--obj-id <ID>]

use clap::{Args, Subcommand};
use cmdbx_core::ops::DefinitionResolver;
use cmdbx_core::{DefinitionFilter, MapStr};
use cmdbx_core_types::RequestContext;

use super::{parse_fields, print_json, CliResult, GlobalArgs, Runtime};

#[derive(Debug, Args)]
pub struct DefinitionArgs {
    #[command(subcommand)]
    pub command: DefinitionCommand,
}

#[derive(Debug, Subcommand)]
pub enum DefinitionCommand {
    /// Register an object type for a tenant
    Add(AddArgs),
    /// List a tenant's object types
    List(ListArgs),
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(long)]
    pub tenant: String,

    #[arg(long)]
    pub obj_id: String,

    /// Display name; defaults to the object type identifier
    #[arg(long)]
    pub name: Option<String>,

    /// JSON object of extra definition attributes
    #[arg(long)]
    pub metadata: Option<String>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long)]
    pub tenant: String,

    #[arg(long)]
    pub obj_id: Option<String>,
}

pub fn execute(global: &GlobalArgs, args: DefinitionArgs) -> CliResult {
    let runtime = Runtime::open(global)?;
    match args.command {
        DefinitionCommand::Add(add) => execute_add(&runtime, add),
        DefinitionCommand::List(list) => execute_list(&runtime, &global.context(), list),
    }
}

fn execute_add(runtime: &Runtime, args: AddArgs) -> CliResult {
    if args.tenant.is_empty() {
        return Err("--tenant must not be empty".into());
    }
    let metadata = match &args.metadata {
        Some(raw) => parse_fields(raw)?,
        None => MapStr::new(),
    };
    let def = runtime.backend.add_definition(
        &args.tenant,
        &args.obj_id,
        args.name.as_deref(),
        &metadata,
    )?;
    print_json(&def)
}

fn execute_list(runtime: &Runtime, ctx: &RequestContext, args: ListArgs) -> CliResult {
    let filter = match &args.obj_id {
        Some(obj_id) => DefinitionFilter::by_type(obj_id),
        None => DefinitionFilter::all(),
    };
    let defs = DefinitionResolver::new(runtime.backend.as_ref()).find_definitions(
        ctx,
        &args.tenant,
        &filter,
    )?;
    print_json(&defs)
}
