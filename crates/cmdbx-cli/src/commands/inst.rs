//! Instance commands
//!
//! Each subcommand maps onto one `InstanceService` operation and prints the
//! result as JSON on stdout.

use clap::{Args, Subcommand};
use cmdbx_core::query::parse_payload;
use cmdbx_core::ExError;

use super::{parse_fields, print_json, CliResult, GlobalArgs, Runtime};

#[derive(Debug, Args)]
pub struct InstArgs {
    #[command(subcommand)]
    pub command: InstCommand,
}

#[derive(Debug, Subcommand)]
pub enum InstCommand {
    /// Create an instance from a JSON object of fields
    Create(CreateArgs),
    /// Merge fields into an existing instance
    Update(UpdateArgs),
    /// Delete an instance
    Delete(TargetArgs),
    /// Search with a filter payload
    Search(SearchArgs),
    /// Fetch one instance by id
    Get(TargetArgs),
}

#[derive(Debug, Args)]
pub struct TypeArgs {
    #[arg(long)]
    pub tenant: String,

    #[arg(long)]
    pub obj_id: String,
}

#[derive(Debug, Args)]
pub struct TargetArgs {
    #[command(flatten)]
    pub target: TypeArgs,

    #[arg(long)]
    pub inst_id: String,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    #[command(flatten)]
    pub target: TypeArgs,

    /// JSON object of instance fields
    #[arg(long, default_value = "{}")]
    pub data: String,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// JSON object of fields to merge
    #[arg(long)]
    pub data: String,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[command(flatten)]
    pub target: TypeArgs,

    /// Filter payload: {"condition": {...}, "fields": ..., "sort": ..., "start": n, "limit": n}
    #[arg(long, default_value = "{}")]
    pub filter: String,
}

pub fn execute(global: &GlobalArgs, args: InstArgs) -> CliResult {
    let runtime = Runtime::open(global)?;
    let service = &runtime.service;
    let ctx = global.context();

    match args.command {
        InstCommand::Create(a) => {
            let fields = parse_fields(&a.data)?;
            let inst =
                service.create_instance(&ctx, &a.target.tenant, &a.target.obj_id, fields)?;
            print_json(&inst)
        }
        InstCommand::Update(a) => {
            let fields = parse_fields(&a.data)?;
            let count = service.update_instance(
                &ctx,
                &a.target.target.tenant,
                &a.target.target.obj_id,
                &a.target.inst_id,
                &fields,
            )?;
            print_json(&serde_json::json!({ "count": count }))
        }
        InstCommand::Delete(a) => {
            let count = service.delete_instance(
                &ctx,
                &a.target.tenant,
                &a.target.obj_id,
                &a.inst_id,
            )?;
            print_json(&serde_json::json!({ "count": count }))
        }
        InstCommand::Search(a) => {
            let payload = parse_payload(a.filter.as_bytes()).map_err(ExError::from)?;
            let found =
                service.search_instances(&ctx, &a.target.tenant, &a.target.obj_id, &payload)?;
            print_json(&found)
        }
        InstCommand::Get(a) => {
            let found = service.search_instance_by_id(
                &ctx,
                &a.target.tenant,
                &a.target.obj_id,
                &a.inst_id,
            )?;
            print_json(&found)
        }
    }
}
