//! cmdbx CLI
//!
//! Command-line adapter over the instance service and the SQLite store

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "cmdbx")]
#[command(about = "cmdbx - generic CMDB instance access", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: commands::GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Object definition registration and listing
    Definition(commands::definition::DefinitionArgs),
    /// Instance create, update, delete and search
    Inst(commands::inst::InstArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Definition(args) => commands::definition::execute(&cli.global, args),
        Commands::Inst(args) => commands::inst::execute(&cli.global, args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
