//! Nevec command-line driver
//!
//! Compiles a typed syntax tree (JSON) to a `.geada` program image and
//! disassembles program images.

mod commands;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nevec")]
#[command(about = "Nevec compiler back end", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a typed tree to a .geada program image
    Build {
        /// Typed tree in JSON form
        input: PathBuf,
        /// Output file (defaults to the input with a .geada extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Compiler configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Run only the unconditional passes
        #[arg(long)]
        no_opt: bool,
        /// Number of allocatable registers (1-253)
        #[arg(short, long)]
        registers: Option<u8>,
        /// Log the interference graph
        #[arg(long)]
        debug_graph: bool,
        /// Print the optimized IR
        #[arg(long)]
        emit_ir: bool,
    },

    /// Print the contents of a .geada program image
    Disasm {
        /// Program image
        file: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Build {
            input,
            output,
            config,
            no_opt,
            registers,
            debug_graph,
            emit_ir,
        } => commands::build::execute(commands::build::BuildArgs {
            input,
            output,
            config,
            no_opt,
            registers,
            debug_graph,
            emit_ir,
        }),
        Commands::Disasm { file } => commands::disasm::execute(&file),
    }
}
