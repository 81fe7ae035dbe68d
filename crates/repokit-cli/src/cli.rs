use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

#[derive(Parser)]
#[command(name = "repokit", version, about, arg_required_else_help = true)]
pub struct Args {
    /// Log more detail (-v debug, -vv trace)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs and printed config as JSON
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Plain output without ANSI colors
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Config file to use instead of the default location
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scaffold source files
    #[command(arg_required_else_help = true)]
    Make {
        #[clap(subcommand)]
        target: MakeTarget,
    },

    /// Print the active configuration
    Config,

    /// Write a default config file
    #[clap(name = "defconfig")]
    DefConfig,
}

#[derive(Subcommand)]
pub enum MakeTarget {
    /// Scaffold a repository module
    #[command(arg_required_else_help = true)]
    Repository {
        /// Name of the repository, without the `Repository` suffix
        name: String,

        /// Record type path, relative to the crate root (e.g. `models/User`)
        #[arg(short, long)]
        model: Option<String>,

        /// Comma separated payload fields
        #[arg(short, long, value_delimiter = ',')]
        payloads: Option<Vec<String>>,

        /// Directory to write the file to
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
