mod check;
mod version;
mod watch;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::cnf::{DEFAULT_LOG, PKG_NAME};
use crate::err::Error;

const INFO: &str = "
Quarry discovers the structure of a relational database and compiles
allow-listed graph queries into role scoped statements.
";

#[derive(Parser, Debug)]
#[command(name = PKG_NAME, about = INFO, disable_version_flag = true, arg_required_else_help = true)]
pub(crate) struct Cli {
	#[arg(help = "The logging level or filter directive")]
	#[arg(env = "QUARRY_LOG", short = 'l', long = "log", global = true)]
	#[arg(default_value = DEFAULT_LOG)]
	log: String,
	#[command(subcommand)]
	pub(crate) command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
	#[command(about = "Inspect the database schema and the allow-list")]
	Check(check::CheckCommandArguments),
	#[command(about = "Keep a live snapshot fresh and log every published reload")]
	Watch(watch::WatchCommandArguments),
	#[command(about = "Output the command-line tool version information")]
	Version,
}

pub fn init() -> ExitCode {
	let args = Cli::parse();
	if let Err(e) = crate::telemetry::builder().with_log_level(&args.log).init() {
		eprintln!("{e}");
		return ExitCode::FAILURE;
	}
	let output = match args.command {
		Commands::Check(args) => run(check::init(args)),
		Commands::Watch(args) => run(watch::init(args)),
		Commands::Version => version::init(),
	};
	match output {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			error!("{e}");
			ExitCode::FAILURE
		}
	}
}

fn run<F>(future: F) -> Result<(), Error>
where
	F: std::future::Future<Output = Result<(), Error>>,
{
	tokio::runtime::Builder::new_multi_thread().enable_all().build()?.block_on(future)
}
