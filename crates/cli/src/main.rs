use clap::Parser;
use devpool_cli::cli::Cli;
use devpool_cli::error::CliError;
use devpool_cli::output::{self, OutputFormat, ResultBuilder};
use devpool_cli::{commands, logging};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let format = cli.format;
	let command = command_name(&cli);

	if let Err(err) = commands::dispatch(cli, format).await {
		handle_error(err, command, format);
		std::process::exit(1);
	}
}

fn command_name(cli: &Cli) -> &'static str {
	use devpool_cli::cli::Commands;
	match cli.command {
		Commands::List => "list",
		Commands::Allocate { .. } => "allocate",
		Commands::Watch { .. } => "watch",
	}
}

fn handle_error(err: CliError, command: &str, format: OutputFormat) {
	let cmd_error = err.to_command_error();

	// Humans read stderr; agents read the envelope on stdout
	output::print_error_stderr(&cmd_error);

	if format != OutputFormat::Text {
		let result: output::CommandResult<()> = ResultBuilder::new(command).command_error(cmd_error).build();
		output::print_result(&result, format);
	}
}
