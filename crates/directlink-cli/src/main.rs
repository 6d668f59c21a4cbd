use clap::Parser;
use std::process::ExitCode;

mod cli;
mod logging;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging as early as possible.
    logging::init_logging_stderr(cli.verbose);

    let record = match cli.run().await {
        Ok(record) => record,
        Err(err) => {
            eprintln!("directlink error: {:#}", err);
            return ExitCode::from(2);
        }
    };

    let json = if cli.pretty {
        serde_json::to_string_pretty(&record)
    } else {
        serde_json::to_string(&record)
    };

    match json {
        Ok(json) => println!("{}", json),
        Err(err) => {
            eprintln!("directlink error: {}", err);
            return ExitCode::from(2);
        }
    }

    if record.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
