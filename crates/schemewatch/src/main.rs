use anyhow::Result;
use clap::Parser;
use std::process;

use schemewatch::cli::{Cli, Commands};
use schemewatch::commands;

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  bentley::init(cli.verbose);

  let result = match cli.command {
    Commands::Run(args) => commands::watch(&args).await.map(|_| ()),
    Commands::Diff { previous, current } => {
      commands::diff_files(&previous, &current).map(|text| print!("{text}"))
    }
    Commands::Show { history } => commands::show_history(history.as_deref()).map(|text| print!("{text}")),
  };

  if let Err(err) = result {
    bentley::error!("{err:#}");
    process::exit(commands::exit_code(&err));
  }

  Ok(())
}
