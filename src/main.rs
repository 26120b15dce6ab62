use clap::Parser;
use metamorph::cli::commands::down::{DownCommand, DownCommandHandler};
use metamorph::cli::commands::generate::{GenerateCommand, GenerateCommandHandler};
use metamorph::cli::commands::status::{StatusCommand, StatusCommandHandler};
use metamorph::cli::commands::up::{UpCommand, UpCommandHandler};
use metamorph::cli::{Cli, Commands};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    // CLIをパースして実行
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // Anyドライバはプロセスごとに1回登録する
    sqlx::any::install_default_drivers();

    // 非同期ランタイムを作成して実行
    let runtime = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");

    let result = runtime.block_on(run_command(cli));

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// トレーシングを初期化する
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// コマンドを実行する
async fn run_command(cli: Cli) -> anyhow::Result<String> {
    let config_path = cli.config;
    let format = cli.format;

    match cli.command {
        Commands::Up {
            target,
            tables,
            prefix,
            env,
        } => {
            let handler = UpCommandHandler::new();
            let command = UpCommand {
                config_path,
                env,
                target,
                tables,
                prefix,
                format,
            };
            handler.execute(&command).await
        }

        Commands::Down {
            target,
            tables,
            prefix,
            env,
        } => {
            let handler = DownCommandHandler::new();
            let command = DownCommand {
                config_path,
                env,
                target,
                tables,
                prefix,
                format,
            };
            handler.execute(&command).await
        }

        Commands::Status { env } => {
            let handler = StatusCommandHandler::new();
            let command = StatusCommand {
                config_path,
                env,
                format,
            };
            handler.execute(&command).await
        }

        Commands::Generate {
            version,
            tables,
            force,
        } => {
            let handler = GenerateCommandHandler::new();
            let command = GenerateCommand {
                config_path,
                version,
                tables,
                force,
            };
            handler.execute(&command).await
        }
    }
}
