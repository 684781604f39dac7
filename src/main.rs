mod cli;
mod error;
mod fmt;
mod importer;
mod mapper;
mod models;
mod settings;
mod taxonomy;
mod tui;
mod wizard;

use clap::{CommandFactory, Parser};

use cli::{Cli, Commands};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Categories { group } => cli::categories::run(group.as_deref()),
        Commands::Inspect { file, sheet, rows } => {
            cli::inspect::run(&file, sheet.as_deref(), rows)
        }
        Commands::Map {
            file,
            sheet,
            auto,
            clear,
            assignments,
            output,
        } => cli::map::run(
            &file,
            cli::map::MapOptions {
                sheet: sheet.as_deref(),
                auto,
                clear,
                assignments: &assignments,
                output: output.as_deref(),
            },
        ),
        Commands::Import {
            file,
            sheet,
            output,
        } => cli::import::run(&file, sheet.as_deref(), output.as_deref()),
        Commands::Config {
            preview_rows,
            default_sheet,
            output_dir,
            auto_map_on_load,
        } => cli::config::run(cli::config::ConfigUpdate {
            preview_rows,
            default_sheet,
            output_dir,
            auto_map_on_load,
        }),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "finmap", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
