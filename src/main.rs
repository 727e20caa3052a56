use clap::Parser;
use page_context::cli::commands::{cmd_exec, cmd_scan, cmd_tools};
use page_context::cli::config::{Cli, Commands, build_scan_config, load_config};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("page_context={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan {
            html,
            format,
            depth,
            include_hidden,
            max_elements,
            url,
        } => {
            let scan_config = build_scan_config(&config.scan, depth, include_hidden, max_elements);
            cmd_scan(&html, url.as_deref(), &format, &scan_config)?;
        }
        Commands::Exec {
            html,
            commands,
            trace,
            format,
            url,
        } => {
            let all_succeeded = cmd_exec(
                &html,
                url.as_deref(),
                &commands,
                trace.as_deref(),
                &format,
                &config.scan,
                config.executor.executor_config(),
            )?;
            if !all_succeeded {
                std::process::exit(1);
            }
        }
        Commands::Tools => cmd_tools()?,
    }

    Ok(())
}
