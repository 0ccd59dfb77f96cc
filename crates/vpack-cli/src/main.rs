use clap::{CommandFactory, FromArgMatches};
use color_eyre::Result;
use serde_json::json;
use vpack_core::{FormatSelection, PackError, PackOptions, PackRequest};

mod cli;

use cli::{ordered_filters, VenvPackCli};

fn main() -> Result<()> {
    color_eyre::install()?;

    let matches = VenvPackCli::command().get_matches();
    let cli = VenvPackCli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    init_tracing(cli.quiet || cli.json, cli.verbose);

    let outcome = ordered_filters(&matches).and_then(|filters| {
        let request = build_request(&cli, filters);
        vpack_core::pack(&request)
    });

    match outcome {
        Ok(output) => {
            if cli.json {
                let payload = json!({
                    "status": "ok",
                    "message": format!("Packed environment to {}", output.display()),
                    "details": { "output": output.display().to_string() },
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            }
            Ok(())
        }
        Err(err) => {
            emit_error(&cli, &err)?;
            std::process::exit(1);
        }
    }
}

fn build_request(cli: &VenvPackCli, filters: Vec<vpack_core::Filter>) -> PackRequest {
    PackRequest {
        prefix: cli.prefix.clone(),
        filters,
        options: PackOptions {
            output: cli.output.clone(),
            format: FormatSelection::parse(&cli.format),
            python_prefix: cli.python_prefix.clone(),
            verbose: !cli.quiet && !cli.json,
            force: cli.force,
            compress_level: cli.compress_level,
            zip_symlinks: cli.zip_symlinks,
            zip_64: !cli.no_zip_64,
        },
    }
}

fn emit_error(cli: &VenvPackCli, err: &PackError) -> Result<()> {
    if cli.json {
        let payload = json!({
            "status": "error",
            "message": err.message(),
            "details": err.details(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        eprintln!("VenvPackError: {}", err.message());
        if let Some(hint) = err.details().get("hint").and_then(|hint| hint.as_str()) {
            eprintln!("Hint: {hint}");
        }
    }
    Ok(())
}

fn init_tracing(quiet: bool, verbose: u8) {
    let level = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("venv_pack={level},vpack_core={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
