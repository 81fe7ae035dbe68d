use clap::Parser;
use cli::{Args, Commands, MakeTarget};
use error::{CliError, Result};
use generator::RepositoryStub;
use logging::setup_logging;
use nu_ansi_term::Color::{Cyan, Green};
use repokit_config::{
    config::{self, generate_default_config, get_config, set_config_path},
    utils::resolve_path,
    Config,
};
use tracing::{debug, info};
use utils::{disable_color, Colored};

mod cli;
mod error;
mod generator;
mod logging;
mod utils;

fn print_config(config: &Config, json: bool) -> Result<()> {
    let rendered = if json {
        serde_json::to_string_pretty(config).map_err(|err| CliError::Serialize(err.to_string()))?
    } else {
        toml::to_string_pretty(config).map_err(|err| CliError::Serialize(err.to_string()))?
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

fn make(target: MakeTarget, json: bool) -> Result<()> {
    let config = get_config();

    match target {
        MakeTarget::Repository {
            name,
            model,
            payloads,
            output,
            force,
        } => {
            let stub = RepositoryStub::new(
                &name,
                model.as_deref(),
                payloads.as_deref(),
                config.models_module(),
            )?;
            let dir = match output {
                Some(dir) => dir,
                None => config.get_repositories_path()?,
            };
            debug!("writing repositories to {}", dir.display());

            let path = stub.write(&dir, force)?;

            if json {
                let summary = serde_json::json!({
                    "repository": stub.repository,
                    "record": stub.record_path,
                    "payloads": stub.payloads,
                    "path": path,
                });
                println!("{summary}");
            } else {
                info!(
                    "{} uses {}",
                    Colored(Green, &stub.repository),
                    Colored(Cyan, &stub.record_path)
                );
            }
        }
    }

    Ok(())
}

fn handle_cli() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args);

    if args.no_color {
        disable_color();
    }

    if let Some(ref c) = args.config {
        set_config_path(resolve_path(c)?);
    }

    let Args { json, command, .. } = args;

    match command {
        Commands::DefConfig => {
            generate_default_config()?;
        }
        Commands::Config => {
            config::init()?;
            print_config(&get_config(), json)?;
        }
        Commands::Make { target } => {
            config::init()?;
            make(target, json)?;
        }
    }

    Ok(())
}

fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli() {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}
