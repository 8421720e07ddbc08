use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::fs;
use tracing::info;

use solbind::config::{Cli, Settings};
use solbind::Generator;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    // stdout may carry the generated code
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_cli(&cli)?;
    let artifacts = settings.load_artifacts()?;
    if artifacts.is_empty() {
        eprintln!("{} No contracts to bind", "⚠".yellow());
    }

    let mut generator = Generator::new(&settings.package);
    for library in &settings.libraries {
        generator = generator.library(library);
    }
    for artifact in &artifacts {
        info!("Binding {} from {}", artifact.type_name, artifact.source.display());
        generator = generator.contract(&artifact.type_name, &artifact.abi, &artifact.bytecode);
    }

    let code = generator.generate().context("Failed to generate bindings")?;

    match &settings.out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {}", parent.display()))?;
            }
            fs::write(path, &code).with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{} Wrote bindings for {} contract(s) to {}",
                "✔".green(),
                artifacts.len(),
                path.display().to_string().bold()
            );
        }
        None => print!("{}", code),
    }

    Ok(())
}
