//! OVF import CLI - inspect and validate OVF packages.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ovfimport_core::{hardware, DescriptorLoader, LocalStorageClient};
use tracing_subscriber::EnvFilter;

/// Inspect and validate OVF virtual appliance packages.
#[derive(Parser)]
#[command(name = "ovfimport")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the resolved hardware of an OVF package.
    Inspect {
        /// Path to the package directory containing the .ovf descriptor.
        package: PathBuf,
    },

    /// Check that a package parses and all file references exist.
    Validate {
        /// Path to the package directory containing the .ovf descriptor.
        package: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Inspect { package } => inspect(&package),
        Commands::Validate { package } => validate(&package),
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();
}

fn package_path(package: &Path) -> Result<&str> {
    package.to_str().context("package path is not valid UTF-8")
}

fn inspect(package: &Path) -> Result<()> {
    let loader = DescriptorLoader::new(LocalStorageClient::new());
    let (descriptor, infos) = hardware::get_descriptor_and_disk_paths(&loader, package_path(package)?)
        .with_context(|| format!("failed to load OVF package at '{}'", package.display()))?;

    let system = hardware::get_virtual_system(&descriptor)?;
    println!("Virtual System: {}", system.id);
    if !system.name.is_empty() && system.name != system.id {
        println!("Name:           {}", system.name);
    }

    let section = hardware::get_virtual_hardware_section(system)?;
    match hardware::get_number_of_cpus(Some(section)) {
        Ok(cpus) => println!("CPUs:           {cpus}"),
        Err(err) => println!("CPUs:           unavailable ({err})"),
    }
    match hardware::get_memory_in_mb(Some(section)) {
        Ok(memory) => println!("Memory:         {memory} MB"),
        Err(err) => println!("Memory:         unavailable ({err})"),
    }

    println!("Disks:");
    for info in &infos {
        println!("  {:<40} {:>6} GB", info.file_path, info.size_gb);
    }

    Ok(())
}

fn validate(package: &Path) -> Result<()> {
    let loader = DescriptorLoader::new(LocalStorageClient::new());
    loader
        .load(package_path(package)?)
        .with_context(|| format!("failed to load OVF package at '{}'", package.display()))?;
    println!("OK: package at '{}' is valid", package.display());
    Ok(())
}
