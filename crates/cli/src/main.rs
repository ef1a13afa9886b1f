//! Capastrophic command-line front-end
//!
//! Thin wrapper around `capastrophic-codec`: decode CAP/EXP files to
//! editable JSON, rebuild binaries from edited JSON, and show quick-look
//! package metadata.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;

use capastrophic_codec::{CapFile, ExpFile};

#[derive(Parser)]
#[command(
    version,
    about = "Capastrophic - inspect and manipulate Java Card CAP and EXP files"
)]
struct Cli {
    /// Detailed logging for debugging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a CAP file into editable JSON
    Cap2json {
        /// Path to the CAP file
        file: PathBuf,
        /// Output path (defaults to output/<ts>_<name>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pretty-print the JSON
        #[arg(short, long)]
        pretty: bool,
    },
    /// Decode an EXP file into editable JSON
    Exp2json {
        /// Path to the EXP file
        file: PathBuf,
        /// Output path (defaults to output/<ts>_<name>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pretty-print the JSON
        #[arg(short, long)]
        pretty: bool,
    },
    /// Rebuild a CAP file from edited JSON
    Json2cap {
        /// Path to the JSON intermediate form
        file: PathBuf,
        /// Output path (defaults to output/<ts>_<name>.cap)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Rebuild an EXP file from edited JSON
    Json2exp {
        /// Path to the JSON intermediate form
        file: PathBuf,
        /// Output path (defaults to output/<ts>_<name>.exp)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show package and applet metadata of a CAP file
    Info {
        /// Path to the CAP file
        file: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match &cli.command {
        Commands::Cap2json {
            file,
            output,
            pretty,
        } => {
            let cap = CapFile::decode(&fs::read(file)?)?;
            if !cap.warnings().is_empty() {
                info!("decode finished with {} warning(s)", cap.warnings().len());
            }
            let json = cap.to_json(*pretty)?;
            let target = resolve_output(output.as_deref(), file, "json")?;
            fs::write(&target, json)?;
            println!("Wrote {}", target.display());
        }
        Commands::Exp2json {
            file,
            output,
            pretty,
        } => {
            let exp = ExpFile::decode(&fs::read(file)?)?;
            let json = exp.to_json(*pretty)?;
            let target = resolve_output(output.as_deref(), file, "json")?;
            fs::write(&target, json)?;
            println!("Wrote {}", target.display());
        }
        Commands::Json2cap { file, output } => {
            let cap = CapFile::from_json(&fs::read_to_string(file)?)?;
            let target = resolve_output(output.as_deref(), file, "cap")?;
            fs::write(&target, cap.encode()?)?;
            println!("Wrote {}", target.display());
        }
        Commands::Json2exp { file, output } => {
            let exp = ExpFile::from_json(&fs::read_to_string(file)?)?;
            let target = resolve_output(output.as_deref(), file, "exp")?;
            fs::write(&target, exp.encode()?)?;
            println!("Wrote {}", target.display());
        }
        Commands::Info { file } => {
            let cap = CapFile::decode(&fs::read(file)?)?;
            print_info(&cap);
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(true)
        .init();
}

/// Pick the output path: explicit `-o`, or `output/<ts>_<stem>.<ext>`
fn resolve_output(
    output: Option<&Path>,
    input: &Path,
    extension: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    if let Some(path) = output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        return Ok(path.to_owned());
    }
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let dir = PathBuf::from("output");
    fs::create_dir_all(&dir)?;
    Ok(dir.join(format!("{timestamp}_{stem}.{extension}")))
}

fn print_info(cap: &CapFile) {
    let summary = cap.summary();

    match summary.format_version {
        Some((major, minor)) => println!("CAP format:      {major}.{minor}"),
        None => println!("CAP format:      unknown"),
    }
    println!(
        "Layout:          {}",
        if summary.extended { "Extended" } else { "Compact" }
    );
    match &summary.package_aid {
        Some(aid) => println!("Package AID:     {}", aid.to_uppercase()),
        None => println!("Package AID:     not found"),
    }
    match summary.package_version {
        Some((major, minor)) => println!("Package version: {major}.{minor}"),
        None => println!("Package version: unknown"),
    }

    println!("\nApplets:");
    if summary.applet_aids.is_empty() {
        println!("  none");
    } else {
        for (i, aid) in summary.applet_aids.iter().enumerate() {
            println!("  {}. AID: {}", i + 1, aid.to_uppercase());
        }
    }

    println!("\nComponents:");
    for (name, record) in cap.records() {
        let size = record.raw().map(|raw| raw.len()).unwrap_or(0);
        println!("  {name:<24} {size} bytes");
    }

    if !cap.warnings().is_empty() {
        println!("\nWarnings:");
        for warning in cap.warnings() {
            println!("  {warning}");
        }
    }
}
