//! formfill-cli - offline batch filler
//!
//! Runs the same generation pipeline as the web service against a roster on
//! disk and writes the resulting zip archive.
//!
//! ```text
//! formfill-cli --form efa --roster attendees.csv --output efa.zip
//! formfill-cli --list
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use formfill_common::config::Settings;
use formfill_common::package::{package_archive, ARCHIVE_NAME};
use formfill_common::pipeline::FormRunner;
use formfill_common::FormCatalog;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "formfill-cli")]
#[command(about = "Fill certification form templates from a roster CSV")]
#[command(version)]
struct Args {
    /// Form type key (see --list)
    #[arg(short, long, required_unless_present = "list")]
    form: Option<String>,

    /// Roster CSV file
    #[arg(short, long, required_unless_present = "list")]
    roster: Option<PathBuf>,

    /// Output archive path
    #[arg(short, long, default_value = ARCHIVE_NAME)]
    output: PathBuf,

    /// Directory holding the template PDFs (overrides the configured one)
    #[arg(short, long)]
    template_dir: Option<PathBuf>,

    /// Root folder (templates default to <root>/templates_pdf)
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, env = "FORMFILL_CONFIG")]
    config: Option<PathBuf>,

    /// Fail when the template lacks fields the form writes
    #[arg(long)]
    strict: bool,

    /// List the known form types and exit
    #[arg(long)]
    list: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = Settings::resolve("formfill-cli", args.root_folder, args.config.as_deref());
    let catalog = FormCatalog::builtin(&settings.host).context("Form catalog is invalid")?;

    if args.list {
        for spec in catalog.iter() {
            println!(
                "{:<24} {:<48} capacity {}",
                spec.kind.key(),
                spec.template_file(),
                spec.capacity()
            );
        }
        return Ok(());
    }

    let (Some(form), Some(roster)) = (args.form, args.roster) else {
        bail!("--form and --roster are required");
    };

    let template_dir = args.template_dir.unwrap_or(settings.template_dir);
    let reader = BufReader::new(
        File::open(&roster).with_context(|| format!("Cannot open roster {}", roster.display()))?,
    );

    let files = FormRunner::new(&catalog, template_dir)
        .strict_audit(args.strict || settings.strict_template_audit)
        .run_csv(&form, reader)
        .with_context(|| format!("Generating {} forms failed", form))?;

    let archive = package_archive(&files)?;
    std::fs::write(&args.output, &archive)
        .with_context(|| format!("Cannot write {}", args.output.display()))?;

    info!(files = files.len(), "Archive written");
    println!("{} file(s) written to {}", files.len(), args.output.display());
    Ok(())
}
