//! Netsheet CLI
//!
//! Usage:
//!   netsheet access.xlsx                 Write `<namespace>.yaml` to the current directory
//!   netsheet access.xlsx -o out/ -y      Write into `out/`, overwrite silently
//!   netsheet access.xlsx --baseline b.yaml --config options.yaml

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use netsheet::{
    Baseline, ConvertOptions, Converter, Table, confirm_overwrite, output_path, write_output,
};

/// Convert a network-access spreadsheet into Cilium network policies
#[derive(Parser, Debug)]
#[command(name = "netsheet")]
#[command(about = "Convert a network-access spreadsheet into Cilium network policies")]
struct Args {
    /// Input workbook (.xlsx)
    #[arg(value_parser = parse_xlsx_path)]
    input: PathBuf,

    /// Baseline policy documents (multi-document YAML); built-in if omitted
    #[arg(long)]
    baseline: Option<PathBuf>,

    /// Conversion options (YAML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory to write `<namespace>.yaml` into
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Overwrite an existing output file without asking
    #[arg(short, long)]
    yes: bool,
}

fn parse_xlsx_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    let is_xlsx = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
    if is_xlsx {
        Ok(path)
    } else {
        Err(format!("expected an .xlsx file, got {value:?}"))
    }
}

fn main() -> ExitCode {
    // Logs go to stderr; the prompt and result summary go to stdout
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("netsheet: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    if !args.input.is_file() {
        bail!("{}: no such file", args.input.display());
    }

    let baseline = match &args.baseline {
        Some(path) => Baseline::from_file(path)
            .with_context(|| format!("loading baseline {}", path.display()))?,
        None => Baseline::builtin().context("loading built-in baseline")?,
    };
    let options = match &args.config {
        Some(path) => ConvertOptions::from_file(path)
            .with_context(|| format!("loading options {}", path.display()))?,
        None => ConvertOptions::default(),
    };

    let table = Table::from_xlsx(&args.input)?;
    let conversion = Converter::new(baseline, options).convert(&table)?;
    let rendered = conversion.to_yaml()?;

    let path = output_path(&args.output_dir, &conversion.namespace);
    if !may_write(&path, args.yes)? {
        tracing::info!(path = %path.display(), "not overwriting existing file");
        return Ok(());
    }

    write_output(&path, &rendered).with_context(|| format!("writing {}", path.display()))?;
    println!("File created: {}", path.display());
    Ok(())
}

fn may_write(path: &Path, yes: bool) -> anyhow::Result<bool> {
    if yes || !path.exists() {
        return Ok(true);
    }
    let stdin = io::stdin();
    Ok(confirm_overwrite(path, stdin.lock(), io::stdout())?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::ffi::OsStr;

    use super::*;

    #[test]
    fn test_parse_xlsx_path() {
        assert_eq!(parse_xlsx_path("a.xlsx").unwrap(), PathBuf::from("a.xlsx"));
        assert_eq!(parse_xlsx_path("dir/a.XLSX").unwrap(), PathBuf::from("dir/a.XLSX"));
        assert!(parse_xlsx_path("a.csv").is_err());
        assert!(parse_xlsx_path("a").is_err());
        assert!(parse_xlsx_path("xlsx").is_err());
    }

    #[test]
    fn test_wrong_extension_is_a_usage_error() {
        assert!(Args::try_parse_from(["netsheet", "access.csv"]).is_err());
        assert!(Args::try_parse_from(["netsheet"]).is_err());
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["netsheet", "access.xlsx"]).unwrap();
        assert_eq!(args.input, PathBuf::from("access.xlsx"));
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert!(args.baseline.is_none());
        assert!(args.config.is_none());
        assert!(!args.yes);

        let args = Args::try_parse_from(["netsheet", "access.xlsx", "-o", "out", "-y"]).unwrap();
        assert_eq!(args.output_dir, PathBuf::from("out"));
        assert!(args.yes);
    }

    #[test]
    fn test_missing_input_fails_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("missing.xlsx");
        let args = Args::try_parse_from([
            OsStr::new("netsheet"),
            input.as_os_str(),
            OsStr::new("-o"),
            dir.path().as_os_str(),
        ])
        .unwrap();

        let err = run(&args).unwrap_err();
        assert!(err.to_string().contains("no such file"), "{err:#}");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_may_write_without_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("billing.yaml");

        assert!(may_write(&path, false).unwrap());

        std::fs::write(&path, "old").unwrap();
        assert!(may_write(&path, true).unwrap());
    }
}
