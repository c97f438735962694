use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command as Process, Stdio};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tagval_core::{generate, GenerateOptions, Package, Severity, UnitOutput, UnknownDirectiveMode};
use tracing::{debug, error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "tagval")]
#[command(about = "Generates validate() methods from `validate:` doc directives.", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate `<stem><suffix>.rs` next to every source file of each package.
    Generate {
        /// Package directories (each is scanned for `*.rs`, non-recursively).
        #[arg(required = true)]
        packages: Vec<PathBuf>,
        /// JSON config file (`schema_version: tagval.config@0.1.0`).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output file suffix (default `_validation`).
        #[arg(long)]
        suffix: Option<String>,
        /// What to do with unknown directives: `fail` or `skip`.
        #[arg(long)]
        unknown_directives: Option<UnknownDirectiveMode>,
        /// Leave existing output files untouched.
        #[arg(long, default_value_t = false)]
        no_overwrite: bool,
        /// Report what would be written; do not write.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        /// If set, fail if any output differs; do not write.
        #[arg(long, default_value_t = false)]
        check: bool,
        /// Pipe generated code through `rustfmt`.
        #[arg(long, default_value_t = false)]
        rustfmt: bool,
        /// Print the report as JSON on stdout.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the directive catalog.
    Rules,
    /// Print the diagnostics catalog (Markdown).
    Diagnostics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Write { overwrite: bool },
    DryRun,
    Check,
}

#[derive(Debug, PartialEq, Eq)]
enum WriteOutcome {
    Written,
    Unchanged,
    KeptExisting,
    WouldWrite,
}

fn main() -> Result<()> {
    try_main().map_err(|err| {
        eprintln!("{err:#}");
        err
    })
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Generate {
            packages,
            config,
            suffix,
            unknown_directives,
            no_overwrite,
            dry_run,
            check,
            rustfmt,
            json,
        } => {
            let mut options = match &config {
                Some(path) => GenerateOptions::load(path)?,
                None => GenerateOptions::default(),
            };
            if let Some(suffix) = suffix {
                options.suffix = suffix;
            }
            if let Some(mode) = unknown_directives {
                options.unknown_directives = mode;
            }
            options.validate().context("invalid options")?;

            let mode = if check {
                WriteMode::Check
            } else if dry_run {
                WriteMode::DryRun
            } else {
                WriteMode::Write {
                    overwrite: !no_overwrite,
                }
            };
            run_generate(&packages, &options, mode, rustfmt, json)
        }
        Command::Rules => {
            print_rules();
            Ok(())
        }
        Command::Diagnostics => {
            print!("{}", tagval_core::diagnostics::render_diagnostics_md());
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_rules() {
    let catalog = tagval_core::directive::rule_catalog();
    let width = catalog.iter().map(|r| r.syntax.len()).max().unwrap_or(0);
    for rule in catalog {
        println!("{:width$}  {}", rule.syntax, rule.summary);
        println!("{:width$}  applies to: {}", "", rule.applies_to);
    }
}

fn run_generate(
    packages: &[PathBuf],
    options: &GenerateOptions,
    mode: WriteMode,
    rustfmt: bool,
    json: bool,
) -> Result<()> {
    let mut failed = false;
    let mut reports = Vec::new();
    for dir in packages {
        let package = Package::load_dir(dir, &options.suffix)?;
        let report = generate(&package, options);
        for diagnostic in &report.diagnostics {
            match diagnostic.severity {
                Severity::Error => error!("{diagnostic}"),
                Severity::Warning => warn!("{diagnostic}"),
            }
        }
        failed |= report.has_errors();

        for output in &report.outputs {
            let src = if rustfmt {
                run_rustfmt(&output.code)
                    .with_context(|| format!("rustfmt: {}", output.output_file))?
            } else {
                output.code.clone()
            };
            let out_path = output_path(dir, output);
            match write_output(&out_path, &src, mode)? {
                WriteOutcome::Written => info!(path = %out_path.display(), "wrote"),
                WriteOutcome::Unchanged => debug!(path = %out_path.display(), "unchanged"),
                WriteOutcome::KeptExisting => {
                    info!(path = %out_path.display(), "exists; not overwritten")
                }
                WriteOutcome::WouldWrite => {
                    println!("would write {}", out_path.display())
                }
            }
        }
        reports.push(serde_json::json!({
            "package": dir.display().to_string(),
            "report": report,
        }));
    }

    if json {
        let text = serde_json::to_string_pretty(&reports).context("serialize report")?;
        println!("{text}");
    }
    if failed {
        anyhow::bail!("validation generation failed; see diagnostics above");
    }
    Ok(())
}

fn output_path(dir: &Path, output: &UnitOutput) -> PathBuf {
    output
        .source_path
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or(dir)
        .join(&output.output_file)
}

fn write_output(out_path: &Path, src: &str, mode: WriteMode) -> Result<WriteOutcome> {
    match mode {
        WriteMode::Check => {
            let cur = std::fs::read_to_string(out_path)
                .with_context(|| format!("read existing output: {}", out_path.display()))?;
            if cur != src {
                anyhow::bail!("generated output differs: {}", out_path.display());
            }
            Ok(WriteOutcome::Unchanged)
        }
        WriteMode::DryRun => Ok(WriteOutcome::WouldWrite),
        WriteMode::Write { overwrite } => {
            if out_path.exists() {
                if !overwrite {
                    return Ok(WriteOutcome::KeptExisting);
                }
                let cur = std::fs::read_to_string(out_path)
                    .with_context(|| format!("read existing output: {}", out_path.display()))?;
                if cur == src {
                    return Ok(WriteOutcome::Unchanged);
                }
            }
            std::fs::write(out_path, src.as_bytes())
                .with_context(|| format!("write output: {}", out_path.display()))?;
            Ok(WriteOutcome::Written)
        }
    }
}

fn run_rustfmt(src: &str) -> Result<String> {
    let mut child = Process::new("rustfmt")
        .args(["--edition", "2021", "--emit", "stdout"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("spawn rustfmt")?;
    child
        .stdin
        .take()
        .context("rustfmt stdin")?
        .write_all(src.as_bytes())
        .context("write rustfmt stdin")?;
    let out = child.wait_with_output().context("wait for rustfmt")?;
    if !out.status.success() {
        anyhow::bail!(
            "rustfmt exited with {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        );
    }
    String::from_utf8(out.stdout).context("rustfmt output is not UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_mode_reports_differences() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_validation.rs");
        std::fs::write(&path, "old").unwrap();

        assert_eq!(
            write_output(&path, "old", WriteMode::Check).unwrap(),
            WriteOutcome::Unchanged
        );
        let err = write_output(&path, "new", WriteMode::Check).unwrap_err();
        assert!(err.to_string().contains("generated output differs"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old");
    }

    #[test]
    fn check_mode_fails_on_missing_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing_validation.rs");
        assert!(write_output(&path, "x", WriteMode::Check).is_err());
    }

    #[test]
    fn overwrite_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_validation.rs");

        assert_eq!(
            write_output(&path, "a", WriteMode::Write { overwrite: false }).unwrap(),
            WriteOutcome::Written
        );
        assert_eq!(
            write_output(&path, "b", WriteMode::Write { overwrite: false }).unwrap(),
            WriteOutcome::KeptExisting
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a");

        assert_eq!(
            write_output(&path, "a", WriteMode::Write { overwrite: true }).unwrap(),
            WriteOutcome::Unchanged
        );
        assert_eq!(
            write_output(&path, "b", WriteMode::Write { overwrite: true }).unwrap(),
            WriteOutcome::Written
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "b");
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_validation.rs");
        assert_eq!(
            write_output(&path, "a", WriteMode::DryRun).unwrap(),
            WriteOutcome::WouldWrite
        );
        assert!(!path.exists());
    }

    #[test]
    fn generates_into_package_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("user.rs"),
            "pub struct User {\n    /// validate: required\n    pub name: String,\n}\n",
        )
        .unwrap();
        let options = GenerateOptions::default();
        run_generate(
            &[dir.path().to_path_buf()],
            &options,
            WriteMode::Write { overwrite: true },
            false,
            false,
        )
        .unwrap();
        let out = std::fs::read_to_string(dir.path().join("user_validation.rs")).unwrap();
        assert!(out.starts_with("// @generated by tagval from user.rs."));

        run_generate(
            &[dir.path().to_path_buf()],
            &options,
            WriteMode::Check,
            false,
            false,
        )
        .unwrap();
    }

    #[test]
    fn errors_fail_the_run() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("bad.rs"),
            "pub struct Bad {\n    /// validate: bogus\n    pub name: String,\n}\n",
        )
        .unwrap();
        let err = run_generate(
            &[dir.path().to_path_buf()],
            &GenerateOptions::default(),
            WriteMode::Write { overwrite: true },
            false,
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("generation failed"));
        assert!(!dir.path().join("bad_validation.rs").exists());
    }
}
