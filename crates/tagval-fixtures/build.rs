use std::path::PathBuf;

use anyhow::{Context, Result};
use tagval_core::{generate, GenerateOptions, Package};

fn main() -> Result<()> {
    let manifest_dir =
        PathBuf::from(std::env::var_os("CARGO_MANIFEST_DIR").context("CARGO_MANIFEST_DIR")?);
    let out_dir = PathBuf::from(std::env::var_os("OUT_DIR").context("OUT_DIR")?);
    let models = manifest_dir.join("src").join("models");
    println!("cargo:rerun-if-changed={}", models.display());

    let options = GenerateOptions::default();
    let package = Package::load_dir(&models, &options.suffix)?;
    let report = generate(&package, &options);
    for diagnostic in &report.diagnostics {
        println!("cargo:warning={}", diagnostic.to_string().replace('\n', " "));
    }
    if report.has_errors() {
        anyhow::bail!("validation generation failed for {}", models.display());
    }

    for output in &report.outputs {
        let path = out_dir.join(&output.output_file);
        std::fs::write(&path, &output.code)
            .with_context(|| format!("write output: {}", path.display()))?;
    }
    Ok(())
}
