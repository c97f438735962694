use serde::Serialize;
use tracing::{info, instrument};

use crate::closure::compute_needs_generation;
use crate::config::GenerateOptions;
use crate::diagnostics::Diagnostic;
use crate::emit::{emit_unit, UnitOutput};
use crate::model::Package;
use crate::oracle::SourceOracle;
use crate::types::TypeResolver;

#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerateReport {
    pub outputs: Vec<UnitOutput>,
    pub diagnostics: Vec<Diagnostic>,
}

impl GenerateReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    pub fn output_for(&self, source_file: &str) -> Option<&UnitOutput> {
        self.outputs.iter().find(|o| o.source_file == source_file)
    }
}

/// Generates validation code for every unit of `package`.
///
/// Errors are reported per record (or per unit for unknown directives in `fail`
/// mode); everything else in the package is still generated.
#[instrument(skip_all, fields(units = package.units.len(), records = package.records.len()))]
pub fn generate(package: &Package, options: &GenerateOptions) -> GenerateReport {
    let closed = {
        let oracle = SourceOracle::new(package, options);
        compute_needs_generation(package, &oracle)
    };
    let oracle = SourceOracle::new(&closed, options);
    let resolver = TypeResolver::new(&oracle);

    let mut report = GenerateReport::default();
    for unit in &closed.units {
        if let Some(output) = emit_unit(&closed, unit, &resolver, options, &mut report.diagnostics)
        {
            info!(
                unit = %output.source_file,
                output = %output.output_file,
                records = output.records.len(),
                "generated"
            );
            report.outputs.push(output);
        }
    }
    report
}
