use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    Load,
    Parse,
    Check,
    Emit,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticCode {
    TV0001DirectiveParse,
    TV0002SourceParse,
    TV0100UnsupportedRuleForType,
    TV0101InvalidParameter,
    TV0200UnknownDirective,
    TV0300UnresolvedSibling,
    TV0400DiveTypeError,
    TV0401SkippedDiveTarget,
    TV0901InternalBug,
}

impl DiagnosticCode {
    pub fn code_str(self) -> &'static str {
        match self {
            DiagnosticCode::TV0001DirectiveParse => "TV0001",
            DiagnosticCode::TV0002SourceParse => "TV0002",
            DiagnosticCode::TV0100UnsupportedRuleForType => "TV0100",
            DiagnosticCode::TV0101InvalidParameter => "TV0101",
            DiagnosticCode::TV0200UnknownDirective => "TV0200",
            DiagnosticCode::TV0300UnresolvedSibling => "TV0300",
            DiagnosticCode::TV0400DiveTypeError => "TV0400",
            DiagnosticCode::TV0401SkippedDiveTarget => "TV0401",
            DiagnosticCode::TV0901InternalBug => "TV0901",
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            DiagnosticCode::TV0001DirectiveParse => "malformed validation directive",
            DiagnosticCode::TV0002SourceParse => "failed to parse source file",
            DiagnosticCode::TV0100UnsupportedRuleForType => "rule does not apply to field type",
            DiagnosticCode::TV0101InvalidParameter => "rule parameter is not valid for field type",
            DiagnosticCode::TV0200UnknownDirective => "unknown validation directive",
            DiagnosticCode::TV0300UnresolvedSibling => "referenced sibling field not found",
            DiagnosticCode::TV0400DiveTypeError => "dive target is not a collection or record",
            DiagnosticCode::TV0401SkippedDiveTarget => "dive target record is skipped",
            DiagnosticCode::TV0901InternalBug => "internal tagval bug",
        }
    }

    pub fn default_help(self) -> Option<&'static str> {
        match self {
            DiagnosticCode::TV0001DirectiveParse => Some(
                "Directives are comma separated; `regexp` and custom validators take `path:Ident`.",
            ),
            DiagnosticCode::TV0002SourceParse => Some("Ensure the file parses as Rust."),
            DiagnosticCode::TV0200UnknownDirective => {
                Some("Fix the directive or run with `--unknown-directives skip`.")
            }
            DiagnosticCode::TV0401SkippedDiveTarget => Some(
                "Remove `validate: skip` from the target or drop `dive`; the element is not validated.",
            ),
            DiagnosticCode::TV0901InternalBug => {
                Some("This is a bug in tagval. Please report it with the input source file.")
            }
            _ => None,
        }
    }

    pub fn default_phase(self) -> Phase {
        match self {
            DiagnosticCode::TV0001DirectiveParse => Phase::Parse,
            DiagnosticCode::TV0002SourceParse => Phase::Load,
            DiagnosticCode::TV0300UnresolvedSibling | DiagnosticCode::TV0401SkippedDiveTarget => {
                Phase::Emit
            }
            DiagnosticCode::TV0901InternalBug => Phase::Internal,
            _ => Phase::Check,
        }
    }

    pub fn default_severity(self) -> Severity {
        match self {
            DiagnosticCode::TV0300UnresolvedSibling | DiagnosticCode::TV0401SkippedDiveTarget => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }
}

/// Where a diagnostic was raised: the source unit and, when known, the record and field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub unit: String,
    pub record: Option<String>,
    pub field: Option<String>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.unit)?;
        if let Some(record) = &self.record {
            write!(f, ": {record}")?;
            if let Some(field) = &self.field {
                write!(f, ".{field}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub phase: Phase,
    pub severity: Severity,
    pub message: String,
    pub help: Option<String>,
    pub location: Option<Location>,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, phase: Phase, message: impl Into<String>) -> Self {
        Diagnostic {
            code,
            phase,
            severity: Severity::Error,
            message: message.into(),
            help: code.default_help().map(|s| s.to_string()),
            location: None,
        }
    }

    pub fn warning(code: DiagnosticCode, phase: Phase, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(code, phase, message)
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?} {:?}: {}",
            self.code.code_str(),
            self.phase,
            self.severity,
            self.message
        )?;
        if let Some(location) = &self.location {
            write!(f, "\n  at: {location}")?;
        }
        if let Some(help) = &self.help {
            write!(f, "\n  help: {help}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

pub fn render_diagnostics_md() -> String {
    let mut rows: Vec<(String, Phase, Severity, String, String)> = Vec::new();
    for code in all_codes() {
        rows.push((
            code.code_str().to_string(),
            code.default_phase(),
            code.default_severity(),
            code.default_message().to_string(),
            code.default_help().unwrap_or("").to_string(),
        ));
    }
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = String::new();
    out.push_str("# tagval diagnostics catalog\n\n");
    out.push_str("This document is generated from `crates/tagval-core/src/diagnostics.rs`.\n\n");
    out.push_str("| Code | Phase | Severity | Message | Help |\n");
    out.push_str("| ---- | ----- | -------- | ------- | ---- |\n");
    for (code, phase, sev, msg, help) in rows {
        out.push_str(&format!(
            "| {code} | {phase:?} | {sev:?} | {msg} | {help} |\n"
        ));
    }
    out
}

pub fn all_codes() -> &'static [DiagnosticCode] {
    &[
        DiagnosticCode::TV0001DirectiveParse,
        DiagnosticCode::TV0002SourceParse,
        DiagnosticCode::TV0100UnsupportedRuleForType,
        DiagnosticCode::TV0101InvalidParameter,
        DiagnosticCode::TV0200UnknownDirective,
        DiagnosticCode::TV0300UnresolvedSibling,
        DiagnosticCode::TV0400DiveTypeError,
        DiagnosticCode::TV0401SkippedDiveTarget,
        DiagnosticCode::TV0901InternalBug,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lists_every_code_once() {
        let md = render_diagnostics_md();
        for code in all_codes() {
            assert_eq!(
                md.matches(&format!("| {} |", code.code_str())).count(),
                1,
                "{}",
                code.code_str()
            );
        }
    }

    #[test]
    fn display_includes_location_and_help() {
        let d = Diagnostic::error(
            DiagnosticCode::TV0200UnknownDirective,
            Phase::Check,
            "unknown validation directive `bogus`",
        )
        .at(Location {
            unit: "user.rs".to_string(),
            record: Some("User".to_string()),
            field: Some("name".to_string()),
        });
        let text = d.to_string();
        assert!(text.starts_with("TV0200 Check Error: unknown validation directive `bogus`"));
        assert!(text.contains("\n  at: user.rs: User.name"));
        assert!(text.contains("\n  help: "));
    }

    #[test]
    fn warnings_keep_code_help() {
        let d = Diagnostic::warning(
            DiagnosticCode::TV0401SkippedDiveTarget,
            Phase::Emit,
            "skipped",
        );
        assert!(!d.is_error());
        assert!(d.help.is_some());
    }
}
