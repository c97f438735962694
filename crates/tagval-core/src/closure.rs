//! Which records need a generated `validate()` entry point.
//!
//! Records with their own rules are seeds. A `dive` into a record type forces
//! that record too, even when it has no rules, so the call site always has a
//! method to call. Forcing is transitive and never overrides `skip`.

use std::collections::VecDeque;

use tracing::debug;

use crate::directive::ParsedRule;
use crate::model::{Package, RecordDescriptor};
use crate::oracle::TypeOracle;
use crate::types::TypeResolver;

/// Returns a copy of `package` with `needs_generation` set on every record that
/// must get an entry point.
pub fn compute_needs_generation(package: &Package, oracle: &dyn TypeOracle) -> Package {
    let resolver = TypeResolver::new(oracle);
    let mut marked = vec![false; package.records.len()];
    let mut queue = VecDeque::new();

    for (idx, record) in package.records.iter().enumerate() {
        if is_eligible(package, record) && record.has_own_validation() {
            marked[idx] = true;
            queue.push_back(idx);
        }
    }

    while let Some(idx) = queue.pop_front() {
        let record = &package.records[idx];
        for target in dive_targets(package, record, &resolver) {
            let Some(target_idx) = package.record_index_near(record.unit, &target) else {
                continue;
            };
            let target_record = &package.records[target_idx];
            if marked[target_idx] || !is_eligible(package, target_record) {
                continue;
            }
            debug!(
                from = %record.name,
                to = %target_record.name,
                "dive forces validation entry point"
            );
            marked[target_idx] = true;
            queue.push_back(target_idx);
        }
    }

    let mut next = package.clone();
    for (record, needs) in next.records.iter_mut().zip(marked) {
        record.needs_generation = needs;
    }
    next
}

fn is_eligible(package: &Package, record: &RecordDescriptor) -> bool {
    !record.skip && !package.unit(record.unit).skip
}

/// Names of the local record types reached through `dive` on this record's fields.
pub fn dive_targets(
    package: &Package,
    record: &RecordDescriptor,
    resolver: &TypeResolver<'_>,
) -> Vec<String> {
    let mut out = Vec::new();
    for field in &record.fields {
        if !field.rules.iter().any(|r| matches!(r, ParsedRule::Dive { .. })) {
            continue;
        }
        let ty = resolver.resolve(record.unit, package.types.get(field.ty));
        let target = ty.ultimate();
        if !target.kind.is_record_like() || target.is_external() {
            continue;
        }
        if let Some(name) = &target.name {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerateOptions;
    use crate::oracle::SourceOracle;

    const SRC: &str = r#"
use crate::external::Remote;

pub struct Order {
    /// validate: dive
    pub items: Vec<Item>,
    /// validate: dive
    pub remote: Vec<Remote>,
    /// validate: dive
    pub legacy: Option<Legacy>,
}

pub struct Item {
    pub variant: Variant,
    /// validate: dive
    pub parts: std::collections::HashMap<String, Part>,
}

pub struct Variant { pub sku: String }
pub struct Part { pub code: String }

/// validate: skip
pub struct Legacy { pub id: u64 }

pub struct Orphan { pub value: i32 }
"#;

    fn closed() -> Package {
        let pkg = Package::from_sources([("order.rs", SRC)]).expect("load");
        let opts = GenerateOptions::default();
        let oracle = SourceOracle::new(&pkg, &opts);
        compute_needs_generation(&pkg, &oracle)
    }

    fn needs(pkg: &Package, name: &str) -> bool {
        pkg.record(name).expect(name).needs_generation
    }

    #[test]
    fn dive_forces_targets_transitively() {
        let pkg = closed();
        assert!(needs(&pkg, "Order"));
        assert!(needs(&pkg, "Item"));
        assert!(needs(&pkg, "Part"));
    }

    #[test]
    fn non_dived_and_skipped_records_stay_off() {
        let pkg = closed();
        assert!(!needs(&pkg, "Variant"));
        assert!(!needs(&pkg, "Orphan"));
        assert!(!needs(&pkg, "Legacy"));
    }

    #[test]
    fn input_is_left_untouched() {
        let pkg = Package::from_sources([("order.rs", SRC)]).expect("load");
        let opts = GenerateOptions::default();
        let oracle = SourceOracle::new(&pkg, &opts);
        let next = compute_needs_generation(&pkg, &oracle);
        assert!(pkg.records.iter().all(|r| !r.needs_generation));
        assert!(next.records.iter().any(|r| r.needs_generation));
    }

    #[test]
    fn skipped_unit_contributes_nothing() {
        let src = format!("//! validate: skip\n{SRC}");
        let pkg = Package::from_sources([("order.rs", src)]).expect("load");
        let opts = GenerateOptions::default();
        let oracle = SourceOracle::new(&pkg, &opts);
        let next = compute_needs_generation(&pkg, &oracle);
        assert!(next.records.iter().all(|r| !r.needs_generation));
    }

    #[test]
    fn targets_skip_external_types() {
        let pkg = Package::from_sources([("order.rs", SRC)]).expect("load");
        let opts = GenerateOptions::default();
        let oracle = SourceOracle::new(&pkg, &opts);
        let resolver = TypeResolver::new(&oracle);
        let order = pkg.record("Order").expect("order");
        assert_eq!(
            dive_targets(&pkg, order, &resolver),
            vec!["Item".to_string(), "Legacy".to_string()]
        );
    }
}
