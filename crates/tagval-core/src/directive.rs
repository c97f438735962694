//! Parsing of `validate:` directive strings into rule lists.
//!
//! A directive is a comma separated list of segments. Each segment is a rule
//! name with an optional `=value` (or `:value`) parameter, a custom validator
//! binding `path:Ident`, or the `dive` marker. Everything after the first
//! `dive` applies to the elements of the annotated collection.

use thiserror::Error;

use crate::util::{is_ident, is_path};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRule {
    Required,
    OmitEmpty,
    Min(String),
    Max(String),
    Gt(String),
    Lt(String),
    Gte(String),
    Lte(String),
    Regexp { module: String, name: String },
    Unique { field: Option<String> },
    Dive { elements: Vec<ParsedRule> },
    DateTime { format: String },
    Uuid,
    Email,
    Iso4217,
    Iso3166Alpha2,
    EqField { other: String },
    RequiredWithout { other: String },
    Custom { module: String, function: String },
    Unknown { raw: String },
}

impl ParsedRule {
    pub fn name(&self) -> &'static str {
        match self {
            ParsedRule::Required => "required",
            ParsedRule::OmitEmpty => "omitempty",
            ParsedRule::Min(_) => "min",
            ParsedRule::Max(_) => "max",
            ParsedRule::Gt(_) => "gt",
            ParsedRule::Lt(_) => "lt",
            ParsedRule::Gte(_) => "gte",
            ParsedRule::Lte(_) => "lte",
            ParsedRule::Regexp { .. } => "regexp",
            ParsedRule::Unique { .. } => "unique",
            ParsedRule::Dive { .. } => "dive",
            ParsedRule::DateTime { .. } => "datetime",
            ParsedRule::Uuid => "uuid",
            ParsedRule::Email => "email",
            ParsedRule::Iso4217 => "iso4217",
            ParsedRule::Iso3166Alpha2 => "iso3166_1_alpha2",
            ParsedRule::EqField { .. } => "eqfield",
            ParsedRule::RequiredWithout { .. } => "required_without",
            ParsedRule::Custom { .. } => "custom",
            ParsedRule::Unknown { .. } => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    #[error("rule `{rule}` requires a parameter (segment `{segment}`)")]
    MissingParameter { rule: &'static str, segment: String },
    #[error("malformed binding `{segment}`: expected `path:Ident`")]
    MalformedBinding { segment: String },
    #[error("`{segment}` does not take a parameter")]
    UnexpectedParameter { segment: String },
}

/// One row of the rule catalog printed by `tagval rules`.
#[derive(Debug, Clone, Copy)]
pub struct RuleInfo {
    pub name: &'static str,
    pub syntax: &'static str,
    pub applies_to: &'static str,
    pub summary: &'static str,
}

pub fn rule_catalog() -> &'static [RuleInfo] {
    &[
        RuleInfo {
            name: "required",
            syntax: "required",
            applies_to: "any (no-op on bool, records, wrappers)",
            summary: "value must not be empty, zero or None",
        },
        RuleInfo {
            name: "omitempty",
            syntax: "omitempty",
            applies_to: "any",
            summary: "skip the remaining rules when the value is empty",
        },
        RuleInfo {
            name: "min",
            syntax: "min=N",
            applies_to: "numbers, strings (chars), collections (len)",
            summary: "lower bound, inclusive",
        },
        RuleInfo {
            name: "max",
            syntax: "max=N",
            applies_to: "numbers, strings (chars), collections (len)",
            summary: "upper bound, inclusive",
        },
        RuleInfo {
            name: "gt",
            syntax: "gt=N",
            applies_to: "numbers, numeric wrappers",
            summary: "strictly greater than N",
        },
        RuleInfo {
            name: "lt",
            syntax: "lt=N",
            applies_to: "numbers, numeric wrappers",
            summary: "strictly less than N",
        },
        RuleInfo {
            name: "gte",
            syntax: "gte=N",
            applies_to: "numbers, numeric wrappers",
            summary: "greater than or equal to N",
        },
        RuleInfo {
            name: "lte",
            syntax: "lte=N",
            applies_to: "numbers, numeric wrappers",
            summary: "less than or equal to N",
        },
        RuleInfo {
            name: "regexp",
            syntax: "regexp=path:STATIC",
            applies_to: "strings (no-op otherwise)",
            summary: "must match a compiled pattern defined elsewhere",
        },
        RuleInfo {
            name: "unique",
            syntax: "unique | unique=field",
            applies_to: "sequences (no-op otherwise)",
            summary: "no duplicate elements, or no duplicate element field",
        },
        RuleInfo {
            name: "dive",
            syntax: "dive[,element rules]",
            applies_to: "collections, records, Option of either",
            summary: "apply the following rules to each element",
        },
        RuleInfo {
            name: "datetime",
            syntax: "datetime=FORMAT",
            applies_to: "strings",
            summary: "must parse with the strftime FORMAT",
        },
        RuleInfo {
            name: "uuid",
            syntax: "uuid",
            applies_to: "strings",
            summary: "RFC 4122 textual UUID, versions 1-5",
        },
        RuleInfo {
            name: "email",
            syntax: "email",
            applies_to: "strings, sequences of strings",
            summary: "email address shape",
        },
        RuleInfo {
            name: "iso4217",
            syntax: "iso4217",
            applies_to: "strings",
            summary: "ISO 4217 currency code",
        },
        RuleInfo {
            name: "iso3166_1_alpha2",
            syntax: "iso3166_1_alpha2 | iso3166-alpha2",
            applies_to: "strings",
            summary: "ISO 3166-1 alpha-2 country code",
        },
        RuleInfo {
            name: "eqfield",
            syntax: "eqfield=Field",
            applies_to: "any comparable",
            summary: "must equal a sibling field, None-aware",
        },
        RuleInfo {
            name: "required_without",
            syntax: "required_without=Field",
            applies_to: "values with an emptiness test",
            summary: "required when the sibling field is empty",
        },
        RuleInfo {
            name: "custom",
            syntax: "path:function",
            applies_to: "any",
            summary: "call `function(&value) -> Result<(), E>`; `E` converts into a boxed error and becomes the source",
        },
    ]
}

/// Parses a directive string into its rule list.
pub fn parse_directive(raw: &str) -> Result<Vec<ParsedRule>, DirectiveError> {
    let segments: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    parse_segments(&segments)
}

fn parse_segments(segments: &[&str]) -> Result<Vec<ParsedRule>, DirectiveError> {
    let Some(dive_at) = segments.iter().position(|s| *s == "dive") else {
        return segments.iter().map(|s| parse_segment(s)).collect();
    };
    let mut rules = segments[..dive_at]
        .iter()
        .map(|s| parse_segment(s))
        .collect::<Result<Vec<_>, _>>()?;
    let elements = parse_segments(&segments[dive_at + 1..])?;
    rules.push(ParsedRule::Dive { elements });
    Ok(rules)
}

const PARAMETERIZED: &[&str] = &[
    "min",
    "max",
    "gt",
    "lt",
    "gte",
    "lte",
    "regexp",
    "unique",
    "datetime",
    "eqfield",
    "required_without",
];

fn split_segment(segment: &str) -> (&str, Option<&str>) {
    if let Some((name, value)) = segment.split_once('=') {
        return (name.trim(), Some(value.trim()));
    }
    if let Some((name, value)) = segment.split_once(':') {
        if PARAMETERIZED.contains(&name.trim()) {
            return (name.trim(), Some(value.trim()));
        }
    }
    (segment, None)
}

fn parse_segment(segment: &str) -> Result<ParsedRule, DirectiveError> {
    let (name, param) = split_segment(segment);
    let param = param.filter(|p| !p.is_empty());
    let required = |rule: &'static str| {
        param
            .map(str::to_string)
            .ok_or_else(|| DirectiveError::MissingParameter {
                rule,
                segment: segment.to_string(),
            })
    };
    let bare = |rule: ParsedRule| {
        if param.is_some() {
            Err(DirectiveError::UnexpectedParameter {
                segment: segment.to_string(),
            })
        } else {
            Ok(rule)
        }
    };

    match name {
        "required" => bare(ParsedRule::Required),
        "omitempty" => bare(ParsedRule::OmitEmpty),
        "uuid" => bare(ParsedRule::Uuid),
        "email" => bare(ParsedRule::Email),
        "iso4217" => bare(ParsedRule::Iso4217),
        "iso3166_1_alpha2" | "iso3166-alpha2" => bare(ParsedRule::Iso3166Alpha2),
        "min" => required("min").map(ParsedRule::Min),
        "max" => required("max").map(ParsedRule::Max),
        "gt" => required("gt").map(ParsedRule::Gt),
        "lt" => required("lt").map(ParsedRule::Lt),
        "gte" => required("gte").map(ParsedRule::Gte),
        "lte" => required("lte").map(ParsedRule::Lte),
        "datetime" => required("datetime").map(|format| ParsedRule::DateTime { format }),
        "eqfield" => required("eqfield").map(|other| ParsedRule::EqField { other }),
        "required_without" => {
            required("required_without").map(|other| ParsedRule::RequiredWithout { other })
        }
        "unique" => Ok(ParsedRule::Unique {
            field: param.map(str::to_string),
        }),
        "regexp" => {
            let value = required("regexp")?;
            let (module, name) =
                parse_binding(&value).ok_or_else(|| DirectiveError::MalformedBinding {
                    segment: segment.to_string(),
                })?;
            Ok(ParsedRule::Regexp { module, name })
        }
        _ if segment.contains(':') => {
            if segment.contains('=') {
                return Err(DirectiveError::UnexpectedParameter {
                    segment: segment.to_string(),
                });
            }
            let (module, function) =
                parse_binding(segment).ok_or_else(|| DirectiveError::MalformedBinding {
                    segment: segment.to_string(),
                })?;
            Ok(ParsedRule::Custom { module, function })
        }
        _ => Ok(ParsedRule::Unknown {
            raw: segment.to_string(),
        }),
    }
}

/// Splits `module:item` at the last `:`. Accepts the `module::item` spelling too.
pub fn parse_binding(text: &str) -> Option<(String, String)> {
    let (module, item) = text.trim().rsplit_once(':')?;
    let module = module.strip_suffix(':').unwrap_or(module).trim();
    let item = item.trim();
    if !is_path(module) || !is_ident(item) {
        return None;
    }
    Some((module.to_string(), item.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_trims_segments() {
        let rules = parse_directive(" required , min=3,, max = 10 ").expect("parse");
        assert_eq!(
            rules,
            vec![
                ParsedRule::Required,
                ParsedRule::Min("3".to_string()),
                ParsedRule::Max("10".to_string()),
            ]
        );
    }

    #[test]
    fn empty_directive_has_no_rules() {
        assert_eq!(parse_directive("").expect("parse"), Vec::new());
        assert_eq!(parse_directive(" , ").expect("parse"), Vec::new());
    }

    #[test]
    fn dive_partitions_element_rules() {
        let rules = parse_directive("min=1,dive,required,gt=0").expect("parse");
        assert_eq!(
            rules,
            vec![
                ParsedRule::Min("1".to_string()),
                ParsedRule::Dive {
                    elements: vec![ParsedRule::Required, ParsedRule::Gt("0".to_string())],
                },
            ]
        );
    }

    #[test]
    fn second_dive_nests() {
        let rules = parse_directive("dive,min=1,dive,email").expect("parse");
        assert_eq!(
            rules,
            vec![ParsedRule::Dive {
                elements: vec![
                    ParsedRule::Min("1".to_string()),
                    ParsedRule::Dive {
                        elements: vec![ParsedRule::Email],
                    },
                ],
            }]
        );
    }

    #[test]
    fn missing_parameters_are_errors() {
        for raw in ["min", "max=", "gte", "datetime", "eqfield=", "required_without", "regexp"] {
            let err = parse_directive(raw).expect_err(raw);
            assert!(
                matches!(err, DirectiveError::MissingParameter { .. }),
                "{raw}: {err:?}"
            );
        }
    }

    #[test]
    fn colon_parameter_form() {
        assert_eq!(
            parse_directive("min:5").expect("parse"),
            vec![ParsedRule::Min("5".to_string())]
        );
        assert_eq!(
            parse_directive("regexp:crate::patterns:SLUG").expect("parse"),
            vec![ParsedRule::Regexp {
                module: "crate::patterns".to_string(),
                name: "SLUG".to_string(),
            }]
        );
    }

    #[test]
    fn regexp_binding_must_be_well_formed() {
        assert_eq!(
            parse_directive("regexp=crate::patterns::SLUG").expect("parse"),
            vec![ParsedRule::Regexp {
                module: "crate::patterns".to_string(),
                name: "SLUG".to_string(),
            }]
        );
        assert!(matches!(
            parse_directive("regexp=SLUG"),
            Err(DirectiveError::MalformedBinding { .. })
        ));
        assert!(matches!(
            parse_directive("regexp=patterns:"),
            Err(DirectiveError::MalformedBinding { .. })
        ));
    }

    #[test]
    fn custom_validator_bindings() {
        assert_eq!(
            parse_directive("required,crate::checks:not_reserved").expect("parse"),
            vec![
                ParsedRule::Required,
                ParsedRule::Custom {
                    module: "crate::checks".to_string(),
                    function: "not_reserved".to_string(),
                },
            ]
        );
        assert!(matches!(
            parse_directive("checks:has-dash"),
            Err(DirectiveError::MalformedBinding { .. })
        ));
        assert!(matches!(
            parse_directive("checks:validate=3"),
            Err(DirectiveError::UnexpectedParameter { .. })
        ));
    }

    #[test]
    fn unique_parameter_is_optional() {
        assert_eq!(
            parse_directive("unique,unique=sku").expect("parse"),
            vec![
                ParsedRule::Unique { field: None },
                ParsedRule::Unique {
                    field: Some("sku".to_string())
                },
            ]
        );
    }

    #[test]
    fn country_alias_and_unknown() {
        assert_eq!(
            parse_directive("iso3166-alpha2,bogus").expect("parse"),
            vec![
                ParsedRule::Iso3166Alpha2,
                ParsedRule::Unknown {
                    raw: "bogus".to_string()
                },
            ]
        );
    }

    #[test]
    fn bare_rules_reject_parameters() {
        assert!(matches!(
            parse_directive("email=yes"),
            Err(DirectiveError::UnexpectedParameter { .. })
        ));
    }

    #[test]
    fn datetime_keeps_format_verbatim() {
        assert_eq!(
            parse_directive("datetime=%Y-%m-%dT%H:%M:%S").expect("parse"),
            vec![ParsedRule::DateTime {
                format: "%Y-%m-%dT%H:%M:%S".to_string()
            }]
        );
    }

    #[test]
    fn catalog_covers_rule_names() {
        let names: Vec<&str> = rule_catalog().iter().map(|r| r.name).collect();
        for rule in [
            ParsedRule::Required,
            ParsedRule::Uuid,
            ParsedRule::Iso3166Alpha2,
            ParsedRule::RequiredWithout {
                other: String::new(),
            },
        ] {
            assert!(names.contains(&rule.name()), "{}", rule.name());
        }
    }
}
