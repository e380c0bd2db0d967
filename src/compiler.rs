//! Turns a threshold check into a complete Flux script.
//!
//! The user's query fragment is parsed first; if it has any syntax errors the
//! whole compilation fails with all of them. Otherwise a generated file is
//! appended to the parsed package and the package is formatted as one script.

use tracing::{debug, warn};

use crate::check::Threshold;
use crate::error::CheckError;
use crate::flux::ast::Package;
use crate::flux::build::{file, imports};
use crate::flux::{format_package, parse_source, SyntaxError};
use crate::settings::ScriptSettings;

/// Validate `check` and render its script.
pub fn compile(check: &Threshold, settings: &ScriptSettings) -> Result<String, CheckError> {
    let package = compile_ast(check, settings)?;
    let script = format_package(&package);
    debug!(check_id = %check.base.id, bytes = script.len(), "compiled check");
    Ok(script)
}

/// Like [`compile`] but returns the package instead of its text.
pub fn compile_ast(check: &Threshold, settings: &ScriptSettings) -> Result<Package, CheckError> {
    if let Err(e) = check.valid() {
        warn!(check_id = %check.base.id, error = %e, "rejected check configuration");
        return Err(e);
    }

    let (mut package, errors) = parse_source(&check.base.query.text);
    if !errors.is_empty() {
        warn!(check_id = %check.base.id, count = errors.len(), "query has syntax errors");
        return Err(syntax_error(&errors));
    }
    debug!(
        check_id = %check.base.id,
        statements = package.files.iter().map(|f| f.body.len()).sum::<usize>(),
        "parsed query"
    );

    let body = check.generate_flux_ast_body(settings)?;
    package.files.push(file(
        &settings.file_name,
        imports(&[settings.alerts_package.as_str()]),
        body,
    ));
    Ok(package)
}

/// One error whose message lists every syntax error, one per line, in the
/// order they were reported.
fn syntax_error(errors: &[SyntaxError]) -> CheckError {
    let message = errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    CheckError::Syntax { message }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::check::{Base, CheckLevel, CheckQuery, Tag, ThresholdConfig};
    use crate::settings::LevelArguments;

    fn threshold(query: &str, thresholds: Vec<ThresholdConfig>) -> Threshold {
        Threshold {
            base: Base {
                id: "000000000000000a".into(),
                name: "moo".into(),
                description: None,
                query: CheckQuery { text: query.into() },
                status_message_template: "whoa!".into(),
                tags: vec![
                    Tag {
                        key: "aaa".into(),
                        value: "vaaa".into(),
                    },
                    Tag {
                        key: "bbb".into(),
                        value: "vbbb".into(),
                    },
                ],
            },
            thresholds,
        }
    }

    fn bound(level: CheckLevel, lower: Option<f64>, upper: Option<f64>) -> ThresholdConfig {
        ThresholdConfig {
            all_values: false,
            level,
            lower_bound: lower,
            upper_bound: upper,
        }
    }

    fn example() -> Threshold {
        threshold(
            r#"data = from(bucket: "foo") |> range(start: -1d)"#,
            vec![
                bound(CheckLevel::Info, Some(10.0), None),
                bound(CheckLevel::Warn, None, Some(40.0)),
            ],
        )
    }

    #[test]
    fn compiles_end_to_end_example() {
        let script = compile(&example(), &ScriptSettings::default()).unwrap();
        let expected = r#"import "influxdata/influxdb/alerts"

data = from(bucket: "foo") |> range(start: -1d)
check = {checkID: "000000000000000a", tags: {aaa: "vaaa", bbb: "vbbb"}}
info = (r) => r._value > 10.0
warn = (r) => r._value < 40.0
messageFn = (r, check) => "whoa!"
data |> alerts.check(check: check, messageFn: messageFn, ok: ok, info: info, warn: warn, crit: crit)"#;
        assert_eq!(script, expected);
    }

    #[test]
    fn compile_is_deterministic() {
        let check = example();
        let settings = ScriptSettings::default();
        assert_eq!(
            compile(&check, &settings).unwrap(),
            compile(&check, &settings).unwrap()
        );
    }

    #[test]
    fn output_reparses_cleanly_and_formats_identically() {
        let script = compile(&example(), &ScriptSettings::default()).unwrap();
        let (package, errors) = parse_source(&script);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(format_package(&package), script);
    }

    #[test]
    fn query_comments_are_dropped() {
        let check = threshold(
            "// cpu usage\ndata = from(bucket: \"foo\") // last day\n    |> range(start: -1d)",
            vec![bound(CheckLevel::Crit, Some(90.0), None)],
        );
        let script = compile(&check, &ScriptSettings::default()).unwrap();
        assert!(!script.contains("//"));
        assert!(script.contains("\n\ndata = from(bucket: \"foo\") |> range(start: -1d)\ncheck = "));
    }

    #[test]
    fn tag_order_follows_input() {
        let mut check = example();
        check.base.tags.reverse();
        let script = compile(&check, &ScriptSettings::default()).unwrap();
        assert!(script.contains(r#"tags: {bbb: "vbbb", aaa: "vaaa"}"#));
    }

    #[test]
    fn range_bound_compiles() {
        let check = threshold(
            "data = from(bucket: \"foo\")",
            vec![bound(CheckLevel::Crit, Some(10.0), Some(40.0))],
        );
        let script = compile(&check, &ScriptSettings::default()).unwrap();
        assert!(script.contains("crit = (r) => r._value < 40.0 and r._value > 10.0"));
    }

    #[test]
    fn one_syntax_error_fails_without_output() {
        let check = threshold("data = from(bucket: \"foo\"", vec![]);
        let err = compile(&check, &ScriptSettings::default()).unwrap_err();
        assert_eq!(err.code(), "syntax");
        assert_eq!(err.message().lines().count(), 1);
        assert!(err.message().starts_with("error @"));
    }

    #[test]
    fn two_syntax_errors_are_joined_in_order() {
        let check = threshold("a = )\nb = ]", vec![]);
        let err = compile(&check, &ScriptSettings::default()).unwrap_err();
        assert_eq!(
            err.message(),
            "error @1:5-1:6: expected expression, got ')'\n\
             error @2:5-2:6: expected expression, got ']'"
        );
    }

    #[test]
    fn invalid_check_is_rejected_before_parsing() {
        // The query is also broken; validation must win.
        let check = threshold("a = )", vec![bound(CheckLevel::Info, None, None)]);
        let err = compile(&check, &ScriptSettings::default()).unwrap_err();
        assert_eq!(err.code(), "invalid");
    }

    #[test]
    fn generated_file_is_appended_last() {
        let package = compile_ast(&example(), &ScriptSettings::default()).unwrap();
        assert_eq!(package.files.len(), 2);
        assert_eq!(package.files[0].name, "");
        let generated = &package.files[1];
        assert_eq!(generated.name, "threshold.flux");
        assert_eq!(generated.imports[0].path, "influxdata/influxdb/alerts");
        assert_eq!(generated.body.len(), 5);
    }

    #[test]
    fn query_imports_are_hoisted_above_the_fragment() {
        let check = threshold(
            "import \"strings\"\ndata = from(bucket: \"foo\")",
            vec![bound(CheckLevel::Ok, None, Some(1.0))],
        );
        let script = compile(&check, &ScriptSettings::default()).unwrap();
        assert!(script.starts_with(
            "import \"strings\"\nimport \"influxdata/influxdb/alerts\"\n\ndata = from(bucket: \"foo\")\ncheck = "
        ));
    }

    #[test]
    fn settings_change_file_and_package() {
        let settings = ScriptSettings {
            file_name: "cpu.flux".into(),
            alerts_package: "contrib/monitor".into(),
            level_arguments: LevelArguments::Defined,
        };
        let package = compile_ast(&example(), &settings).unwrap();
        assert_eq!(package.files[1].name, "cpu.flux");

        let script = format_package(&package);
        assert!(script.starts_with("import \"contrib/monitor\""));
        assert!(script.ends_with(
            "data |> monitor.check(check: check, messageFn: messageFn, info: info, warn: warn)"
        ));
    }
}
