use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::{Base, CheckLevel};
use crate::error::CheckError;
use crate::flux::ast::{Expression, Property, Statement};
use crate::flux::build::{
    and, call, define_variable, expression_statement, float, function, function_params,
    greater_than, identifier, less_than, member, object, pipe, property, string,
};
use crate::settings::{LevelArguments, ScriptSettings};

/// A check that compares each record's `_value` against per-level bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, JsonSchema)]
#[ts(export)]
pub struct Threshold {
    #[serde(flatten)]
    pub base: Base,
    #[serde(default)]
    pub thresholds: Vec<ThresholdConfig>,
}

/// Bounds for one severity level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ThresholdConfig {
    /// Only alert if all values meet the threshold. Stored, not used when
    /// generating scripts.
    #[serde(default)]
    pub all_values: bool,
    pub level: CheckLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub lower_bound: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub upper_bound: Option<f64>,
}

/// The comparison a [`ThresholdConfig`] describes.
///
/// `Range` does not require `lower < upper`; an inverted range simply never
/// matches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// `r._value > lower`
    GreaterThan(f64),
    /// `r._value < upper`
    LessThan(f64),
    /// `r._value < upper and r._value > lower`
    Range { lower: f64, upper: f64 },
}

impl ThresholdConfig {
    /// Classify by which bounds are present. `None` if neither is.
    pub fn bound(&self) -> Option<Bound> {
        match (self.lower_bound, self.upper_bound) {
            (Some(lower), None) => Some(Bound::GreaterThan(lower)),
            (None, Some(upper)) => Some(Bound::LessThan(upper)),
            (Some(lower), Some(upper)) => Some(Bound::Range { lower, upper }),
            (None, None) => None,
        }
    }

    pub fn valid(&self) -> Result<(), CheckError> {
        if self.lower_bound.is_none() && self.upper_bound.is_none() {
            return Err(CheckError::invalid(
                "threshold must have at least one lowerBound or upperBound value",
            ));
        }
        let mut bounds = self.lower_bound.into_iter().chain(self.upper_bound);
        if !bounds.all(f64::is_finite) {
            return Err(CheckError::invalid("threshold bounds must be finite numbers"));
        }
        Ok(())
    }

    fn predicate(&self) -> Result<Expression, CheckError> {
        let bound = self.bound().ok_or_else(|| {
            CheckError::internal(format!("{} threshold has no bounds", self.level))
        })?;
        let value = || member("r", "_value");
        Ok(match bound {
            Bound::GreaterThan(lower) => greater_than(value(), float(lower)),
            Bound::LessThan(upper) => less_than(value(), float(upper)),
            Bound::Range { lower, upper } => and(
                less_than(value(), float(upper)),
                greater_than(value(), float(lower)),
            ),
        })
    }

    /// `<level> = (r) => <predicate>`
    fn statement(&self) -> Result<Statement, CheckError> {
        let func = function(function_params(&["r"]), self.predicate()?);
        Ok(define_variable(self.level.identifier(), func))
    }
}

impl Threshold {
    pub fn valid(&self) -> Result<(), CheckError> {
        self.base.valid()?;
        let mut seen = Vec::with_capacity(self.thresholds.len());
        for config in &self.thresholds {
            config.valid()?;
            if seen.contains(&config.level) {
                return Err(CheckError::invalid("threshold levels must be unique"));
            }
            seen.push(config.level);
        }
        Ok(())
    }

    /// Validate and compile into a complete script.
    pub fn generate_flux(&self, settings: &ScriptSettings) -> Result<String, CheckError> {
        crate::compiler::compile(self, settings)
    }

    /// Statements of the generated file, in emission order: check definition,
    /// one predicate per threshold, message function, then the call into the
    /// alerts package.
    pub fn generate_flux_ast_body(
        &self,
        settings: &ScriptSettings,
    ) -> Result<Vec<Statement>, CheckError> {
        let mut statements = Vec::with_capacity(self.thresholds.len() + 3);
        statements.push(self.check_definition());
        for config in &self.thresholds {
            statements.push(config.statement()?);
        }
        statements.push(self.message_function());
        statements.push(self.checks_function(settings));
        Ok(statements)
    }

    /// `check = {checkID: "<id>", tags: {...}}`
    fn check_definition(&self) -> Statement {
        let tags = self
            .base
            .tags
            .iter()
            .map(|tag| property(&tag.key, string(&tag.value)))
            .collect();
        define_variable(
            "check",
            object(vec![
                property("checkID", string(&self.base.id)),
                property("tags", object(tags)),
            ]),
        )
    }

    /// `messageFn = (r, check) => "<template>"`. The template is emitted as is.
    fn message_function(&self) -> Statement {
        let func = function(
            function_params(&["r", "check"]),
            string(&self.base.status_message_template),
        );
        define_variable("messageFn", func)
    }

    /// `data |> alerts.check(check: check, messageFn: messageFn, ...levels)`
    fn checks_function(&self, settings: &ScriptSettings) -> Statement {
        let mut args = vec![
            property("check", identifier("check")),
            property("messageFn", identifier("messageFn")),
        ];
        args.extend(self.level_arguments(settings.level_arguments));

        let checks = call(
            member(settings.alerts_identifier(), "check"),
            object(args),
        );
        expression_statement(pipe(identifier("data"), [checks]))
    }

    fn level_arguments(&self, mode: LevelArguments) -> Vec<Property> {
        CheckLevel::ALL
            .into_iter()
            .filter(|level| match mode {
                LevelArguments::All => true,
                LevelArguments::Defined => self.thresholds.iter().any(|c| c.level == *level),
            })
            .map(|level| property(level.identifier(), identifier(level.identifier())))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::check::{CheckQuery, Tag};
    use crate::flux::format_file;
    use crate::flux::build::file;

    fn config(level: CheckLevel, lower: Option<f64>, upper: Option<f64>) -> ThresholdConfig {
        ThresholdConfig {
            all_values: false,
            level,
            lower_bound: lower,
            upper_bound: upper,
        }
    }

    fn threshold(thresholds: Vec<ThresholdConfig>) -> Threshold {
        Threshold {
            base: Base {
                id: "000000000000000a".into(),
                name: "cpu".into(),
                description: None,
                query: CheckQuery {
                    text: "data = from(bucket: \"foo\")".into(),
                },
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

    fn render(config: &ThresholdConfig) -> String {
        format_file(&file("", Vec::new(), vec![config.statement().unwrap()]))
    }

    #[test]
    fn greater_than_when_only_lower() {
        let c = config(CheckLevel::Info, Some(10.0), None);
        assert_eq!(c.bound(), Some(Bound::GreaterThan(10.0)));
        assert_eq!(render(&c), "info = (r) => r._value > 10.0");
    }

    #[test]
    fn less_than_when_only_upper() {
        let c = config(CheckLevel::Warn, None, Some(40.0));
        assert_eq!(c.bound(), Some(Bound::LessThan(40.0)));
        assert_eq!(render(&c), "warn = (r) => r._value < 40.0");
    }

    #[test]
    fn range_when_both() {
        let c = config(CheckLevel::Crit, Some(10.0), Some(40.0));
        assert_eq!(
            c.bound(),
            Some(Bound::Range {
                lower: 10.0,
                upper: 40.0
            })
        );
        assert_eq!(render(&c), "crit = (r) => r._value < 40.0 and r._value > 10.0");
    }

    #[test]
    fn inverted_range_is_accepted() {
        let c = config(CheckLevel::Ok, Some(50.0), Some(5.0));
        assert!(c.valid().is_ok());
        assert_eq!(render(&c), "ok = (r) => r._value < 5.0 and r._value > 50.0");
    }

    #[test]
    fn negative_bounds_render_as_unary() {
        let c = config(CheckLevel::Info, Some(-2.5), None);
        assert_eq!(render(&c), "info = (r) => r._value > -2.5");
    }

    #[test]
    fn no_bounds_is_invalid() {
        let c = config(CheckLevel::Info, None, None);
        assert_eq!(c.bound(), None);
        let err = c.valid().unwrap_err();
        assert_eq!(err.code(), "invalid");
        assert_eq!(
            err.message(),
            "threshold must have at least one lowerBound or upperBound value"
        );
        // Reaching the builder without validation is an internal error.
        assert_eq!(c.statement().unwrap_err().code(), "internal");
    }

    #[test]
    fn non_finite_bounds_are_invalid() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = config(CheckLevel::Info, Some(bad), None).valid().unwrap_err();
            assert_eq!(err.message(), "threshold bounds must be finite numbers");
            let err = config(CheckLevel::Info, Some(1.0), Some(bad)).valid().unwrap_err();
            assert_eq!(err.message(), "threshold bounds must be finite numbers");
        }
    }

    #[test]
    fn duplicate_levels_are_invalid() {
        let t = threshold(vec![
            config(CheckLevel::Warn, Some(1.0), None),
            config(CheckLevel::Warn, None, Some(2.0)),
        ]);
        let err = t.valid().unwrap_err();
        assert_eq!(err.message(), "threshold levels must be unique");
    }

    #[test]
    fn body_statement_order() {
        let t = threshold(vec![
            config(CheckLevel::Info, Some(10.0), None),
            config(CheckLevel::Warn, None, Some(40.0)),
        ]);
        let body = t.generate_flux_ast_body(&ScriptSettings::default()).unwrap();
        assert_eq!(body.len(), 5);
        assert_eq!(
            format_file(&file("", Vec::new(), body)),
            [
                "check = {checkID: \"000000000000000a\", tags: {aaa: \"vaaa\", bbb: \"vbbb\"}}",
                "info = (r) => r._value > 10.0",
                "warn = (r) => r._value < 40.0",
                "messageFn = (r, check) => \"whoa!\"",
                "data |> alerts.check(check: check, messageFn: messageFn, ok: ok, info: info, warn: warn, crit: crit)",
            ]
            .join("\n")
        );
    }

    #[test]
    fn defined_level_arguments_only_reference_bound_levels() {
        let t = threshold(vec![
            config(CheckLevel::Crit, Some(90.0), None),
            config(CheckLevel::Info, Some(10.0), None),
        ]);
        let settings = ScriptSettings {
            level_arguments: LevelArguments::Defined,
            ..ScriptSettings::default()
        };
        let body = t.generate_flux_ast_body(&settings).unwrap();
        let last = format_file(&file("", Vec::new(), vec![body[body.len() - 1].clone()]));
        assert_eq!(
            last,
            "data |> alerts.check(check: check, messageFn: messageFn, info: info, crit: crit)"
        );
    }

    #[test]
    fn message_template_is_literal() {
        let mut t = threshold(vec![config(CheckLevel::Info, Some(1.0), None)]);
        t.base.status_message_template = "${r._value} is \"high\"".into();
        let body = t.generate_flux_ast_body(&ScriptSettings::default()).unwrap();
        let message = format_file(&file("", Vec::new(), vec![body[2].clone()]));
        assert_eq!(message, r#"messageFn = (r, check) => "\${r._value} is \"high\"""#);
    }

    #[test]
    fn json_uses_camel_case_and_omits_missing_bounds() {
        let c = config(CheckLevel::Info, Some(10.0), None);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "allValues": false, "level": "INFO", "lowerBound": 10.0 })
        );
        let back: ThresholdConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, c);
    }
}
