//! Four-dimension validation of a checkpoint against an expectation set
//!
//! Expectations drive the assertion set, not observations: a tag that fired
//! without being expected produces no assertion at all. Dimension order is
//! tags, events, variables, consent; within a dimension, declaration order.
//! Both orders are part of the observable contract because report output is
//! order-sensitive.

use tracing::debug;

use crate::checkpoint::{Checkpoint, ValidationOutcome};
use crate::config::{ExpectationSet, ExpectedValue};
use crate::error::{MonitorError, Result};

/// What an assertion was about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectKind {
    Tag,
    Event,
    Variable,
    Consent,
}

/// One pass/fail comparison result tied to a single expected item.
#[derive(Debug, Clone)]
pub struct Assertion {
    pub kind: SubjectKind,
    pub subject: String,
    pub passed: bool,
    pub message: String,
}

/// Validate a checkpoint against the expectation set, populating its
/// passed/failed message lists exactly once.
///
/// Calling this twice on the same checkpoint is a usage error, not a silent
/// no-op: a second pass would duplicate assertion messages. An entirely
/// empty expectation set validates to zero assertions (trivially
/// successful).
pub fn validate(checkpoint: &mut Checkpoint, expectations: &ExpectationSet) -> Result<()> {
    if checkpoint.is_validated() {
        return Err(MonitorError::AlreadyValidated(checkpoint.event_label.clone()));
    }

    let mut outcome = ValidationOutcome::default();
    for assertion in assertions(checkpoint, expectations) {
        if assertion.passed {
            outcome.passed.push(assertion.message);
        } else {
            outcome.failed.push(assertion.message);
        }
    }

    debug!(
        "Checkpoint '{}': {} passed, {} failed",
        checkpoint.event_label,
        outcome.passed.len(),
        outcome.failed.len()
    );

    checkpoint.validation = Some(outcome);
    Ok(())
}

/// Compare a checkpoint against the expectation set without recording
/// anything on it. One assertion per expected item, in contract order.
pub fn assertions(checkpoint: &Checkpoint, expectations: &ExpectationSet) -> Vec<Assertion> {
    let mut assertions = Vec::with_capacity(expectations.len());

    for expected in &expectations.tags {
        let fired = checkpoint.tags_fired.iter().any(|t| &t.name == expected);
        assertions.push(Assertion {
            kind: SubjectKind::Tag,
            subject: expected.clone(),
            passed: fired,
            message: if fired {
                format!("Tag fired: {expected}")
            } else {
                format!("Tag NOT fired: {expected}")
            },
        });
    }

    for expected in &expectations.events {
        let found = checkpoint
            .datalayer
            .iter()
            .any(|e| e.event.as_deref() == Some(expected.as_str()));
        assertions.push(Assertion {
            kind: SubjectKind::Event,
            subject: expected.clone(),
            passed: found,
            message: if found {
                format!("Event found: {expected}")
            } else {
                format!("Event NOT found: {expected}")
            },
        });
    }

    for expectation in &expectations.variables {
        let name = &expectation.name;
        let captured = checkpoint.variables.get(name);
        let (passed, message) = match (&expectation.value, captured) {
            (ExpectedValue::Any, Some(_)) => (true, format!("Variable exists: {name}")),
            (ExpectedValue::Any, None) => {
                (false, format!("Variable missing: {name} (expected: *)"))
            }
            (ExpectedValue::Literal(expected), Some(variable)) => {
                if variable.value.as_deref() == Some(expected.as_str()) {
                    (true, format!("Variable matched: {name}={expected}"))
                } else {
                    let actual = variable.value.as_deref().unwrap_or("(none)");
                    (
                        false,
                        format!(
                            "Variable mismatch: {name} (expected: {expected}, got: {actual})"
                        ),
                    )
                }
            }
            (ExpectedValue::Literal(expected), None) => (
                false,
                format!("Variable missing: {name} (expected: {expected})"),
            ),
        };
        assertions.push(Assertion {
            kind: SubjectKind::Variable,
            subject: name.clone(),
            passed,
            message,
        });
    }

    for expectation in &expectations.consent {
        let signal = &expectation.signal;
        let actual = checkpoint.consent.get(signal).copied().unwrap_or_default();
        let passed = actual == expectation.state;
        assertions.push(Assertion {
            kind: SubjectKind::Consent,
            subject: signal.clone(),
            passed,
            message: if passed {
                format!("Consent: {signal}={actual}")
            } else {
                format!(
                    "Consent mismatch: {signal} (expected: {}, got: {actual})",
                    expectation.state
                )
            },
        });
    }

    assertions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CapturedVariable, ConsentState, DataLayerEntry, FiredTag};
    use crate::config::{ConsentExpectation, VariableExpectation};
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn checkpoint() -> Checkpoint {
        Checkpoint {
            timestamp: Utc::now(),
            event_label: "page_load".into(),
            screenshot: PathBuf::from("001_page_load.png"),
            screenshot_sha256: None,
            annotated: None,
            tags_fired: Vec::new(),
            tags_not_fired: Vec::new(),
            variables: BTreeMap::new(),
            consent: BTreeMap::new(),
            datalayer: Vec::new(),
            validation: None,
        }
    }

    fn fired(name: &str) -> FiredTag {
        FiredTag {
            name: name.into(),
            tag_type: None,
            trigger: None,
            bounding_box: None,
        }
    }

    fn variable(value: &str) -> CapturedVariable {
        CapturedVariable { value: Some(value.into()), bounding_box: None }
    }

    fn event(index: usize, name: &str) -> DataLayerEntry {
        DataLayerEntry {
            index,
            event: Some(name.into()),
            data: serde_json::Value::Null,
            timestamp: None,
        }
    }

    #[test]
    fn empty_expectations_yield_zero_assertions() {
        let mut cp = checkpoint();
        cp.tags_fired.push(fired("GA4 - Page View"));

        validate(&mut cp, &ExpectationSet::default()).unwrap();

        let outcome = cp.validation.as_ref().unwrap();
        assert!(outcome.passed.is_empty());
        assert!(outcome.failed.is_empty());
    }

    #[test]
    fn assertion_count_matches_expected_item_count() {
        let mut cp = checkpoint();
        let expectations = ExpectationSet {
            tags: vec!["A".into(), "B".into()],
            events: vec!["page_view".into()],
            variables: vec![VariableExpectation {
                name: "txn_id".into(),
                value: ExpectedValue::Any,
            }],
            consent: vec![ConsentExpectation {
                signal: "ad_storage".into(),
                state: ConsentState::Denied,
            }],
        };

        validate(&mut cp, &expectations).unwrap();

        let outcome = cp.validation.as_ref().unwrap();
        assert_eq!(outcome.passed.len() + outcome.failed.len(), expectations.len());
        assert_eq!(expectations.len(), 5);
    }

    #[test]
    fn wildcard_passes_on_presence_regardless_of_value() {
        let mut cp = checkpoint();
        cp.variables.insert("txn_id".into(), variable("A123"));
        let expectations = ExpectationSet {
            variables: vec![VariableExpectation {
                name: "txn_id".into(),
                value: "*".to_string().into(),
            }],
            ..Default::default()
        };

        validate(&mut cp, &expectations).unwrap();

        let outcome = cp.validation.as_ref().unwrap();
        assert_eq!(outcome.passed, vec!["Variable exists: txn_id"]);
        assert!(outcome.failed.is_empty());
    }

    #[test]
    fn literal_mismatch_message_cites_both_values() {
        let mut cp = checkpoint();
        cp.variables.insert("txn_id".into(), variable("A123"));
        let expectations = ExpectationSet {
            variables: vec![VariableExpectation {
                name: "txn_id".into(),
                value: ExpectedValue::Literal("B999".into()),
            }],
            ..Default::default()
        };

        validate(&mut cp, &expectations).unwrap();

        let outcome = cp.validation.as_ref().unwrap();
        assert!(outcome.passed.is_empty());
        assert_eq!(outcome.failed.len(), 1);
        assert!(outcome.failed[0].contains("A123"));
        assert!(outcome.failed[0].contains("B999"));
    }

    #[test]
    fn missing_variable_is_distinguished_from_mismatch() {
        let mut cp = checkpoint();
        let expectations = ExpectationSet {
            variables: vec![VariableExpectation {
                name: "txn_id".into(),
                value: ExpectedValue::Literal("B999".into()),
            }],
            ..Default::default()
        };

        validate(&mut cp, &expectations).unwrap();

        let outcome = cp.validation.as_ref().unwrap();
        assert_eq!(outcome.failed, vec!["Variable missing: txn_id (expected: B999)"]);
    }

    // The wildcard sentinel is the literal string `*`, so a variable whose
    // captured value is literally `*` cannot be asserted literally: the
    // expectation parses as a presence check. Known edge case, preserved.
    #[test]
    fn wildcard_shadows_literal_star_value() {
        let mut cp = checkpoint();
        cp.variables.insert("sep".into(), variable("*"));
        let expectations = ExpectationSet {
            variables: vec![VariableExpectation {
                name: "sep".into(),
                value: "*".to_string().into(),
            }],
            ..Default::default()
        };

        validate(&mut cp, &expectations).unwrap();

        let outcome = cp.validation.as_ref().unwrap();
        assert_eq!(outcome.passed, vec!["Variable exists: sep"]);
    }

    #[test]
    fn unobserved_consent_signal_defaults_to_unknown() {
        let mut cp = checkpoint();
        let expectations = ExpectationSet {
            consent: vec![ConsentExpectation {
                signal: "ad_storage".into(),
                state: ConsentState::Denied,
            }],
            ..Default::default()
        };

        validate(&mut cp, &expectations).unwrap();

        let outcome = cp.validation.as_ref().unwrap();
        assert_eq!(
            outcome.failed,
            vec!["Consent mismatch: ad_storage (expected: denied, got: unknown)"]
        );
    }

    #[test]
    fn expecting_unknown_consent_passes_when_unobserved() {
        let mut cp = checkpoint();
        let expectations = ExpectationSet {
            consent: vec![ConsentExpectation {
                signal: "ad_storage".into(),
                state: ConsentState::Unknown,
            }],
            ..Default::default()
        };

        validate(&mut cp, &expectations).unwrap();

        let outcome = cp.validation.as_ref().unwrap();
        assert_eq!(outcome.passed, vec!["Consent: ad_storage=unknown"]);
    }

    #[test]
    fn assertions_follow_dimension_then_declaration_order() {
        let mut cp = checkpoint();
        cp.tags_fired.push(fired("T1"));
        cp.datalayer.push(event(0, "E1"));
        cp.variables.insert("V1".into(), variable("x"));
        cp.consent.insert("analytics_storage".into(), ConsentState::Granted);

        let expectations = ExpectationSet {
            tags: vec!["T1".into()],
            events: vec!["E1".into()],
            variables: vec![VariableExpectation {
                name: "V1".into(),
                value: ExpectedValue::Any,
            }],
            consent: vec![ConsentExpectation {
                signal: "analytics_storage".into(),
                state: ConsentState::Granted,
            }],
        };

        validate(&mut cp, &expectations).unwrap();

        let outcome = cp.validation.as_ref().unwrap();
        assert_eq!(
            outcome.passed,
            vec![
                "Tag fired: T1",
                "Event found: E1",
                "Variable exists: V1",
                "Consent: analytics_storage=granted",
            ]
        );
    }

    #[test]
    fn unexpected_observations_produce_no_assertions() {
        let mut cp = checkpoint();
        cp.tags_fired.push(fired("Surprise Tag"));
        cp.datalayer.push(event(0, "surprise_event"));

        let expectations = ExpectationSet {
            tags: vec!["Expected Tag".into()],
            ..Default::default()
        };

        validate(&mut cp, &expectations).unwrap();

        let outcome = cp.validation.as_ref().unwrap();
        assert_eq!(outcome.passed.len() + outcome.failed.len(), 1);
        assert_eq!(outcome.failed, vec!["Tag NOT fired: Expected Tag"]);
    }

    #[test]
    fn second_validation_pass_is_an_error() {
        let mut cp = checkpoint();
        validate(&mut cp, &ExpectationSet::default()).unwrap();

        let err = validate(&mut cp, &ExpectationSet::default()).unwrap_err();
        assert!(matches!(err, MonitorError::AlreadyValidated(_)));

        // The first outcome is untouched.
        assert_eq!(cp.validation, Some(ValidationOutcome::default()));
    }

    #[test]
    fn end_to_end_scenario_passes_three_assertions() {
        let mut cp = checkpoint();
        cp.tags_fired.push(fired("GA4 - Page View"));
        cp.datalayer.push(event(0, "gtm.js"));
        cp.datalayer.push(event(1, "page_view"));
        cp.consent.insert("analytics_storage".into(), ConsentState::Granted);

        let expectations = ExpectationSet {
            tags: vec!["GA4 - Page View".into()],
            events: vec!["page_view".into()],
            variables: Vec::new(),
            consent: vec![ConsentExpectation {
                signal: "analytics_storage".into(),
                state: ConsentState::Granted,
            }],
        };

        validate(&mut cp, &expectations).unwrap();

        let outcome = cp.validation.as_ref().unwrap();
        assert_eq!(outcome.passed.len(), 3);
        assert!(outcome.failed.is_empty());
    }
}
