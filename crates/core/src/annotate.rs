//! Annotation plan derivation and the renderer boundary
//!
//! The pipeline exposes exactly one interface for visual annotation: a list
//! of callouts derived from passed assertions whose subject carried a
//! bounding box. Rendering is a collaborator concern behind [`Annotator`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::checkpoint::Checkpoint;
use crate::config::{ExpectationSet, ExpectedValue};
use crate::error::Result;

/// Which side of the target the arrow approaches from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrowDirection {
    Left,
    Right,
    Top,
    Bottom,
}

/// One arrow-and-label annotation aimed at a screen position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Callout {
    pub x: i64,
    pub y: i64,
    pub label: String,
    pub success: bool,
    pub direction: ArrowDirection,
}

/// Derive the callouts for a checkpoint: expected tags that fired (arrow
/// from the left) and expected variables that were present with the
/// expected value (arrow from the right). Subjects without a bounding box
/// are skipped; consent and events carry no screen position.
pub fn annotation_plan(checkpoint: &Checkpoint, expectations: &ExpectationSet) -> Vec<Callout> {
    let mut plan = Vec::new();

    for expected in &expectations.tags {
        let Some(tag) = checkpoint.tags_fired.iter().find(|t| &t.name == expected) else {
            continue;
        };
        let Some(bounding_box) = &tag.bounding_box else {
            continue;
        };
        let (x, y) = bounding_box.center();
        plan.push(Callout {
            x,
            y,
            label: format!("{} fired", tag.name),
            success: true,
            direction: ArrowDirection::Left,
        });
    }

    for expectation in &expectations.variables {
        let Some(variable) = checkpoint.variables.get(&expectation.name) else {
            continue;
        };
        let passed = match &expectation.value {
            ExpectedValue::Any => true,
            ExpectedValue::Literal(expected) => {
                variable.value.as_deref() == Some(expected.as_str())
            }
        };
        if !passed {
            continue;
        }
        let Some(bounding_box) = &variable.bounding_box else {
            continue;
        };
        let (x, y) = bounding_box.center();
        plan.push(Callout {
            x,
            y,
            label: format!(
                "{} = {}",
                expectation.name,
                variable.value.as_deref().unwrap_or("(none)")
            ),
            success: true,
            direction: ArrowDirection::Right,
        });
    }

    plan
}

/// Renders callouts onto a screenshot and returns the annotated copy's
/// path. The session runner stores that path back on the checkpoint;
/// rendering failures are advisory and never abort a session.
pub trait Annotator: Send + Sync {
    fn annotate(&self, screenshot: &Path, callouts: &[Callout]) -> Result<PathBuf>;
}
