//! Manifest model — actions, stages, steps, and validation.
//!
//! This is the in-memory representation of `.project.yml`. It is deliberately
//! dumb: deserialization maps YAML directly onto these types, and
//! [`Manifest::validate`] is the single place that enforces the invariants
//! `spec.md` §4.1 lists. Nothing past `validate()` re-checks them — the
//! scheduler and graph builder trust a validated manifest.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::VersionKind;

/// Errors produced while validating a [`Manifest`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// `project.name` was empty.
    #[error("project name must not be empty")]
    EmptyProjectName,

    /// An action had an empty `name`.
    #[error("action at index {0} has an empty name")]
    EmptyActionName(usize),

    /// Two actions shared the same name.
    #[error("duplicate action name: {0}")]
    DuplicateAction(String),

    /// An action had neither or both of `run`/`uses`.
    #[error("action '{0}' must set exactly one of `run` or `uses`")]
    AmbiguousAction(String),

    /// A stage had zero steps.
    #[error("stage '{0}' has no steps")]
    EmptyStage(String),

    /// A step referenced an action that doesn't exist.
    #[error("stage '{stage}' step references unknown action '{action}'")]
    UnknownAction {
        /// Stage containing the offending step.
        stage: String,
        /// The missing action name.
        action: String,
    },

}

/// Result alias for manifest validation.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// The root manifest document, `.project.yml`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Manifest {
    /// Project metadata.
    pub project: Project,
    /// Reusable actions, referenced by name from stage steps.
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Named, ordered sequences of steps.
    #[serde(default)]
    pub stages: BTreeMap<String, Stage>,
}

/// Project metadata block.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Project {
    /// Project name, used in reporter output.
    pub name: String,
    /// Ordered list of module names (e.g., workspace crates) this project
    /// spans. Surfaced to actions as `module`/`modules` interpolation keys.
    pub modules: Vec<String>,
    /// Optional directory containing built binaries, surfaced to actions
    /// that need to locate compiled artifacts.
    #[serde(default)]
    pub bin_dir: Option<String>,
}

/// A named unit of work: either a shell script or a built-in identifier.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Action {
    /// Unique name, referenced by [`Step::action`].
    pub name: String,
    /// Inline multi-line shell script. Mutually exclusive with `uses`.
    #[serde(default)]
    pub run: Option<String>,
    /// Built-in identifier (e.g. `git@untracked`). Mutually exclusive with `run`.
    #[serde(default)]
    pub uses: Option<String>,
}

/// The resolved body of an [`Action`] after the `run`/`uses` exclusivity
/// check has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind<'a> {
    /// A shell script to interpolate and execute.
    Run(&'a str),
    /// A built-in identifier to dispatch through the registry.
    Uses(&'a str),
}

impl Action {
    /// Classify this action as [`ActionKind::Run`] or [`ActionKind::Uses`].
    ///
    /// Returns `None` if the action is ambiguous (both or neither set) —
    /// callers that run after [`Manifest::validate`] can `expect` this.
    #[must_use]
    pub fn kind(&self) -> Option<ActionKind<'_>> {
        match (&self.run, &self.uses) {
            (Some(run), None) => Some(ActionKind::Run(run)),
            (None, Some(uses)) => Some(ActionKind::Uses(uses)),
            _ => None,
        }
    }
}

/// A named, ordered sequence of [`Step`]s.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Stage {
    /// Steps in declaration order — the sole ordering key for display.
    pub steps: Vec<Step>,
}

/// One entry in a [`Stage`]: an action reference plus scheduling metadata.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Step {
    /// The [`Action::name`] this step runs.
    pub action: String,
    /// Action names that must complete with non-error status before this
    /// step may run.
    #[serde(default)]
    pub require: BTreeSet<String>,
    /// Failure policy: `stop` (default) propagates SKIPPED to dependents,
    /// `warn` demotes ERROR to WARN and never propagates.
    #[serde(default)]
    pub on_error: OnError,
    /// Optional predicate evaluated against the Variable Context.
    #[serde(default)]
    pub r#if: Option<String>,
    /// Optional set of version kinds this step is restricted to.
    #[serde(default)]
    pub only: Option<BTreeSet<VersionKind>>,
}

/// Failure policy for a [`Step`].
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// An ERROR result propagates SKIPPED to every dependent step.
    #[default]
    Stop,
    /// An ERROR result is demoted to WARN and never propagates.
    Warn,
}

impl Manifest {
    /// Validate every invariant `spec.md` §4.1 lists. Called once at load
    /// time; nothing downstream re-checks these.
    pub fn validate(&self) -> ManifestResult<()> {
        if self.project.name.trim().is_empty() {
            return Err(ManifestError::EmptyProjectName);
        }

        let mut seen = BTreeSet::new();
        for (index, action) in self.actions.iter().enumerate() {
            if action.name.trim().is_empty() {
                return Err(ManifestError::EmptyActionName(index));
            }
            if !seen.insert(action.name.as_str()) {
                return Err(ManifestError::DuplicateAction(action.name.clone()));
            }
            if action.kind().is_none() {
                return Err(ManifestError::AmbiguousAction(action.name.clone()));
            }
        }

        for (stage_name, stage) in &self.stages {
            if stage.steps.is_empty() {
                return Err(ManifestError::EmptyStage(stage_name.clone()));
            }

            for step in &stage.steps {
                if self.get_action(&step.action).is_none() {
                    return Err(ManifestError::UnknownAction {
                        stage: stage_name.clone(),
                        action: step.action.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Look up an action by name.
    #[must_use]
    pub fn get_action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name == name)
    }

    /// Look up a stage by name.
    #[must_use]
    pub fn get_stage(&self, name: &str) -> Option<&Stage> {
        self.stages.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(name: &str, run: Option<&str>, uses: Option<&str>) -> Action {
        Action {
            name: name.to_string(),
            run: run.map(str::to_string),
            uses: uses.map(str::to_string),
        }
    }

    fn step(action: &str, require: &[&str]) -> Step {
        Step {
            action: action.to_string(),
            require: require.iter().map(|s| (*s).to_string()).collect(),
            on_error: OnError::Stop,
            r#if: None,
            only: None,
        }
    }

    fn base_manifest() -> Manifest {
        let mut stages = BTreeMap::new();
        stages.insert(
            "pre-push".to_string(),
            Stage {
                steps: vec![step("a", &[])],
            },
        );
        Manifest {
            project: Project {
                name: "demo".to_string(),
                modules: vec!["demo".to_string()],
                bin_dir: None,
            },
            actions: vec![action("a", Some("true"), None)],
            stages,
        }
    }

    #[test]
    fn valid_manifest_passes() {
        assert!(base_manifest().validate().is_ok());
    }

    #[test]
    fn empty_project_name_rejected() {
        let mut m = base_manifest();
        m.project.name = String::new();
        assert_eq!(m.validate(), Err(ManifestError::EmptyProjectName));
    }

    #[test]
    fn empty_action_name_rejected() {
        let mut m = base_manifest();
        m.actions.push(action("", Some("true"), None));
        assert_eq!(m.validate(), Err(ManifestError::EmptyActionName(1)));
    }

    #[test]
    fn duplicate_action_rejected() {
        let mut m = base_manifest();
        m.actions.push(action("a", Some("true"), None));
        assert_eq!(
            m.validate(),
            Err(ManifestError::DuplicateAction("a".to_string()))
        );
    }

    #[test]
    fn action_with_both_run_and_uses_rejected() {
        let mut m = base_manifest();
        m.actions[0].uses = Some("git@untracked".to_string());
        assert_eq!(
            m.validate(),
            Err(ManifestError::AmbiguousAction("a".to_string()))
        );
    }

    #[test]
    fn action_with_neither_run_nor_uses_rejected() {
        let mut m = base_manifest();
        m.actions[0].run = None;
        assert_eq!(
            m.validate(),
            Err(ManifestError::AmbiguousAction("a".to_string()))
        );
    }

    #[test]
    fn empty_stage_rejected() {
        let mut m = base_manifest();
        m.stages.insert("empty".to_string(), Stage::default());
        assert_eq!(
            m.validate(),
            Err(ManifestError::EmptyStage("empty".to_string()))
        );
    }

    #[test]
    fn unknown_action_reference_rejected() {
        let mut m = base_manifest();
        m.stages
            .get_mut("pre-push")
            .unwrap()
            .steps
            .push(step("missing", &[]));
        assert_eq!(
            m.validate(),
            Err(ManifestError::UnknownAction {
                stage: "pre-push".to_string(),
                action: "missing".to_string(),
            })
        );
    }

    #[test]
    fn get_action_and_stage_lookup() {
        let m = base_manifest();
        assert!(m.get_action("a").is_some());
        assert!(m.get_action("nope").is_none());
        assert!(m.get_stage("pre-push").is_some());
        assert!(m.get_stage("nope").is_none());
    }

    #[test]
    fn action_kind_classification() {
        assert_eq!(
            action("a", Some("true"), None).kind(),
            Some(ActionKind::Run("true"))
        );
        assert_eq!(
            action("a", None, Some("git@untracked")).kind(),
            Some(ActionKind::Uses("git@untracked"))
        );
        assert_eq!(action("a", None, None).kind(), None);
        assert_eq!(
            action("a", Some("true"), Some("git@untracked")).kind(),
            None
        );
    }
}
