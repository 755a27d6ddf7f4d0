//! Graph Builder — turns a [`Stage`]'s steps into a dependency graph.
//!
//! Nodes are stored in a `Vec` in declaration order, so a node's index
//! *is* its declaration index: the scheduler's display cursor (`spec.md`
//! §4.4) just walks this vector in order, no separate index map needed.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::manifest::{Action, Manifest, Stage, Step};

/// Errors from building a dependency graph out of a stage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A step's `action` is not defined in the manifest.
    #[error("unknown action '{0}' referenced by a step")]
    UnknownAction(String),

    /// A step's `require` entry is not a step in the same stage.
    #[error("step for action '{step}' requires unknown action '{require}'")]
    UnknownRequire {
        /// The step doing the requiring.
        step: String,
        /// The missing requirement.
        require: String,
    },

    /// The stage's `require` edges form a cycle.
    #[error("dependency cycle detected at action '{0}'")]
    Cycle(String),
}

/// Result alias for graph construction.
pub type GraphResult<T> = Result<T, GraphError>;

/// One vertex in the dependency graph: a resolved action, its originating
/// step, and the edges into its prerequisites (by node index).
#[derive(Debug, Clone)]
pub struct Node<'a> {
    /// Declaration index — this node's position in the stage's step list,
    /// and the sole ordering key for display.
    pub declaration_index: usize,
    /// The resolved action this node runs.
    pub action: &'a Action,
    /// The originating step (for `on_error`, `if`, `only`).
    pub step: &'a Step,
    /// Indices, into the owning [`Graph::nodes`], of this node's
    /// prerequisites.
    pub requires: Vec<usize>,
}

/// A directed dependency graph built from one [`Stage`].
#[derive(Debug, Clone)]
pub struct Graph<'a> {
    /// Nodes in declaration order.
    pub nodes: Vec<Node<'a>>,
}

/// Build the dependency graph for `stage`, resolving action and `require`
/// references against `manifest` and checking for cycles.
pub fn build_graph<'a>(stage: &'a Stage, manifest: &'a Manifest) -> GraphResult<Graph<'a>> {
    // Map each step's action name to its declaration index, so `require`
    // entries (which name actions, not steps) resolve to node indices.
    let mut index_by_action: BTreeMap<&str, usize> = BTreeMap::new();
    for (index, step) in stage.steps.iter().enumerate() {
        index_by_action.insert(step.action.as_str(), index);
    }

    let mut nodes = Vec::with_capacity(stage.steps.len());
    for (index, step) in stage.steps.iter().enumerate() {
        let action = manifest
            .get_action(&step.action)
            .ok_or_else(|| GraphError::UnknownAction(step.action.clone()))?;

        let mut requires = Vec::with_capacity(step.require.len());
        for requirement in &step.require {
            let dep_index = index_by_action.get(requirement.as_str()).copied().ok_or_else(|| {
                GraphError::UnknownRequire {
                    step: step.action.clone(),
                    require: requirement.clone(),
                }
            })?;
            requires.push(dep_index);
        }

        nodes.push(Node {
            declaration_index: index,
            action,
            step,
            requires,
        });
    }

    let graph = Graph { nodes };
    detect_cycle(&graph)?;
    Ok(graph)
}

/// Depth-first cycle detection. Reports the first offending node found.
fn detect_cycle(graph: &Graph<'_>) -> GraphResult<()> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; graph.nodes.len()];

    fn visit(
        graph: &Graph<'_>,
        marks: &mut [Mark],
        node_index: usize,
    ) -> Result<(), GraphError> {
        match marks[node_index] {
            Mark::Done => return Ok(()),
            Mark::InProgress => {
                return Err(GraphError::Cycle(
                    graph.nodes[node_index].action.name.clone(),
                ));
            }
            Mark::Unvisited => {}
        }

        marks[node_index] = Mark::InProgress;
        for &dep in &graph.nodes[node_index].requires {
            visit(graph, marks, dep)?;
        }
        marks[node_index] = Mark::Done;
        Ok(())
    }

    for index in 0..graph.nodes.len() {
        visit(graph, &mut marks, index)?;
    }

    Ok(())
}
