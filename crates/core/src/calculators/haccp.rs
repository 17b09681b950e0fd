//! HACCP critical-control-point decision tree.
//!
//! The node set and edges encode food-safety judgment and are fixed data;
//! traversal is a small state machine over them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecisionTreeError {
    #[error("node {0} is a result; there is no question to answer")]
    AtTerminal(&'static str),

    #[error("already at the first question")]
    AtStart,

    #[error("unknown decision node {0}")]
    UnknownNode(String),

    #[error("path must begin at {expected}, found {found}")]
    WrongStart { expected: &'static str, found: String },

    #[error("no edge from {from} to {to}")]
    NoEdge { from: &'static str, to: String },
}

/// Classification reached at a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlPoint {
    #[serde(rename = "CCP")]
    Ccp,
    #[serde(rename = "CP")]
    Cp,
    #[serde(rename = "Not Control Point")]
    NotControlPoint,
}

impl ControlPoint {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ControlPoint::Ccp => "CCP",
            ControlPoint::Cp => "CP",
            ControlPoint::NotControlPoint => "Not Control Point",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum NodeKind {
    Question { yes: &'static str, no: &'static str },
    Result { result: ControlPoint },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecisionNode {
    pub id: &'static str,
    pub question: &'static str,
    pub explanation: &'static str,
    pub kind: NodeKind,
    pub examples: &'static [&'static str],
}

impl DecisionNode {
    #[must_use]
    pub fn result(&self) -> Option<ControlPoint> {
        match self.kind {
            NodeKind::Result { result } => Some(result),
            NodeKind::Question { .. } => None,
        }
    }

    fn successor(&self, answer: Answer) -> Option<&'static str> {
        match (self.kind, answer) {
            (NodeKind::Question { yes, .. }, Answer::Yes) => Some(yes),
            (NodeKind::Question { no, .. }, Answer::No) => Some(no),
            (NodeKind::Result { .. }, _) => None,
        }
    }
}

const fn question(
    id: &'static str,
    question: &'static str,
    explanation: &'static str,
    yes: &'static str,
    no: &'static str,
    examples: &'static [&'static str],
) -> DecisionNode {
    DecisionNode {
        id,
        question,
        explanation,
        kind: NodeKind::Question { yes, no },
        examples,
    }
}

const fn leaf(
    id: &'static str,
    result: ControlPoint,
    explanation: &'static str,
    examples: &'static [&'static str],
) -> DecisionNode {
    DecisionNode {
        id,
        question: "",
        explanation,
        kind: NodeKind::Result { result },
        examples,
    }
}

const START: &str = "start";

static HACCP_NODES: [DecisionNode; 9] = [
    question(
        START,
        "Are preventive measures in place for this hazard?",
        "Preventive measures are actions taken to prevent or minimize hazards.",
        "q1",
        "modify",
        &[
            "Temperature controls for drying",
            "Cleaning procedures for equipment",
            "Supplier qualification programs",
        ],
    ),
    question(
        "modify",
        "Can the step be modified to include preventive measures?",
        "Consider if you can add controls or modify the process to address the hazard.",
        "q1",
        "not_cp",
        &[
            "Add temperature monitoring to drying process",
            "Install metal detection equipment",
            "Implement visual inspection procedures",
        ],
    ),
    question(
        "q1",
        "Is control at this step necessary to prevent, eliminate, or reduce the hazard?",
        "This step must be essential for safety - without it, the hazard would remain uncontrolled.",
        "q2",
        "cp",
        &[
            "Heat treatment to eliminate pathogens",
            "Metal detection before packaging",
            "pH adjustment to prevent bacterial growth",
        ],
    ),
    question(
        "q2",
        "Could contamination occur at unacceptable levels?",
        "Consider if hazards could increase to dangerous levels at this step.",
        "q3",
        "cp",
        &[
            "Microbial growth during storage",
            "Cross-contamination during handling",
            "Chemical contamination from cleaning agents",
        ],
    ),
    question(
        "q3",
        "Will a subsequent step eliminate or reduce the hazard?",
        "Check if later process steps will adequately control this hazard.",
        "cp",
        "q4",
        &[
            "Heat treatment after mixing",
            "Final testing before packaging",
            "Filtration in downstream processing",
        ],
    ),
    question(
        "q4",
        "Will a subsequent step reduce the hazard to acceptable levels?",
        "Even if not eliminated, will later steps make the hazard acceptable?",
        "cp",
        "ccp",
        &[
            "Partial reduction through processing",
            "Dilution in final formulation",
            "Testing that catches most issues",
        ],
    ),
    leaf(
        "ccp",
        ControlPoint::Ccp,
        "This is a Critical Control Point (CCP). Establish critical limits, monitoring, and corrective actions.",
        &[
            "Final product testing for potency",
            "Metal detection before packaging",
            "Temperature control during extraction",
        ],
    ),
    leaf(
        "cp",
        ControlPoint::Cp,
        "This is a Control Point (CP). Important for quality but not critical for safety.",
        &[
            "Visual inspection for defects",
            "Weight checks during filling",
            "Label verification processes",
        ],
    ),
    leaf(
        "not_cp",
        ControlPoint::NotControlPoint,
        "This step is not a control point. Consider if the process needs modification.",
        &[
            "Administrative record keeping",
            "Storage of finished products",
            "Routine equipment maintenance",
        ],
    ),
];

/// A process hazard walked through the tree in the course material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkedExample {
    pub process: &'static str,
    pub hazard: &'static str,
    pub steps: &'static [&'static str],
    pub result: ControlPoint,
}

pub static WORKED_EXAMPLES: [WorkedExample; 3] = [
    WorkedExample {
        process: "Drying Process",
        hazard: "Mold growth due to excessive moisture",
        steps: &["start", "q1", "q2", "q3", "q4", "ccp"],
        result: ControlPoint::Ccp,
    },
    WorkedExample {
        process: "Extraction Process",
        hazard: "Residual solvents above safe limits",
        steps: &["start", "q1", "q2", "q3", "q4", "ccp"],
        result: ControlPoint::Ccp,
    },
    WorkedExample {
        process: "Packaging Process",
        hazard: "Foreign material contamination",
        steps: &["start", "q1", "q2", "q3", "q4", "cp"],
        result: ControlPoint::Cp,
    },
];

/// Handle on a fixed decision graph.
#[derive(Debug, Clone, Copy)]
pub struct DecisionTree {
    nodes: &'static [DecisionNode],
    start: &'static str,
}

impl DecisionTree {
    /// The HACCP CCP determination tree.
    #[must_use]
    pub fn haccp() -> Self {
        Self {
            nodes: &HACCP_NODES,
            start: START,
        }
    }

    #[must_use]
    pub fn nodes(&self) -> &'static [DecisionNode] {
        self.nodes
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&'static DecisionNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn start_node(&self) -> &'static DecisionNode {
        // `start` always names an entry of `nodes`
        self.node(self.start).unwrap_or(&self.nodes[0])
    }

    /// Begin a walk at the first question.
    #[must_use]
    pub fn traverse(&self) -> Traversal {
        Traversal {
            tree: *self,
            path: vec![self.start_node()],
        }
    }

    /// Rebuild a walk from a recorded node path, checking every edge.
    ///
    /// # Errors
    ///
    /// Returns `DecisionTreeError` if the path does not start at the first
    /// question, names an unknown node, or follows a missing edge.
    pub fn replay<S: AsRef<str>>(&self, steps: &[S]) -> Result<Traversal, DecisionTreeError> {
        let mut traversal = self.traverse();
        let mut steps = steps.iter().map(AsRef::<str>::as_ref);

        match steps.next() {
            Some(first) if first == self.start => {}
            Some(other) => {
                return Err(DecisionTreeError::WrongStart {
                    expected: self.start,
                    found: other.to_owned(),
                });
            }
            None => return Ok(traversal),
        }

        for step in steps {
            let target = self
                .node(step)
                .ok_or_else(|| DecisionTreeError::UnknownNode(step.to_owned()))?;
            let current = traversal.current();
            let answer = [Answer::Yes, Answer::No]
                .into_iter()
                .find(|a| current.successor(*a) == Some(target.id))
                .ok_or_else(|| DecisionTreeError::NoEdge {
                    from: current.id,
                    to: step.to_owned(),
                })?;
            traversal.answer(answer)?;
        }
        Ok(traversal)
    }
}

/// Position in a decision tree plus the nodes visited to get there.
#[derive(Debug, Clone)]
pub struct Traversal {
    tree: DecisionTree,
    path: Vec<&'static DecisionNode>,
}

impl Traversal {
    #[must_use]
    pub fn current(&self) -> &'static DecisionNode {
        // path always holds at least the start node
        self.path
            .last()
            .copied()
            .unwrap_or_else(|| self.tree.start_node())
    }

    /// Visited node ids, first to current.
    #[must_use]
    pub fn path(&self) -> Vec<&'static str> {
        self.path.iter().map(|n| n.id).collect()
    }

    /// 1-based step number of the current node.
    #[must_use]
    pub fn step(&self) -> usize {
        self.path.len()
    }

    #[must_use]
    pub fn result(&self) -> Option<ControlPoint> {
        self.current().result()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.result().is_some()
    }

    /// Follow the yes or no edge of the current question.
    ///
    /// # Errors
    ///
    /// Returns `DecisionTreeError::AtTerminal` once a result is reached, and
    /// `DecisionTreeError::UnknownNode` if the graph names a missing node.
    pub fn answer(&mut self, answer: Answer) -> Result<&'static DecisionNode, DecisionTreeError> {
        let current = self.current();
        let next_id = current
            .successor(answer)
            .ok_or(DecisionTreeError::AtTerminal(current.id))?;
        let next = self
            .tree
            .node(next_id)
            .ok_or_else(|| DecisionTreeError::UnknownNode(next_id.to_owned()))?;
        self.path.push(next);
        Ok(next)
    }

    /// Undo the last answer.
    ///
    /// # Errors
    ///
    /// Returns `DecisionTreeError::AtStart` when nothing has been answered.
    pub fn back(&mut self) -> Result<&'static DecisionNode, DecisionTreeError> {
        if self.path.len() <= 1 {
            return Err(DecisionTreeError::AtStart);
        }
        self.path.pop();
        Ok(self.current())
    }

    /// Return to the first question and clear the history.
    pub fn reset(&mut self) {
        self.path.truncate(1);
    }
}
