//! Lane configuration and the heuristic that places uncategorized elements.

use serde::{Deserialize, Serialize};

use crate::model::{ElementType, ProcessElement};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, schemars::JsonSchema)]
pub struct LaneSpec {
    pub id: String,
    pub name: String,
}

impl LaneSpec {
    fn new(id: &str, name: &str) -> Self {
        LaneSpec {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

/// The four lanes the normalizer fabricates and assigns into.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(default)]
pub struct LaneSet {
    pub planning: LaneSpec,
    pub execution: LaneSpec,
    pub review: LaneSpec,
    pub completion: LaneSpec,
}

impl Default for LaneSet {
    fn default() -> Self {
        LaneSet {
            planning: LaneSpec::new("Lane_Planning", "Planning & Initiation"),
            execution: LaneSpec::new("Lane_Execution", "Development & Execution"),
            review: LaneSpec::new("Lane_Review", "Review & Quality Control"),
            completion: LaneSpec::new("Lane_Completion", "Completion & Delivery"),
        }
    }
}

impl LaneSet {
    /// Fixed order used for fabrication and round-robin placement.
    pub fn ordered(&self) -> [&LaneSpec; 4] {
        [&self.planning, &self.execution, &self.review, &self.completion]
    }

    pub fn get(&self, role: LaneRole) -> &LaneSpec {
        match role {
            LaneRole::Planning => &self.planning,
            LaneRole::Execution => &self.execution,
            LaneRole::Review => &self.review,
            LaneRole::Completion => &self.completion,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneRole {
    Planning,
    Execution,
    Review,
    Completion,
}

impl LaneRole {
    pub const ORDER: [LaneRole; 4] = [
        LaneRole::Planning,
        LaneRole::Execution,
        LaneRole::Review,
        LaneRole::Completion,
    ];

    /// First matching rule wins. `None` means no rule matched and the caller
    /// falls back to round-robin.
    pub fn classify(element: &ProcessElement) -> Option<LaneRole> {
        let ty = element.element_type();
        let name = element.name.to_lowercase();

        if ty == ElementType::StartEvent || name.contains("start") {
            Some(LaneRole::Planning)
        } else if ty == ElementType::EndEvent || name.contains("complete") {
            Some(LaneRole::Completion)
        } else if ty == ElementType::ExclusiveGateway || name.contains('?') {
            Some(LaneRole::Review)
        } else if name.contains("develop") || name.contains("implement") {
            Some(LaneRole::Execution)
        } else {
            None
        }
    }

    pub fn round_robin(index: usize) -> LaneRole {
        Self::ORDER[index % Self::ORDER.len()]
    }
}
