//! Category normalization: every element ends up in exactly one existing lane.

use std::collections::HashSet;

use tracing::debug;

use crate::model::{ProcessDefinition, RawProcessDefinition, Swimlane};
use crate::rules::{LaneRole, LaneSet, LaneSpec};

/// What a normalization pass changed. Diagnostic only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Elements whose lane was missing or pointed at an unknown lane
    pub reassigned: usize,
    /// True when the input had no lanes and the configured set was fabricated
    pub fabricated_lanes: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    lanes: LaneSet,
}

impl Normalizer {
    pub fn new(lanes: LaneSet) -> Self {
        Normalizer { lanes }
    }

    pub fn lanes(&self) -> &LaneSet {
        &self.lanes
    }

    pub fn normalize(&self, raw: RawProcessDefinition) -> ProcessDefinition {
        self.normalize_with_report(raw).0
    }

    pub fn normalize_with_report(
        &self,
        raw: RawProcessDefinition,
    ) -> (ProcessDefinition, NormalizeReport) {
        let mut report = NormalizeReport::default();

        let mut swimlanes = raw.swimlanes;
        if swimlanes.is_empty() {
            swimlanes = self.lanes.ordered().into_iter().map(empty_lane).collect();
            report.fabricated_lanes = true;
        }

        // Partition against the lanes that existed before any assignment.
        let known: HashSet<String> = swimlanes.iter().map(|s| s.id.clone()).collect();
        let mut elements = raw.elements;
        let categorized: Vec<bool> = elements
            .iter()
            .map(|e| e.lane.as_deref().is_some_and(|l| known.contains(l)))
            .collect();

        let mut uncategorized_index = 0;
        for (element, is_categorized) in elements.iter_mut().zip(categorized) {
            if is_categorized {
                continue;
            }
            let role = LaneRole::classify(element)
                .unwrap_or_else(|| LaneRole::round_robin(uncategorized_index));
            uncategorized_index += 1;

            let spec = self.lanes.get(role);
            if !swimlanes.iter().any(|s| s.id == spec.id) {
                swimlanes.push(empty_lane(spec));
            }
            element.lane = Some(spec.id.clone());
            report.reassigned += 1;
        }

        for lane in &mut swimlanes {
            lane.elements = elements
                .iter()
                .filter(|e| e.lane.as_deref() == Some(lane.id.as_str()))
                .map(|e| e.id.clone())
                .collect();
        }

        debug!(
            reassigned = report.reassigned,
            fabricated_lanes = report.fabricated_lanes,
            lanes = swimlanes.len(),
            "normalized process definition"
        );

        let def = ProcessDefinition {
            id: raw.id,
            elements,
            flows: raw.flows.unwrap_or_default(),
            swimlanes,
        };
        (def, report)
    }
}

fn empty_lane(spec: &LaneSpec) -> Swimlane {
    Swimlane {
        id: spec.id.clone(),
        name: spec.name.clone(),
        elements: Vec::new(),
    }
}

/// Normalize with the default lane set.
pub fn normalize(raw: RawProcessDefinition) -> ProcessDefinition {
    Normalizer::default().normalize(raw)
}
