//! BPMN 2.0 XML compilation, including the diagram-interchange section.
//!
//! Compilation is total and deterministic: malformed input degrades into empty
//! attributes, generic task shapes and missing edges rather than errors, and
//! the same input always yields the same bytes.

use std::collections::HashMap;
use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::model::{ElementType, ProcessDefinition, ProcessElement, RawProcessDefinition};
use crate::normalize::Normalizer;

const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const NAMESPACES: &str = r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:bpmn2="http://www.omg.org/spec/BPMN/20100524/MODEL" xmlns:bpmndi="http://www.omg.org/spec/BPMN/20100524/DI" xmlns:dc="http://www.omg.org/spec/DD/20100524/DC" xmlns:di="http://www.omg.org/spec/DD/20100524/DI""#;
const TARGET_NAMESPACE: &str = "http://bpmn.io/schema/bpmn";
const DEFAULT_DEFINITIONS_ID: &str = "Definitions_1";
const PROCESS_ID: &str = "Process_1";

/// Blank diagram with a single start event, imported whenever nothing better is available.
pub const DEFAULT_TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn2:definitions xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:bpmn2="http://www.omg.org/spec/BPMN/20100524/MODEL" xmlns:bpmndi="http://www.omg.org/spec/BPMN/20100524/DI" xmlns:dc="http://www.omg.org/spec/DD/20100524/DC" xmlns:di="http://www.omg.org/spec/DD/20100524/DI" xsi:schemaLocation="http://www.omg.org/spec/BPMN/20100524/MODEL BPMN20.xsd" id="sample-diagram" targetNamespace="http://bpmn.io/schema/bpmn">
  <bpmn2:process id="Process_1" isExecutable="false">
    <bpmn2:startEvent id="StartEvent_1"/>
  </bpmn2:process>
  <bpmndi:BPMNDiagram id="BPMNDiagram_1">
    <bpmndi:BPMNPlane id="BPMNPlane_1" bpmnElement="Process_1">
      <bpmndi:BPMNShape id="_BPMNShape_StartEvent_2" bpmnElement="StartEvent_1">
        <dc:Bounds height="36.0" width="36.0" x="412.0" y="240.0"/>
      </bpmndi:BPMNShape>
    </bpmndi:BPMNPlane>
  </bpmndi:BPMNDiagram>
</bpmn2:definitions>
"#;

const ROW_ORIGIN_X: i64 = 100;
const ROW_STEP_X: i64 = 200;
const ROW_Y: i64 = 150;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ShapeBounds {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Emit a `laneSet` listing lane membership inside the process
    pub emit_lane_set: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            emit_lane_set: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Compiler {
    normalizer: Normalizer,
    options: CompileOptions,
}

impl Compiler {
    pub fn new(normalizer: Normalizer, options: CompileOptions) -> Self {
        Compiler {
            normalizer,
            options,
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Normalize and compile in one step.
    pub fn compile(&self, raw: RawProcessDefinition) -> String {
        let def = self.normalizer.normalize(raw);
        self.compile_normalized(&def)
    }

    /// Compile a definition that has already been normalized.
    pub fn compile_normalized(&self, def: &ProcessDefinition) -> String {
        let bounds = layout(def);
        let mut out = String::with_capacity(1024 + def.elements.len() * 256);

        out.push_str(XML_HEADER);
        out.push('\n');
        let _ = writeln!(
            out,
            r#"<bpmn2:definitions {} id="{}" targetNamespace="{}">"#,
            NAMESPACES,
            escape_xml(def.id.as_deref().unwrap_or(DEFAULT_DEFINITIONS_ID)),
            TARGET_NAMESPACE
        );

        // --- Process ---
        let _ = writeln!(
            out,
            r#"  <bpmn2:process id="{}" isExecutable="false">"#,
            PROCESS_ID
        );
        if self.options.emit_lane_set {
            write_lane_set(&mut out, def);
        }
        for element in &def.elements {
            let _ = writeln!(
                out,
                r#"    <bpmn2:{} id="{}" name="{}" />"#,
                tag_for(element.element_type()),
                escape_xml(&element.id),
                escape_xml(&element.name)
            );
        }
        for flow in &def.flows {
            let _ = writeln!(
                out,
                r#"    <bpmn2:sequenceFlow id="{}" sourceRef="{}" targetRef="{}" name="{}" />"#,
                escape_xml(&flow.id),
                escape_xml(&flow.source_ref),
                escape_xml(&flow.target_ref),
                escape_xml(&flow.name)
            );
        }
        out.push_str("  </bpmn2:process>\n");

        // --- Diagram interchange ---
        out.push_str("  <bpmndi:BPMNDiagram id=\"BPMNDiagram_1\">\n");
        let _ = writeln!(
            out,
            r#"    <bpmndi:BPMNPlane id="BPMNPlane_1" bpmnElement="{}">"#,
            PROCESS_ID
        );
        for (element, b) in def.elements.iter().zip(&bounds) {
            let id = escape_xml(&element.id);
            let _ = writeln!(
                out,
                r#"      <bpmndi:BPMNShape id="{id}_di" bpmnElement="{id}">"#
            );
            let _ = writeln!(
                out,
                r#"        <dc:Bounds x="{}" y="{}" width="{}" height="{}" />"#,
                b.x, b.y, b.width, b.height
            );
            out.push_str("      </bpmndi:BPMNShape>\n");
        }

        // First occurrence wins when ids collide.
        let mut positions: HashMap<&str, ShapeBounds> = HashMap::new();
        for (element, b) in def.elements.iter().zip(&bounds) {
            positions.entry(element.id.as_str()).or_insert(*b);
        }
        for flow in &def.flows {
            let (Some(source), Some(target)) = (
                positions.get(flow.source_ref.as_str()),
                positions.get(flow.target_ref.as_str()),
            ) else {
                continue;
            };
            let id = escape_xml(&flow.id);
            let _ = writeln!(
                out,
                r#"      <bpmndi:BPMNEdge id="{id}_di" bpmnElement="{id}">"#
            );
            let _ = writeln!(
                out,
                r#"        <di:waypoint x="{}" y="{}" />"#,
                source.x + 50,
                source.y + 40
            );
            let _ = writeln!(
                out,
                r#"        <di:waypoint x="{}" y="{}" />"#,
                target.x,
                target.y + 40
            );
            out.push_str("      </bpmndi:BPMNEdge>\n");
        }

        out.push_str("    </bpmndi:BPMNPlane>\n");
        out.push_str("  </bpmndi:BPMNDiagram>\n");
        out.push_str("</bpmn2:definitions>\n");
        out
    }
}

fn write_lane_set(out: &mut String, def: &ProcessDefinition) {
    out.push_str("    <bpmn2:laneSet id=\"LaneSet_1\">\n");
    for lane in &def.swimlanes {
        let _ = writeln!(
            out,
            r#"      <bpmn2:lane id="{}" name="{}">"#,
            escape_xml(&lane.id),
            escape_xml(&lane.name)
        );
        for member in &lane.elements {
            let _ = writeln!(
                out,
                "        <bpmn2:flowNodeRef>{}</bpmn2:flowNodeRef>",
                escape_xml(member)
            );
        }
        out.push_str("      </bpmn2:lane>\n");
    }
    out.push_str("    </bpmn2:laneSet>\n");
}

/// Process-section tag for an element type.
pub fn tag_for(ty: ElementType) -> &'static str {
    match ty {
        ElementType::StartEvent => "startEvent",
        ElementType::EndEvent => "endEvent",
        ElementType::Task | ElementType::UserTask | ElementType::ServiceTask => "task",
        ElementType::ExclusiveGateway => "exclusiveGateway",
        ElementType::ParallelGateway => "parallelGateway",
        ElementType::IntermediateCatchEvent | ElementType::IntermediateThrowEvent => {
            "intermediateCatchEvent"
        }
        ElementType::Other => "task",
    }
}

fn shape_size(element: &ProcessElement) -> (i64, i64) {
    let ty = element.element_type();
    if ty.is_event_boundary() {
        (36, 36)
    } else if ty.is_gateway() {
        (50, 50)
    } else {
        (100, 80)
    }
}

/// Single-row placement by array index.
pub fn layout(def: &ProcessDefinition) -> Vec<ShapeBounds> {
    def.elements
        .iter()
        .enumerate()
        .map(|(i, element)| {
            let (width, height) = shape_size(element);
            ShapeBounds {
                x: ROW_ORIGIN_X + i as i64 * ROW_STEP_X,
                y: ROW_Y,
                width,
                height,
            }
        })
        .collect()
}

/// Escape an attribute value. Ampersand goes first so later entities are not doubled.
/// Tab, LF and CR become character references so attribute-value normalization
/// keeps them. Characters XML 1.0 cannot carry at all are dropped.
pub fn escape_xml(raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|&c| is_xml_char(c)).collect();
    cleaned
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
        .replace('\t', "&#9;")
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r')
        || ('\u{20}'..='\u{D7FF}').contains(&c)
        || ('\u{E000}'..='\u{FFFD}').contains(&c)
        || c >= '\u{10000}'
}

/// Normalize and compile with default lanes and options.
pub fn compile(raw: RawProcessDefinition) -> String {
    Compiler::default().compile(raw)
}
