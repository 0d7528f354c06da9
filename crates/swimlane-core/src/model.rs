use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;

// --- Types ---

/// The closed set of element kinds the compiler knows how to draw.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ElementType {
    StartEvent,
    EndEvent,
    Task,
    UserTask,
    ServiceTask,
    ExclusiveGateway,
    ParallelGateway,
    IntermediateCatchEvent,
    IntermediateThrowEvent,
    Other,
}

impl ElementType {
    /// Map a verbatim type string onto the enumeration. Unknown strings become `Other`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "startEvent" => ElementType::StartEvent,
            "endEvent" => ElementType::EndEvent,
            "task" => ElementType::Task,
            "userTask" => ElementType::UserTask,
            "serviceTask" => ElementType::ServiceTask,
            "exclusiveGateway" => ElementType::ExclusiveGateway,
            "parallelGateway" => ElementType::ParallelGateway,
            "intermediateCatchEvent" => ElementType::IntermediateCatchEvent,
            "intermediateThrowEvent" => ElementType::IntermediateThrowEvent,
            _ => ElementType::Other,
        }
    }

    pub fn is_event_boundary(self) -> bool {
        matches!(self, ElementType::StartEvent | ElementType::EndEvent)
    }

    pub fn is_gateway(self) -> bool {
        matches!(
            self,
            ElementType::ExclusiveGateway | ElementType::ParallelGateway
        )
    }
}

/// A node of the process. `kind` keeps the type string exactly as it arrived;
/// interpretation happens through [`ProcessElement::element_type`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessElement {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub lane: Option<String>,
}

impl ProcessElement {
    pub fn element_type(&self) -> ElementType {
        ElementType::parse(&self.kind)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SequenceFlow {
    pub id: String,
    pub source_ref: String,
    pub target_ref: String,
    pub name: String,
}

/// A lane. `elements` is derived by the normalizer and never edited by hand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Swimlane {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub elements: Vec<String>,
}

/// A normalized process: every element sits in exactly one existing lane.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub elements: Vec<ProcessElement>,
    pub flows: Vec<SequenceFlow>,
    pub swimlanes: Vec<Swimlane>,
}

impl ProcessDefinition {
    pub fn lane(&self, id: &str) -> Option<&Swimlane> {
        self.swimlanes.iter().find(|s| s.id == id)
    }

    pub fn element(&self, id: &str) -> Option<&ProcessElement> {
        self.elements.iter().find(|e| e.id == id)
    }
}

/// Process data as it arrives from storage or an AI reply. No invariants hold yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawProcessDefinition {
    pub id: Option<String>,
    pub elements: Vec<ProcessElement>,
    pub flows: Option<Vec<SequenceFlow>>,
    pub swimlanes: Vec<Swimlane>,
}

impl From<ProcessDefinition> for RawProcessDefinition {
    fn from(def: ProcessDefinition) -> Self {
        RawProcessDefinition {
            id: def.id,
            elements: def.elements,
            flows: Some(def.flows),
            swimlanes: def.swimlanes,
        }
    }
}

// --- Coercion from untyped JSON ---

impl RawProcessDefinition {
    /// Coerce arbitrary JSON into a raw definition. Accepts `{"definitions": {...}}`
    /// or the bare definition object; anything missing falls back to empty.
    pub fn from_value(value: &Value) -> Self {
        let root = match value.get("definitions") {
            Some(inner) if inner.is_object() => inner,
            _ => value,
        };

        let elements = objects(root.get("elements"))
            .map(|obj| ProcessElement {
                id: text(obj.get("id")),
                kind: text(obj.get("type")),
                name: text(obj.get("name")),
                lane: obj.get("lane").and_then(Value::as_str).map(str::to_string),
            })
            .collect();

        let flows = root.get("flows").map(|_| {
            objects(root.get("flows"))
                .map(|obj| SequenceFlow {
                    id: text(obj.get("id")),
                    source_ref: text(obj.get("sourceRef")),
                    target_ref: text(obj.get("targetRef")),
                    name: text(obj.get("name")),
                })
                .collect()
        });

        let swimlanes = objects(root.get("swimlanes"))
            .map(|obj| Swimlane {
                id: text(obj.get("id")),
                name: text(obj.get("name")),
                elements: Vec::new(),
            })
            .collect();

        let id = root
            .get("id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        RawProcessDefinition {
            id,
            elements,
            flows,
            swimlanes,
        }
    }
}

fn objects(value: Option<&Value>) -> impl Iterator<Item = &serde_json::Map<String, Value>> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

/// Strings pass through, numbers and booleans are stringified, everything else is empty.
fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

// --- Parsing AI text ---

/// Parse stored or AI-produced text into a raw definition.
/// Falls back to the outermost `{...}` span when the text wraps JSON in prose or code fences.
pub fn parse_process_json(raw: &str) -> Result<RawProcessDefinition, Error> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(first) => {
            let inner = extract_json_object(raw).ok_or(Error::Parse(first))?;
            serde_json::from_str(inner)?
        }
    };
    if !value.is_object() {
        return Err(Error::NotAnObject);
    }
    Ok(RawProcessDefinition::from_value(&value))
}

/// Extract the outermost JSON object substring from raw text.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}
