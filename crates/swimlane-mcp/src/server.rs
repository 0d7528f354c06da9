use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use serde::Deserialize;
use swimlane_core::{parse_process_json, summarize, Compiler, FileStore, Settings, Slot, SlotStore};
use tracing::{debug, info};

// --- Request types ---

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ProcessRequest {
    /// Process plan as JSON: {id?, elements: [{id, type, name, lane?}], flows: [{id, sourceRef, targetRef, name?}], swimlanes?: [{id, name}]}. Surrounding prose is tolerated; the outermost {...} object is used.
    data: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct CompileRequest {
    /// Process plan as JSON, same shape as normalize_process accepts
    data: String,
    /// Also store the compiled XML as the current diagram. Default: false
    save: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SummarizeRequest {
    /// BPMN 2.0 XML document
    xml: String,
}

// --- Server ---

#[derive(Clone)]
pub struct SwimlaneServer {
    compiler: Compiler,
    settings: Settings,
    store: FileStore,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl SwimlaneServer {
    pub fn new(settings: Settings, store: FileStore) -> Self {
        Self {
            compiler: settings.compiler(),
            settings,
            store,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Normalize a process plan: every element gets a lane, lanes list their elements in input order. Elements without a valid lane are placed by name (start -> planning, complete -> completion, '?' -> review, develop/implement -> execution), otherwise round-robin. Returns {definition, reassigned, fabricatedLanes}."
    )]
    fn normalize_process(
        &self,
        Parameters(req): Parameters<ProcessRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(respond(self.run_normalize(&req.data)))
    }

    #[tool(
        description = "Compile a process plan into BPMN 2.0 XML with diagram interchange (one row of shapes, straight edges). Flows whose ends do not exist keep their sequenceFlow but get no edge. Set save=true to store the result as the current diagram."
    )]
    fn compile_process(
        &self,
        Parameters(req): Parameters<CompileRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(respond(self.run_compile(&req.data, req.save.unwrap_or(false))))
    }

    #[tool(
        description = "Summarize BPMN XML as {id, name, elements: [{type, id, name}]} listing the direct children of the first process."
    )]
    fn summarize_bpmn(
        &self,
        Parameters(req): Parameters<SummarizeRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(respond(run_summarize(&req.xml)))
    }

    #[tool(description = "Get the four configured lanes (planning, execution, review, completion) as {id, name} pairs")]
    fn get_lanes(&self) -> Result<CallToolResult, McpError> {
        Ok(respond(self.run_lanes()))
    }

    #[tool(
        description = "Stage a process plan for the editor. The plan is validated, then picked up and compiled the next time a diagram session loads."
    )]
    fn stage_process(
        &self,
        Parameters(req): Parameters<ProcessRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(respond(self.run_stage(&req.data)))
    }

    #[tool(description = "Get the current diagram XML (last compiled, imported or saved)")]
    fn get_diagram(&self) -> Result<CallToolResult, McpError> {
        Ok(respond(self.run_get_diagram()))
    }
}

fn respond(result: Result<String, String>) -> CallToolResult {
    match result {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(e) => CallToolResult::error(vec![Content::text(e)]),
    }
}

fn to_json(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("Serialization error: {}", e))
}

impl SwimlaneServer {
    fn run_normalize(&self, data: &str) -> Result<String, String> {
        let raw = parse_process_json(data).map_err(|e| format!("Invalid process plan: {}", e))?;
        let (definition, report) = self.compiler.normalizer().normalize_with_report(raw);
        debug!(reassigned = report.reassigned, "normalized process");
        to_json(&serde_json::json!({
            "definition": definition,
            "reassigned": report.reassigned,
            "fabricatedLanes": report.fabricated_lanes,
        }))
    }

    fn run_compile(&self, data: &str, save: bool) -> Result<String, String> {
        let raw = parse_process_json(data).map_err(|e| format!("Invalid process plan: {}", e))?;
        let xml = self.compiler.compile(raw);
        if save {
            self.store
                .set(Slot::Diagram, &xml)
                .map_err(|e| format!("Compiled, but failed to store diagram: {}", e))?;
            info!(bytes = xml.len(), "stored compiled diagram");
        }
        Ok(xml)
    }

    fn run_lanes(&self) -> Result<String, String> {
        to_json(&self.settings.lanes)
    }

    fn run_stage(&self, data: &str) -> Result<String, String> {
        let raw = parse_process_json(data).map_err(|e| format!("Invalid process plan: {}", e))?;
        self.store
            .set(Slot::PendingProcess, data)
            .map_err(|e| format!("Failed to stage process: {}", e))?;
        Ok(format!(
            "Staged process with {} element(s). It will be loaded the next time the editor opens.",
            raw.elements.len()
        ))
    }

    fn run_get_diagram(&self) -> Result<String, String> {
        match self.store.get(Slot::Diagram) {
            Ok(Some(xml)) => Ok(xml),
            Ok(None) => Err("No diagram stored yet. Use compile_process with save=true to create one.".to_string()),
            Err(e) => Err(format!("Failed to read diagram: {}", e)),
        }
    }
}

fn run_summarize(xml: &str) -> Result<String, String> {
    let summary = summarize(xml).map_err(|e| format!("Invalid BPMN XML: {}", e))?;
    to_json(&summary)
}

#[tool_handler]
impl ServerHandler for SwimlaneServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

const INSTRUCTIONS: &str = r#"Swimlane turns process plans into BPMN 2.0 diagrams.

A process plan is JSON: {"elements": [{"id", "type", "name", "lane"?}], "flows": [{"id", "sourceRef", "targetRef", "name"?}], "swimlanes"?: [{"id", "name"}]}.
Element types: startEvent, endEvent, task, userTask, serviceTask, exclusiveGateway, parallelGateway, intermediateCatchEvent, intermediateThrowEvent. User and service tasks, and anything unrecognized, are drawn as plain tasks.

## Workflow
1. Draft the plan. Lanes are optional; call get_lanes to see the four default lanes.
2. Call normalize_process to check lane placement.
3. Call compile_process for the XML, or stage_process to hand the plan to the editor."#;
