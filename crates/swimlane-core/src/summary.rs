//! Compact JSON view of a BPMN document, rebuilt from whatever XML the engine saves.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_SUMMARY_ID: &str = "process_001";
const SUMMARY_NAME: &str = "Current Process";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryElement {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagramSummary {
    pub id: String,
    pub name: String,
    pub elements: Vec<SummaryElement>,
}

/// List the direct children of the first `process` element.
/// Namespace prefixes are stripped from tag names.
pub fn summarize(xml: &str) -> Result<DiagramSummary> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut id = None;
    let mut elements = Vec::new();
    let mut depth = 0usize;
    let mut process_depth: Option<usize> = None;
    let mut seen_process = false;
    let mut seen_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                visit(&e, depth, &mut id, &mut elements, process_depth)?;
                if process_depth.is_none() && !seen_process && e.local_name().as_ref() == b"process" {
                    process_depth = Some(depth);
                    seen_process = true;
                }
                seen_root = true;
            }
            Event::Empty(e) => {
                visit(&e, depth + 1, &mut id, &mut elements, process_depth)?;
                seen_root = true;
            }
            Event::End(_) => {
                if process_depth == Some(depth) {
                    process_depth = None;
                }
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| Error::Xml("unexpected closing tag".to_string()))?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(Error::Xml("document has no root element".to_string()));
    }
    if depth != 0 {
        return Err(Error::Xml(format!("{depth} element(s) left unclosed")));
    }

    Ok(DiagramSummary {
        id: id.unwrap_or_else(|| DEFAULT_SUMMARY_ID.to_string()),
        name: SUMMARY_NAME.to_string(),
        elements,
    })
}

fn visit(
    e: &BytesStart<'_>,
    depth: usize,
    id: &mut Option<String>,
    elements: &mut Vec<SummaryElement>,
    process_depth: Option<usize>,
) -> Result<()> {
    if depth == 1 {
        *id = attribute(e, b"id")?.filter(|s| !s.is_empty());
    }
    if process_depth.is_some_and(|d| d + 1 == depth) {
        elements.push(SummaryElement {
            kind: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
            id: attribute(e, b"id")?.unwrap_or_default(),
            name: attribute(e, b"name")?.unwrap_or_default(),
        });
    }
    Ok(())
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::Xml(err.to_string()))?;
        if attr.key.local_name().as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}
