pub mod compile;
pub mod error;
pub mod model;
pub mod normalize;
pub mod rules;
pub mod settings;
pub mod storage;
pub mod summary;

pub use compile::{compile, escape_xml, layout, CompileOptions, Compiler, ShapeBounds, DEFAULT_TEMPLATE};
pub use error::{Error, Result};
pub use model::{
    parse_process_json, ElementType, ProcessDefinition, ProcessElement, RawProcessDefinition,
    SequenceFlow, Swimlane,
};
pub use normalize::{normalize, NormalizeReport, Normalizer};
pub use rules::{LaneRole, LaneSet, LaneSpec};
pub use settings::{load_settings, read_settings, settings_path, write_settings, Settings};
pub use storage::{data_dir, FileStore, MemoryStore, Slot, SlotStore};
pub use summary::{summarize, DiagramSummary, SummaryElement};
