//! Streaming multi-axis analysis pipeline: grouped concurrent analyzers,
//! progress events, and a single aggregated final result (C8).

mod analyze;
mod axis;
mod events;
mod schema;

pub use analyze::{analyze, stream_axis_analysis};
pub use axis::{AnalysisRequest, Analyzers, AxisId, AxisProgress, AxisStatus, Group, GroupAnalyzer, Language};
pub use events::{AnalysisResult, Confidence, StreamEvent};
