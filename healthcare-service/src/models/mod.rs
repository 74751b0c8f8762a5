//! Request and response shapes for the analysis endpoint.

pub mod analysis;

pub use analysis::{
    AnalyzeHealthRequest, AnalyzeHealthResponse, DocumentInput, DocumentRecord, ExtractedEntity,
    TextDocument,
};
