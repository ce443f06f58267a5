//! Fashion Finder Common Library
//!
//! CLIと将来のWeb(WASM)で共有される型・プロンプト・セッション状態機械

pub mod types;
pub mod error;
pub mod data_url;
pub mod prompts;
pub mod parser;
pub mod session;
pub mod share;

pub use types::{
    AnalyzedItem, GroundingChunk, ImagePayload, InputMode, OutfitAnalysisResult,
    ProductSuggestion, SimilarItemSuggestionGroup, SimilarItemsSearchResult, WebGroundingSource,
};
pub use error::{AnalysisError, Error, InputError, Result, SearchError};
pub use data_url::{extract_base64_from_data_url, extract_mime_type_from_data_url};
pub use prompts::{build_analysis_prompt, build_similar_items_prompt};
pub use parser::{extract_json, parse_analysis_response, parse_similar_items_response};
pub use session::{
    AnalysisTicket, Generation, SearchTicket, SessionOrchestrator, SessionPhase, SessionSnapshot,
    SourceSwitch,
};
pub use share::build_share_text;
