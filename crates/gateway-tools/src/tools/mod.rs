//! Concrete tool implementations. Each owns a clone of the shared
//! [`gateway_api::ApiClient`] and is responsible for its own call,
//! content assembly, and error presentation.

mod analyze_code;
mod get_pattern;
mod search_patterns;

pub use analyze_code::AnalyzeCodeTool;
pub use get_pattern::GetPatternTool;
pub use search_patterns::SearchPatternsTool;
