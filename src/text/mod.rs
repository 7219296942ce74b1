pub mod analyzer;
pub mod compliance;
pub mod words;

pub use analyzer::{Recognition, TextContentAnalyzer};
pub use compliance::{check_compliance, ComplianceParams, ComplianceReport};
