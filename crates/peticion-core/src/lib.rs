pub mod json;
pub mod prompt;
pub mod session;
pub mod types;

pub use json::{extract_json_block, parse_block, safe_parse};
pub use prompt::{Prompt, QualityProfile, Specialization, Task, get_quality_profile};
pub use session::{ChatContext, Session, SessionError, Stage};
pub use types::{AnalysisResult, ChatTurn, Level, Problem, ProblemCategory, Recommendation};
