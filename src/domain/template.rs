use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `content` carries `{{placeholder}}` markers substituted by the prompt manager. `version`
/// increments whenever `content` changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub template_id: String,
    pub name: String,
    pub content: String,
    /// Strict templates fail to render rather than leave a placeholder empty.
    pub strict: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
