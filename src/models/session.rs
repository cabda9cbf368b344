use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier handed out by the remote directory. The service is loose about
/// whether ids are numbers or strings, so both are carried verbatim and sent
/// back in the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(id) => write!(f, "{id}"),
            RecordId::Text(id) => f.write_str(id),
        }
    }
}

/// Who is being tracked and on what. Fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdentity {
    pub employee_id: String,
    pub employee_name: String,
    pub project_name: String,
    pub task_id: Option<RecordId>,
}

impl SessionIdentity {
    pub fn new(
        employee_id: impl Into<String>,
        employee_name: impl Into<String>,
        project_name: impl Into<String>,
        task_id: Option<RecordId>,
    ) -> Self {
        Self {
            employee_id: employee_id.into(),
            employee_name: employee_name.into(),
            project_name: project_name.into(),
            task_id,
        }
    }
}
