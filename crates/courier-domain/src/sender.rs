use serde::{Deserialize, Serialize};

/// Names describing who sent a message, shown to the recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderMetadata {
    pub organization_name: String,
    pub department_name: String,
    pub service_name: String,
}
