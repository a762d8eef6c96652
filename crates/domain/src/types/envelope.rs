use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Webhook,
    Code,
    Format,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Webhook => "webhook",
            ActionKind::Code => "code",
            ActionKind::Format => "format",
        }
    }
}

/// `origin.portalId` — kept as the raw inbound int rather than coerced
/// into `tenant_id`'s string form at the edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Origin {
    #[serde(rename = "portalId")]
    pub portal_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ActionObject {
    #[serde(rename = "objectType", default)]
    pub object_type: Option<String>,
    #[serde(rename = "objectId", default)]
    pub object_id: Option<String>,
    #[serde(default)]
    pub properties: Value,
}

/// The inbound envelope for all three action routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionEnvelope {
    #[serde(rename = "callbackId")]
    pub callback_id: String,
    pub origin: Origin,
    #[serde(default)]
    pub context: Value,
    #[serde(default)]
    pub object: ActionObject,
    #[serde(rename = "inputFields", default)]
    pub input_fields: Value,
}

impl ActionEnvelope {
    /// `context.workflowId`, pulled out of the freeform `context` bag.
    pub fn workflow_id(&self) -> Option<String> {
        self.context
            .get("workflowId")
            .and_then(Value::as_str)
            .map(str::to_owned)
    }

    pub fn tenant_id(&self) -> String {
        self.origin.portal_id.to_string()
    }

    pub fn object_ref(&self) -> String {
        format!(
            "{}:{}",
            self.object.object_type.as_deref().unwrap_or(""),
            self.object.object_id.as_deref().unwrap_or("")
        )
    }
}
