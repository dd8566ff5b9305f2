//! xAPI statement serialization
//!
//! Learner units become completion statements. Content metadata has no
//! representation on an activity stream, so the inherited
//! `serialize_content` contract keeps failing it per unit.

use serde_json::{json, Value};

use lernio_channel::error::{ChannelError, ChannelResult};
use lernio_channel::traits::WireSerializer;
use lernio_channel::unit::ExportableUnit;

const VERB_COMPLETED: &str = "http://adlnet.gov/expapi/verbs/completed";
const VERB_PROGRESSED: &str = "http://adlnet.gov/expapi/verbs/progressed";

/// Serializer producing xAPI 1.0.3 statements.
#[derive(Debug, Default)]
pub struct XapiSerializer;

impl XapiSerializer {
    /// Create a serializer.
    pub fn new() -> Self {
        Self
    }
}

fn required_str<'a>(unit: &'a ExportableUnit, field: &str) -> ChannelResult<&'a str> {
    unit.fields
        .get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ChannelError::serialization(
                unit.item_key.clone(),
                format!("missing required field '{field}'"),
            )
        })
}

impl WireSerializer for XapiSerializer {
    // serialize_content is intentionally not overridden: the activity
    // stream carries learner events only.

    fn serialize_learner(&self, unit: &ExportableUnit) -> ChannelResult<Value> {
        let learner_id = required_str(unit, "learner_id")?;
        let content_key = required_str(unit, "content_key")?;

        let completed = unit
            .fields
            .get("status")
            .and_then(|v| v.as_str())
            .map(|s| s == "completed" || s == "passed")
            .unwrap_or(false);
        let (verb, display) = if completed {
            (VERB_COMPLETED, "completed")
        } else {
            (VERB_PROGRESSED, "progressed")
        };

        let mut result = json!({ "completion": completed });
        if let Some(grade) = unit.fields.get("grade_percent").and_then(|v| v.as_f64()) {
            result["score"] = json!({ "scaled": grade / 100.0 });
        }
        if let Some(timestamp) = unit.fields.get("completed_at").and_then(|v| v.as_str()) {
            result["timestamp"] = json!(timestamp);
        }

        Ok(json!({
            "actor": {
                "objectType": "Agent",
                "mbox": format!("mailto:{learner_id}"),
            },
            "verb": {
                "id": verb,
                "display": { "en-US": display },
            },
            "object": {
                "objectType": "Activity",
                "id": format!("https://learn.example.com/courses/{content_key}"),
                "definition": {
                    "type": "http://adlnet.gov/expapi/activities/course",
                },
            },
            "result": result,
        }))
    }
}
