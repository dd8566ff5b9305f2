//! Canvas wire serialization
//!
//! Maps the normalized unit fields to the Canvas course and completion
//! shapes. Required fields missing from a unit fail that unit only.

use serde_json::{json, Value};

use lernio_channel::error::{ChannelError, ChannelResult};
use lernio_channel::traits::WireSerializer;
use lernio_channel::unit::ExportableUnit;

/// Serializer for the Canvas wire schema.
#[derive(Debug, Default)]
pub struct CanvasSerializer;

impl CanvasSerializer {
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

impl WireSerializer for CanvasSerializer {
    fn serialize_content(&self, unit: &ExportableUnit) -> ChannelResult<Value> {
        let content_key = required_str(unit, "content_key")?;
        let title = required_str(unit, "title")?;

        Ok(json!({
            "name": title,
            "course_code": content_key,
            "integration_id": content_key,
            "public_description": unit.fields.get("description").cloned().unwrap_or(Value::Null),
            "image_url": unit.fields.get("image_url").cloned().unwrap_or(Value::Null),
            "course_url": unit.fields.get("content_url").cloned().unwrap_or(Value::Null),
            "is_public": true,
        }))
    }

    fn serialize_learner(&self, unit: &ExportableUnit) -> ChannelResult<Value> {
        let learner_id = required_str(unit, "learner_id")?;
        let content_key = required_str(unit, "content_key")?;

        let completed = unit
            .fields
            .get("status")
            .and_then(|v| v.as_str())
            .map(|s| s == "completed" || s == "passed")
            .unwrap_or(false);

        Ok(json!({
            "user_id": learner_id,
            "course_code": content_key,
            "completed": completed,
            "completed_at": unit.fields.get("completed_at").cloned().unwrap_or(Value::Null),
            "grade": unit.fields.get("grade_percent").cloned().unwrap_or(Value::Null),
        }))
    }
}
