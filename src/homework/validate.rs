use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::PollError;

/// A validated review API payload. Records are kept raw so that a single bad
/// record only fails when it is actually looked at.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusBatch {
    pub homeworks: Vec<Value>,
    pub current_date: i64,
}

impl StatusBatch {
    pub fn latest(&self) -> Option<&Value> {
        self.homeworks.first()
    }
}

#[instrument(skip_all)]
pub fn check_response(response: &Value) -> Result<StatusBatch, PollError> {
    let Some(object) = response.as_object() else {
        return Err(PollError::Schema(format!(
            "expected a JSON object, got {}",
            json_type(response)
        )));
    };
    let homeworks = match object.get("homeworks") {
        None | Some(Value::Null) => {
            return Err(PollError::Schema("missing `homeworks` key".to_string()))
        }
        Some(value) => value,
    };
    let Some(current_date) = object.get("current_date") else {
        return Err(PollError::Schema("missing `current_date` key".to_string()));
    };
    let Some(homeworks) = homeworks.as_array() else {
        return Err(PollError::Schema(format!(
            "`homeworks` must be a list, got {}",
            json_type(homeworks)
        )));
    };
    let Some(current_date) = current_date.as_i64() else {
        return Err(PollError::Schema(format!(
            "`current_date` must be an integer, got {}",
            json_type(current_date)
        )));
    };

    debug!(count = homeworks.len(), current_date, "homework list received");
    Ok(StatusBatch {
        homeworks: homeworks.clone(),
        current_date,
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
