//! Record-level actions a batch context can carry.

use crate::error::{Error, Result};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAction {
    Create,
    Update,
    Delete,
    Read,
}

impl RecordAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordAction::Create => "create",
            RecordAction::Update => "update",
            RecordAction::Delete => "delete",
            RecordAction::Read => "read",
        }
    }
}

/// Validates a record payload for a write and returns its fields, with the
/// identifier fields stripped (Salesforce rejects them in write bodies).
pub fn parse_record(record: &Value, id_fields: &[String]) -> Result<Map<String, Value>> {
    let object = record
        .as_object()
        .ok_or_else(|| Error::BadRequest("Record must be an object of field values.".into()))?;

    let parsed: Map<String, Value> = object
        .iter()
        .filter(|(name, _)| !id_fields.iter().any(|id| id.eq_ignore_ascii_case(name)))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    if parsed.is_empty() {
        return Err(Error::BadRequest(
            "No valid fields were found in record.".into(),
        ));
    }
    Ok(parsed)
}

/// Identifier of a record, read from its payload.
pub fn record_id(record: &Value, id_fields: &[String]) -> Option<String> {
    let object = record.as_object()?;
    for id_field in id_fields {
        for (name, value) in object {
            if name.eq_ignore_ascii_case(id_field) {
                if let Some(id) = value.as_str() {
                    return Some(id.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id_fields() -> Vec<String> {
        vec!["Id".to_string()]
    }

    #[test]
    fn test_parse_record_strips_identifiers() {
        let record = json!({"Id": "001", "Name": "Acme", "iD": "dup"});
        let parsed = parse_record(&record, &id_fields()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(parsed.contains_key("Name"));
    }

    #[test]
    fn test_parse_record_rejects_empty_payload() {
        assert!(parse_record(&json!({"Id": "001"}), &id_fields()).is_err());
        assert!(parse_record(&json!({}), &id_fields()).is_err());
        assert!(parse_record(&json!("not an object"), &id_fields()).is_err());
    }

    #[test]
    fn test_record_id_case_insensitive() {
        assert_eq!(
            record_id(&json!({"id": "003xx"}), &id_fields()),
            Some("003xx".to_string())
        );
        assert_eq!(record_id(&json!({"Name": "Acme"}), &id_fields()), None);
    }
}
