//! Normalized descriptors for SObjects and their fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Salesforce always exposes an implicit identifier field under this name,
/// regardless of what the describe metadata flags as primary.
pub const DEFAULT_ID_FIELD: &str = "Id";

/// Normalized field types mapped from the Salesforce describe vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldType {
    Id,
    String,
    Boolean,
    Integer,
    Double,
    Currency,
    Percent,
    Date,
    DateTime,
    Time,
    Reference,
    Picklist,
    MultiPicklist,
    TextArea,
    Phone,
    Email,
    Url,
    Address,
    Base64,
    Other(String),
}

impl FieldType {
    /// Maps a remote type tag; unknown tags are preserved verbatim.
    pub fn from_remote(tag: &str) -> Self {
        match tag {
            "id" => FieldType::Id,
            "string" | "encryptedstring" | "combobox" => FieldType::String,
            "boolean" => FieldType::Boolean,
            "int" => FieldType::Integer,
            "double" => FieldType::Double,
            "currency" => FieldType::Currency,
            "percent" => FieldType::Percent,
            "date" => FieldType::Date,
            "datetime" => FieldType::DateTime,
            "time" => FieldType::Time,
            "reference" => FieldType::Reference,
            "picklist" => FieldType::Picklist,
            "multipicklist" => FieldType::MultiPicklist,
            "textarea" => FieldType::TextArea,
            "phone" => FieldType::Phone,
            "email" => FieldType::Email,
            "url" => FieldType::Url,
            "address" => FieldType::Address,
            "base64" => FieldType::Base64,
            other => FieldType::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub label: Option<String>,
    pub field_type: FieldType,
    pub nullable: bool,
    pub is_unique: bool,
    /// Autonumber fields are generated remotely and rejected on write.
    pub auto_generated: bool,
    pub size: Option<u64>,
    pub precision: Option<u64>,
    pub scale: Option<u64>,
    /// Target SObjects for reference fields.
    pub reference_to: Vec<String>,
    pub default_value: Option<Value>,
}

impl FieldDescriptor {
    /// Maps one entry of a describe response's `fields` array.
    pub fn from_describe(field: &Value) -> Option<Self> {
        let name = field.get("name")?.as_str()?.to_string();
        let type_tag = field.get("type").and_then(|t| t.as_str()).unwrap_or("string");
        let field_type = FieldType::from_remote(type_tag);
        let default_value = field
            .get("defaultValue")
            .filter(|v| !v.is_null())
            .map(|v| normalize_default(v, &field_type));

        Some(Self {
            name,
            label: field.get("label").and_then(|l| l.as_str()).map(str::to_string),
            nullable: field.get("nillable").and_then(|n| n.as_bool()).unwrap_or(false),
            is_unique: field.get("unique").and_then(|u| u.as_bool()).unwrap_or(false),
            auto_generated: field
                .get("autoNumber")
                .and_then(|a| a.as_bool())
                .unwrap_or(false),
            size: field.get("length").and_then(|l| l.as_u64()),
            precision: field.get("precision").and_then(|p| p.as_u64()),
            scale: field.get("scale").and_then(|s| s.as_u64()),
            reference_to: field
                .get("referenceTo")
                .and_then(|r| r.as_array())
                .map(|targets| {
                    targets
                        .iter()
                        .filter_map(|t| t.as_str())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            default_value,
            field_type,
        })
    }
}

/// Coerces a remote default into the field's normalized type where the
/// remote reported it as a string.
fn normalize_default(value: &Value, field_type: &FieldType) -> Value {
    match field_type {
        FieldType::Boolean => match value {
            Value::Bool(_) => value.clone(),
            Value::String(s) => Value::Bool(s.eq_ignore_ascii_case("true")),
            _ => value.clone(),
        },
        FieldType::Integer => match value {
            Value::Number(_) => value.clone(),
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| value.clone()),
            _ => value.clone(),
        },
        FieldType::Double | FieldType::Currency | FieldType::Percent => match value {
            Value::Number(_) => value.clone(),
            Value::String(s) => s
                .parse::<f64>()
                .map(Value::from)
                .unwrap_or_else(|_| value.clone()),
            _ => value.clone(),
        },
        _ => value.clone(),
    }
}

/// Cached metadata for one SObject. Lookup keys are lower-cased once at
/// ingestion so per-field access never re-folds case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SObjectDescriptor {
    pub name: String,
    pub label: Option<String>,
    /// Always [`DEFAULT_ID_FIELD`]; see module notes in `metadata`.
    pub id_field: String,
    pub fields: Vec<FieldDescriptor>,
    index: HashMap<String, usize>,
}

impl SObjectDescriptor {
    pub fn from_describe(describe: &Value) -> Option<Self> {
        let name = describe.get("name")?.as_str()?.to_string();
        let label = describe
            .get("label")
            .and_then(|l| l.as_str())
            .map(str::to_string);

        let fields: Vec<FieldDescriptor> = describe
            .get("fields")
            .and_then(|f| f.as_array())
            .map(|entries| entries.iter().filter_map(FieldDescriptor::from_describe).collect())
            .unwrap_or_default();

        let index = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.to_lowercase(), i))
            .collect();

        Some(Self {
            name,
            label,
            id_field: DEFAULT_ID_FIELD.to_string(),
            fields,
            index,
        })
    }

    /// Case-insensitive field lookup.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.index
            .get(&name.to_lowercase())
            .map(|&i| &self.fields[i])
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn describe_payload() -> Value {
        json!({
            "name": "Account",
            "label": "Account",
            "fields": [
                {"name": "Id", "type": "id", "nillable": false, "unique": false},
                {"name": "Name", "type": "string", "nillable": false, "length": 255},
                {"name": "AccountNumber", "type": "string", "autoNumber": true, "nillable": true},
                {"name": "OwnerId", "type": "reference", "referenceTo": ["User"], "nillable": true},
                {"name": "IsActive__c", "type": "boolean", "defaultValue": "true", "nillable": true},
                {"name": "Employees", "type": "int", "defaultValue": "10", "precision": 8},
                {"name": "UnknownKind", "type": "location"}
            ]
        })
    }

    #[test]
    fn test_descriptor_mapping() {
        let descriptor = SObjectDescriptor::from_describe(&describe_payload()).unwrap();
        assert_eq!(descriptor.name, "Account");
        assert_eq!(descriptor.id_field, "Id");
        assert_eq!(descriptor.fields.len(), 7);

        let name = descriptor.field("Name").unwrap();
        assert_eq!(name.field_type, FieldType::String);
        assert_eq!(name.size, Some(255));
        assert!(!name.nullable);

        let auto = descriptor.field("AccountNumber").unwrap();
        assert!(auto.auto_generated);

        let owner = descriptor.field("OwnerId").unwrap();
        assert_eq!(owner.field_type, FieldType::Reference);
        assert_eq!(owner.reference_to, vec!["User".to_string()]);
    }

    #[test]
    fn test_identifier_is_always_the_well_known_field() {
        // Even when no field is flagged as an id, the implicit Id applies.
        let describe = json!({"name": "Custom__c", "fields": [
            {"name": "Name", "type": "string"}
        ]});
        let descriptor = SObjectDescriptor::from_describe(&describe).unwrap();
        assert_eq!(descriptor.id_field, "Id");
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let descriptor = SObjectDescriptor::from_describe(&describe_payload()).unwrap();
        assert!(descriptor.field("ownerid").is_some());
        assert!(descriptor.field("OWNERID").is_some());
        assert!(descriptor.field("missing").is_none());
    }

    #[test]
    fn test_defaults_normalized_against_type() {
        let descriptor = SObjectDescriptor::from_describe(&describe_payload()).unwrap();
        assert_eq!(
            descriptor.field("IsActive__c").unwrap().default_value,
            Some(json!(true))
        );
        assert_eq!(
            descriptor.field("Employees").unwrap().default_value,
            Some(json!(10))
        );
    }

    #[test]
    fn test_unknown_type_tags_preserved() {
        let descriptor = SObjectDescriptor::from_describe(&describe_payload()).unwrap();
        assert_eq!(
            descriptor.field("UnknownKind").unwrap().field_type,
            FieldType::Other("location".into())
        );
        // Missing tag defaults to string.
        let f = FieldDescriptor::from_describe(&json!({"name": "Bare"})).unwrap();
        assert_eq!(f.field_type, FieldType::String);
    }
}
