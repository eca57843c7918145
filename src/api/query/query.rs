//! SOQL string assembly and result-page mapping.

use serde_json::Value;

/// Joins a requested field list, appending `id_field` when the caller left
/// it out (case-insensitive match) so rows are never returned without
/// their identifier. `None` or an empty list selects the identifier alone.
pub fn build_field_list(fields: Option<&str>, id_field: &str) -> String {
    let list = match fields {
        Some(list) if !list.trim().is_empty() => list,
        _ => return id_field.to_string(),
    };

    let mut parts: Vec<String> = list
        .split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect();

    if !parts.iter().any(|part| part.eq_ignore_ascii_case(id_field)) {
        parts.push(id_field.to_string());
    }
    parts.join(",")
}

/// Path for fetching the next page of a previous query.
pub fn continuation_path(cursor: &str) -> String {
    format!("query/{}", cursor)
}

/// The cursor is the trailing path segment of `nextRecordsUrl`.
fn cursor_suffix(next_records_url: &str) -> String {
    next_records_url
        .rsplit('/')
        .next()
        .unwrap_or(next_records_url)
        .to_string()
}

#[derive(Debug, Clone)]
pub struct SoqlQuery {
    pub resource: String,
    pub fields: String,
    pub filter: Option<String>,
    pub order: Option<String>,
    pub offset: u64,
    pub limit: u64,
}

impl SoqlQuery {
    pub fn new(resource: impl Into<String>, fields: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            fields: fields.into(),
            filter: None,
            order: None,
            offset: 0,
            limit: 0,
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        if !filter.is_empty() {
            self.filter = Some(filter);
        }
        self
    }

    pub fn with_order(mut self, order: impl Into<String>) -> Self {
        let order = order.into();
        if !order.is_empty() {
            self.order = Some(order);
        }
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Assembles the query string. Clause order is fixed; OFFSET and LIMIT
    /// are emitted only when positive.
    pub fn to_soql(&self) -> String {
        let mut query = format!("SELECT {} FROM {}", self.fields, self.resource);
        if let Some(filter) = &self.filter {
            query.push_str(" WHERE ");
            query.push_str(filter);
        }
        if let Some(order) = &self.order {
            query.push_str(" ORDER BY ");
            query.push_str(order);
        }
        if self.offset > 0 {
            query.push_str(&format!(" OFFSET {}", self.offset));
        }
        if self.limit > 0 {
            query.push_str(&format!(" LIMIT {}", self.limit));
        }
        query
    }
}

/// One page of query results plus scroll metadata.
#[derive(Debug, Clone)]
pub struct QueryPage {
    pub records: Vec<Value>,
    /// Total row count, present when requested or when more pages exist.
    pub total_count: Option<u64>,
    /// Opaque continuation token for [`continuation_path`].
    pub next_cursor: Option<String>,
}

impl QueryPage {
    pub fn from_response(result: &Value, include_count: bool) -> Self {
        let records = result
            .get("records")
            .and_then(|r| r.as_array())
            .cloned()
            .unwrap_or_default();

        let next_cursor = result
            .get("nextRecordsUrl")
            .and_then(|n| n.as_str())
            .map(cursor_suffix);

        let total_count = if include_count || next_cursor.is_some() {
            result.get("totalSize").and_then(|t| t.as_u64())
        } else {
            None
        };

        Self {
            records,
            total_count,
            next_cursor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_list_defaults_to_identifier() {
        assert_eq!(build_field_list(None, "Id"), "Id");
        assert_eq!(build_field_list(Some(""), "Id"), "Id");
        assert_eq!(build_field_list(Some("  "), "Id"), "Id");
    }

    #[test]
    fn test_field_list_appends_identifier_once() {
        assert_eq!(build_field_list(Some("Name"), "Id"), "Name,Id");
        assert_eq!(
            build_field_list(Some("Name, Industry"), "Id"),
            "Name,Industry,Id"
        );
    }

    #[test]
    fn test_field_list_never_duplicates_identifier() {
        assert_eq!(build_field_list(Some("Id,Name"), "Id"), "Id,Name");
        assert_eq!(build_field_list(Some("name,ID"), "Id"), "name,ID");
        assert_eq!(build_field_list(Some("iD"), "Id"), "iD");
    }

    #[test]
    fn test_full_query_assembly() {
        let query = SoqlQuery::new("Account", "Id,Name")
            .with_filter("Name='Acme'")
            .with_order("Name")
            .with_offset(10)
            .with_limit(5);
        assert_eq!(
            query.to_soql(),
            "SELECT Id,Name FROM Account WHERE Name='Acme' ORDER BY Name OFFSET 10 LIMIT 5"
        );
    }

    #[test]
    fn test_zero_offset_and_limit_omitted() {
        let query = SoqlQuery::new("Contact", "Id");
        assert_eq!(query.to_soql(), "SELECT Id FROM Contact");
    }

    #[test]
    fn test_page_carries_cursor_and_count() {
        let result = json!({
            "totalSize": 3000,
            "done": false,
            "nextRecordsUrl": "/services/data/v37.0/query/01gD0000002HU6KIAW-2000",
            "records": [{"Id": "001"}]
        });
        let page = QueryPage::from_response(&result, false);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.total_count, Some(3000));
        assert_eq!(page.next_cursor.as_deref(), Some("01gD0000002HU6KIAW-2000"));
    }

    #[test]
    fn test_count_omitted_when_not_requested_and_done() {
        let result = json!({"totalSize": 1, "done": true, "records": [{"Id": "001"}]});
        let page = QueryPage::from_response(&result, false);
        assert_eq!(page.total_count, None);
        assert!(page.next_cursor.is_none());

        let counted = QueryPage::from_response(&result, true);
        assert_eq!(counted.total_count, Some(1));
    }
}
