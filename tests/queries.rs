//! Query execution, pagination, and schema discovery caching.

mod common;

use anyhow::Result;
use salesforce_db::{FieldType, QueryOptions};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_query_string_assembly_reaches_the_wire() -> Result<()> {
    let server = MockServer::start().await;
    let service = common::service_for(&server).await;

    Mock::given(method("GET"))
        .and(path("/services/data/v37.0/query"))
        .and(query_param(
            "q",
            "SELECT Id,Name FROM Account WHERE Name='Acme' ORDER BY Name OFFSET 10 LIMIT 5",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 1,
            "done": true,
            "records": [{"Id": "001A", "Name": "Acme"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = service
        .query(
            "Account",
            QueryOptions {
                fields: Some("Id,Name".into()),
                filter: Some("Name='Acme'".into()),
                order: Some("Name".into()),
                offset: 10,
                limit: 5,
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.total_count, None);
    Ok(())
}

#[tokio::test]
async fn test_scroll_consumes_cursor_instead_of_rebuilding_query() -> Result<()> {
    let server = MockServer::start().await;
    let service = common::service_for(&server).await;

    Mock::given(method("GET"))
        .and(path("/services/data/v37.0/query"))
        .and(query_param("q", "SELECT Id FROM Contact"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 4000,
            "done": false,
            "nextRecordsUrl": "/services/data/v37.0/query/01gD0000002HU6KIAW-2000",
            "records": [{"Id": "003A"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let first = service.query("Contact", QueryOptions::default()).await?;
    assert_eq!(first.total_count, Some(4000));
    let cursor = first.next_cursor.clone().expect("cursor for more rows");
    assert_eq!(cursor, "01gD0000002HU6KIAW-2000");

    Mock::given(method("GET"))
        .and(path(format!("/services/data/v37.0/query/{}", cursor)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 4000,
            "done": true,
            "records": [{"Id": "003B"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let second = service
        .query(
            "Contact",
            QueryOptions {
                cursor: Some(cursor),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(second.records[0]["Id"], "003B");
    assert!(second.next_cursor.is_none());
    Ok(())
}

#[tokio::test]
async fn test_include_count_surfaces_total() -> Result<()> {
    let server = MockServer::start().await;
    let service = common::service_for(&server).await;

    Mock::given(method("GET"))
        .and(path("/services/data/v37.0/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 12, "done": true, "records": []
        })))
        .mount(&server)
        .await;

    let page = service
        .query(
            "Account",
            QueryOptions {
                include_count: true,
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(page.total_count, Some(12));
    Ok(())
}

#[tokio::test]
async fn test_star_expands_to_described_fields() -> Result<()> {
    let server = MockServer::start().await;
    let service = common::service_for(&server).await;

    Mock::given(method("GET"))
        .and(path("/services/data/v37.0/sobjects/Account/describe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Account",
            "label": "Account",
            "fields": [
                {"name": "Id", "type": "id"},
                {"name": "Name", "type": "string"},
                {"name": "Industry", "type": "picklist"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/services/data/v37.0/query"))
        .and(query_param("q", "SELECT Id,Name,Industry FROM Account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 0, "done": true, "records": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    service
        .query(
            "Account",
            QueryOptions {
                fields: Some("*".into()),
                ..Default::default()
            },
        )
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_describe_served_from_cache_until_refresh() -> Result<()> {
    let server = MockServer::start().await;
    let service = common::service_for(&server).await;

    Mock::given(method("GET"))
        .and(path("/services/data/v37.0/sobjects/Account/describe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Account",
            "label": "Account",
            "fields": [
                {"name": "Id", "type": "id"},
                {"name": "Name", "type": "string", "nillable": false}
            ]
        })))
        .expect(2)
        .mount(&server)
        .await;

    // Two lookups, one remote describe.
    let first = service.describe_resource("Account").await?;
    let second = service.describe_resource("Account").await?;
    assert_eq!(first.fields.len(), 2);
    assert_eq!(second.field("Name").unwrap().field_type, FieldType::String);

    let describe_hits = |requests: &[wiremock::Request]| {
        requests
            .iter()
            .filter(|r| r.url.path() == "/services/data/v37.0/sobjects/Account/describe")
            .count()
    };
    assert_eq!(describe_hits(&server.received_requests().await.unwrap()), 1);

    // Refresh clears the descriptor and the next lookup goes remote again.
    service.refresh_schema_cache().await;
    service.describe_resource("Account").await?;
    assert_eq!(describe_hits(&server.received_requests().await.unwrap()), 2);
    Ok(())
}

#[tokio::test]
async fn test_resource_names_preserve_remote_order() -> Result<()> {
    let server = MockServer::start().await;
    let service = common::service_for(&server).await;

    Mock::given(method("GET"))
        .and(path("/services/data/v37.0/sobjects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sobjects": [
                {"name": "Account", "label": "Account"},
                {"name": "CustomThing__c", "label": "Custom Thing"},
                {"name": "Contact", "label": "Contact"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let names = service.list_resources().await?;
    assert_eq!(names, vec!["Account", "CustomThing__c", "Contact"]);

    // Second listing is served from cache.
    let again = service.list_resources().await?;
    assert_eq!(again, names);
    Ok(())
}
