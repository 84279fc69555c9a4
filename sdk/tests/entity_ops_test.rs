//! Entity operations driven end to end through a mock transport

use futures::TryStreamExt;
use serde_json::{Value as Json, json};
use std::sync::Arc;
use storecraft_sdk::testing::MockTransport;
use storecraft_sdk::{
    ClientConfig, EntityDefinition, EntityPatch, Error, IterateConfig, ListConfig, Projection,
    Schema, Storecraft, Value, field,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn client(transport: Arc<MockTransport>) -> Storecraft {
    init_tracing();
    let schema = Schema::builder()
        .entity(
            EntityDefinition::build("book")
                .name("Book")
                .field("title", field::single_line_text().required())
                .field("pages", field::integer()),
        )
        .build()
        .unwrap();
    Storecraft::new(transport, schema, ClientConfig::new("acme"))
}

fn row(id: u32, title: &str, pages: i64) -> Json {
    json!({
        "_id": format!("gid://storecraft/Entity/{}", id),
        "_handle": format!("book-{}", id),
        "_updatedAt": "2024-05-01T09:00:00Z",
        "field0": {"value": title},
        "field1": {"value": pages.to_string()},
    })
}

fn page(rows: Vec<Json>, has_next_page: bool, end_cursor: Option<&str>) -> Json {
    json!({"entities": {
        "nodes": rows,
        "pageInfo": {"hasNextPage": has_next_page, "endCursor": end_cursor},
    }})
}

#[tokio::test]
async fn test_list_decodes_rows_and_defaults_page_size() {
    let transport = Arc::new(MockTransport::new());
    transport.push_data(page(vec![row(1, "Dune", 412)], false, None));
    let client = client(Arc::clone(&transport));

    let result = client
        .entities("book")
        .unwrap()
        .list(ListConfig::default())
        .await
        .unwrap();

    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].field("title"), Some(&Value::Text("Dune".into())));
    assert_eq!(result.items[0].field("pages"), Some(&Value::Integer(412)));
    assert!(!result.page_info.has_next_page);

    let request = &transport.requests()[0];
    assert_eq!(request.variables["entityType"], json!("acme_book"));
    assert_eq!(request.variables["first"], json!(50));
    assert_eq!(request.variables["field0"], json!("title"));
}

#[tokio::test]
async fn test_iterate_fetches_exactly_one_page_per_page() {
    let transport = Arc::new(MockTransport::new());
    transport.push_data(page(vec![row(1, "a", 1), row(2, "b", 2)], true, Some("c2")));
    transport.push_data(page(vec![row(3, "c", 3), row(4, "d", 4)], true, Some("c4")));
    transport.push_data(page(vec![row(5, "e", 5)], false, None));
    let client = client(Arc::clone(&transport));

    let stream = client
        .entities("book")
        .unwrap()
        .iterate(IterateConfig {
            page_size: 2,
            ..IterateConfig::default()
        })
        .unwrap();
    let records: Vec<_> = stream.try_collect().await.unwrap();

    // five records across ceil(5/2) fetches, no extra fetch after the
    // last page reports no successor
    assert_eq!(records.len(), 5);
    assert_eq!(transport.request_count(), 3);
    let requests = transport.requests();
    assert_eq!(requests[0].variables["after"], Json::Null);
    assert_eq!(requests[1].variables["after"], json!("c2"));
    assert_eq!(requests[2].variables["after"], json!("c4"));
}

#[tokio::test]
async fn test_iterate_limit_stops_mid_page() {
    let transport = Arc::new(MockTransport::new());
    transport.push_data(page(vec![row(1, "a", 1), row(2, "b", 2)], true, Some("c2")));
    let client = client(Arc::clone(&transport));

    let stream = client
        .entities("book")
        .unwrap()
        .iterate(IterateConfig {
            page_size: 2,
            limit: Some(2),
            ..IterateConfig::default()
        })
        .unwrap();
    let records: Vec<_> = stream.try_collect().await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_get_missing_record_is_none() {
    let transport = Arc::new(MockTransport::new());
    transport.push_data(json!({"entity": null}));
    let client = client(Arc::clone(&transport));

    let record = client
        .entities("book")
        .unwrap()
        .get("gid://storecraft/Entity/404", Projection::All)
        .await
        .unwrap();
    assert!(record.is_none());
}

#[tokio::test]
async fn test_insert_encodes_fields_and_surfaces_user_errors() {
    let transport = Arc::new(MockTransport::new());
    transport.push_data(json!({"entityCreate": {
        "entity": row(9, "Dune", 412),
        "userErrors": [],
    }}));
    let client = client(Arc::clone(&transport));
    let books = client.entities("book").unwrap();

    let record = books
        .insert([
            ("title".to_string(), Value::from("Dune")),
            ("pages".to_string(), Value::from(412i64)),
        ])
        .await
        .unwrap();
    assert_eq!(record.handle, "book-9");

    let fields = &transport.requests()[0].variables["entity"]["fields"];
    assert_eq!(fields[0], json!({"key": "title", "value": "Dune"}));
    assert_eq!(fields[1], json!({"key": "pages", "value": "412"}));

    transport.push_data(json!({"entityCreate": {
        "entity": null,
        "userErrors": [{"field": ["handle"], "message": "handle taken"}],
    }}));
    let err = books
        .insert([("title".to_string(), Value::from("Dune"))])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::User(msg) if msg == "handle taken"));
}

#[tokio::test]
async fn test_upsert_addresses_the_record_by_typed_handle() {
    let transport = Arc::new(MockTransport::new());
    transport.push_data(json!({"entityUpsert": {
        "entity": row(3, "Dune", 412),
        "userErrors": [],
    }}));
    let client = client(Arc::clone(&transport));

    let record = client
        .entities("book")
        .unwrap()
        .upsert("dune", [("title".to_string(), Value::from("Dune"))])
        .await
        .unwrap();
    assert_eq!(record.handle, "book-3");

    let request = &transport.requests()[0];
    assert!(request.document.contains("entityUpsert"));
    assert_eq!(
        request.variables["handle"],
        json!({"type": "acme_book", "handle": "dune"})
    );
    assert_eq!(
        request.variables["entity"],
        json!({"fields": [{"key": "title", "value": "Dune"}]})
    );
}

#[tokio::test]
async fn test_preconditions_fire_before_any_request() {
    let transport = Arc::new(MockTransport::new());
    let client = client(Arc::clone(&transport));
    let books = client.entities("book").unwrap();

    let err = books
        .update("gid://storecraft/Entity/1", EntityPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EmptyUpdate));

    let err = books
        .list(ListConfig {
            projection: Projection::include(["isbn"]),
            ..ListConfig::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownField(alias) if alias == "isbn"));

    let err = books
        .insert([("isbn".to_string(), Value::from("978"))])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownField(_)));

    assert!(matches!(
        client.entities("magazine").unwrap_err(),
        Error::UnknownAlias(_)
    ));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_delete_many_returns_job() {
    let transport = Arc::new(MockTransport::new());
    transport.push_data(json!({"entityBulkDelete": {
        "job": {"id": "gid://storecraft/Job/3", "done": false},
        "userErrors": [],
    }}));
    transport.push_data(json!({"job": {"id": "gid://storecraft/Job/3", "done": true}}));
    let client = client(Arc::clone(&transport));

    let job = client
        .entities("book")
        .unwrap()
        .delete_many(&["gid://storecraft/Entity/1".to_string()])
        .await
        .unwrap();
    assert!(!job.done);

    let job = client.job(&job.id).await.unwrap();
    assert!(job.done);
}

#[tokio::test]
async fn test_update_sends_only_provided_changes() {
    let transport = Arc::new(MockTransport::new());
    transport.push_data(json!({"entityUpdate": {
        "entity": row(1, "Dune", 500),
        "userErrors": [],
    }}));
    let client = client(Arc::clone(&transport));

    client
        .entities("book")
        .unwrap()
        .update(
            "gid://storecraft/Entity/1",
            EntityPatch {
                handle: None,
                fields: vec![("pages".to_string(), Value::from(500i64))],
            },
        )
        .await
        .unwrap();

    let entity = &transport.requests()[0].variables["entity"];
    assert!(entity.get("handle").is_none());
    assert_eq!(entity["fields"], json!([{"key": "pages", "value": "500"}]));
}
