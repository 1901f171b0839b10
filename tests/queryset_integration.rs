//! Integration Tests for ES Queryset
//!
//! End-to-end cursor behaviour against the in-memory backend: chaining,
//! compilation, evaluation, caching and the unsupported surface.
//!
//! # Running Tests
//! ```bash
//! cargo test --test queryset_integration
//! ```
//!
//! # Fixture
//! Four people in index `people`:
//! - 1 John Smith (email, group "agroup")
//! - 2 Jack Smith
//! - 3 Mama Smith
//! - 4 Foo Bar

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use es_queryset::{
    FilterValue, IndexDescriptor, InMemoryTransport, MltOptions, QueryError, Queryset,
    QuerysetConfig, Row, SearchArgs, SearchRequest, SearchTransport, SerdeSerializer,
    TransportError,
};

// =============================================================================
// Fixture Helpers
// =============================================================================

fn descriptor() -> IndexDescriptor {
    IndexDescriptor::new("people")
        .text_searchable("first_name")
        .text("last_name")
        .keyword("username")
        .keyword("email")
        .integer("id")
        .date("date_joined")
        .nested("groups")
        .ordering(["id"])
}

fn transport() -> Arc<InMemoryTransport> {
    let transport = InMemoryTransport::new();
    transport.index_document(
        "people",
        "1",
        json!({
            "id": 1, "first_name": "John", "last_name": "Smith", "username": "jsmith",
            "email": "john@example.com", "date_joined": "2014-03-01T00:00:00Z",
            "groups": [{"id": 1, "value": "agroup"}], "name_suggest": "John Smith"
        }),
    );
    transport.index_document(
        "people",
        "2",
        json!({
            "id": 2, "first_name": "Jack", "last_name": "Smith", "username": "jacks",
            "date_joined": "2015-06-01T00:00:00Z", "groups": [], "name_suggest": "Jack Smith"
        }),
    );
    transport.index_document(
        "people",
        "3",
        json!({
            "id": 3, "first_name": "Mama", "last_name": "Smith", "username": "mama",
            "date_joined": "2016-01-01T00:00:00Z", "groups": [{"id": 2, "value": "bgroup"}],
            "name_suggest": "Mama Smith"
        }),
    );
    transport.index_document(
        "people",
        "4",
        json!({
            "id": 4, "first_name": "Foo", "last_name": "Bar", "username": "foo",
            "date_joined": "2013-01-01T00:00:00Z", "groups": [], "name_suggest": "Foo Bar"
        }),
    );
    Arc::new(transport)
}

fn people_with(config: &QuerysetConfig) -> (Queryset<Value>, Arc<InMemoryTransport>) {
    let transport = transport();
    let qs = Queryset::json(Arc::new(descriptor()), transport.clone(), config);
    (qs, transport)
}

fn people() -> (Queryset<Value>, Arc<InMemoryTransport>) {
    people_with(&QuerysetConfig::default())
}

fn ids(rows: &[Row<Value>]) -> Vec<i64> {
    rows.iter()
        .map(|row| row.as_document().and_then(|d| d["id"].as_i64()).unwrap())
        .collect()
}

async fn ids_of(qs: &mut Queryset<Value>) -> Vec<i64> {
    ids(qs.rows().await.unwrap())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Person {
    id: u64,
    first_name: String,
    last_name: String,
}

/// Backend that fails every call
struct BrokenTransport;

#[async_trait]
impl SearchTransport for BrokenTransport {
    async fn search(&self, _request: &SearchRequest) -> Result<Value, TransportError> {
        Err(TransportError::Connection("connection refused".into()))
    }

    async fn count(&self, _index: &str, _body: Option<&Value>) -> Result<u64, TransportError> {
        Err(TransportError::Connection("connection refused".into()))
    }

    async fn get(&self, _index: &str, _id: &str) -> Result<Option<Value>, TransportError> {
        Err(TransportError::Connection("connection refused".into()))
    }
}

// =============================================================================
// Chaining and Caching
// =============================================================================

#[tokio::test]
async fn test_all_returns_everything_in_default_order() {
    let (qs, _) = people();
    let mut all = qs.all();
    assert_eq!(ids_of(&mut all).await, vec![1, 2, 3, 4]);
    assert_eq!(all.count().await.unwrap(), 4);
}

#[tokio::test]
async fn test_clone_independence() {
    let (base, transport) = people();
    let mut smiths = base.filter([("last_name", "Smith")]);
    assert_eq!(ids_of(&mut smiths).await, vec![1, 2, 3]);
    assert!(smiths.is_evaluated());

    // Chaining from an evaluated cursor yields an unevaluated, independent one
    let mut johns = smiths.search("John");
    assert!(!johns.is_evaluated());
    assert_eq!(ids_of(&mut johns).await, vec![1]);

    assert_eq!(smiths.len().await.unwrap(), 3);
    assert!(base.state().filters.is_empty());
    assert_eq!(transport.stats().searches, 2);
}

#[tokio::test]
async fn test_cache_once() {
    let (qs, transport) = people();
    let mut qs = qs.filter([("last_name", "Smith")]);

    qs.rows().await.unwrap();
    qs.len().await.unwrap();
    qs.contains(1).await.unwrap();
    qs.response().await.unwrap();
    qs.max_score().await.unwrap();
    qs.count().await.unwrap();
    let _ = qs.fetch().await.unwrap().count();

    let stats = transport.stats();
    assert_eq!(stats.searches, 1);
    assert_eq!(stats.counts, 0);
}

#[tokio::test]
async fn test_zero_matches_are_cached() {
    let (qs, transport) = people();
    let mut nobody = qs.filter([("last_name", "Nobody")]);

    assert!(nobody.rows().await.unwrap().is_empty());
    assert!(nobody.is_evaluated());
    assert_eq!(nobody.len().await.unwrap(), 0);
    assert_eq!(nobody.count().await.unwrap(), 0);
    assert_eq!(transport.stats().searches, 1);
}

#[tokio::test]
async fn test_count_consistency() {
    let (qs, transport) = people();

    // Unevaluated: count request, remembered
    let mut smiths = qs.filter([("last_name", "Smith")]);
    assert_eq!(smiths.count().await.unwrap(), 3);
    assert_eq!(smiths.count().await.unwrap(), 3);
    assert_eq!(transport.stats().counts, 1);
    assert_eq!(transport.stats().searches, 0);

    // Evaluated: total independent of the window
    let mut window = qs.filter([("last_name", "Smith")]);
    let rows = window.slice(0..1).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(window.count().await.unwrap(), 3);
    assert_eq!(transport.stats().counts, 1);
}

#[tokio::test]
async fn test_is_empty() {
    let (qs, _) = people();
    assert!(!qs.all().is_empty().await.unwrap());
    assert!(qs.filter([("last_name", "Nobody")]).is_empty().await.unwrap());
}

// =============================================================================
// Filters and Exclusions
// =============================================================================

#[tokio::test]
async fn test_filter_text_and_term() {
    let (qs, _) = people();
    assert_eq!(ids_of(&mut qs.filter([("last_name", "Smith")])).await, vec![1, 2, 3]);
    assert_eq!(ids_of(&mut qs.filter([("username", "jacks")])).await, vec![2]);
    assert_eq!(ids_of(&mut qs.filter([("id", 4)])).await, vec![4]);
}

#[tokio::test]
async fn test_exclude_inversion() {
    let (qs, _) = people();
    let mut not_smiths = qs.exclude([("last_name", "Smith")]).unwrap();
    assert_eq!(ids_of(&mut not_smiths).await, vec![4]);

    let mut double_negative = qs.exclude([("last_name__must_not", "Smith")]).unwrap();
    assert_eq!(ids_of(&mut double_negative).await, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_bounds_and_their_complements_partition() {
    let (qs, _) = people();
    for op in ["gt", "gte", "lt", "lte"] {
        let key = format!("id__{}", op);
        let mut kept = qs.filter([(key.as_str(), 2)]);
        let mut dropped = qs.exclude([(key.as_str(), 2)]).unwrap();

        let mut all = ids_of(&mut kept).await;
        let excluded = ids_of(&mut dropped).await;
        assert!(all.iter().all(|id| !excluded.contains(id)), "{} overlaps", op);
        all.extend(excluded);
        all.sort();
        assert_eq!(all, vec![1, 2, 3, 4], "{} does not partition", op);
    }

    assert_eq!(ids_of(&mut qs.filter([("id__gt", 2)])).await, vec![3, 4]);
    assert_eq!(ids_of(&mut qs.exclude([("id__gt", 2)]).unwrap()).await, vec![1, 2]);
}

#[tokio::test]
async fn test_range() {
    let (qs, _) = people();
    let mut middle = qs.filter([("id__range", FilterValue::range(2, 3))]);
    assert_eq!(ids_of(&mut middle).await, vec![2, 3]);

    let mut scalar = qs.filter([("id__range", 2)]);
    assert!(matches!(
        scalar.rows().await,
        Err(QueryError::UnsupportedLookup { .. })
    ));

    assert!(matches!(
        qs.exclude([("id__range", FilterValue::range(2, 3))]),
        Err(QueryError::NotSupported(_))
    ));
}

#[tokio::test]
async fn test_exists_and_isnull_duality() {
    let (qs, _) = people();
    assert_eq!(ids_of(&mut qs.filter([("email__exists", true)])).await, vec![1]);
    assert_eq!(ids_of(&mut qs.filter([("email__exists", false)])).await, vec![2, 3, 4]);
    assert_eq!(ids_of(&mut qs.filter([("email__isnull", true)])).await, vec![2, 3, 4]);
    assert_eq!(ids_of(&mut qs.filter([("email__isnull", false)])).await, vec![1]);

    let mut excluded = qs.exclude([("email__exists", true)]).unwrap();
    let mut isnull = qs.filter([("email__isnull", true)]);
    assert_eq!(ids_of(&mut excluded).await, ids_of(&mut isnull).await);

    let mut bad = qs.filter([("email__exists", "yes")]);
    assert!(matches!(bad.rows().await, Err(QueryError::UnsupportedLookup { .. })));
}

#[tokio::test]
async fn test_date_filters() {
    let (qs, _) = people();
    let since = Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap();
    let mut recent = qs.filter([("date_joined__gte", since)]);
    assert_eq!(ids_of(&mut recent).await, vec![2, 3]);
}

#[tokio::test]
async fn test_nested_filters() {
    let (qs, _) = people();
    let mut by_value = qs.filter([("groups__value", "agroup")]);
    assert_eq!(ids_of(&mut by_value).await, vec![1]);

    let mut by_entity = qs.filter([("groups", FilterValue::entity(2))]);
    assert_eq!(ids_of(&mut by_entity).await, vec![3]);

    let mut combined = qs.filter([
        ("groups__value", FilterValue::from("agroup")),
        ("groups__id", FilterValue::from(1)),
    ]);
    assert_eq!(ids_of(&mut combined).await, vec![1]);
}

// =============================================================================
// Free-text Search
// =============================================================================

#[tokio::test]
async fn test_search_text() {
    let (qs, _) = people();
    assert_eq!(ids_of(&mut qs.search("John")).await, vec![1]);
    // AUTO fuzziness tolerates one edit on a four-letter term
    assert_eq!(ids_of(&mut qs.search("Jahn")).await, vec![1]);

    let mut strict = qs.fuzziness(es_queryset::Fuzziness::Edits(0)).search("Jahn");
    assert!(ids_of(&mut strict).await.is_empty());
}

#[tokio::test]
async fn test_search_with_fields() {
    let (qs, _) = people();
    let mut smiths = qs
        .search_with(SearchArgs::default().field("last_name", "Smith"))
        .unwrap();
    assert_eq!(ids_of(&mut smiths).await, vec![1, 2, 3]);

    let mut combined = qs
        .search_with(SearchArgs::text("Mama").field("last_name", "Smith"))
        .unwrap();
    assert_eq!(ids_of(&mut combined).await, vec![3]);

    assert!(matches!(
        qs.search_with(SearchArgs::default()),
        Err(QueryError::Argument(_))
    ));
}

// =============================================================================
// Ordering and Pagination
// =============================================================================

#[tokio::test]
async fn test_ordering() {
    let (qs, _) = people();
    assert_eq!(ids_of(&mut qs.order_by(["-id"])).await, vec![4, 3, 2, 1]);
    assert_eq!(ids_of(&mut qs.order_by(["first_name"])).await, vec![4, 2, 1, 3]);
    assert_eq!(
        ids_of(&mut qs.order_by(["last_name", "-first_name"])).await,
        vec![4, 3, 1, 2]
    );
}

#[tokio::test]
async fn test_slice_pagination() {
    let (qs, _) = people();
    let mut qs = qs.all();
    assert_eq!(ids(&qs.slice(1..3).await.unwrap()), vec![2, 3]);
    assert_eq!(qs.count().await.unwrap(), 4);
    assert_eq!(ids(&qs.slice(..2).await.unwrap()), vec![1, 2]);
    assert_eq!(ids(&qs.slice(2..).await.unwrap()), vec![3, 4]);
    assert!(qs.slice(10..12).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_slice_within_cached_window_reuses_cache() {
    let (qs, transport) = people();
    let mut qs = qs.all();
    qs.slice(0..4).await.unwrap();
    assert_eq!(ids(&qs.slice(1..3).await.unwrap()), vec![2, 3]);
    assert_eq!(transport.stats().searches, 1);
}

#[tokio::test]
async fn test_get_index() {
    let (base, transport) = people();
    let mut qs = base.order_by(["-id"]);

    let row = qs.get_index(2).await.unwrap();
    assert_eq!(row.as_document().unwrap()["id"], json!(2));

    match qs.get_index(10).await {
        Err(QueryError::IndexOutOfRange { index, .. }) => assert_eq!(index, 10),
        other => panic!("expected IndexOutOfRange, got {:?}", other.map(|_| ())),
    }

    // Served from an evaluated window that holds the position
    let mut all = base.order_by(["-id"]);
    all.rows().await.unwrap();
    let before = transport.stats().searches;
    let row = all.get_index(0).await.unwrap();
    assert_eq!(row.as_document().unwrap()["id"], json!(4));
    assert_eq!(transport.stats().searches, before);
}

#[tokio::test]
async fn test_positions_past_usize_range() {
    let (qs, transport) = people();
    let mut qs = qs.all();

    match qs.get_index(usize::MAX).await {
        Err(QueryError::IndexOutOfRange { index, .. }) => assert_eq!(index, usize::MAX),
        other => panic!("expected IndexOutOfRange, got {:?}", other.map(|_| ())),
    }
    assert!(matches!(qs.slice(..=usize::MAX).await, Err(QueryError::Argument(_))));
    assert_eq!(transport.stats().searches, 0);
}

// =============================================================================
// Facets and Suggestions
// =============================================================================

#[tokio::test]
async fn test_global_facets() {
    let (qs, _) = people();
    let mut qs = qs.filter([("first_name", "Foo")]).facet(["last_name"], None);
    assert_eq!(ids_of(&mut qs).await, vec![4]);

    let facets = qs.facets().await.unwrap().cloned().unwrap();
    assert_eq!(facets["doc_count"], json!(4));
    assert_eq!(
        facets["last_name"]["buckets"],
        json!([{"key": "Smith", "doc_count": 3}, {"key": "Bar", "doc_count": 1}])
    );
}

#[tokio::test]
async fn test_scoped_facets_and_limit() {
    let (qs, _) = people();
    let mut scoped = qs
        .filter([("first_name", "Foo")])
        .facet_global(["last_name"], None, false);
    let facets = scoped.facets().await.unwrap().cloned().unwrap();
    assert_eq!(
        facets["last_name"]["buckets"],
        json!([{"key": "Bar", "doc_count": 1}])
    );

    let mut limited = qs.facet_global(["username", "last_name"], Some(1), false);
    let facets = limited.facets().await.unwrap().cloned().unwrap();
    assert_eq!(facets["last_name"]["buckets"].as_array().unwrap().len(), 1);
    assert_eq!(facets["username"]["buckets"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_no_facets_requested() {
    let (qs, _) = people();
    let mut qs = qs.all();
    assert!(qs.facets().await.unwrap().is_none());
}

#[tokio::test]
async fn test_suggestions() {
    let (qs, _) = people();
    let mut qs = qs.search("Smath").suggest(["last_name"], Some(1));
    let suggestions = qs.suggestions().await.unwrap().cloned().unwrap();
    let options = &suggestions["last_name"][0]["options"];
    assert_eq!(options.as_array().unwrap().len(), 1);
    assert_eq!(options[0]["text"], json!("smith"));
}

#[tokio::test]
async fn test_complete() {
    let (qs, transport) = people();
    let completions = qs.complete("name_suggest", "ja").await.unwrap();
    assert_eq!(completions, vec!["Jack Smith".to_string()]);

    let completions = qs.complete("name_suggest", "m").await.unwrap();
    assert_eq!(completions, vec!["Mama Smith".to_string()]);

    assert!(qs.complete("missing_field", "zz").await.unwrap().is_empty());
    assert!(!qs.is_evaluated());
    assert_eq!(transport.stats().searches, 3);
}

// =============================================================================
// Direct Get, Extra Body, More-like-this
// =============================================================================

#[tokio::test]
async fn test_get() {
    let (qs, _) = people();
    let mut qs = qs.all();

    let row = qs.get(Some(json!(1))).await.unwrap();
    assert_eq!(row.as_document().unwrap()["first_name"], json!("John"));

    let mut by_filter = qs.filter([("id", 2)]);
    let row = by_filter.get(None).await.unwrap();
    assert_eq!(row.as_document().unwrap()["first_name"], json!("Jack"));

    let mut by_pk = qs.filter([("pk", "3")]);
    let row = by_pk.get(None).await.unwrap();
    assert_eq!(row.as_document().unwrap()["first_name"], json!("Mama"));

    assert!(matches!(qs.get(None).await, Err(QueryError::Argument(_))));
    match qs.get(Some(json!(99))).await {
        Err(QueryError::NotFound { index, id }) => {
            assert_eq!(index, "people");
            assert_eq!(id, "99");
        }
        other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_extra_overrides_query() {
    let (qs, _) = people();
    let mut qs = qs
        .filter([("last_name", "Smith")])
        .extra(json!({"query": {"match": {"first_name": "Foo"}}}))
        .unwrap();
    assert_eq!(ids_of(&mut qs).await, vec![4]);
}

#[tokio::test]
async fn test_more_like_this() {
    let (qs, transport) = people();
    let mut qs = qs.all();
    qs.mlt(
        1,
        MltOptions {
            fields: Some(vec!["last_name".into()]),
            ..MltOptions::default()
        },
    );

    // No count request in this mode: count evaluates
    assert_eq!(qs.count().await.unwrap(), 2);
    assert_eq!(transport.stats().counts, 0);
    assert_eq!(transport.stats().searches, 1);

    let mut found = ids_of(&mut qs).await;
    found.sort();
    assert_eq!(found, vec![2, 3]);
    assert!(!qs.contains(1).await.unwrap());
}

#[tokio::test]
async fn test_more_like_this_positional_access() {
    let (qs, _) = people();
    let mut similar = qs.all();
    similar.mlt(
        1,
        MltOptions {
            fields: Some(vec!["last_name".into()]),
            ..MltOptions::default()
        },
    );
    let full = ids_of(&mut similar.clone()).await;
    assert_eq!(full.len(), 2);

    let mut qs = similar.clone();
    let row = qs.get_index(1).await.unwrap();
    assert_eq!(row.as_document().unwrap()["id"], json!(full[1]));

    assert_eq!(ids(&qs.slice(0..1).await.unwrap()), vec![full[0]]);
    assert_eq!(ids(&qs.slice(1..).await.unwrap()), vec![full[1]]);
    assert_eq!(qs.count().await.unwrap(), 2);

    match similar.clone().get_index(2).await {
        Err(QueryError::IndexOutOfRange { index, available }) => {
            assert_eq!(index, 2);
            assert_eq!(available, 2);
        }
        other => panic!("expected IndexOutOfRange, got {:?}", other.map(|_| ())),
    }
}

// =============================================================================
// Rows, Serialization, Preview
// =============================================================================

#[tokio::test]
async fn test_deserialize_rows() {
    let transport = transport();
    let qs: Queryset<Person> = Queryset::new(
        Arc::new(descriptor()),
        transport,
        Arc::new(SerdeSerializer::<Person>::new()),
        &QuerysetConfig::default(),
    );

    let mut raw = qs.filter([("last_name", "Bar")]);
    assert!(raw.rows().await.unwrap()[0].as_document().is_some());

    let mut objects = qs.filter([("last_name", "Bar")]).deserialize();
    let rows = objects.rows().await.unwrap();
    assert_eq!(
        rows[0].as_object(),
        Some(&Person {
            id: 4,
            first_name: "Foo".into(),
            last_name: "Bar".into(),
        })
    );
    assert!(objects.contains(4).await.unwrap());
    assert!(!objects.contains(1).await.unwrap());
}

#[tokio::test]
async fn test_contains_raw_rows() {
    let (qs, _) = people();
    let mut smiths = qs.filter([("last_name", "Smith")]);
    assert!(smiths.contains(2).await.unwrap());
    assert!(smiths.contains("3").await.unwrap());
    assert!(!smiths.contains(4).await.unwrap());
}

#[tokio::test]
async fn test_preview_truncates() {
    let config = QuerysetConfig {
        repr_output_size: 2,
        ..QuerysetConfig::default()
    };
    let (qs, _) = people_with(&config);
    let qs = qs.all();

    let preview = qs.preview().await.unwrap();
    assert!(preview.starts_with('['));
    assert!(preview.ends_with("...(remaining elements truncated)...]"));
    assert!(preview.contains("\"John\""));
    assert!(!preview.contains("\"Mama\""));
    assert!(!qs.is_evaluated());

    let short = qs.filter([("id", 4)]).preview().await.unwrap();
    assert!(!short.contains("truncated"));
}

#[tokio::test]
async fn test_max_score_and_response() {
    let (qs, _) = people();
    let mut qs = qs.search("John");
    assert!(qs.max_score().await.unwrap().unwrap() > 0.0);
    let response = qs.response().await.unwrap();
    assert_eq!(response["hits"]["total"]["value"], json!(1));
}

// =============================================================================
// Failures and Unsupported Operations
// =============================================================================

#[tokio::test]
async fn test_unsupported_operations() {
    let (qs, _) = people();
    assert!(matches!(qs.update(), Err(QueryError::OperationNotSupported("update"))));
    assert!(matches!(qs.delete(), Err(QueryError::OperationNotSupported("delete"))));
    assert!(matches!(
        qs.prefetch_related(),
        Err(QueryError::OperationNotSupported("prefetch_related"))
    ));
    assert!(matches!(qs.and(&qs), Err(QueryError::OperationNotSupported("and"))));
    assert!(matches!(qs.or(&qs), Err(QueryError::OperationNotSupported("or"))));
}

#[tokio::test]
async fn test_backend_errors_propagate() {
    let mut qs = Queryset::json(
        Arc::new(descriptor()),
        Arc::new(BrokenTransport),
        &QuerysetConfig::default(),
    );
    match qs.rows().await {
        Err(QueryError::Backend(TransportError::Connection(msg))) => {
            assert_eq!(msg, "connection refused")
        }
        other => panic!("expected backend error, got {:?}", other.map(|_| ())),
    }
    assert!(!qs.is_evaluated());
    assert!(qs.count().await.unwrap_err().is_backend());
    assert!(qs.get(Some(json!(1))).await.unwrap_err().is_backend());
}

#[tokio::test]
async fn test_unknown_index_is_backend_error() {
    let transport = transport();
    let mut qs = Queryset::json(
        Arc::new(IndexDescriptor::new("missing")),
        transport,
        &QuerysetConfig::default(),
    );
    assert!(qs.rows().await.unwrap_err().is_backend());
}
