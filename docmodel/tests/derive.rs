use docmodel::{
    memory::InMemoryStore,
    prelude::*,
    schema::{FieldType, Schema},
};

#[derive(Debug, Clone, Serialize, Deserialize, Model)]
#[model(collection = "library")]
struct Novel {
    #[serde(skip)]
    #[model(meta)]
    record: Meta,
    #[serde(rename = "name")]
    title: String,
    published: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rating: Option<f64>,
    #[model(default)]
    #[serde(default)]
    copies: u32,
    #[serde(skip)]
    cached_summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Model)]
struct BookReview {
    #[serde(skip)]
    meta: Meta,
    body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Model)]
struct Shelf {
    #[serde(skip)]
    meta: Meta,
    labels: Vec<String>,
}

#[test]
fn derive_registers_declared_fields() {
    let schema = Novel::schema().unwrap();

    let names = schema
        .fields()
        .iter()
        .map(|field| field.name())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["name", "published", "rating", "copies"]);

    let published = schema.field("published").unwrap();
    assert_eq!(published.field_type(), FieldType::Timestamp);
    assert!(published.is_optional());

    let copies = schema.field("copies").unwrap();
    assert_eq!(copies.field_type(), FieldType::Number);
    assert!(!copies.is_required());

    assert!(schema.field("name").unwrap().is_required());
    assert_eq!(Novel::model_name(), "Novel");
}

#[test]
fn collection_names() {
    assert_eq!(Novel::collection_name(), "library");
    assert_eq!(BookReview::collection_name(), "book_reviews");
}

#[test]
fn unsupported_field_types_are_schema_errors() {
    assert!(matches!(Shelf::schema(), Err(ModelError::Schema { .. })));
    assert!(matches!(
        Schema::of::<Shelf>(),
        Err(ModelError::Schema { ref model, .. }) if model == "Shelf"
    ));
}

#[tokio::test]
async fn derived_models_round_trip() {
    let store = DocumentStore::new(InMemoryStore::new());
    let novels = store.models::<Novel>();

    let mut novel = novels
        .make(doc! { "name": "Bluebeard", "rating": 4.5 }, false)
        .await
        .unwrap();
    novel.cached_summary = Some("an artist's memoir".to_string());
    novels.save(&mut novel).await.unwrap();

    let fetched = novels
        .fetch_required(novel.id().unwrap())
        .await
        .unwrap();

    assert_eq!(fetched.title, "Bluebeard");
    assert_eq!(fetched.rating, Some(4.5));
    assert_eq!(fetched.copies, 0);
    assert_eq!(fetched.published, None);
    assert_eq!(fetched.cached_summary, None);
    assert_eq!(fetched.meta(), novel.meta());
    assert!(store.backend().len("library").await == 1);
}
