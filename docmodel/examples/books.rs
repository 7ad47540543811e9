use docmodel::{memory::InMemoryStore, prelude::*};

#[derive(Debug, Clone, Serialize, Deserialize, Model)]
struct Book {
    #[serde(skip)]
    meta: Meta,
    title: String,
    author: String,
    publisher: String,
    year: i32,
    pages: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    docmodel::configure(DocumentStore::new(InMemoryStore::new()))?;

    let book_id = "100800604002";

    let mut book = Book::make(
        doc! {
            "title": "Sirens of Titan",
            "author": "Kurt Vonnegut",
            "publisher": "Delacorte",
            "year": 1959,
            "pages": 319,
        },
        false,
    )
    .await?;

    book.meta_mut().set_id(book_id);
    println!("{}", book.to_json()?);
    book.save().await?;

    let book = Book::fetch_required(book_id).await?;
    println!("{book:?}");

    let query = Book::query([("author", "Kurt Vonnegut")])?;
    for book in query.get().await? {
        println!("{}", book.to_json()?);
    }

    Book::delete(book_id).await?;
    println!("{:?}", Book::fetch(book_id).await?);

    Ok(())
}
