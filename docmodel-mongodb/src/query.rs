//! Query translation from docmodel filters to MongoDB query syntax.

use bson::{Bson, Document, doc};

use docmodel_core::{
    error::StoreError,
    query::{FieldOp, QueryVisitor},
    schema::ID_FIELD,
};

/// MongoDB field holding the document key.
pub(crate) const MONGO_ID_FIELD: &str = "_id";

/// Maps a model field name to the MongoDB field storing it.
pub(crate) fn mongo_field(field: &str) -> &str {
    if field == ID_FIELD { MONGO_ID_FIELD } else { field }
}

/// Translates docmodel filters into MongoDB query documents.
pub(crate) struct MongoQueryTranslator;

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = StoreError;

    fn visit_filter(&mut self, field: &str, op: FieldOp, value: &Bson) -> Result<Document, StoreError> {
        let operator = match op {
            FieldOp::Eq => "$eq",
            FieldOp::Lt => "$lt",
            FieldOp::Gt => "$gt",
            FieldOp::Lte => "$lte",
            FieldOp::Gte => "$gte",
        };

        Ok(doc! {
            mongo_field(field): { operator: value.clone() },
        })
    }

    fn visit_all(&mut self, mut clauses: Vec<Document>) -> Result<Document, StoreError> {
        Ok(match clauses.len() {
            0 => doc! {},
            1 => clauses.remove(0),
            _ => doc! { "$and": clauses },
        })
    }
}

#[cfg(test)]
mod tests {
    use docmodel_core::query::Filter;

    use super::*;

    #[test]
    fn translates_filters() {
        let filters = [Filter::eq("occupation", "circus dog"), Filter::gte("age", 3)];

        let query = MongoQueryTranslator
            .visit_filters(&filters)
            .unwrap();

        assert_eq!(
            query,
            doc! {
                "$and": [
                    { "occupation": { "$eq": "circus dog" } },
                    { "age": { "$gte": 3 } },
                ]
            }
        );
    }

    #[test]
    fn single_and_empty_filters() {
        assert_eq!(MongoQueryTranslator.visit_filters(&[]).unwrap(), doc! {});
        assert_eq!(
            MongoQueryTranslator
                .visit_filters(&[Filter::lt("id", "m")])
                .unwrap(),
            doc! { "_id": { "$lt": "m" } }
        );
    }
}
