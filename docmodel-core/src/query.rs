//! Query construction, validation and deferred execution.
//!
//! A query is a conjunctive list of filter clauses, each comparing one field against a
//! value. Building a query never touches the store: [`ModelCollection::query`] validates
//! the clauses and returns a [`QueryHandle`], and only [`QueryHandle::get`] runs it.
//!
//! Clauses can be written as [`Filter`]s or as tuples, the two-element form meaning
//! equality:
//!
//! ```ignore
//! use docmodel::query::Filter;
//!
//! let circus_dogs = users.query([("occupation", "=", "circus dog")])?.get().await?;
//! let recent = users.query([Filter::gt("created", since)])?.limit(10).get().await?;
//! let by_author = books.query([("author", "Kurt Vonnegut")])?.get().await?;
//! ```
//!
//! [`ModelCollection::query`]: crate::collection::ModelCollection::query

use std::{fmt, marker::PhantomData, str::FromStr, sync::Arc};

use bson::Bson;
use tracing::debug;

use crate::{
    backend::DynStoreBackend,
    codec,
    error::{ModelResult, QueryError, StoreError},
    model::Model,
    schema::Schema,
};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// Sort specification for query results.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Field comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    /// Equal to.
    Eq,
    /// Less than.
    Lt,
    /// Greater than.
    Gt,
    /// Less than or equal to.
    Lte,
    /// Greater than or equal to.
    Gte,
}

impl FieldOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldOp::Eq => "==",
            FieldOp::Lt => "<",
            FieldOp::Gt => ">",
            FieldOp::Lte => "<=",
            FieldOp::Gte => ">=",
        }
    }
}

impl FromStr for FieldOp {
    type Err = QueryError;

    fn from_str(op: &str) -> Result<Self, Self::Err> {
        match op.trim() {
            "=" | "==" => Ok(FieldOp::Eq),
            "<" => Ok(FieldOp::Lt),
            ">" => Ok(FieldOp::Gt),
            "<=" => Ok(FieldOp::Lte),
            ">=" => Ok(FieldOp::Gte),
            other => Err(QueryError::UnsupportedOperator(other.to_string())),
        }
    }
}

impl fmt::Display for FieldOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One filter clause: `field op value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// The field to compare. `id` refers to the document key.
    pub field: String,
    /// The comparison operator.
    pub op: FieldOp,
    /// The value to compare against.
    pub value: Bson,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FieldOp, value: impl Into<Bson>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Matches documents where the field equals the value.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new(field, FieldOp::Eq, value)
    }

    /// Matches documents where the field is less than the value.
    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new(field, FieldOp::Lt, value)
    }

    /// Matches documents where the field is greater than the value.
    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new(field, FieldOp::Gt, value)
    }

    /// Matches documents where the field is less than or equal to the value.
    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new(field, FieldOp::Lte, value)
    }

    /// Matches documents where the field is greater than or equal to the value.
    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::new(field, FieldOp::Gte, value)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op, self.value)
    }
}

/// Conversion into a filter clause. Operators written as strings are parsed here, so an
/// unsupported operator surfaces when the query is built.
pub trait IntoFilter {
    fn into_filter(self) -> Result<Filter, QueryError>;
}

impl IntoFilter for Filter {
    fn into_filter(self) -> Result<Filter, QueryError> {
        Ok(self)
    }
}

impl<F, V> IntoFilter for (F, V)
where
    F: Into<String>,
    V: Into<Bson>,
{
    fn into_filter(self) -> Result<Filter, QueryError> {
        Ok(Filter::eq(self.0, self.1))
    }
}

impl<F, O, V> IntoFilter for (F, O, V)
where
    F: Into<String>,
    O: AsRef<str>,
    V: Into<Bson>,
{
    fn into_filter(self) -> Result<Filter, QueryError> {
        Ok(Filter::new(self.0, self.1.as_ref().parse()?, self.2))
    }
}

/// The store-facing query: filters plus optional ordering and paging.
///
/// Backends receive this through [`StoreBackend::query_documents`]. Multiple range
/// clauses on different fields are passed through unchanged; whether they can be served is
/// up to the backend.
///
/// [`StoreBackend::query_documents`]: crate::backend::StoreBackend::query_documents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Conjunctive filter clauses.
    pub filters: Vec<Filter>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    /// Number of documents to skip.
    pub offset: Option<usize>,
    /// Sort specification for results.
    pub sort: Option<Sort>,
}

impl Query {
    /// Creates a new query matching every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }

    /// Checks every referenced field against `schema`.
    pub fn validate(&self, schema: &Schema) -> Result<(), QueryError> {
        let fields = self
            .filters
            .iter()
            .map(|filter| filter.field.as_str())
            .chain(self.sort.iter().map(|sort| sort.field.as_str()));

        for field in fields {
            if !schema.is_queryable(field) {
                return Err(QueryError::UnknownField {
                    field: field.to_string(),
                    model: schema.model().to_string(),
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter clause.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.query.filters.push(filter);
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Sets the number of documents to skip.
    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = Some(offset);
        self
    }

    /// Sets the sort specification.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort = Some(Sort { field: field.into(), direction });
        self
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

/// Translates a filter list into a backend's own representation.
pub trait QueryVisitor {
    type Output;
    type Error: Into<StoreError>;

    /// Translates one clause.
    fn visit_filter(
        &mut self,
        field: &str,
        op: FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    /// Combines translated clauses into their conjunction. Called with an empty list when
    /// the query has no filters.
    fn visit_all(&mut self, clauses: Vec<Self::Output>) -> Result<Self::Output, Self::Error>;

    fn visit_filters(&mut self, filters: &[Filter]) -> Result<Self::Output, Self::Error> {
        let clauses = filters
            .iter()
            .map(|filter| self.visit_filter(&filter.field, filter.op, &filter.value))
            .collect::<Result<Vec<_>, _>>()?;

        self.visit_all(clauses)
    }
}

/// A validated, not yet executed query over one model's collection.
///
/// Handles are immutable; the paging and ordering methods return new handles. Every call to
/// [`get`](QueryHandle::get) queries the store again and reflects its current state.
pub struct QueryHandle<'a, M: Model> {
    collection: String,
    backend: &'a dyn DynStoreBackend,
    schema: Arc<Schema>,
    query: Query,
    _marker: PhantomData<M>,
}

impl<'a, M: Model> Clone for QueryHandle<'a, M> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            backend: self.backend,
            schema: self.schema.clone(),
            query: self.query.clone(),
            _marker: PhantomData,
        }
    }
}

impl<'a, M: Model> fmt::Debug for QueryHandle<'a, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryHandle")
            .field("collection", &self.collection)
            .field("query", &self.query)
            .finish()
    }
}

impl<'a, M: Model> QueryHandle<'a, M> {
    pub(crate) fn new(
        collection: String,
        backend: &'a dyn DynStoreBackend,
        schema: Arc<Schema>,
        query: Query,
    ) -> Self {
        Self {
            collection,
            backend,
            schema,
            query,
            _marker: PhantomData,
        }
    }

    /// The collection this query runs against.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The query that will be sent to the store.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Returns a handle that yields at most `limit` instances.
    pub fn limit(&self, limit: usize) -> Self {
        let mut handle = self.clone();
        handle.query.limit = Some(limit);
        handle
    }

    /// Returns a handle that skips the first `offset` matches.
    pub fn offset(&self, offset: usize) -> Self {
        let mut handle = self.clone();
        handle.query.offset = Some(offset);
        handle
    }

    /// Returns a handle ordered by `field`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownField`] if the model does not declare `field`.
    pub fn order_by(&self, field: impl Into<String>, direction: SortDirection) -> ModelResult<Self> {
        let mut handle = self.clone();
        handle.query.sort = Some(Sort { field: field.into(), direction });
        handle.query.validate(&handle.schema)?;

        Ok(handle)
    }

    /// Executes the query and decodes every match, in the order the store returns them.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Store`] if the store fails, or a decode error if any returned
    /// document does not fit the model. No partial results are returned.
    pub async fn get(&self) -> ModelResult<Vec<M>> {
        debug!(
            collection = %self.collection,
            filters = self.query.filters.len(),
            limit = ?self.query.limit,
            "running query"
        );

        let rows = self
            .backend
            .query_documents(&self.collection, &self.query)
            .await
            .map_err(|source| QueryError::Store {
                collection: self.collection.clone(),
                source,
            })?;

        rows.into_iter()
            .map(|(id, document)| codec::decode::<M>(id, document))
            .collect()
    }

    /// Executes the query with a limit of one and returns the first match, if any.
    pub async fn first(&self) -> ModelResult<Option<M>> {
        Ok(self
            .limit(1)
            .get()
            .await?
            .into_iter()
            .next())
    }
}
