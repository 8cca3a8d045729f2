use axum::http::Uri;
use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};

use crate::database::manager::DatabaseError;
use crate::database::query_builder::{bind_param_query, bind_param_query_as, build_select_query};
use crate::request::query_param_int;

pub const DEFAULT_PER_PAGE: i64 = 10;
pub const MAX_PER_PAGE: i64 = 1000;

/// A clamped page request. Pages start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    /// Page below 1 becomes 1. A page size outside `1..=1000` becomes 10.
    pub fn new(page: i64, per_page: i64) -> Self {
        let page = page.max(1);
        let per_page = if per_page <= 0 || per_page > MAX_PER_PAGE {
            DEFAULT_PER_PAGE
        } else {
            per_page
        };
        Self { page, per_page }
    }

    /// Read `page` and `per_page` from the query string
    pub fn from_uri(uri: &Uri) -> Self {
        Self::new(
            query_param_int(uri, "page", 1),
            query_param_int(uri, "per_page", DEFAULT_PER_PAGE),
        )
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, DEFAULT_PER_PAGE)
    }
}

/// Filtered base query that can be rendered as a page or as a count
#[derive(Debug, Clone, Default)]
pub struct PageQuery {
    table: String,
    columns: Vec<String>,
    where_clause: Option<String>,
    params: Vec<Value>,
    order_by: Option<String>,
}

impl PageQuery {
    pub fn new(table: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            table: table.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Raw WHERE fragment using `$1..$n` for `params`
    pub fn filter(mut self, where_clause: impl Into<String>, params: Vec<Value>) -> Self {
        self.where_clause = Some(where_clause.into());
        self.params = params;
        self
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    fn where_fragment(&self) -> &str {
        self.where_clause.as_deref().unwrap_or("")
    }

    pub fn select_sql(&self) -> String {
        let columns: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        let mut sql = build_select_query(&self.table, &columns, self.where_fragment());
        if let Some(order_by) = &self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        }
        let n = self.params.len();
        sql.push_str(&format!(" LIMIT ${} OFFSET ${}", n + 1, n + 2));
        sql
    }

    pub fn count_sql(&self) -> String {
        build_select_query(&self.table, &["COUNT(*) AS count"], self.where_fragment())
    }
}

/// One page of records plus the unpaged total
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    /// Zero when there are no records or the page size is not positive
    pub fn total_pages(&self) -> i64 {
        if self.total <= 0 || self.per_page <= 0 {
            return 0;
        }
        (self.total + self.per_page - 1) / self.per_page
    }

    pub fn meta(&self) -> PageMeta {
        PageMeta {
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages(),
        }
    }
}

/// Count the filtered base, then fetch the requested page of it
pub async fn count_and_paginate<T>(
    pool: &PgPool,
    query: &PageQuery,
    pagination: Pagination,
) -> Result<Page<T>, DatabaseError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let count_sql = query.count_sql();
    let mut count_q = sqlx::query(&count_sql);
    for p in query.params.iter() {
        count_q = bind_param_query(count_q, p);
    }
    let row = count_q.fetch_one(pool).await?;
    let total: i64 = row.try_get("count")?;

    let select_sql = query.select_sql();
    let mut select_q = sqlx::query_as::<_, T>(&select_sql);
    for p in query.params.iter() {
        select_q = bind_param_query_as(select_q, p);
    }
    let records = select_q
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(pool)
        .await?;

    tracing::debug!(
        "Paginated {}: page {} of {} rows",
        query.table,
        pagination.page,
        total
    );

    Ok(Page {
        records,
        total,
        page: pagination.page,
        per_page: pagination.per_page,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clamps_page_and_per_page() {
        assert_eq!(Pagination::new(0, 20), Pagination { page: 1, per_page: 20 });
        assert_eq!(Pagination::new(-3, 20).page, 1);
        assert_eq!(Pagination::new(2, 0).per_page, DEFAULT_PER_PAGE);
        assert_eq!(Pagination::new(2, -5).per_page, DEFAULT_PER_PAGE);
        assert_eq!(Pagination::new(2, 1001).per_page, DEFAULT_PER_PAGE);
        assert_eq!(Pagination::new(2, 1000).per_page, 1000);
    }

    #[test]
    fn offset_is_zero_based() {
        assert_eq!(Pagination::new(1, 10).offset(), 0);
        assert_eq!(Pagination::new(3, 25).offset(), 50);
        assert_eq!(Pagination::new(3, 25).limit(), 25);
    }

    #[test]
    fn reads_from_query_string() {
        let uri: Uri = "/books?page=3&per_page=5".parse().unwrap();
        assert_eq!(Pagination::from_uri(&uri), Pagination { page: 3, per_page: 5 });

        let uri: Uri = "/books?page=abc&per_page=5000".parse().unwrap();
        assert_eq!(Pagination::from_uri(&uri), Pagination { page: 1, per_page: 10 });
    }

    #[test]
    fn renders_page_and_count_sql() {
        let q = PageQuery::new("books", &["id", "title"])
            .filter("author_id = $1", vec![json!(7)])
            .order_by("id DESC");
        assert_eq!(
            q.select_sql(),
            "SELECT id, title FROM books WHERE author_id = $1 ORDER BY id DESC LIMIT $2 OFFSET $3"
        );
        assert_eq!(q.count_sql(), "SELECT COUNT(*) AS count FROM books WHERE author_id = $1");

        let q = PageQuery::new("books", &["id"]);
        assert_eq!(q.select_sql(), "SELECT id FROM books LIMIT $1 OFFSET $2");
        assert_eq!(q.count_sql(), "SELECT COUNT(*) AS count FROM books");
    }

    #[test]
    fn total_pages_rounds_up() {
        let page: Page<()> = Page { records: vec![], total: 21, page: 1, per_page: 10 };
        assert_eq!(page.total_pages(), 3);
        assert_eq!(
            page.meta(),
            PageMeta { page: 1, per_page: 10, total: 21, total_pages: 3 }
        );

        let empty: Page<()> = Page { records: vec![], total: 0, page: 1, per_page: 10 };
        assert_eq!(empty.total_pages(), 0);
    }

    #[test]
    fn total_pages_with_non_positive_page_size_is_zero() {
        let page: Page<()> = Page { records: vec![], total: 1, page: 1, per_page: 0 };
        assert_eq!(page.total_pages(), 0);
        assert_eq!(page.meta().total_pages, 0);

        let page: Page<()> = Page { records: vec![], total: 5, page: 1, per_page: -3 };
        assert_eq!(page.total_pages(), 0);
    }
}
