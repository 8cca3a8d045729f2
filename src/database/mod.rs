pub mod manager;
pub mod migrate;
pub mod pagination;
pub mod query_builder;
pub mod transaction;

pub use manager::{
    close, connect_postgres, connect_postgres_url, init, init_from_url, open_pool, ping,
    url_connect_options, DatabaseError, PoolBounds, PostgresConfig,
};
pub use migrate::{auto_migrate, ColumnDef, Model, TableSchema};
pub use pagination::{count_and_paginate, Page, PageMeta, PageQuery, Pagination};
pub use query_builder::{
    build_insert_query, build_select_query, build_update_query, check_rows_affected, RowsAffected,
};
pub use transaction::with_transaction;
