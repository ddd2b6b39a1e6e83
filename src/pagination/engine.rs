// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::time::Duration;

use tracing::debug;

use crate::error::ViewSyncError;
use crate::metrics::{self, LatencyTimer};
use crate::storage::traits::DocumentStore;
use crate::view::query::{QueryOptions, Row, ViewQuery};

use super::cursor::Cursor;
use super::page::{Page, PageRequest};
use super::wrapper::RowWrapper;

/// Serves fixed-size pages of a view.
///
/// A page of `N` rows is read as `N + 1` rows forward from the start cursor;
/// the extra row, when present, becomes the `next` cursor. The `prev` cursor
/// comes from a second read of `N` rows walking the other way from the same
/// cursor, skipping the cursor row itself. Both reads run concurrently.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    count: usize,
    timeout: Option<Duration>,
}

impl Paginator {
    pub fn new(count: usize) -> Result<Self, ViewSyncError> {
        if count == 0 {
            return Err(ViewSyncError::InvalidPageSize(count));
        }
        Ok(Self { count, timeout: None })
    }

    pub fn from_request(request: &PageRequest) -> Result<Self, ViewSyncError> {
        Self::new(request.count)
    }

    /// Fail with [`ViewSyncError::Timeout`] instead of waiting longer than
    /// `timeout` for the store.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Fetch one page of `query`, starting at the encoded cursor `start`
    /// (first page when `None`).
    #[tracing::instrument(skip(self, store, query, start, wrapper), fields(design = %query.design, view = %query.view, count = self.count))]
    pub async fn paginate<T, W>(
        &self,
        store: &dyn DocumentStore,
        query: &ViewQuery,
        start: Option<&str>,
        wrapper: &W,
    ) -> Result<Page<T>, ViewSyncError>
    where
        W: RowWrapper<T> + ?Sized,
    {
        let start = match start {
            Some(token) => Some(Cursor::decode(token).map_err(|e| {
                metrics::record_malformed_cursor();
                e
            })?),
            None => None,
        };

        let read = self.read_page(store, query, start.as_ref());
        let (rows, next, prev) = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, read).await.map_err(|_| {
                metrics::record_timeout("page");
                ViewSyncError::Timeout(limit)
            })??,
            None => read.await?,
        };

        debug!(rows = rows.len(), has_next = next.is_some(), has_prev = prev.is_some(), "Page read");
        metrics::record_page(next.is_some(), prev.is_some());

        let items = rows
            .into_iter()
            .map(|row| wrapper.wrap(row))
            .collect::<Result<Vec<T>, _>>()?;
        Ok(Page { items, next, prev })
    }

    /// [`paginate`](Self::paginate) with the cursor taken from a client request.
    pub async fn paginate_request<T, W>(
        store: &dyn DocumentStore,
        query: &ViewQuery,
        request: &PageRequest,
        wrapper: &W,
    ) -> Result<Page<T>, ViewSyncError>
    where
        W: RowWrapper<T> + ?Sized,
    {
        Self::from_request(request)?
            .paginate(store, query, request.start.as_deref(), wrapper)
            .await
    }

    async fn read_page(
        &self,
        store: &dyn DocumentStore,
        query: &ViewQuery,
        start: Option<&Cursor>,
    ) -> Result<(Vec<Row>, Option<Cursor>, Option<Cursor>), ViewSyncError> {
        match start {
            None => {
                let mut rows = read(store, query, &self.forward(&query.options, None)).await?;
                let next = self.split_next(&mut rows);
                Ok((rows, next, None))
            }
            Some(cursor) => {
                let forward = self.forward(&query.options, Some(cursor));
                let backward = self.backward(&query.options, cursor);
                let (mut rows, before) = tokio::try_join!(
                    read(store, query, &forward),
                    read(store, query, &backward),
                )?;
                let next = self.split_next(&mut rows);
                let prev = before.last().map(Cursor::from_row);
                Ok((rows, next, prev))
            }
        }
    }

    /// `N + 1` rows from the cursor (inclusive) in the query's direction.
    fn forward(&self, base: &QueryOptions, cursor: Option<&Cursor>) -> QueryOptions {
        let mut options = base.clone();
        options.limit = Some(self.count.saturating_add(1));
        options.reduce = Some(false);
        if let Some(cursor) = cursor {
            options.start_key = Some(cursor.key.clone());
            options.start_key_doc_id = Some(cursor.id.clone());
            options.skip = 0;
        }
        options
    }

    /// `N` rows before the cursor, walking backwards towards the query's own
    /// start bound.
    fn backward(&self, base: &QueryOptions, cursor: &Cursor) -> QueryOptions {
        QueryOptions {
            limit: Some(self.count),
            start_key: Some(cursor.key.clone()),
            start_key_doc_id: Some(cursor.id.clone()),
            end_key: base.start_key.clone(),
            end_key_doc_id: base.start_key_doc_id.clone(),
            inclusive_end: true,
            skip: 1,
            descending: !base.descending,
            include_docs: false,
            reduce: Some(false),
        }
    }

    fn split_next(&self, rows: &mut Vec<Row>) -> Option<Cursor> {
        if rows.len() <= self.count {
            return None;
        }
        let overflow = rows.split_off(self.count);
        overflow.first().map(Cursor::from_row)
    }
}

/// One page of `query` with `count` items per page.
pub async fn paginate<T, W>(
    store: &dyn DocumentStore,
    query: &ViewQuery,
    count: usize,
    start: Option<&str>,
    wrapper: &W,
) -> Result<Page<T>, ViewSyncError>
where
    W: RowWrapper<T> + ?Sized,
{
    Paginator::new(count)?.paginate(store, query, start, wrapper).await
}

/// Read every row of `query` (no pagination) and wrap each one.
///
/// Map rows are read unless the query asks for reduction explicitly with
/// [`ViewQuery::reduce`].
#[tracing::instrument(skip(store, query, wrapper), fields(design = %query.design, view = %query.view))]
pub async fn query_rows<T, W>(store: &dyn DocumentStore, query: &ViewQuery, wrapper: &W) -> Result<Vec<T>, ViewSyncError>
where
    W: RowWrapper<T> + ?Sized,
{
    let rows = read(store, query, &map_rows_by_default(&query.options)).await?;
    rows.into_iter().map(|row| wrapper.wrap(row)).collect()
}

fn map_rows_by_default(base: &QueryOptions) -> QueryOptions {
    let mut options = base.clone();
    options.reduce.get_or_insert(false);
    options
}

async fn read(store: &dyn DocumentStore, query: &ViewQuery, options: &QueryOptions) -> Result<Vec<Row>, ViewSyncError> {
    let _timer = LatencyTimer::new("view_query");
    match store.query_view(&query.design, &query.view, options).await {
        Ok(rows) => {
            metrics::record_view_query(&query.design, &query.view, "success");
            metrics::record_view_rows(rows.len());
            Ok(rows)
        }
        Err(e) => {
            metrics::record_view_query(&query.design, &query.view, "error");
            metrics::record_store_error("query", e.kind());
            Err(e.into())
        }
    }
}
