use crate::filter::{Filter, Schema};
use crate::models::Model;
use crate::paging::{apply_cursor, bound_page_size, next_page_token};
use crate::storage::{Query, Store};

use super::error::RegistryResult;
use super::messages::{ListRequest, ListResponse};
use super::RegistryConfig;

/// read one page of `query`, keeping the models `request.filter` accepts
///
/// Rows that fail to decode are logged and skipped. The page ends once it
/// holds the bounded page size or the scan runs out.
pub(crate) fn list_page<M: Model>(
    store: &mut dyn Store,
    query: Query,
    schema: &Schema,
    request: &ListRequest,
    config: &RegistryConfig,
) -> RegistryResult<ListResponse<M>> {
    let page_size = bound_page_size(request.page_size, config.default_page_size, config.max_page_size)?;
    let filter = Filter::compile(&request.filter, schema)?;
    let query = apply_cursor(query, &request.page_token)?;

    let mut rows = store.run(&query)?;
    let mut items = Vec::new();
    while items.len() < page_size {
        let Some(row) = rows.next() else {
            break;
        };
        let model = match M::from_row(&row) {
            Ok(model) => model,
            Err(e) => {
                tracing::warn!(table = M::TABLE, key = %row.key, error = %e, "skipping undecodable row");
                continue;
            }
        };
        if filter.is_empty() || filter.matches(&model.fields()?)? {
            items.push(model);
        }
    }

    let next_page_token = next_page_token(&rows, items.len(), page_size);
    tracing::debug!(table = M::TABLE, returned = items.len(), more = !next_page_token.is_empty(), "listed");
    Ok(ListResponse { items, next_page_token })
}

/// `query` constrained by `filters`
pub(crate) fn select(mut query: Query, filters: Vec<(&'static str, String)>) -> Query {
    for (field, value) in filters {
        query = query.require(field, value);
    }
    query
}
