//! The list-query executor shared by every entity repository.

use query_core::path::is_valid_field_path;
use query_core::{
    merge_filters, merge_layers, to_expr, translate, FilterDocument, FilterParser, PageRequest,
    Paginated, Pagination, QueryOptions, SortKey, DEFAULT_ITEMS_PER_PAGE,
};
use tracing::{debug, instrument, warn};

use crate::entity::EntityConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::{Document, DocumentStore, FindQuery, ID_FIELD};

/// One list request as received from a caller.
///
/// `base_filter` is trusted server-side input. `advanced` is a user filter
/// string and gets sanitized; `contextual` is a trusted filter string (for
/// example the trash view) and does not.
#[derive(Clone, Debug, Default)]
pub struct PageQuery {
    pub base_filter: FilterDocument,
    pub page: PageRequest,
    pub options: QueryOptions,
    pub advanced: Option<String>,
    pub contextual: Option<String>,
}

/// Requested sort keys, minus invalid field names, with an `id` tiebreaker.
pub fn sort_keys(options: &QueryOptions) -> Vec<SortKey> {
    let mut keys: Vec<SortKey> = options
        .sort_keys()
        .into_iter()
        .filter(|k| {
            let ok = is_valid_field_path(&k.field);
            if !ok {
                warn!(field = %k.field, "dropping sort key with invalid field name");
            }
            ok
        })
        .collect();
    if !keys.iter().any(|k| k.field == ID_FIELD) {
        keys.push(SortKey::asc(ID_FIELD));
    }
    keys
}

/// Filter behind `totalRows`: the permanent filter, the deletion state taken
/// from the combined filter, and the contextual filter. Search terms from the
/// base and advanced layers are left out.
fn total_rows_filter(
    config: &EntityConfig,
    permanent: &FilterDocument,
    combined: &FilterDocument,
    contextual: &FilterDocument,
) -> FilterDocument {
    let mut deletion_state = FilterDocument::new();
    if let Some(v) = combined.get(&config.soft_delete_field) {
        deletion_state.insert(config.soft_delete_field.clone(), v.clone());
    }
    merge_layers([permanent, &deletion_state, contextual])
}

/// The four filter layers of one list request, already translated.
struct Layers<'a> {
    permanent: &'a FilterDocument,
    base: &'a FilterDocument,
    advanced: &'a FilterDocument,
    contextual: &'a FilterDocument,
}

/// Run a filtered, sorted, paginated query plus its two counts.
///
/// Malformed `advanced`/`contextual` strings degrade to empty filters, and so
/// does an advanced filter the store cannot evaluate. A base or permanent
/// filter that does not compile is an error, as is any other store failure.
#[instrument(
    name = "docstore.find_paginated",
    skip_all,
    fields(collection = %config.collection, backend = store.backend())
)]
pub async fn find_paginated(
    store: &dyn DocumentStore,
    config: &EntityConfig,
    parser: &FilterParser,
    query: &PageQuery,
) -> StoreResult<Paginated<Document>> {
    let advanced = parser.parse(query.advanced.as_deref(), true);
    let contextual = parser.parse(query.contextual.as_deref(), false);
    let permanent = translate(&config.permanent_filter)?;
    let base = translate(&query.base_filter)?;

    let layers = Layers {
        permanent: &permanent,
        base: &base,
        advanced: &advanced,
        contextual: &contextual,
    };
    match execute(store, config, query, &layers).await {
        Err(StoreError::UnsupportedFilter(reason)) if !advanced.is_empty() => {
            warn!(%reason, "store cannot evaluate the advanced filter; ignoring it");
            let empty = FilterDocument::new();
            let layers = Layers {
                advanced: &empty,
                ..layers
            };
            execute(store, config, query, &layers).await
        }
        other => other,
    }
}

async fn execute(
    store: &dyn DocumentStore,
    config: &EntityConfig,
    query: &PageQuery,
    layers: &Layers<'_>,
) -> StoreResult<Paginated<Document>> {
    let combined = merge_filters(layers.permanent, layers.base, layers.advanced, layers.contextual);
    let filter = to_expr(&combined)?;
    let total_filter = to_expr(&total_rows_filter(
        config,
        layers.permanent,
        &combined,
        layers.contextual,
    ))?;

    let page = query.page.resolve(DEFAULT_ITEMS_PER_PAGE);
    let find = FindQuery {
        filter: filter.clone(),
        sort: sort_keys(&query.options),
        skip: page.skip(),
        limit: Some(page.items_per_page),
        projection: query.options.projection.clone(),
    };

    let collection = config.collection.as_str();
    let (data, total_filtered_rows, total_rows) = tokio::try_join!(
        store.find(collection, &find),
        store.count(collection, &filter),
        store.count(collection, &total_filter),
    )?;

    debug!(
        page = page.page,
        items_per_page = page.items_per_page,
        returned = data.len(),
        total_filtered_rows,
        total_rows,
        "list query done"
    );
    Ok(Paginated {
        data,
        pagination: Pagination::new(page, total_filtered_rows, total_rows),
    })
}
