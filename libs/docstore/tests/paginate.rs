//! List-query behaviour, run against every backend.

use std::sync::Arc;

use docstore::{connect, find_paginated, Document, DocumentStore, EntityConfig, PageQuery};
use query_core::{PageRequest, Pagination, QueryOptions};
use serde_json::{json, Value};

const BACKENDS: [&str; 2] = ["memory://", "sqlite::memory:"];

fn doc(v: Value) -> Document {
    v.as_object().cloned().expect("test document must be an object")
}

/// 12 live products (p00..p11, one named "x") and 3 deleted gadgets.
async fn seeded(url: &str) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let store = connect(url).await?;
    for i in 0..12 {
        let name = if i == 3 {
            "x".to_string()
        } else {
            format!("Widget {i}")
        };
        let category = if i % 2 == 0 { "even" } else { "odd" };
        store
            .insert(
                "products",
                doc(json!({
                    "id": format!("p{i:02}"),
                    "name": name,
                    "price": i * 10,
                    "category": category,
                    "isDeleted": false
                })),
            )
            .await?;
    }
    for i in 0..3 {
        store
            .insert(
                "products",
                doc(json!({
                    "id": format!("d{i}"),
                    "name": format!("Old gadget {i}"),
                    "price": 5,
                    "isDeleted": true
                })),
            )
            .await?;
    }
    Ok(store)
}

async fn run(url: &str, query: PageQuery) -> anyhow::Result<(Vec<Document>, Pagination)> {
    let store = seeded(url).await?;
    let cfg = EntityConfig::new("products");
    let page = find_paginated(store.as_ref(), &cfg, &cfg.parser(), &query).await?;
    Ok((page.data, page.pagination))
}

fn ids(data: &[Document]) -> Vec<&str> {
    data.iter().filter_map(|d| d["id"].as_str()).collect()
}

fn pagination(page: u64, per: u64, filtered: u64, total: u64, pages: u64) -> Pagination {
    Pagination {
        page,
        items_per_page: per,
        total_filtered_rows: filtered,
        total_rows: total,
        pages,
    }
}

#[tokio::test]
async fn second_page_of_twelve() -> anyhow::Result<()> {
    for url in BACKENDS {
        let (data, p) = run(
            url,
            PageQuery {
                page: PageRequest::new(2, 5),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(ids(&data), ["p05", "p06", "p07", "p08", "p09"], "{url}");
        assert_eq!(p, pagination(2, 5, 12, 12, 3), "{url}");
    }
    Ok(())
}

#[tokio::test]
async fn search_narrows_filtered_rows_only() -> anyhow::Result<()> {
    for url in BACKENDS {
        let (data, p) = run(
            url,
            PageQuery {
                page: PageRequest::new(1, 5),
                advanced: Some(r#"{"name":{"$eq":"x"}}"#.into()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(ids(&data), ["p03"], "{url}");
        assert_eq!(p, pagination(1, 5, 1, 12, 1), "{url}");
    }
    Ok(())
}

#[tokio::test]
async fn user_cannot_reveal_deleted_records() -> anyhow::Result<()> {
    for url in BACKENDS {
        let (data, p) = run(
            url,
            PageQuery {
                page: PageRequest::new(1, 100),
                advanced: Some(r#"{"isDeleted": true, "$where": "1"}"#.into()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(data.len(), 12, "{url}");
        assert!(data.iter().all(|d| d["isDeleted"] == json!(false)), "{url}");
        assert_eq!(p.total_filtered_rows, 12, "{url}");
    }
    Ok(())
}

#[tokio::test]
async fn contextual_trash_view_counts_deleted_only() -> anyhow::Result<()> {
    for url in BACKENDS {
        let (data, p) = run(
            url,
            PageQuery {
                contextual: Some(r#"{"isDeleted": true}"#.into()),
                advanced: Some(r#"{"name":{"contains":"GADGET 1"}}"#.into()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(ids(&data), ["d1"], "{url}");
        assert_eq!(p, pagination(1, 10, 1, 3, 1), "{url}");
    }
    Ok(())
}

#[tokio::test]
async fn malformed_filter_is_ignored() -> anyhow::Result<()> {
    for url in BACKENDS {
        let (_, p) = run(
            url,
            PageQuery {
                advanced: Some("{not json".into()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(p, pagination(1, 10, 12, 12, 2), "{url}");
    }
    Ok(())
}

#[tokio::test]
async fn sort_and_projection() -> anyhow::Result<()> {
    for url in BACKENDS {
        let (data, _) = run(
            url,
            PageQuery {
                page: PageRequest::new(1, 2),
                options: QueryOptions {
                    projection: Some(vec!["name".into()]),
                    sort_by: vec!["price".into()],
                    sort_desc: vec![true],
                },
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(
            data.into_iter().map(Value::Object).collect::<Vec<_>>(),
            vec![
                json!({"id": "p11", "name": "Widget 11"}),
                json!({"id": "p10", "name": "Widget 10"}),
            ],
            "{url}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn out_of_range_and_clamped_pages() -> anyhow::Result<()> {
    for url in BACKENDS {
        let (data, p) = run(
            url,
            PageQuery {
                page: PageRequest::new(9, 5),
                ..Default::default()
            },
        )
        .await?;
        assert!(data.is_empty(), "{url}");
        assert_eq!(p, pagination(9, 5, 12, 12, 3), "{url}");

        let (data, p) = run(
            url,
            PageQuery {
                page: PageRequest::new(0, -5),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(ids(&data), ["p00"], "{url}");
        assert_eq!(p, pagination(1, 1, 12, 12, 12), "{url}");
    }
    Ok(())
}

#[tokio::test]
async fn generic_operators_inside_or() -> anyhow::Result<()> {
    for url in BACKENDS {
        let (data, p) = run(
            url,
            PageQuery {
                advanced: Some(
                    r#"{"$or":[{"price":{"gte":100}},{"category":{"in":["none"]}}]}"#.into(),
                ),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(ids(&data), ["p10", "p11"], "{url}");
        assert_eq!(p.total_rows, 12, "{url}");
    }
    Ok(())
}

#[tokio::test]
async fn base_filter_is_applied() -> anyhow::Result<()> {
    for url in BACKENDS {
        let (data, p) = run(
            url,
            PageQuery {
                base_filter: doc(json!({"category": "odd", "price": {"$lt": 40}})),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(ids(&data), ["p01", "p03"], "{url}");
        assert_eq!(p.total_filtered_rows, 2, "{url}");
        assert_eq!(p.total_rows, 12, "{url}");
    }
    Ok(())
}

#[tokio::test]
async fn uncompilable_regex_is_ignored() -> anyhow::Result<()> {
    for url in BACKENDS {
        let (_, p) = run(
            url,
            PageQuery {
                advanced: Some(r#"{"name":{"$regex":"(wid"}}"#.into()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(p, pagination(1, 10, 12, 12, 2), "{url}");
    }
    Ok(())
}

#[tokio::test]
async fn regex_the_store_cannot_run_degrades_to_no_advanced_filter() -> anyhow::Result<()> {
    let (data, p) = run(
        "memory://",
        PageQuery {
            advanced: Some(r#"{"name":{"$regex":"^Wi.*t 1$"}}"#.into()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(ids(&data), ["p01"]);
    assert_eq!(p.total_filtered_rows, 1);

    // SQLite only runs literal patterns; the rest of the request still applies
    let (data, p) = run(
        "sqlite::memory:",
        PageQuery {
            base_filter: doc(json!({"category": "odd"})),
            advanced: Some(r#"{"name":{"$regex":"^Wi.*t 1$"}}"#.into()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(ids(&data), ["p01", "p03", "p05", "p07", "p09", "p11"]);
    assert_eq!(p, pagination(1, 10, 6, 12, 1));
    Ok(())
}
