use std::sync::Arc;

use docstore::{connect, DataAccess, Document, EntityConfig, PageQuery, Repository, StoreError};
use serde_json::{json, Value};

const BACKENDS: [&str; 2] = ["memory://", "sqlite::memory:"];

fn doc(v: Value) -> Document {
    v.as_object().cloned().expect("test document must be an object")
}

async fn repo(url: &str) -> anyhow::Result<Repository> {
    let store = connect(url).await?;
    Ok(Repository::new(Arc::clone(&store), EntityConfig::new("tags")))
}

#[tokio::test]
async fn create_sets_managed_fields() -> anyhow::Result<()> {
    for url in BACKENDS {
        let repo = repo(url).await?;
        let created = repo
            .create(doc(json!({"name": "rust", "isDeleted": true, "createdAt": "forged"})))
            .await?;
        let id = created["id"].as_str().expect("generated id");
        assert!(uuid::Uuid::parse_str(id).is_ok(), "{url}");
        assert_eq!(created["isDeleted"], json!(false), "{url}");
        assert_ne!(created["createdAt"], json!("forged"), "{url}");
        assert_eq!(created["createdAt"], created["updatedAt"], "{url}");

        let loaded = repo.find_by_id(id).await?.expect("visible after create");
        assert_eq!(loaded, created, "{url}");
    }
    Ok(())
}

#[tokio::test]
async fn explicit_ids_must_be_unique() -> anyhow::Result<()> {
    for url in BACKENDS {
        let repo = repo(url).await?;
        repo.create(doc(json!({"id": "t1", "name": "a"}))).await?;
        let err = repo
            .create(doc(json!({"id": "t1", "name": "b"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }), "{url}: {err}");
    }
    Ok(())
}

#[tokio::test]
async fn update_merges_and_protects_managed_fields() -> anyhow::Result<()> {
    for url in BACKENDS {
        let repo = repo(url).await?;
        repo.create(doc(json!({"id": "t1", "name": "a", "color": "red"})))
            .await?;
        let updated = repo
            .update("t1", doc(json!({"name": "b", "id": "other", "isDeleted": true})))
            .await?
            .expect("record exists");
        assert_eq!(updated["id"], json!("t1"), "{url}");
        assert_eq!(updated["name"], json!("b"), "{url}");
        assert_eq!(updated["color"], json!("red"), "{url}");
        assert_eq!(updated["isDeleted"], json!(false), "{url}");

        assert!(repo.update("missing", Document::new()).await?.is_none(), "{url}");
    }
    Ok(())
}

#[tokio::test]
async fn soft_delete_restore_and_purge() -> anyhow::Result<()> {
    for url in BACKENDS {
        let repo = repo(url).await?;
        repo.create(doc(json!({"id": "t1", "name": "a"}))).await?;

        let deleted = repo.soft_delete("t1").await?.expect("was visible");
        assert_eq!(deleted["isDeleted"], json!(true), "{url}");
        assert!(deleted["deletedAt"].is_string(), "{url}");
        assert!(repo.find_by_id("t1").await?.is_none(), "{url}");
        assert!(repo.find_by_id_any("t1").await?.is_some(), "{url}");
        assert!(repo.soft_delete("t1").await?.is_none(), "{url}");

        let trash = repo
            .find_paginated(&PageQuery {
                contextual: Some(r#"{"isDeleted": true}"#.into()),
                ..Default::default()
            })
            .await?;
        assert_eq!(trash.pagination.total_rows, 1, "{url}");

        let restored = repo.restore("t1").await?.expect("exists");
        assert_eq!(restored["isDeleted"], json!(false), "{url}");
        assert_eq!(restored["deletedAt"], Value::Null, "{url}");
        assert!(repo.find_by_id("t1").await?.is_some(), "{url}");

        assert!(repo.delete("t1").await?, "{url}");
        assert!(repo.find_by_id_any("t1").await?.is_none(), "{url}");
        assert!(!repo.delete("t1").await?, "{url}");
    }
    Ok(())
}

#[tokio::test]
async fn exists_where_ignores_excluded_and_deleted() -> anyhow::Result<()> {
    for url in BACKENDS {
        let repo = repo(url).await?;
        repo.create(doc(json!({"id": "t1", "name": "rust"}))).await?;
        repo.create(doc(json!({"id": "t2", "name": "go"}))).await?;

        let by_name = doc(json!({"name": "rust"}));
        assert!(repo.exists_where(&by_name, None).await?, "{url}");
        assert!(!repo.exists_where(&by_name, Some("t1")).await?, "{url}");
        assert!(repo.exists_where(&by_name, Some("t2")).await?, "{url}");

        repo.soft_delete("t1").await?;
        assert!(!repo.exists_where(&by_name, None).await?, "{url}");
    }
    Ok(())
}
