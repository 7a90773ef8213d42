//! What makes a record type a catalog entity.
//!
//! Everything the generic service needs to know about a type lives on
//! [`CatalogEntity`]: where it is stored, which fields users may filter on,
//! which fields must be unique among live records, and how payloads are
//! validated.

use docstore::EntityConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::CatalogConfig;
use crate::contract::model::{
    Category, CategoryPatch, NewCategory, NewProduct, NewTag, Product, ProductPatch, Tag, TagPatch,
};
use crate::domain::error::DomainError;

pub const MAX_NAME_LENGTH: usize = 200;

/// Fields every entity exposes to filters and sorting.
const COMMON_FIELDS: &[&str] = &["id", "createdAt", "updatedAt"];

pub trait CatalogEntity: Serialize + DeserializeOwned + Send + Sync + 'static {
    type New: Serialize + DeserializeOwned + Send + Sync + 'static;
    type Patch: Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Display name used in messages ("Product").
    const NAME: &'static str;
    const COLLECTION: &'static str;
    /// Mount point of the REST routes ("/products").
    const PATH: &'static str;
    /// Fields advanced filters may reference, besides the common ones.
    const FILTERABLE_FIELDS: &'static [&'static str];
    /// Fields whose values must be unique among non-deleted records.
    const UNIQUE_FIELDS: &'static [&'static str];

    fn validate_new(new: &Self::New) -> Result<(), DomainError>;

    fn validate_patch(patch: &Self::Patch) -> Result<(), DomainError>;

    fn entity_config(cfg: &CatalogConfig) -> EntityConfig {
        EntityConfig::new(Self::COLLECTION)
            .with_allowed_fields(
                COMMON_FIELDS
                    .iter()
                    .chain(Self::FILTERABLE_FIELDS)
                    .copied(),
            )
            .with_max_filter_depth(cfg.max_filter_depth)
    }
}

fn validate_name(field: &str, name: &str) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::validation(field, "must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(DomainError::validation(
            field,
            format!("must be at most {MAX_NAME_LENGTH} characters"),
        ));
    }
    Ok(())
}

/// Lowercase ASCII words joined by single hyphens.
fn validate_slug(slug: &str) -> Result<(), DomainError> {
    let well_formed = !slug.is_empty()
        && slug
            .split('-')
            .all(|w| !w.is_empty() && w.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    if !well_formed {
        return Err(DomainError::validation(
            "slug",
            "must be lowercase letters and digits separated by single hyphens",
        ));
    }
    Ok(())
}

fn validate_price(price: f64) -> Result<(), DomainError> {
    if !price.is_finite() || price < 0.0 {
        return Err(DomainError::validation("price", "must be a non-negative number"));
    }
    Ok(())
}

fn validate_sku(sku: &str) -> Result<(), DomainError> {
    if sku.trim().is_empty() {
        return Err(DomainError::validation("sku", "must not be empty"));
    }
    Ok(())
}

impl CatalogEntity for Product {
    type New = NewProduct;
    type Patch = ProductPatch;

    const NAME: &'static str = "Product";
    const COLLECTION: &'static str = "products";
    const PATH: &'static str = "/products";
    const FILTERABLE_FIELDS: &'static [&'static str] =
        &["name", "description", "price", "sku", "categoryId", "tags"];
    const UNIQUE_FIELDS: &'static [&'static str] = &["sku"];

    fn validate_new(new: &NewProduct) -> Result<(), DomainError> {
        validate_name("name", &new.name)?;
        validate_price(new.price)?;
        if let Some(sku) = &new.sku {
            validate_sku(sku)?;
        }
        Ok(())
    }

    fn validate_patch(patch: &ProductPatch) -> Result<(), DomainError> {
        if let Some(name) = &patch.name {
            validate_name("name", name)?;
        }
        if let Some(price) = patch.price {
            validate_price(price)?;
        }
        if let Some(sku) = &patch.sku {
            validate_sku(sku)?;
        }
        Ok(())
    }
}

impl CatalogEntity for Category {
    type New = NewCategory;
    type Patch = CategoryPatch;

    const NAME: &'static str = "Category";
    const COLLECTION: &'static str = "categories";
    const PATH: &'static str = "/categories";
    const FILTERABLE_FIELDS: &'static [&'static str] = &["name", "slug", "description", "parentId"];
    const UNIQUE_FIELDS: &'static [&'static str] = &["slug"];

    fn validate_new(new: &NewCategory) -> Result<(), DomainError> {
        validate_name("name", &new.name)?;
        validate_slug(&new.slug)
    }

    fn validate_patch(patch: &CategoryPatch) -> Result<(), DomainError> {
        if let Some(name) = &patch.name {
            validate_name("name", name)?;
        }
        if let Some(slug) = &patch.slug {
            validate_slug(slug)?;
        }
        Ok(())
    }
}

impl CatalogEntity for Tag {
    type New = NewTag;
    type Patch = TagPatch;

    const NAME: &'static str = "Tag";
    const COLLECTION: &'static str = "tags";
    const PATH: &'static str = "/tags";
    const FILTERABLE_FIELDS: &'static [&'static str] = &["name", "slug"];
    const UNIQUE_FIELDS: &'static [&'static str] = &["name", "slug"];

    fn validate_new(new: &NewTag) -> Result<(), DomainError> {
        validate_name("name", &new.name)?;
        validate_slug(&new.slug)
    }

    fn validate_patch(patch: &TagPatch) -> Result<(), DomainError> {
        if let Some(name) = &patch.name {
            validate_name("name", name)?;
        }
        if let Some(slug) = &patch.slug {
            validate_slug(slug)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, price: f64) -> NewProduct {
        NewProduct {
            name: name.into(),
            description: None,
            price,
            sku: None,
            category_id: None,
            tags: vec![],
        }
    }

    #[test]
    fn product_validation() {
        assert!(Product::validate_new(&product("Widget", 9.5)).is_ok());
        assert!(matches!(
            Product::validate_new(&product("  ", 1.0)),
            Err(DomainError::Validation { ref field, .. }) if field == "name"
        ));
        assert!(Product::validate_new(&product("Widget", -1.0)).is_err());
        assert!(Product::validate_new(&product("Widget", f64::NAN)).is_err());
        assert!(Product::validate_new(&product(&"x".repeat(MAX_NAME_LENGTH + 1), 1.0)).is_err());
    }

    #[test]
    fn empty_patch_is_valid() {
        assert!(Product::validate_patch(&ProductPatch::default()).is_ok());
        assert!(Tag::validate_patch(&TagPatch::default()).is_ok());
    }

    #[test]
    fn slugs() {
        assert!(validate_slug("home-garden-2").is_ok());
        for bad in ["", "Home", "a--b", "-a", "a-", "a b", "ä"] {
            assert!(validate_slug(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn entity_config_allows_common_and_entity_fields() {
        let cfg = Product::entity_config(&CatalogConfig::default());
        let allowed = cfg.allowed_fields.unwrap();
        assert!(allowed.contains("price"));
        assert!(allowed.contains("createdAt"));
        assert!(!allowed.contains("isDeleted"));
        assert_eq!(cfg.collection, "products");
    }
}
