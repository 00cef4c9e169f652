//! # Product Catalog
//!
//! The cart only *reads* the catalog: it needs a price per product id to
//! compute totals. The catalog is owned elsewhere (a product store, an API
//! cache), so it is modelled as a trait.
//!
//! ## Revisions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  total_price depends on (cart items, catalog prices).                   │
//! │                                                                         │
//! │  The store memoizes it under the key                                    │
//! │      (items_version, catalog.revision())                                │
//! │                                                                         │
//! │  A catalog that can change must bump its revision on every change,      │
//! │  otherwise a cached total goes stale. A frozen catalog may keep the     │
//! │  default revision of 0.                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::error::{CoreResult, ValidationError};
use crate::types::{CatalogProduct, ProductId};
use crate::validation::validate_catalog_product;

// =============================================================================
// Catalog Contract
// =============================================================================

/// Read-only product lookup.
pub trait ProductCatalog: Send + Sync {
    /// Looks up a product by id.
    fn get(&self, id: &str) -> Option<CatalogProduct>;

    /// Change counter; see the module docs.
    fn revision(&self) -> u64 {
        0
    }
}

/// A plain map is a frozen catalog.
impl ProductCatalog for HashMap<ProductId, CatalogProduct> {
    fn get(&self, id: &str) -> Option<CatalogProduct> {
        HashMap::get(self, id).cloned()
    }
}

// =============================================================================
// In-Memory Catalog
// =============================================================================

/// Catalog held in memory, safe to share between the UI layer (which loads
/// products) and the cart (which reads prices).
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<ProductId, CatalogProduct>>,
    revision: AtomicU64,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from trusted records without validation.
    ///
    /// Later records win when ids repeat.
    pub fn from_products(products: impl IntoIterator<Item = CatalogProduct>) -> Self {
        let map = products
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect::<HashMap<_, _>>();

        InMemoryCatalog {
            products: RwLock::new(map),
            revision: AtomicU64::new(0),
        }
    }

    /// Builds a catalog from untrusted records, validating each one and
    /// rejecting duplicate ids.
    pub fn try_from_products(
        products: impl IntoIterator<Item = CatalogProduct>,
    ) -> CoreResult<Self> {
        let mut map = HashMap::new();

        for product in products {
            validate_catalog_product(&product)?;
            if map.contains_key(&product.id) {
                return Err(ValidationError::Duplicate {
                    field: "product id".to_string(),
                    value: product.id,
                }
                .into());
            }
            map.insert(product.id.clone(), product);
        }

        Ok(InMemoryCatalog {
            products: RwLock::new(map),
            revision: AtomicU64::new(0),
        })
    }

    /// Parses a JSON array of products.
    ///
    /// ## Format
    /// ```json
    /// [
    ///   { "id": "A", "name": "Apple", "price_cents": 200 },
    ///   { "id": "B", "name": "Bread", "price_cents": 350 }
    /// ]
    /// ```
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let products: Vec<CatalogProduct> =
            serde_json::from_str(json).map_err(|e| ValidationError::InvalidFormat {
                field: "catalog".to_string(),
                reason: e.to_string(),
            })?;

        Self::try_from_products(products)
    }

    /// Inserts or replaces a product and bumps the revision.
    pub fn upsert(&self, product: CatalogProduct) -> CoreResult<()> {
        validate_catalog_product(&product)?;

        self.products
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(product.id.clone(), product);
        self.revision.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Removes a product, bumping the revision if it existed.
    pub fn remove(&self, id: &str) -> Option<CatalogProduct> {
        let removed = self
            .products
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);

        if removed.is_some() {
            self.revision.fetch_add(1, Ordering::AcqRel);
        }
        removed
    }

    /// Number of products.
    pub fn len(&self) -> usize {
        self.products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProductCatalog for InMemoryCatalog {
    fn get(&self, id: &str) -> Option<CatalogProduct> {
        self.products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
