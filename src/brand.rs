//! Brand reference store: brand identities, their canonical domains and the
//! precomputed reference logo embeddings they are matched against.
//!
//! The store is a persisted JSON artifact produced offline. It is loaded once
//! at startup, validated, and shared read-only (`Arc`) across all analyses.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::embedding::Embedding;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Reference store not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read reference store: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse reference store: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Brand '{0}' has no canonical domains")]
    EmptyDomains(String),

    #[error("Brand '{0}' has no reference embeddings")]
    NoEmbeddings(String),

    #[error("Brand '{brand}' embedding '{image}' is empty")]
    EmptyVector { brand: String, image: String },

    #[error("Brand '{brand}' embedding '{image}' has dimension {found}, expected {expected}")]
    DimensionMismatch {
        brand: String,
        image: String,
        expected: usize,
        found: usize,
    },

    #[error("Duplicate brand id '{0}' in reference store")]
    DuplicateBrand(String),
}

/// One reference logo embedding with the image it was computed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceEmbedding {
    /// Identifier of the source reference image (for audit output).
    pub source: String,
    pub vector: Vec<f32>,
}

impl ReferenceEmbedding {
    pub fn embedding(&self) -> Embedding {
        Embedding::new(self.vector.clone())
    }
}

/// One known brand: identity, domains it legitimately owns, reference logos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandEntry {
    pub brand_id: String,
    /// Registrable domain labels (e.g. "paypal"), stored lowercase.
    pub domains: Vec<String>,
    pub embeddings: Vec<ReferenceEmbedding>,
}

impl BrandEntry {
    /// Case-insensitive membership test against the canonical domains.
    pub fn owns_domain(&self, registrable: &str) -> bool {
        if registrable.is_empty() {
            return false;
        }
        let needle = registrable.to_lowercase();
        self.domains.iter().any(|d| d.to_lowercase() == needle)
    }
}

/// Root of the persisted artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceStore {
    pub brands: Vec<BrandEntry>,
}

impl ReferenceStore {
    /// Load and validate the store from a JSON file.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let store: ReferenceStore = serde_json::from_str(&content)?;
        store.validate()?;

        debug!(
            brands = store.brand_count(),
            embeddings = store.embedding_count(),
            "reference store loaded"
        );
        Ok(store)
    }

    /// Enforce the store invariants: every brand has at least one canonical
    /// domain and one embedding, ids are unique, and all vectors share one
    /// dimension across the whole store.
    pub fn validate(&self) -> Result<(), StoreError> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut expected_dim: Option<usize> = None;

        for brand in &self.brands {
            if !seen.insert(brand.brand_id.as_str()) {
                return Err(StoreError::DuplicateBrand(brand.brand_id.clone()));
            }
            if brand.domains.iter().all(|d| d.trim().is_empty()) {
                return Err(StoreError::EmptyDomains(brand.brand_id.clone()));
            }
            if brand.embeddings.is_empty() {
                return Err(StoreError::NoEmbeddings(brand.brand_id.clone()));
            }

            for emb in &brand.embeddings {
                if emb.vector.is_empty() {
                    return Err(StoreError::EmptyVector {
                        brand: brand.brand_id.clone(),
                        image: emb.source.clone(),
                    });
                }
                match expected_dim {
                    None => expected_dim = Some(emb.vector.len()),
                    Some(dim) if dim != emb.vector.len() => {
                        return Err(StoreError::DimensionMismatch {
                            brand: brand.brand_id.clone(),
                            image: emb.source.clone(),
                            expected: dim,
                            found: emb.vector.len(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.brands.is_empty()
    }

    pub fn brand_count(&self) -> usize {
        self.brands.len()
    }

    pub fn embedding_count(&self) -> usize {
        self.brands.iter().map(|b| b.embeddings.len()).sum()
    }

    pub fn get(&self, brand_id: &str) -> Option<&BrandEntry> {
        self.brands.iter().find(|b| b.brand_id == brand_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brand(id: &str, domains: &[&str], dims: &[usize]) -> BrandEntry {
        BrandEntry {
            brand_id: id.to_string(),
            domains: domains.iter().map(|d| d.to_string()).collect(),
            embeddings: dims
                .iter()
                .enumerate()
                .map(|(i, &dim)| ReferenceEmbedding {
                    source: format!("{}_{}.png", id, i),
                    vector: vec![0.5; dim],
                })
                .collect(),
        }
    }

    #[test]
    fn test_validate_ok() {
        let store = ReferenceStore {
            brands: vec![brand("paypal", &["paypal"], &[4, 4]), brand("ebay", &["ebay"], &[4])],
        };
        assert!(store.validate().is_ok());
        assert_eq!(store.brand_count(), 2);
        assert_eq!(store.embedding_count(), 3);
    }

    #[test]
    fn test_validate_empty_store_ok() {
        let store = ReferenceStore { brands: vec![] };
        assert!(store.validate().is_ok());
        assert!(store.is_empty());
    }

    #[test]
    fn test_validate_rejects_empty_domains() {
        let store = ReferenceStore { brands: vec![brand("x", &[], &[4])] };
        assert!(matches!(store.validate(), Err(StoreError::EmptyDomains(_))));
    }

    #[test]
    fn test_validate_rejects_missing_embeddings() {
        let store = ReferenceStore { brands: vec![brand("x", &["x"], &[])] };
        assert!(matches!(store.validate(), Err(StoreError::NoEmbeddings(_))));
    }

    #[test]
    fn test_validate_rejects_dimension_mismatch() {
        let store = ReferenceStore { brands: vec![brand("x", &["x"], &[4, 8])] };
        assert!(matches!(store.validate(), Err(StoreError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_dimension_mismatch_names_offending_image() {
        let store = ReferenceStore { brands: vec![brand("x", &["x"], &[4, 8])] };
        let err = store.validate().unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("x_1.png"), "got: {rendered}");
        assert!(rendered.contains("dimension 8, expected 4"), "got: {rendered}");
    }

    #[test]
    fn test_empty_vector_names_offending_image() {
        let store = ReferenceStore { brands: vec![brand("x", &["x"], &[0])] };
        let err = store.validate().unwrap_err();
        assert_eq!(err.to_string(), "Brand 'x' embedding 'x_0.png' is empty");
    }

    #[test]
    fn test_validate_rejects_duplicate_brand() {
        let store = ReferenceStore {
            brands: vec![brand("x", &["x"], &[4]), brand("x", &["y"], &[4])],
        };
        assert!(matches!(store.validate(), Err(StoreError::DuplicateBrand(_))));
    }

    #[test]
    fn test_owns_domain_case_insensitive() {
        let b = brand("paypal", &["paypal", "Braintree"], &[4]);
        assert!(b.owns_domain("PayPal"));
        assert!(b.owns_domain("braintree"));
        assert!(!b.owns_domain("paypal-secure-login"));
        assert!(!b.owns_domain(""));
    }

    #[test]
    fn test_load_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        let store = ReferenceStore { brands: vec![brand("paypal", &["paypal"], &[4])] };
        std::fs::write(&path, serde_json::to_string(&store).unwrap()).unwrap();

        let loaded = ReferenceStore::load(&path).unwrap();
        assert_eq!(loaded.brand_count(), 1);
        assert_eq!(loaded.get("paypal").unwrap().domains, vec!["paypal"]);
    }

    #[test]
    fn test_load_missing_file() {
        let result = ReferenceStore::load(Path::new("/nonexistent/store.json"));
        assert!(matches!(result, Err(StoreError::FileNotFound(_))));
    }
}
