//! Integration tests for Shopstate.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopstate-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `scenarios` - End-to-end shopper flows through `ShopState`
//! - `cross_tab` - Several contexts sharing one in-memory origin
//! - `file_storage` - Persistence and cross-process polling on disk
//!
//! Nothing here needs external services; file tests run in a throwaway
//! directory under the system temp dir.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use shopstate_engine::EngineConfig;
use uuid::Uuid;

/// A uniquely named origin directory, removed on drop.
#[derive(Debug)]
pub struct TempOrigin {
    root: PathBuf,
    config: EngineConfig,
}

impl TempOrigin {
    #[must_use]
    pub fn new() -> Self {
        let root = std::env::temp_dir().join(format!("shopstate-it-{}", Uuid::new_v4().simple()));
        let config = EngineConfig {
            storage_dir: root.clone(),
            ..EngineConfig::default()
        };
        Self { root, config }
    }

    /// Config pointing every context at this origin.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for TempOrigin {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TempOrigin {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

/// A product record as a page component would hand it over.
#[must_use]
pub fn product(id: &str, price: u32) -> Value {
    json!({
        "id": id,
        "name": format!("Product {id}"),
        "price": price,
    })
}
