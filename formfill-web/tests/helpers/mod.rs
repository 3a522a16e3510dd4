//! Test Helper Utilities
//!
//! Shared utilities for testing formfill-web

#![allow(dead_code)]

pub mod multipart;
pub mod pdf_fixtures;

pub use multipart::{multipart_request, Part};
pub use pdf_fixtures::{field_value, install_template, roster_csv};

use formfill_common::config::{Settings, TomlConfig};
use formfill_common::FormCatalog;
use formfill_web::{build_router, AppState};
use tempfile::TempDir;

/// Isolated service instance rooted in a temporary directory
pub struct TestApp {
    pub root: TempDir,
    pub settings: Settings,
    pub catalog: FormCatalog,
}

impl TestApp {
    /// Fresh root with empty template and output directories
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        let settings = Settings::from_parts(root.path().to_path_buf(), TomlConfig::default());
        settings.ensure_directories().unwrap();
        let catalog = FormCatalog::builtin(&settings.host).unwrap();
        Self {
            root,
            settings,
            catalog,
        }
    }

    /// Install a generated template for the form `key`
    pub fn with_template(self, key: &str) -> Self {
        let spec = self.catalog.lookup(key).unwrap();
        install_template(&self.settings.template_dir, spec);
        self
    }

    pub fn router(&self) -> axum::Router {
        build_router(AppState::new(self.catalog.clone(), self.settings.clone()))
    }
}
