//! Where a language's catalog structure comes from.
//!
//! A manifest only describes the shape of the catalog (folders and the books
//! inside them). Book contents are never part of it.

use crate::error::{ErrorKind, Result};
use crate::language::Language;
use async_trait::async_trait;
use exn::ResultExt;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogManifest {
    pub name: String,
    #[serde(default)]
    pub folders: Vec<FolderManifest>,
    #[serde(default)]
    pub books: Vec<BookManifest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FolderManifest {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub folders: Vec<FolderManifest>,
    #[serde(default)]
    pub books: Vec<BookManifest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BookManifest {
    pub id: u32,
    pub name: String,
    pub path: String,
    /// Remote location of the book database.
    pub url: String,
}

#[async_trait]
pub trait ManifestSource: Send + Sync {
    async fn manifest(&self, language: &Language) -> Result<CatalogManifest>;
}

/// Reads `<root>/catalogs/<language code>.json`.
#[derive(Debug, Clone)]
pub struct FileManifestSource {
    root: PathBuf,
}

impl FileManifestSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, language: &Language) -> PathBuf {
        self.root.join("catalogs").join(format!("{}.json", language.code()))
    }
}

#[async_trait]
impl ManifestSource for FileManifestSource {
    #[instrument(level = "debug", skip_all, fields(language = %language.code()))]
    async fn manifest(&self, language: &Language) -> Result<CatalogManifest> {
        let path = self.path(language);
        let catalog_error = || ErrorKind::Catalog(language.code().to_string());
        let bytes = tokio::fs::read(&path).await.or_raise(catalog_error)?;
        let manifest: CatalogManifest = serde_json::from_slice(&bytes).or_raise(catalog_error)?;
        debug!(path = %path.display(), folders = manifest.folders.len(), books = manifest.books.len(), "Loaded catalog manifest");
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ops::Deref;

    #[tokio::test]
    async fn test_reads_json_by_language_code() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("catalogs")).unwrap();
        std::fs::write(
            dir.path().join("catalogs/spa.json"),
            r#"{
                "name": "Biblioteca",
                "folders": [{
                    "name": "Escrituras",
                    "path": "/scriptures",
                    "books": [{"id": 1, "name": "El Libro de Mormón", "path": "/scriptures/bofm", "url": "https://example.org/spa/bofm.sqlite"}]
                }]
            }"#,
        )
        .unwrap();
        let source = FileManifestSource::new(dir.path());
        let manifest = source.manifest(&Language::new(3, "spa", "Español")).await.unwrap();
        assert_eq!(manifest.name, "Biblioteca");
        assert!(manifest.books.is_empty());
        assert_eq!(manifest.folders[0].books[0].path, "/scriptures/bofm");
        assert!(manifest.folders[0].folders.is_empty());
    }

    #[tokio::test]
    async fn test_missing_or_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileManifestSource::new(dir.path());
        let language = Language::new(1, "eng", "English");
        let err = source.manifest(&language).await.unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::Catalog(code) if code == "eng"));

        std::fs::create_dir_all(dir.path().join("catalogs")).unwrap();
        std::fs::write(source.path(&language), b"{\"folders\": 3}").unwrap();
        let err = source.manifest(&language).await.unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::Catalog(_)));
    }
}
