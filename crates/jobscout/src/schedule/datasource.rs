use std::collections::HashMap;

use serde::Serialize;

use crate::store::{Document, RecordStore, StoreError, Subscription};

/// A scrape source the backend knows how to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Datasource {
    pub id: String,
    pub name: String,
}

/// Read-only id to name lookup over the datasource registry.
#[derive(Debug, Clone, Default)]
pub struct DatasourceDirectory {
    sources: Vec<Datasource>,
    names: HashMap<String, usize>,
}

impl DatasourceDirectory {
    /// Loads the registry once. Entries without a usable name are listed
    /// under their id.
    pub async fn load(store: &dyn RecordStore, collection: &str) -> Result<Self, StoreError> {
        let documents = store.list(collection).await?;
        Ok(Self::from_documents(&documents))
    }

    /// Live registry, rebuilt whenever any writer changes it.
    pub async fn subscribe(
        store: &dyn RecordStore,
        collection: &str,
    ) -> Result<DatasourceSubscription, StoreError> {
        let inner = store.watch(collection).await?;
        Ok(DatasourceSubscription { inner })
    }

    fn from_documents(documents: &[Document]) -> Self {
        let sources = documents
            .iter()
            .map(|doc| {
                let name = doc
                    .get_str("name")
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .unwrap_or(doc.id.as_str())
                    .to_string();
                Datasource {
                    id: doc.id.clone(),
                    name,
                }
            })
            .collect();
        Self::from_sources(sources)
    }

    pub fn from_sources(mut sources: Vec<Datasource>) -> Self {
        sources.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        let names = sources
            .iter()
            .enumerate()
            .map(|(i, source)| (source.id.clone(), i))
            .collect();
        Self { sources, names }
    }

    /// Sources sorted by name.
    pub fn sources(&self) -> &[Datasource] {
        &self.sources
    }

    pub fn get(&self, id: &str) -> Option<&Datasource> {
        self.names.get(id).map(|&i| &self.sources[i])
    }

    /// The source's name, or the id itself if the source is unknown.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map(|s| s.name.as_str()).unwrap_or(id)
    }
}

/// Stream of datasource directories. Dropping it stops the listener.
pub struct DatasourceSubscription {
    inner: Subscription,
}

impl DatasourceSubscription {
    pub async fn next(&mut self) -> Option<DatasourceDirectory> {
        let documents = self.inner.next().await?;
        Some(DatasourceDirectory::from_documents(&documents))
    }
}
