use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to decode catalog metadata: {source}")]
    Metadata {
        #[source]
        source: serde_json::Error,
    },
}
