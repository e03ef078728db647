use thiserror::Error;
pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Catalog is empty")]
    EmptyCatalog,
    #[error("Duplicate topic id in catalog: {0}")]
    DuplicateTopic(String),
    #[error("Reference list '{0}' must not be empty")]
    EmptyReferenceList(&'static str),
    #[error("Expected 12 month names, found {0}")]
    MonthNames(usize),
}
