use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Invalid track record: {0}")]
    InvalidTrack(String),

    #[error("Malformed catalog data: {0}")]
    MalformedData(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
