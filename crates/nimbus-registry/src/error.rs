use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("package.json is present but not valid JSON: {0}")]
    InvalidPackageJson(String),
}
