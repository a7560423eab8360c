use crate::resolve::error::ResolveError;
use crate::tables::error::TableError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StationMatchError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Table(#[from] TableError),
}
