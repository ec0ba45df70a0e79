use crate::{serialize::SerializeError, store::BackendError};
use thiserror::Error as ThisError;

///
/// Error
///
/// Failures that reach callers. Storage trouble on the collection
/// read/write path never lands here: the store degrades to defaults and
/// logs instead, so this surface is limited to setup and intake.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),
}
