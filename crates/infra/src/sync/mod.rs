//! Remote store adapter

pub mod errors;
pub mod remote_repository;

pub use errors::{RemoteError, RemoteErrorCategory};
pub use remote_repository::HttpRemoteRepository;
