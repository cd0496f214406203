//! # murmur-shadow
//!
//! The synchronization handler: applies Created/Updated/Deleted user
//! events from the identity authority to the local shadow store, one
//! transaction per event.

pub mod error;
pub mod handler;

pub use error::SyncError;
pub use handler::ShadowSyncHandler;
