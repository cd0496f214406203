//! Database entity models.

pub mod user;

pub use user::{NewUser, User, UserReplacement};
