//! Wrappers over `cw_bytecode` classes to register them in a repository
//! and query their hierarchy.

mod class;
mod repository;
mod uids;

pub use class::Class;
pub use repository::Repo;
pub use uids::{ClassUid, RepoCounters};
