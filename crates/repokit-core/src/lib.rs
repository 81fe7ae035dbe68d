//! Repositories over SQLite record types.
//!
//! A [`Repository`] definition names a [`Record`] type, the payload fields it
//! accepts and the scopes it contributes. [`BaseRepository`] binds such a
//! definition to a [`RepositoryContext`] and provides identifier lookup,
//! transactional create-or-update, delete and scoped queries.
//!
//! Scopes of a repository type are installed once, the first time a
//! repository of that type is constructed.

pub mod boot;
pub mod builder;
pub mod context;
pub mod error;
pub mod identifier;
pub mod model;
pub mod payload;
pub mod record;
pub mod repository;
pub mod resolver;
pub mod scope;

pub use builder::Builder;
pub use context::RepositoryContext;
pub use error::{RepositoryError, Result};
pub use identifier::{Identifier, Target};
pub use model::Model;
pub use payload::{Payload, PayloadSource};
pub use record::Record;
pub use repokit_config::ScopePolicy;
pub use repository::{BaseRepository, Repository};
pub use scope::{ScopeFn, ScopeRegistry, ScopeTable};
