//! # palimpsest-core
//!
//! Event-sourced project engine for the Palimpsest audio editor. Every edit
//! is a logged, reversible command; project state is a fold over that log,
//! persisted one atomic batch per command.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use palimpsest_core::config::Config;
//! use palimpsest_core::ids::IdGenerator;
//! use palimpsest_core::project::Project;
//!
//! let config = Config::load();
//! let mut ids = IdGenerator::from_entropy()?;
//! let user = config.load_or_create_user(&mut ids)?;
//!
//! let mut project = Project::create(path, ids.next_id(), &user)?;
//! let track = project.insert_track(None, None)?;
//! project.set_sample_rate(48_000)?;
//! project.undo()?;
//! project.close()?;
//! ```
//!
//! ## Module Overview
//!
//! - [`project`]: `Project` lifecycle, mutators, undo/redo, accessors
//! - [`store`]: `OrderedStore` contract, `SqliteStore`, `MemoryStore`, key layout
//! - [`config`]: TOML configuration (embedded defaults + user override)
//! - [`ids`]: `IdGenerator`
//! - [`paths`]: application directories
//! - [`error`]: `ProjectError`

pub mod config;
pub mod error;
pub mod ids;
pub mod paths;
pub mod project;
pub mod store;

pub use error::{ProjectError, Result};
pub use project::Project;
