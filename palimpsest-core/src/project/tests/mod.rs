use std::path::{Path, PathBuf};

use palimpsest_types::{User, WideId};

use crate::config::ProjectSettings;
use crate::ids::IdGenerator;
use crate::project::Project;
use crate::store::MemoryStore;

mod failures;
mod ordering;
mod replay;

fn alice() -> User {
    User::new(WideId::from_bytes([0xa1; 32]), "alice")
}

fn bob() -> User {
    User::new(WideId::from_bytes([0xb0; 32]), "bob")
}

fn project_id() -> WideId {
    WideId::from_bytes([0x42; 32])
}

/// A fresh project on an in-memory store; the returned handle shares it.
fn memory_project(user: &User) -> (Project, MemoryStore) {
    let store = MemoryStore::new();
    let project = Project::create_in(
        Box::new(store.clone()),
        project_id(),
        user,
        &ProjectSettings::default(),
        IdGenerator::seeded(1),
    )
    .unwrap();
    (project, store)
}

fn reopen(store: &MemoryStore, user: &User, seed: u64) -> Project {
    Project::open_in(Box::new(store.clone()), user, IdGenerator::seeded(seed)).unwrap()
}

fn temp_project_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("project_test.palimpsest")
}

fn write_sample(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn track_ids(project: &mut Project) -> Vec<WideId> {
    project.tracks().into_iter().map(|t| t.id).collect()
}
