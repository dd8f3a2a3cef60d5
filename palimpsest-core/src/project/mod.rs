//! The project aggregate.
//!
//! A [`Project`] is its bootstrap records plus a fold over its command log.
//! Every change goes through `apply_command`, which applies the command's
//! forward effect, commits the command together with the entity records it
//! touched as one batch, and only then records it in history. Undo and redo
//! are themselves logged commands, so the log replays to the same state and
//! the same undo cursor on the next open.

mod apply;
mod history;
mod mutate;
mod state;
mod views;

#[cfg(test)]
mod tests;

pub use history::UndoStack;
pub use state::{ProjectHeader, ProjectState, Settings};

use std::path::Path;

use palimpsest_types::codec::Decode;
use palimpsest_types::{
    AudioAsset, AudioClip, AudioClipSegment, ChannelLayout, Command, CommandKind, ContentDigest,
    DeviceId, Effect, EffectKind, EffectSend, Entity, EntityTable, MixerLine, ProjectMetadata,
    SendTarget, SortKey, Track, User, WideId,
};

use self::apply::{apply_forward, apply_inverse, check_forward};
use self::history::CommandLog;
use self::state::HEADER_FORMAT;
use self::views::Views;
use crate::config::{Config, ProjectSettings};
use crate::error::{ProjectError, Result};
use crate::ids::IdGenerator;
use crate::store::keys::{self, Record};
use crate::store::{OrderedStore, SqliteStore, WriteBatch};

pub struct Project {
    header: ProjectHeader,
    user: User,
    state: ProjectState,
    log: CommandLog,
    undo: UndoStack,
    views: Views,
    ids: IdGenerator,
    store: Box<dyn OrderedStore>,
}

impl Project {
    /// Create a new project file at `path` with defaults from the user config.
    pub fn create(path: &Path, id: WideId, user: &User) -> Result<Self> {
        Self::create_with_settings(path, id, user, &Config::load().project_settings())
    }

    /// Create a new project file at `path`. Nothing is left on disk if
    /// creation fails.
    pub fn create_with_settings(
        path: &Path,
        id: WideId,
        user: &User,
        settings: &ProjectSettings,
    ) -> Result<Self> {
        let ids = IdGenerator::from_entropy()?;
        let store = SqliteStore::create(path)?;
        match Self::create_in(Box::new(store), id, user, settings, ids) {
            Ok(project) => {
                log::info!(target: "project", "created {} at {}", id.short(), path.display());
                Ok(project)
            }
            Err(err) => {
                if let Err(cleanup) = SqliteStore::remove_files(path) {
                    log::warn!(
                        target: "project",
                        "cannot remove {} after failed create: {}",
                        path.display(),
                        cleanup
                    );
                }
                Err(err)
            }
        }
    }

    /// Open the project file at `path` as `user`.
    pub fn open(path: &Path, user: &User) -> Result<Self> {
        let store = SqliteStore::open(path)?;
        let project = Self::open_in(Box::new(store), user, IdGenerator::from_entropy()?)?;
        log::info!(target: "project", "opened {} from {}", project.id().short(), path.display());
        Ok(project)
    }

    /// Write the bootstrap records of a new project into an empty store.
    pub fn create_in(
        mut store: Box<dyn OrderedStore>,
        id: WideId,
        user: &User,
        settings: &ProjectSettings,
        mut ids: IdGenerator,
    ) -> Result<Self> {
        if store.get(keys::HEADER)?.is_some() {
            return Err(ProjectError::InvalidArgument(
                "store already holds a project".to_string(),
            ));
        }
        if settings.sample_rate == 0 {
            return Err(ProjectError::InvalidArgument("sample rate must be positive".to_string()));
        }

        let initial = Settings {
            sample_rate: settings.sample_rate,
            channel_layout: settings.channel_layout.clone(),
            metadata: ProjectMetadata::default(),
        };
        let master = MixerLine {
            id: ids.next_id(),
            name: settings.master_line_name.clone(),
            sort_key: SortKey::initial(),
            solo: false,
            volume: 1.0,
        };
        let main_out = Effect {
            id: ids.next_id(),
            mixer_line_id: master.id,
            sort_key: SortKey::initial(),
            kind: EffectKind::Send(EffectSend {
                gain: 1.0,
                target: SendTarget::Device(DeviceId::MainOut),
            }),
        };
        let header = ProjectHeader {
            format: HEADER_FORMAT,
            id,
            master_mixer_line_id: master.id,
            initial: initial.clone(),
        };

        let mut batch = WriteBatch::new();
        batch.put_record(keys::HEADER.to_vec(), &header);
        batch.put_record(keys::SETTINGS.to_vec(), &initial);
        batch.put_record(keys::record::<MixerLine>(&master.id), &master);
        batch.put_record(keys::record::<Effect>(&main_out.id), &main_out);
        batch.put_record(keys::record::<User>(&user.id), user);
        store.commit(batch)?;

        let mut state = ProjectState::new(initial);
        state.mixer_lines.insert(master);
        state.effects.insert(main_out);
        state.users.insert(user.clone());

        log::debug!(target: "project", "bootstrapped {} for user {}", id.short(), user.name);
        Ok(Self {
            header,
            user: user.clone(),
            state,
            log: CommandLog::new(),
            undo: UndoStack::new(),
            views: Views::default(),
            ids,
            store,
        })
    }

    /// Load a project from `store`, replaying its command log as `user`.
    pub fn open_in(mut store: Box<dyn OrderedStore>, user: &User, ids: IdGenerator) -> Result<Self> {
        let header_bytes = store
            .get(keys::HEADER)?
            .ok_or_else(|| ProjectError::InvalidFormat("missing project header".to_string()))?;
        let header = ProjectHeader::from_bytes(&header_bytes)?;
        if header.format > HEADER_FORMAT {
            return Err(ProjectError::Unimplemented(format!(
                "project header format {} is newer than supported ({})",
                header.format, HEADER_FORMAT
            )));
        }

        let mut state = ProjectState::new(header.initial.clone());
        state.mixer_lines = load_table(store.as_ref())?;
        state.effects = load_table(store.as_ref())?;
        state.users = load_table(store.as_ref())?;
        if !state.mixer_lines.contains(&header.master_mixer_line_id) {
            return Err(ProjectError::InvalidFormat("master mixer line is missing".to_string()));
        }

        let mut log = CommandLog::new();
        let mut undo = UndoStack::new();
        replay(store.as_ref(), &mut state, &mut log, &mut undo, user)?;
        verify_materialized(store.as_ref(), &state)?;

        if !state.users.contains(&user.id) {
            let mut batch = WriteBatch::new();
            batch.put_record(keys::record::<User>(&user.id), user);
            store.commit(batch)?;
            state.users.insert(user.clone());
            log::info!(target: "project", "registered user {} ({})", user.name, user.id.short());
        }

        log::debug!(
            target: "project",
            "replayed {} commands, undo cursor {}/{}",
            log.len(),
            undo.cursor(),
            undo.entries().len()
        );
        Ok(Self {
            header,
            user: user.clone(),
            state,
            log,
            undo,
            views: Views::default(),
            ids,
            store,
        })
    }

    pub fn close(self) -> Result<()> {
        let id = self.header.id;
        self.store.close()?;
        log::info!(target: "project", "closed {}", id.short());
        Ok(())
    }

    /// Bind `kind` to the active user and the next revision, apply it, and
    /// commit it. A command that no longer fits the state is rejected up
    /// front; on a failed commit the in-memory state is restored and history
    /// is left untouched.
    fn apply_command(&mut self, kind: CommandKind) -> Result<WideId> {
        check_forward(&kind, &self.state, &self.log).map_err(|reason| {
            log::warn!(target: "project", "rejected {}: {}", kind.description(), reason);
            ProjectError::Conflict(reason)
        })?;

        let command = Command {
            id: self.ids.next_id(),
            user_id: self.user.id,
            revision: self.log.next_revision(),
            kind,
        };

        let mut batch = WriteBatch::new();
        apply_forward(&command.kind, &mut self.state, &self.log, &mut batch);
        batch.put_record(keys::command(command.revision, &command.id), &command);

        if let Err(err) = self.store.commit(batch) {
            log::warn!(
                target: "project",
                "commit of revision {} ({}) failed: {}",
                command.revision,
                command.description(),
                err
            );
            apply_inverse(&command.kind, &mut self.state, &self.log, &mut WriteBatch::new());
            return Err(err);
        }

        log::debug!(
            target: "project",
            "r{} {} by {}",
            command.revision,
            command.description(),
            self.user.name
        );
        self.views.invalidate_for(&command.kind, &self.log);
        self.undo.record(&command);
        let id = command.id;
        self.log.push(command);
        Ok(id)
    }

    /// Revert the newest applied command of the active user. Returns
    /// `Ok(false)` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool> {
        match self.undo.undo_target() {
            Some(other) => self.apply_command(CommandKind::Undo { other }).map(|_| true),
            None => Ok(false),
        }
    }

    /// Re-apply the oldest undone command of the active user. Returns
    /// `Ok(false)` when there is nothing to redo.
    pub fn redo(&mut self) -> Result<bool> {
        match self.undo.redo_target() {
            Some(other) => self.apply_command(CommandKind::Redo { other }).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    pub fn undo_cursor(&self) -> usize {
        self.undo.cursor()
    }

    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo
    }

    pub fn id(&self) -> WideId {
        self.header.id
    }

    pub fn master_mixer_line_id(&self) -> WideId {
        self.header.master_mixer_line_id
    }

    /// The user this session acts as.
    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn state(&self) -> &ProjectState {
        &self.state
    }

    pub fn sample_rate(&self) -> u32 {
        self.state.settings.sample_rate
    }

    pub fn channel_layout(&self) -> &ChannelLayout {
        &self.state.settings.channel_layout
    }

    /// Release tags for exported files.
    pub fn metadata(&self) -> &ProjectMetadata {
        &self.state.settings.metadata
    }

    pub fn track(&self, id: &WideId) -> Option<&Track> {
        self.state.tracks.get(id)
    }

    pub fn audio_asset(&self, id: &WideId) -> Option<&AudioAsset> {
        self.state.audio_assets.get(id)
    }

    pub fn audio_clip(&self, id: &WideId) -> Option<&AudioClip> {
        self.state.audio_clips.get(id)
    }

    pub fn segment(&self, id: &WideId) -> Option<&AudioClipSegment> {
        self.state.segments.get(id)
    }

    pub fn mixer_line(&self, id: &WideId) -> Option<&MixerLine> {
        self.state.mixer_lines.get(id)
    }

    pub fn effect(&self, id: &WideId) -> Option<&Effect> {
        self.state.effects.get(id)
    }

    pub fn effect_description(&self, id: &WideId) -> Option<String> {
        self.effect(id).map(|e| e.kind.description())
    }

    pub fn user_by_id(&self, id: &WideId) -> Option<&User> {
        self.state.users.get(id)
    }

    pub fn command(&self, id: &WideId) -> Option<&Command> {
        self.log.get(id)
    }

    /// Every command, in revision order.
    pub fn commands(&self) -> impl Iterator<Item = &Command> + '_ {
        self.log.iter()
    }

    pub fn last_revision(&self) -> u64 {
        self.log.last_revision()
    }

    /// Human-readable summary of a command; markers name what they revert.
    pub fn describe_command(&self, command: &Command) -> String {
        match &command.kind {
            CommandKind::Undo { other } | CommandKind::Redo { other } => {
                match self.log.get(other) {
                    Some(target) => format!("{} {}", command.description(), target.description()),
                    None => command.description(),
                }
            }
            _ => command.description(),
        }
    }

    /// Tracks in display order.
    pub fn tracks(&mut self) -> Vec<&Track> {
        self.views.tracks.refresh(|| views::ordered_tracks(&self.state));
        resolve_ids(&self.state.tracks, self.views.tracks.value())
    }

    /// Segments placed on `track`, by timeline position.
    pub fn track_segments(&mut self, track: &WideId) -> Vec<&AudioClipSegment> {
        self.views
            .segments_by_track
            .refresh(|| views::segments_by_track(&self.state));
        match self.views.segments_by_track.value().get(track) {
            Some(ids) => resolve_ids(&self.state.segments, ids),
            None => Vec::new(),
        }
    }

    pub fn users(&mut self) -> Vec<&User> {
        self.views.users.refresh(|| views::ordered_users(&self.state));
        resolve_ids(&self.state.users, self.views.users.value())
    }

    pub fn audio_assets(&mut self) -> Vec<&AudioAsset> {
        self.views
            .audio_assets
            .refresh(|| views::ordered_assets(&self.state));
        resolve_ids(&self.state.audio_assets, self.views.audio_assets.value())
    }

    pub fn audio_asset_by_digest(&mut self, digest: &ContentDigest) -> Option<&AudioAsset> {
        self.views
            .assets_by_digest
            .refresh(|| views::assets_by_digest(&self.state));
        self.views
            .assets_by_digest
            .value()
            .get(digest)
            .and_then(|id| self.state.audio_assets.get(id))
    }

    pub fn audio_clips(&mut self) -> Vec<&AudioClip> {
        self.views
            .audio_clips
            .refresh(|| views::ordered_clips(&self.state));
        resolve_ids(&self.state.audio_clips, self.views.audio_clips.value())
    }

    pub fn mixer_lines(&mut self) -> Vec<&MixerLine> {
        self.views
            .mixer_lines
            .refresh(|| views::ordered_mixer_lines(&self.state));
        resolve_ids(&self.state.mixer_lines, self.views.mixer_lines.value())
    }

    /// Effects on `line`, in chain order.
    pub fn line_effects(&mut self, line: &WideId) -> Vec<&Effect> {
        self.views
            .effects_by_line
            .refresh(|| views::effects_by_line(&self.state));
        match self.views.effects_by_line.value().get(line) {
            Some(ids) => resolve_ids(&self.state.effects, ids),
            None => Vec::new(),
        }
    }
}

fn resolve_ids<'a, T: Entity>(table: &'a EntityTable<T>, ids: &[WideId]) -> Vec<&'a T> {
    ids.iter().filter_map(|id| table.get(id)).collect()
}

fn load_table<T: Record + Decode>(store: &dyn OrderedStore) -> Result<EntityTable<T>> {
    let mut table = EntityTable::new();
    for (key, value) in store.scan_prefix(T::PREFIX)? {
        let record = T::from_bytes(&value)?;
        if key != keys::record::<T>(&record.id()) {
            return Err(ProjectError::InvalidFormat(format!(
                "{} record stored under the wrong key",
                T::KIND
            )));
        }
        table.insert(record);
    }
    Ok(table)
}

/// Rebuild `state`, `log` and `user`'s undo stack from the persisted commands.
fn replay(
    store: &dyn OrderedStore,
    state: &mut ProjectState,
    log: &mut CommandLog,
    undo: &mut UndoStack,
    user: &User,
) -> Result<()> {
    for (key, value) in store.scan_prefix(keys::COMMAND_PREFIX)? {
        let command = Command::from_bytes(&value)?;
        if keys::parse_command(&key) != Some((command.revision, command.id)) {
            return Err(ProjectError::InvalidFormat(format!(
                "command {} stored under the wrong key",
                command.id
            )));
        }
        if command.revision <= log.last_revision() {
            return Err(ProjectError::InvalidFormat(format!(
                "command revision {} is out of order",
                command.revision
            )));
        }
        if !state.users.contains(&command.user_id) {
            return Err(ProjectError::InvalidFormat(format!(
                "command {} has unknown author {}",
                command.id, command.user_id
            )));
        }
        if let Err(reason) = check_forward(&command.kind, state, log) {
            return Err(ProjectError::InvalidFormat(format!(
                "revision {} does not apply: {}",
                command.revision, reason
            )));
        }

        if command.user_id == user.id {
            let expected = match command.kind {
                CommandKind::Undo { .. } => undo.undo_target(),
                CommandKind::Redo { .. } => undo.redo_target(),
                _ => None,
            };
            if let CommandKind::Undo { other } | CommandKind::Redo { other } = command.kind {
                if expected != Some(other) {
                    return Err(ProjectError::InvalidFormat(format!(
                        "revision {} does not match the undo history",
                        command.revision
                    )));
                }
            }
        }

        apply_forward(&command.kind, state, log, &mut WriteBatch::new());
        if command.user_id == user.id {
            undo.record(&command);
        }
        log.push(command);
    }
    Ok(())
}

/// The materialized records must be exactly what the log replays to.
fn verify_materialized(store: &dyn OrderedStore, state: &ProjectState) -> Result<()> {
    fn check<T: Record + Decode + PartialEq>(
        store: &dyn OrderedStore,
        replayed: &EntityTable<T>,
    ) -> Result<()> {
        if &load_table::<T>(store)? != replayed {
            return Err(ProjectError::InvalidFormat(format!(
                "stored {} records disagree with history",
                T::KIND
            )));
        }
        Ok(())
    }

    check(store, &state.tracks)?;
    check(store, &state.audio_assets)?;
    check(store, &state.audio_clips)?;
    check(store, &state.segments)?;

    let settings = store
        .get(keys::SETTINGS)?
        .ok_or_else(|| ProjectError::InvalidFormat("missing project settings".to_string()))?;
    if Settings::from_bytes(&settings)? != state.settings {
        return Err(ProjectError::InvalidFormat(
            "stored settings disagree with history".to_string(),
        ));
    }
    Ok(())
}
