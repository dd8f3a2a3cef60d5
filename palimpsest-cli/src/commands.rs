//! One function per subcommand. Each opens the project as the local user,
//! performs its edit or query, and closes the project again.

use std::path::{Path, PathBuf};

use serde::Serialize;

use palimpsest_core::config::Config;
use palimpsest_core::ids::IdGenerator;
use palimpsest_core::{Project, ProjectError};
use palimpsest_types::{User, WideId};

#[derive(Debug)]
pub enum CliError {
    Project(ProjectError),
    Usage(String),
    Output(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Project(err) => write!(f, "{}", err),
            CliError::Usage(msg) => write!(f, "{}", msg),
            CliError::Output(err) => write!(f, "cannot write output: {}", err),
        }
    }
}

impl From<ProjectError> for CliError {
    fn from(err: ProjectError) -> Self {
        CliError::Project(err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Output(err)
    }
}

type Result<T> = std::result::Result<T, CliError>;

/// One line of `palimpsest log`.
#[derive(Serialize)]
struct LogLine<'a> {
    revision: u64,
    id: WideId,
    author: &'a str,
    description: String,
}

#[derive(Serialize)]
struct TrackLine<'a> {
    id: WideId,
    name: &'a str,
    segments: usize,
}

pub fn run(command: &str, project: PathBuf, args: &[&str]) -> Result<()> {
    let config = Config::load();
    let mut ids = IdGenerator::from_entropy()?;
    let user = config.load_or_create_user(&mut ids)?;

    match command {
        "new" => {
            if let Some(parent) = project.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ProjectError::from_io(e, parent))?;
            }
            let created = Project::create(&project, ids.next_id(), &user)?;
            println!("created {} ({})", project.display(), created.id().short());
            created.close()?;
            Ok(())
        }
        "info" => with_project(&project, &user, info),
        "log" => with_project(&project, &user, history),
        "tracks" => with_project(&project, &user, tracks),
        "add-track" => with_project(&project, &user, |p| {
            let after = args.first().map(|s| parse_id(s)).transpose()?;
            let id = p.insert_track(after, None)?;
            println!("{}", id);
            Ok(())
        }),
        "delete-track" => with_project(&project, &user, |p| {
            let id = parse_id(required(args, 0, "track id")?)?;
            p.delete_track(&id)?;
            Ok(())
        }),
        "import" => with_project(&project, &user, |p| {
            let file = Path::new(required(args, 0, "audio file")?);
            let id = p.add_audio_asset(file)?;
            println!("{}", id);
            Ok(())
        }),
        "sample-rate" => with_project(&project, &user, |p| {
            let hz = required(args, 0, "sample rate")?;
            let rate: u32 = hz
                .parse()
                .map_err(|_| CliError::Usage(format!("invalid sample rate {:?}", hz)))?;
            if p.set_sample_rate(rate)?.is_none() {
                println!("sample rate is already {}", rate);
            }
            Ok(())
        }),
        "tag" => with_project(&project, &user, |p| {
            let field = required(args, 0, "tag name")?;
            let value = args.get(1).copied().unwrap_or("");
            let mut metadata = p.metadata().clone();
            match field {
                "title" => metadata.title = value.to_string(),
                "artist" => metadata.artist = value.to_string(),
                "album-artist" => metadata.album_artist = value.to_string(),
                "album" => metadata.album = value.to_string(),
                "year" if value.is_empty() => metadata.year = None,
                "year" => {
                    let year = value
                        .parse()
                        .map_err(|_| CliError::Usage(format!("invalid year {:?}", value)))?;
                    metadata.year = Some(year);
                }
                other => return Err(CliError::Usage(format!("unknown tag {:?}", other))),
            }
            p.set_metadata(metadata)?;
            Ok(())
        }),
        "undo" => with_project(&project, &user, |p| {
            if !p.undo()? {
                println!("nothing to undo");
            }
            Ok(())
        }),
        "redo" => with_project(&project, &user, |p| {
            if !p.redo()? {
                println!("nothing to redo");
            }
            Ok(())
        }),
        other => Err(CliError::Usage(format!("unknown command {:?}", other))),
    }
}

fn with_project<F>(path: &Path, user: &User, f: F) -> Result<()>
where
    F: FnOnce(&mut Project) -> Result<()>,
{
    let mut project = Project::open(path, user)?;
    let result = f(&mut project);
    project.close()?;
    result
}

fn info(project: &mut Project) -> Result<()> {
    println!("project      {}", project.id());
    println!("user         {} ({})", project.user().name, project.user().id.short());
    println!("sample rate  {}", project.sample_rate());
    println!("layout       {}", project.channel_layout().name);

    let tags = project.metadata();
    for (name, value) in [
        ("title", &tags.title),
        ("artist", &tags.artist),
        ("album artist", &tags.album_artist),
        ("album", &tags.album),
    ] {
        if !value.is_empty() {
            println!("{:<13}{}", name, value);
        }
    }
    if let Some(year) = tags.year {
        println!("year         {}", year);
    }

    let master = project.master_mixer_line_id();
    let name = project
        .mixer_line(&master)
        .map(|line| line.name.clone())
        .unwrap_or_default();
    let effects: Vec<WideId> = project.line_effects(&master).into_iter().map(|e| e.id).collect();
    println!("master       {}", name);
    for effect in effects {
        if let Some(desc) = project.effect_description(&effect) {
            println!("  effect     {}", desc);
        }
    }

    println!("tracks       {}", project.tracks().len());
    println!("assets       {}", project.audio_assets().len());
    println!("revision     {}", project.last_revision());
    println!(
        "undo         {}/{}",
        project.undo_cursor(),
        project.undo_stack().entries().len()
    );
    Ok(())
}

fn history(project: &mut Project) -> Result<()> {
    for command in project.commands() {
        let author = project
            .user_by_id(&command.user_id)
            .map(|u| u.name.as_str())
            .unwrap_or("?");
        let line = LogLine {
            revision: command.revision,
            id: command.id,
            author,
            description: project.describe_command(command),
        };
        println!("{}", serde_json::to_string(&line)?);
    }
    Ok(())
}

fn tracks(project: &mut Project) -> Result<()> {
    let ids: Vec<WideId> = project.tracks().into_iter().map(|t| t.id).collect();
    for id in ids {
        let segments = project.track_segments(&id).len();
        if let Some(track) = project.track(&id) {
            let line = TrackLine {
                id,
                name: &track.name,
                segments,
            };
            println!("{}", serde_json::to_string(&line)?);
        }
    }
    Ok(())
}

fn required<'a>(args: &[&'a str], index: usize, what: &str) -> Result<&'a str> {
    args.get(index)
        .copied()
        .ok_or_else(|| CliError::Usage(format!("missing {}", what)))
}

fn parse_id(s: &str) -> Result<WideId> {
    s.parse()
        .map_err(|_| CliError::Usage(format!("invalid id {:?}: expected 64 hex digits", s)))
}
