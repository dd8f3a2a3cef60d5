mod commands;

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use palimpsest_core::paths;

const USAGE: &str = "\
usage: palimpsest [-v] <command> [args]

commands:
  new [project]                       create an empty project
  info <project>                      settings, master line and undo state
  log <project>                       command history as JSON lines
  tracks <project>                    tracks in display order
  add-track <project> [after-id]      insert a track (after the given one)
  delete-track <project> <track-id>   delete a track and its segments
  import <project> <file>             add an audio asset
  sample-rate <project> <hz>          change the sample rate
  tag <project> <name> [value]        set or clear a release tag
                                      (title, artist, album-artist, album, year)
  undo <project>                      undo your last change
  redo <project>                      redo your last undone change";

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = paths::log_path();
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    // Best effort: run without a log rather than fail.
    let Ok(log_file) = File::create(&log_path).or_else(|_| File::create("/tmp/palimpsest.log"))
    else {
        return;
    };
    if WriteLogger::init(log_level, Config::default(), log_file).is_err() {
        return;
    }

    log::info!("palimpsest starting (log level: {:?})", log_level);
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let args: Vec<&str> = args
        .iter()
        .map(String::as_str)
        .filter(|a| *a != "--verbose" && *a != "-v")
        .collect();
    let Some((&command, rest)) = args.split_first() else {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    };
    if command == "help" || command == "--help" || command == "-h" {
        println!("{}", USAGE);
        return ExitCode::SUCCESS;
    }
    let (project, rest) = match rest.split_first() {
        Some((&project, rest)) => (PathBuf::from(project), rest),
        None if command == "new" => match paths::default_project_path("untitled") {
            Some(path) => (path, rest),
            None => {
                eprintln!("palimpsest new: no data directory, give a project path");
                return ExitCode::FAILURE;
            }
        },
        None => {
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    match commands::run(command, project, rest) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}: {}", command, err);
            eprintln!("palimpsest {}: {}", command, err);
            ExitCode::FAILURE
        }
    }
}
