//! Project files: command line options kept in a file.
//!
//! ```text
//! [generator-project]
//! output-directory = out
//! include-paths = include
//! header-file = include/geo.h
//! typesystem-file = typesystem_geo.toml
//! dry-run
//! ```
//!
//! Every `key = value` line becomes `--key=value`, a bare `key` becomes
//! `--key`. `header-file` and `typesystem-file` supply the positionals.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

const PROJECT_HEADER: &str = "[generator-project]";

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Cannot read project file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{0}' is not a project file: the first line must be [generator-project]")]
    MissingHeader(PathBuf),

    #[error("{path}:{line}: expected `key = value`")]
    Syntax { path: PathBuf, line: usize },
}

/// Options read from a project file, as command line arguments.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProjectArgs {
    pub options: Vec<String>,
    pub headers: Vec<String>,
    pub typesystem: Option<String>,
}

pub fn read_project_file(path: &Path) -> Result<ProjectArgs, ProjectError> {
    let contents = fs::read_to_string(path).map_err(|source| ProjectError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_project(path, &contents)
}

pub fn parse_project(path: &Path, contents: &str) -> Result<ProjectArgs, ProjectError> {
    let mut lines = contents.lines().enumerate();
    match lines.next() {
        Some((_, first)) if first.trim() == PROJECT_HEADER => {}
        _ => return Err(ProjectError::MissingHeader(path.to_path_buf())),
    }

    let mut project = ProjectArgs::default();
    for (index, line) in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = match line.split_once('=') {
            Some((key, value)) => (key.trim(), Some(value.trim())),
            None => (line, None),
        };
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(ProjectError::Syntax {
                path: path.to_path_buf(),
                line: index + 1,
            });
        }
        match (key, value) {
            ("header-file", Some(value)) => project.headers.push(value.to_string()),
            ("typesystem-file", Some(value)) => project.typesystem = Some(value.to_string()),
            (_, Some(value)) => project.options.push(format!("--{key}={value}")),
            (_, None) => project.options.push(format!("--{key}")),
        }
    }
    Ok(project)
}

/// Splice the options of `--project-file=<file>` into the argument list,
/// ahead of the arguments given on the command line. Positionals of the
/// command line count as additional headers.
pub fn expand_args(args: Vec<String>) -> Result<Vec<String>, ProjectError> {
    let mut project_file = None;
    let mut rest = Vec::with_capacity(args.len());
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if let Some(file) = arg.strip_prefix("--project-file=") {
            project_file = Some(PathBuf::from(file));
        } else if arg == "--project-file" {
            project_file = iter.next().map(PathBuf::from);
        } else {
            rest.push(arg);
        }
    }

    let Some(file) = project_file else {
        return Ok(rest);
    };
    let project = read_project_file(&file)?;
    let mut rest = rest.into_iter();
    let mut expanded: Vec<String> = rest.next().into_iter().collect();
    expanded.extend(project.options);
    expanded.extend(project.headers);
    expanded.extend(rest);
    expanded.extend(project.typesystem);
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_project() {
        let project = parse_project(
            Path::new("geo.project"),
            "[generator-project]\n\
             # comment\n\
             output-directory = out\n\
             header-file = include/geo.h\n\
             header-file = include/shape.h\n\
             typesystem-file = typesystem_geo.toml\n\
             dry-run\n",
        )
        .unwrap();
        assert_eq!(project.options, vec!["--output-directory=out", "--dry-run"]);
        assert_eq!(project.headers, vec!["include/geo.h", "include/shape.h"]);
        assert_eq!(project.typesystem.as_deref(), Some("typesystem_geo.toml"));
    }

    #[test]
    fn test_parse_errors() {
        let path = Path::new("bad.project");
        assert!(matches!(
            parse_project(path, "output-directory = out\n"),
            Err(ProjectError::MissingHeader(_))
        ));
        assert!(matches!(
            parse_project(path, "[generator-project]\nbad key = 1\n"),
            Err(ProjectError::Syntax { line: 2, .. })
        ));
    }

    #[test]
    fn test_expand_args() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("geo.project");
        fs::write(&file, "[generator-project]\nheader-file = geo.h\ntypesystem-file = ts.toml\nsilent\n").unwrap();

        let args = vec![
            "cppbind".to_string(),
            format!("--project-file={}", file.display()),
            "--dry-run".to_string(),
            "extra.h".to_string(),
        ];
        assert_eq!(
            expand_args(args).unwrap(),
            vec!["cppbind", "--silent", "geo.h", "--dry-run", "extra.h", "ts.toml"]
        );

        let plain = vec!["cppbind".to_string(), "a.h".to_string()];
        assert_eq!(expand_args(plain.clone()).unwrap(), plain);
    }
}
