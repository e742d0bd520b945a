//! Wiki checkout management.
//!
//! GitHub serves every wiki as a separate git repository
//! (`<project>.wiki.git`). The build works on a local checkout of it: cloned
//! shallowly on first use and fast-forwarded on later runs. Everything goes
//! through the `git` command line.

use crate::config::WikiConfig;
use std::path::Path;
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WikiError {
    #[error("could not run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("could not create {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// What [`sync`] did to the checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Cloned,
    Updated,
}

/// Clone the wiki into `dir`, or fast-forward it if `dir` is already a checkout.
pub fn sync(config: &WikiConfig, dir: &Path) -> Result<SyncOutcome, WikiError> {
    if dir.join(".git").exists() {
        let dir = dir.to_string_lossy();
        git(&["-C", &*dir, "pull", "--ff-only"])?;
        return Ok(SyncOutcome::Updated);
    }

    if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| WikiError::CreateDir {
            path: parent.display().to_string(),
            source,
        })?;
    }
    let dir = dir.to_string_lossy();
    git(&["clone", "--depth", "1", config.repository.as_str(), &*dir])?;
    Ok(SyncOutcome::Cloned)
}

/// Abbreviated commit id of the checkout's `HEAD`.
///
/// `None` when git is missing or `dir` is not the root of a checkout. A plain
/// directory nested inside some other repository does not borrow its `HEAD`.
pub fn short_commit(dir: &Path) -> Option<String> {
    if !dir.join(".git").exists() {
        return None;
    }
    let dir = dir.to_string_lossy();
    git(&["-C", &*dir, "rev-parse", "--short", "HEAD"])
        .ok()
        .filter(|hash| !hash.is_empty())
}

/// Run git and return its trimmed stdout.
fn git(args: &[&str]) -> Result<String, WikiError> {
    let command = command_line(args);
    log::debug!("running {command}");
    let output = Command::new("git")
        .args(args)
        .output()
        .map_err(|source| WikiError::Spawn {
            command: command.clone(),
            source,
        })?;
    if !output.status.success() {
        return Err(WikiError::Failed {
            command,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn command_line(args: &[&str]) -> String {
    std::iter::once("git")
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn command_line_is_readable() {
        assert_eq!(
            command_line(&["clone", "--depth", "1", "url", "wiki"]),
            "git clone --depth 1 url wiki"
        );
    }

    #[test]
    fn short_commit_outside_a_checkout_is_none() {
        let tmp = TempDir::new().unwrap();
        // A missing directory can never be a checkout
        assert_eq!(short_commit(&tmp.path().join("missing")), None);
    }

    /// Set up a repository with one empty commit. `false` when git is unavailable.
    fn init_repo(dir: &Path) -> bool {
        let dir = dir.to_string_lossy();
        git(&["init", "--quiet", &*dir]).is_ok()
            && git(&[
                "-C",
                &*dir,
                "-c",
                "user.name=wikisite",
                "-c",
                "user.email=wikisite@localhost",
                "commit",
                "--quiet",
                "--allow-empty",
                "-m",
                "init",
            ])
            .is_ok()
    }

    #[test]
    fn plain_directory_inside_a_repository_has_no_commit() {
        let tmp = TempDir::new().unwrap();
        if !init_repo(tmp.path()) {
            return;
        }
        let wiki = tmp.path().join("wiki");
        std::fs::create_dir(&wiki).unwrap();
        std::fs::write(wiki.join("Home.md"), "# Home").unwrap();

        assert!(short_commit(tmp.path()).is_some());
        assert_eq!(short_commit(&wiki), None);
    }

    #[test]
    fn clone_of_missing_repository_fails() {
        let tmp = TempDir::new().unwrap();
        let config = WikiConfig {
            repository: tmp.path().join("no-such-repo.git").display().to_string(),
            ..WikiConfig::default()
        };
        let result = sync(&config, &tmp.path().join("wiki"));
        assert!(result.is_err());
    }

    #[test]
    fn failure_message_names_the_command() {
        let err = WikiError::Failed {
            command: "git pull --ff-only".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "fatal: not possible to fast-forward".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("git pull --ff-only"));
        assert!(msg.contains("not possible to fast-forward"));
    }
}
