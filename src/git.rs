/*
 * Copyright 2023 Trevor Bentley
 *
 * Author: Trevor Bentley
 * Contact: gitsy@@trevorbentley.com
 *
 * This file is part of Thirty-Days.
 *
 * Thirty-Days is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Thirty-Days is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Thirty-Days.  If not, see <http://www.gnu.org/licenses/>.
 */
use crate::util::{ThirtyError, ThirtyErrorKind};
use crate::{always, error, loud, louder};
use git2::{
    Commit, Cred, CredentialType, ErrorCode, IndexAddOption, PushOptions, RemoteCallbacks, Repository,
};
use std::path::Path;

/// What the publisher needs from a version control system.
pub trait VersionControl {
    fn enabled(&self) -> bool {
        true
    }
    fn stage(&self) -> Result<(), ThirtyError>;
    fn commit(&self, message: &str) -> Result<(), ThirtyError>;
    fn push(&self) -> Result<(), ThirtyError>;
}

/// Used when version control is switched off, or there is no checkout.
pub struct DisabledVcs;

impl VersionControl for DisabledVcs {
    fn enabled(&self) -> bool {
        false
    }
    fn stage(&self) -> Result<(), ThirtyError> {
        Ok(())
    }
    fn commit(&self, _message: &str) -> Result<(), ThirtyError> {
        Ok(())
    }
    fn push(&self) -> Result<(), ThirtyError> {
        Ok(())
    }
}

pub struct GitCheckout {
    repo: Repository,
    remote: String,
    branch: Option<String>,
}

impl GitCheckout {
    /// Find the checkout containing `path`, searching upwards.
    pub fn discover(path: impl AsRef<Path>, remote: &str, branch: Option<&str>) -> Result<Self, ThirtyError> {
        let repo = Repository::discover(path)?;
        if repo.is_bare() {
            return Err(ThirtyError::kind(ThirtyErrorKind::Git, Some("repository has no working tree")));
        }
        louder!(" - using git checkout at {}", repo.workdir().unwrap_or(repo.path()).display());
        Ok(GitCheckout {
            repo,
            remote: remote.to_string(),
            branch: branch.map(|b| b.to_string()),
        })
    }

    fn head_commit(&self) -> Result<Option<Commit<'_>>, ThirtyError> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn branch(&self) -> Result<String, ThirtyError> {
        if let Some(branch) = &self.branch {
            return Ok(branch.clone());
        }
        let head = self.repo.head()?;
        match (head.is_branch(), head.shorthand()) {
            (true, Some(name)) => Ok(name.to_string()),
            _ => Err(ThirtyError::kind(
                ThirtyErrorKind::Git,
                Some("HEAD is not on a branch, and no branch is configured"),
            )),
        }
    }
}

impl VersionControl for GitCheckout {
    fn stage(&self) -> Result<(), ThirtyError> {
        let mut index = self.repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        // picks up deletions, which add_all skips
        index.update_all(["*"].iter(), None)?;
        index.write()?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<(), ThirtyError> {
        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let parent = self.head_commit()?;
        if let Some(p) = &parent {
            if p.tree_id() == tree_id {
                return Err(ThirtyError::kind(ThirtyErrorKind::Git, Some("nothing to commit")));
            }
        }
        let tree = self.repo.find_tree(tree_id)?;
        let sig = self.repo.signature()?;
        let parents: Vec<&Commit> = parent.iter().collect();
        let id = self.repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
        loud!(" - committed {}", id);
        Ok(())
    }

    fn push(&self) -> Result<(), ThirtyError> {
        let branch = self.branch()?;
        let mut remote = self.repo.find_remote(&self.remote)?;
        let config = self.repo.config()?;

        let mut attempts = 0;
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |url, username, allowed| {
            attempts += 1;
            if attempts > 3 {
                return Err(git2::Error::from_str("authentication failed"));
            }
            if allowed.contains(CredentialType::SSH_KEY) {
                Cred::ssh_key_from_agent(username.unwrap_or("git"))
            } else if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
                Cred::credential_helper(&config, url, username)
            } else {
                Cred::default()
            }
        });
        callbacks.push_update_reference(|refname, status| match status {
            Some(msg) => Err(git2::Error::from_str(&format!("{} rejected by remote: {}", refname, msg))),
            None => Ok(()),
        });
        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);

        let refspec = format!("refs/heads/{0}:refs/heads/{0}", branch);
        remote.push(&[refspec.as_str()], Some(&mut options))?;
        loud!(" - pushed {} to {}", branch, self.remote);
        Ok(())
    }
}

/// Stage, commit, and optionally push.  Failures are reported and
/// swallowed: a missing commit never fails the day's generation.
pub fn commit_and_push(vcs: &dyn VersionControl, message: &str, push: bool) -> bool {
    if !vcs.enabled() {
        loud!(" - version control disabled, not committing");
        return false;
    }
    let result = vcs.stage().and_then(|_| vcs.commit(message)).and_then(|_| match push {
        true => vcs.push(),
        false => Ok(()),
    });
    match result {
        Ok(_) => {
            match push {
                true => always!("Changes successfully committed and pushed to the repository."),
                false => always!("Changes successfully committed to the repository."),
            }
            true
        }
        Err(e) => {
            error!("Skipping remaining git steps: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;

    fn init_checkout(dir: &Path) -> Repository {
        let repo = Repository::init(dir).unwrap();
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();
        repo
    }

    fn head_message(repo: &Repository) -> String {
        repo.head().unwrap().peel_to_commit().unwrap().message().unwrap().to_string()
    }

    #[test]
    fn stage_commit_and_push_to_bare_remote() {
        let work = tempfile::tempdir().unwrap();
        let remote_dir = tempfile::tempdir().unwrap();
        let repo = init_checkout(work.path());
        Repository::init_bare(remote_dir.path()).unwrap();
        repo.remote("origin", &remote_dir.path().to_string_lossy()).unwrap();

        fs::create_dir_all(work.path().join("generated_sites/site_5-3-2025_progress_1")).unwrap();
        fs::write(work.path().join("generated_sites/site_5-3-2025_progress_1/index.html"), "<p/>").unwrap();
        fs::write(work.path().join("README.md"), "# 30github").unwrap();

        let vcs = GitCheckout::discover(work.path(), "origin", None).unwrap();
        assert!(commit_and_push(&vcs, "Site created. Progress: 1/30 days.", true));
        assert_eq!(head_message(&repo), "Site created. Progress: 1/30 days.");

        let head = repo.head().unwrap();
        let branch = head.shorthand().unwrap();
        let bare = Repository::open_bare(remote_dir.path()).unwrap();
        let pushed = bare
            .find_reference(&format!("refs/heads/{}", branch))
            .unwrap()
            .peel_to_commit()
            .unwrap();
        assert_eq!(pushed.id(), head.target().unwrap());
        let tree = pushed.tree().unwrap();
        assert!(tree.get_path(Path::new("generated_sites/site_5-3-2025_progress_1/index.html")).is_ok());
    }

    #[test]
    fn second_commit_has_parent_and_deletions_are_staged() {
        let work = tempfile::tempdir().unwrap();
        let repo = init_checkout(work.path());
        fs::write(work.path().join("a.txt"), "a").unwrap();
        fs::write(work.path().join("b.txt"), "b").unwrap();
        let vcs = GitCheckout::discover(work.path(), "origin", None).unwrap();
        vcs.stage().unwrap();
        vcs.commit("first").unwrap();

        fs::remove_file(work.path().join("b.txt")).unwrap();
        vcs.stage().unwrap();
        vcs.commit("second").unwrap();

        let head = repo.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(head.parent_count(), 1);
        assert!(head.tree().unwrap().get_name("b.txt").is_none());
        assert!(head.tree().unwrap().get_name("a.txt").is_some());
    }

    #[test]
    fn failures_are_swallowed() {
        let work = tempfile::tempdir().unwrap();
        init_checkout(work.path());
        fs::write(work.path().join("a.txt"), "a").unwrap();
        let vcs = GitCheckout::discover(work.path(), "origin", None).unwrap();
        // no `origin` remote configured
        assert!(!commit_and_push(&vcs, "msg", true));

        // nothing changed since the last commit
        assert!(!commit_and_push(&vcs, "msg", false));
    }

    #[test]
    fn discover_outside_checkout_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = GitCheckout::discover(dir.path(), "origin", None).map(|_| ()).unwrap_err();
        assert_eq!(err.error_kind(), ThirtyErrorKind::Git);
    }

    #[derive(Default)]
    struct Recording {
        calls: RefCell<Vec<String>>,
        fail_commit: bool,
    }

    impl VersionControl for Recording {
        fn stage(&self) -> Result<(), ThirtyError> {
            self.calls.borrow_mut().push("stage".into());
            Ok(())
        }
        fn commit(&self, message: &str) -> Result<(), ThirtyError> {
            self.calls.borrow_mut().push(format!("commit: {}", message));
            match self.fail_commit {
                true => Err(ThirtyError::kind(ThirtyErrorKind::Git, Some("nothing to commit"))),
                false => Ok(()),
            }
        }
        fn push(&self) -> Result<(), ThirtyError> {
            self.calls.borrow_mut().push("push".into());
            Ok(())
        }
    }

    #[test]
    fn steps_run_in_order_and_stop_on_failure() {
        let vcs = Recording::default();
        assert!(commit_and_push(&vcs, "hello", true));
        assert_eq!(*vcs.calls.borrow(), vec!["stage", "commit: hello", "push"]);

        let vcs = Recording::default();
        assert!(commit_and_push(&vcs, "hello", false));
        assert_eq!(*vcs.calls.borrow(), vec!["stage", "commit: hello"]);

        let vcs = Recording {
            fail_commit: true,
            ..Default::default()
        };
        assert!(!commit_and_push(&vcs, "hello", true));
        assert_eq!(*vcs.calls.borrow(), vec!["stage", "commit: hello"]);
    }

    #[test]
    fn disabled_vcs_does_nothing() {
        assert!(!commit_and_push(&DisabledVcs, "hello", true));
    }
}
