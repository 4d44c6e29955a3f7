use crate::{errors::*, types::SyncOptions};
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    BranchType, CertificateCheckStatus, Commit, FetchOptions, RemoteCallbacks, Repository,
    Signature,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A local working copy of a remote repository, brought up to date by
/// [`SyncedRepository::sync`].
pub struct SyncedRepository {
    path: PathBuf,
    repo: Repository,
    local_branch: String,
}

impl std::fmt::Debug for SyncedRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncedRepository")
            .field("path", &self.path)
            .field("local_branch", &self.local_branch)
            .finish_non_exhaustive()
    }
}

impl SyncedRepository {
    /// Ensure a working tree for `remote_url` exists at `local_path`: clone
    /// when absent, fetch + merge the remote primary branch when present.
    pub fn sync(remote_url: &str, local_path: &Path, opts: &SyncOptions) -> Result<Self> {
        let repo = match Repository::open(local_path) {
            Ok(repo) => {
                info!(path = %local_path.display(), "updating existing checkout");
                Self::fetch_and_merge(&repo, remote_url, opts)?;
                repo
            }
            Err(_) => {
                info!(url = remote_url, path = %local_path.display(), "cloning repository");
                Self::clone_into(remote_url, local_path, opts)?
            }
        };
        Ok(Self {
            path: local_path.to_path_buf(),
            repo,
            local_branch: opts.local_branch.clone(),
        })
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn workdir(&self) -> Result<&Path> {
        self.repo
            .workdir()
            .ok_or_else(|| SourceError::Git(git2::Error::from_str("repository has no working tree")))
    }

    /// Tip commit of the primary branch; falls back to HEAD when the
    /// configured branch name does not exist locally.
    pub fn tip_commit(&self) -> Result<Commit<'_>> {
        if let Ok(branch) = self.repo.find_branch(&self.local_branch, BranchType::Local) {
            return Ok(branch.into_reference().peel_to_commit()?);
        }
        debug!(
            branch = %self.local_branch,
            "local branch not found, falling back to HEAD"
        );
        Ok(self.repo.head()?.peel_to_commit()?)
    }

    fn remote_callbacks(opts: &SyncOptions) -> RemoteCallbacks<'static> {
        let mut callbacks = RemoteCallbacks::new();
        if !opts.verify_certificates {
            callbacks.certificate_check(|_cert, _host| Ok(CertificateCheckStatus::CertificateOk));
        }
        callbacks
    }

    fn clone_into(remote_url: &str, local_path: &Path, opts: &SyncOptions) -> Result<Repository> {
        if let Some(parent) = local_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut fetch_opts = FetchOptions::new();
        fetch_opts.remote_callbacks(Self::remote_callbacks(opts));
        RepoBuilder::new()
            .fetch_options(fetch_opts)
            .clone(remote_url, local_path)
            .map_err(|source| SourceError::RepositoryUnreachable {
                url: remote_url.to_string(),
                source,
            })
    }

    /// Fetch all configured refspecs from `origin`, then merge the
    /// remote-tracking primary branch into the local one. Fast-forwards when
    /// analysis allows; already-up-to-date is a no-op.
    fn fetch_and_merge(repo: &Repository, remote_url: &str, opts: &SyncOptions) -> Result<()> {
        let mut remote = repo
            .find_remote("origin")
            .or_else(|_| repo.remote_anonymous(remote_url))?;
        let mut fetch_opts = FetchOptions::new();
        fetch_opts.remote_callbacks(Self::remote_callbacks(opts));
        remote
            .fetch(&[] as &[&str], Some(&mut fetch_opts), None)
            .map_err(|source| SourceError::RepositoryUnreachable {
                url: remote_url.to_string(),
                source,
            })?;
        drop(remote);

        let remote_ref = repo
            .resolve_reference_from_short_name(&opts.remote_branch)
            .map_err(|_| SourceError::BranchNotFound(opts.remote_branch.clone()))?;
        let annotated = repo.reference_to_annotated_commit(&remote_ref)?;
        let (analysis, _) = repo.merge_analysis(&[&annotated])?;

        if analysis.is_up_to_date() {
            debug!(branch = %opts.local_branch, "already up to date");
            return Ok(());
        }

        if analysis.is_fast_forward() {
            let branch = repo
                .find_branch(&opts.local_branch, BranchType::Local)
                .map_err(|_| SourceError::BranchNotFound(opts.local_branch.clone()))?;
            let mut branch_ref = branch.into_reference();
            branch_ref.set_target(annotated.id(), "fast-forward")?;
            repo.set_head(&format!("refs/heads/{}", opts.local_branch))?;
            repo.checkout_head(Some(CheckoutBuilder::default().force()))?;
            info!(branch = %opts.local_branch, "fast-forwarded to remote tip");
            return Ok(());
        }

        repo.merge(&[&annotated], None, None)?;
        let mut index = repo.index()?;
        if index.has_conflicts() {
            repo.cleanup_state()?;
            return Err(SourceError::Git(git2::Error::from_str(
                "merge produced conflicts",
            )));
        }
        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;
        let sig = repo
            .signature()
            .or_else(|_| Signature::now("gitsource", "gitsource@localhost"))?;
        let head_commit = repo.head()?.peel_to_commit()?;
        let theirs = repo.find_commit(annotated.id())?;
        repo.commit(
            Some("HEAD"),
            &sig,
            &sig,
            &format!("Merge {} into {}", opts.remote_branch, opts.local_branch),
            &tree,
            &[&head_commit, &theirs],
        )?;
        repo.cleanup_state()?;
        info!(branch = %opts.local_branch, "merged remote changes");
        Ok(())
    }
}
