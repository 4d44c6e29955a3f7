//! Fixture helpers shared by the unit tests.

use crate::repo::SyncedRepository;
use crate::types::SyncOptions;
use git2::BranchType;
use std::path::Path;

pub fn write_file<P: AsRef<Path>>(p: P, content: &str) {
    std::fs::create_dir_all(p.as_ref().parent().unwrap()).unwrap();
    std::fs::write(p, content).unwrap();
}

/// Commit the given paths with a fixed author and an explicit timestamp, so
/// time-ordered traversals are deterministic.
pub fn commit_at(repo: &git2::Repository, paths: &[&str], message: &str, epoch: i64) -> String {
    let sig =
        git2::Signature::new("Tester", "tester@example.com", &git2::Time::new(epoch, 0)).unwrap();
    let mut index = repo.index().unwrap();
    for p in paths {
        index.add_path(Path::new(p)).unwrap();
    }
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    let oid = repo
        .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap();
    oid.to_string()
}

/// Pin the primary branch name to `master` regardless of the host's
/// `init.defaultBranch` setting.
pub fn ensure_master(repo: &git2::Repository) {
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    if repo.find_branch("master", BranchType::Local).is_err() {
        repo.branch("master", &head, true).unwrap();
    }
    repo.set_head("refs/heads/master").unwrap();
}

/// Three commits touching `a.txt`, `b.txt`, `a.txt`; returns shas
/// oldest-first.
pub fn fixture_repo(dir: &Path) -> Vec<String> {
    let repo = git2::Repository::init(dir).unwrap();
    write_file(dir.join("a.txt"), "one");
    let c1 = commit_at(&repo, &["a.txt"], "c1", 1_700_000_000);
    ensure_master(&repo);
    write_file(dir.join("b.txt"), "two");
    let c2 = commit_at(&repo, &["b.txt"], "c2", 1_700_000_100);
    write_file(dir.join("a.txt"), "three");
    let c3 = commit_at(&repo, &["a.txt"], "c3", 1_700_000_200);
    vec![c1, c2, c3]
}

pub fn clone_of(src: &Path, dst: &Path) -> SyncedRepository {
    SyncedRepository::sync(src.to_str().unwrap(), dst, &SyncOptions::default()).unwrap()
}
