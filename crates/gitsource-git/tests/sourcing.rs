use gitsource_core::{ContentGraphSink, ContentNode, SourceConfig};
use gitsource_git::builder::file_node_seed;
use gitsource_git::synchronize;
use gitsource_graph::MemoryGraph;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn write_file<P: AsRef<Path>>(p: P, content: &str) {
    std::fs::create_dir_all(p.as_ref().parent().unwrap()).unwrap();
    std::fs::write(p, content).unwrap();
}

fn commit_at(repo: &git2::Repository, paths: &[&str], message: &str, epoch: i64) -> String {
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
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
        .to_string()
}

fn ensure_master(repo: &git2::Repository) {
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    if repo.find_branch("master", git2::BranchType::Local).is_err() {
        repo.branch("master", &head, true).unwrap();
    }
    repo.set_head("refs/heads/master").unwrap();
}

/// Three commits: a.txt, then b.txt, then a.txt again. Returns shas
/// oldest-first.
fn fixture_repo(dir: &Path) -> Vec<String> {
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

async fn wait_for<F: Fn() -> bool>(what: &str, cond: F) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("timed out waiting for {what}");
}

#[tokio::test(flavor = "multi_thread")]
async fn full_session_materializes_remote_commits_and_files() {
    let src = tempdir().unwrap();
    let shas = fixture_repo(src.path());
    let cache = tempdir().unwrap();

    let memory = Arc::new(MemoryGraph::new());
    let sink: Arc<dyn ContentGraphSink> = memory.clone();
    let mut config = SourceConfig::new("docs", src.path().to_str().unwrap());
    config.cache_dir = Some(cache.path().to_path_buf());

    let session = synchronize(config, Arc::clone(&sink)).await.unwrap();
    session.bootstrap_finished();

    assert_eq!(memory.count_of_type("GitRemote"), 1);
    assert_eq!(memory.count_of_type("GitCommit"), 3);
    assert_eq!(memory.count_of_type("File"), 2);

    let a_id = sink.allocate_id(&file_node_seed("a.txt"));
    let Some(ContentNode::File(node)) = sink.lookup(a_id).await.unwrap() else {
        panic!("a.txt node missing");
    };
    // a.txt was in every snapshot, most recent first.
    assert_eq!(
        node.commits.as_deref().unwrap(),
        &[shas[2].clone(), shas[1].clone(), shas[0].clone()]
    );
    assert_eq!(node.remote, Some(sink.allocate_id("git-remote-docs")));

    let b_id = sink.allocate_id(&file_node_seed("b.txt"));
    let Some(ContentNode::File(node)) = sink.lookup(b_id).await.unwrap() else {
        panic!("b.txt node missing");
    };
    assert_eq!(
        node.commits.as_deref().unwrap(),
        &[shas[2].clone(), shas[1].clone()]
    );

    session.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn resynchronizing_an_unchanged_repository_is_idempotent() {
    let src = tempdir().unwrap();
    fixture_repo(src.path());
    let cache = tempdir().unwrap();

    let memory = Arc::new(MemoryGraph::new());
    let sink: Arc<dyn ContentGraphSink> = memory.clone();
    let config = |cache: &Path| {
        let mut c = SourceConfig::new("docs", src.path().to_str().unwrap());
        c.cache_dir = Some(cache.to_path_buf());
        c
    };

    let session = synchronize(config(cache.path()), Arc::clone(&sink))
        .await
        .unwrap();
    let nodes_after_first = memory.node_count();
    session.shutdown();

    // Second run hits the fetch+merge path against an unchanged upstream.
    let session = synchronize(config(cache.path()), Arc::clone(&sink))
        .await
        .unwrap();
    assert_eq!(memory.node_count(), nodes_after_first);
    assert_eq!(memory.count_of_type("GitCommit"), 3);
    session.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn live_changes_flow_into_the_graph_after_readiness() {
    let src = tempdir().unwrap();
    fixture_repo(src.path());
    let cache = tempdir().unwrap();

    let memory = Arc::new(MemoryGraph::new());
    let sink: Arc<dyn ContentGraphSink> = memory.clone();
    let mut config = SourceConfig::new("docs", src.path().to_str().unwrap());
    config.cache_dir = Some(cache.path().to_path_buf());

    let session = synchronize(config, Arc::clone(&sink)).await.unwrap();
    session.bootstrap_finished();
    let checkout = session.local_path().to_path_buf();

    write_file(checkout.join("fresh.txt"), "fresh");
    let fresh_id = sink.allocate_id(&file_node_seed("fresh.txt"));
    {
        let memory = Arc::clone(&memory);
        wait_for("fresh.txt node", move || memory.contains(fresh_id)).await;
    }

    // A path with no recorded history carries no commit links.
    let Some(ContentNode::File(node)) = sink.lookup(fresh_id).await.unwrap() else {
        panic!("fresh.txt node missing");
    };
    assert!(node.commits.is_none());

    std::fs::remove_file(checkout.join("fresh.txt")).unwrap();
    {
        let memory = Arc::clone(&memory);
        wait_for("fresh.txt removal", move || !memory.contains(fresh_id)).await;
    }

    session.shutdown();
}
