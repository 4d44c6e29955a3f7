use crate::{FileNode, GitSourceError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use url::Url;
use uuid::Uuid;

pub type NodeId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    File,
    Directory,
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKind::File => write!(f, "file"),
            PathKind::Directory => write!(f, "directory"),
        }
    }
}

/// Filesystem change reported by the watcher, before the machine decides
/// whether to buffer or apply it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathEventKind {
    Added,
    Changed,
    Removed,
}

impl fmt::Display for PathEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathEventKind::Added => write!(f, "added"),
            PathEventKind::Changed => write!(f, "changed"),
            PathEventKind::Removed => write!(f, "deleted"),
        }
    }
}

/// Parsed identity of the remote repository a sourcing session tracks.
/// Created once per session and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDescriptor {
    pub id: NodeId,
    pub name: String,
    pub protocol: String,
    pub host: String,
    pub owner: Option<String>,
    pub repo: String,
    pub web_link: String,
}

impl RemoteDescriptor {
    /// Parse a remote url into its components. Accepts standard urls
    /// (`https://`, `git://`, `ssh://`, `file://`), scp-like syntax
    /// (`git@host:owner/repo.git`), and bare filesystem paths.
    pub fn parse(id: NodeId, name: &str, remote: &str) -> Result<Self> {
        let remote = remote.trim();
        if remote.is_empty() {
            return Err(GitSourceError::InvalidRemote("empty remote".into()));
        }

        if let Some(descriptor) = Self::parse_scp_like(id, name, remote) {
            return Ok(descriptor);
        }

        if let Ok(parsed) = Url::parse(remote) {
            if parsed.scheme() == "file" {
                return Ok(Self::local(id, name, parsed.path()));
            }
            let host = parsed
                .host_str()
                .ok_or_else(|| GitSourceError::InvalidRemote(format!("no host in {remote}")))?
                .to_string();
            let mut segments: Vec<String> = parsed
                .path_segments()
                .map(|s| {
                    s.filter(|p| !p.is_empty())
                        .map(|p| p.to_string())
                        .collect()
                })
                .unwrap_or_default();
            let repo = segments
                .pop()
                .map(|r| strip_git_suffix(&r))
                .ok_or_else(|| GitSourceError::InvalidRemote(format!("no path in {remote}")))?;
            let owner = if segments.is_empty() {
                None
            } else {
                Some(segments.join("/"))
            };
            let web_link = match &owner {
                Some(owner) => format!("https://{host}/{owner}/{repo}"),
                None => format!("https://{host}/{repo}"),
            };
            return Ok(Self {
                id,
                name: name.to_string(),
                protocol: parsed.scheme().to_string(),
                host,
                owner,
                repo,
                web_link,
            });
        }

        // Anything else is treated as a local working tree path.
        Ok(Self::local(id, name, remote))
    }

    fn parse_scp_like(id: NodeId, name: &str, remote: &str) -> Option<Self> {
        // user@host:path, where the part before ':' holds no '/'.
        let (user_host, path) = remote.split_once(':')?;
        let (_, host) = user_host.split_once('@')?;
        if user_host.contains('/') || host.is_empty() || path.is_empty() {
            return None;
        }
        let mut segments: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        let repo = strip_git_suffix(segments.pop()?);
        let owner = if segments.is_empty() {
            None
        } else {
            Some(segments.join("/"))
        };
        let web_link = match &owner {
            Some(owner) => format!("https://{host}/{owner}/{repo}"),
            None => format!("https://{host}/{repo}"),
        };
        Some(Self {
            id,
            name: name.to_string(),
            protocol: "ssh".to_string(),
            host: host.to_string(),
            owner,
            repo,
            web_link,
        })
    }

    fn local(id: NodeId, name: &str, path: &str) -> Self {
        let repo = path
            .rsplit('/')
            .find(|p| !p.is_empty())
            .map(strip_git_suffix)
            .unwrap_or_else(|| path.to_string());
        Self {
            id,
            name: name.to_string(),
            protocol: "file".to_string(),
            host: String::new(),
            owner: None,
            repo,
            web_link: path.to_string(),
        }
    }
}

fn strip_git_suffix(segment: &str) -> String {
    segment
        .strip_suffix(".git")
        .unwrap_or(segment)
        .to_string()
}

/// One record per distinct commit reachable from the primary branch tip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub id: NodeId,
    pub sha: String,
    pub remote: NodeId,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub digest: String,
}

/// Repository-relative path -> commit shas, most-recent-first.
///
/// A path's entry holds every commit whose tree snapshot contained the path,
/// not only the commits that changed it. Built once per sourcing session,
/// read-only afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitIndex {
    entries: HashMap<String, Vec<String>>,
}

impl CommitIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, path: impl Into<String>, sha: &str) {
        self.entries
            .entry(path.into())
            .or_default()
            .push(sha.to_string());
    }

    pub fn commits_for(&self, path: &str) -> Option<&[String]> {
        self.entries.get(path).map(|v| v.as_slice())
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The unit a [`crate::ContentGraphSink`] stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentNode {
    Remote(RemoteDescriptor),
    Commit(CommitRecord),
    File(FileNode),
}

impl ContentNode {
    pub fn id(&self) -> NodeId {
        match self {
            ContentNode::Remote(r) => r.id,
            ContentNode::Commit(c) => c.id,
            ContentNode::File(f) => f.id,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ContentNode::Remote(_) => "GitRemote",
            ContentNode::Commit(_) => "GitCommit",
            ContentNode::File(_) => "File",
        }
    }
}
