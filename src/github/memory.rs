//! In-memory git object database used by tests.

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{
    CommitInfo, ContentEntry, ContentsResponse, GitDatabase, GitHubApiError, PutContentsCommit,
    RepoContents, TreeEntry,
};

#[derive(Debug, Clone)]
struct Commit {
    tree: String,
    parent: Option<String>,
    message: String,
}

#[derive(Default)]
struct State {
    head: String,
    blobs: HashMap<String, String>,
    trees: HashMap<String, BTreeMap<String, String>>,
    commits: HashMap<String, Commit>,
    counter: u64,
    /// Contents API traffic: fetched paths and `(path, sha)` of each PUT
    fetched: Vec<String>,
    puts: Vec<(String, Option<String>)>,
}

impl State {
    /// Fresh object id; ids stay unique even for identical content.
    fn next_id(&mut self, kind: &str, payload: &str) -> String {
        self.counter += 1;
        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update(self.counter.to_le_bytes());
        hasher.update(payload.as_bytes());
        let hex = format!("{:x}", hasher.finalize());
        hex[..40].to_string()
    }

    fn is_ancestor<'a>(&'a self, ancestor: &str, mut sha: &'a str) -> bool {
        loop {
            if sha == ancestor {
                return true;
            }
            match self.commits.get(sha).and_then(|c| c.parent.as_deref()) {
                Some(parent) => sha = parent,
                None => return false,
            }
        }
    }

    fn commit_raw(&mut self, files: BTreeMap<String, String>, parent: Option<String>, message: &str) -> String {
        let mut tree = BTreeMap::new();
        for (path, content) in files {
            let blob = self.next_id("blob", &content);
            self.blobs.insert(blob.clone(), content);
            tree.insert(path, blob);
        }
        let tree_sha = self.next_id("tree", &format!("{:?}", tree));
        self.trees.insert(tree_sha.clone(), tree);
        let sha = self.next_id("commit", message);
        self.commits.insert(
            sha.clone(),
            Commit {
                tree: tree_sha,
                parent,
                message: message.to_string(),
            },
        );
        sha
    }
}

pub struct MemoryRepo {
    state: Mutex<State>,
    /// Another writer pushes a commit right before our next ref update
    race_next_update: AtomicBool,
    fail_blobs: AtomicBool,
}

impl MemoryRepo {
    /// A repository whose branch holds one commit containing `files`.
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let mut state = State::default();
        let files = files
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect();
        state.head = state.commit_raw(files, None, "Initial commit");
        Self {
            state: Mutex::new(state),
            race_next_update: AtomicBool::new(false),
            fail_blobs: AtomicBool::new(false),
        }
    }

    pub fn head(&self) -> String {
        self.state.lock().unwrap().head.clone()
    }

    /// Number of commits reachable from the branch head.
    pub fn history_len(&self) -> usize {
        let state = self.state.lock().unwrap();
        let mut count = 0;
        let mut current = Some(state.head.clone());
        while let Some(sha) = current {
            count += 1;
            current = state.commits.get(&sha).and_then(|c| c.parent.clone());
        }
        count
    }

    /// Files of the tree at `sha`, path → content.
    pub fn files_at(&self, sha: &str) -> BTreeMap<String, String> {
        let state = self.state.lock().unwrap();
        Self::files_of_commit(&state, sha)
    }

    pub fn parent_of(&self, sha: &str) -> Option<String> {
        self.state.lock().unwrap().commits[sha].parent.clone()
    }

    pub fn message_of(&self, sha: &str) -> String {
        self.state.lock().unwrap().commits[sha].message.clone()
    }

    pub fn race_next_update(&self) {
        self.race_next_update.store(true, Ordering::SeqCst);
    }

    pub fn fail_blobs(&self) {
        self.fail_blobs.store(true, Ordering::SeqCst);
    }

    /// Commit `files` on top of the head as another writer would.
    pub fn push_external(&self, files: &[(&str, &str)], message: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let head = state.head.clone();
        let mut tree = Self::files_of_commit(&state, &head);
        for (p, c) in files {
            tree.insert(p.to_string(), c.to_string());
        }
        let sha = state.commit_raw(tree, Some(head), message);
        state.head = sha.clone();
        sha
    }

    /// Paths requested through the contents API, in order.
    pub fn fetched(&self) -> Vec<String> {
        self.state.lock().unwrap().fetched.clone()
    }

    /// `(path, sha)` of every contents PUT, in order.
    pub fn puts(&self) -> Vec<(String, Option<String>)> {
        self.state.lock().unwrap().puts.clone()
    }

    /// Blob sha of `path` at the branch head.
    pub fn blob_sha(&self, path: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        let commit = &state.commits[&state.head];
        state.trees[&commit.tree].get(path).cloned()
    }

    fn files_of_commit(state: &State, sha: &str) -> BTreeMap<String, String> {
        let commit = &state.commits[sha];
        state.trees[&commit.tree]
            .iter()
            .map(|(path, blob)| (path.clone(), state.blobs[blob].clone()))
            .collect()
    }
}

fn not_found(what: &str) -> anyhow::Error {
    anyhow::Error::new(GitHubApiError {
        status: 404,
        message: format!("{} not found", what),
    })
}

impl GitDatabase for MemoryRepo {
    async fn branch_head(&self) -> Result<String> {
        Ok(self.head())
    }

    async fn commit_info(&self, sha: &str) -> Result<CommitInfo> {
        let state = self.state.lock().unwrap();
        let commit = state.commits.get(sha).ok_or_else(|| not_found("commit"))?;
        Ok(CommitInfo {
            sha: sha.to_string(),
            tree_sha: commit.tree.clone(),
        })
    }

    async fn create_blob(&self, content: &str) -> Result<String> {
        if self.fail_blobs.load(Ordering::SeqCst) {
            anyhow::bail!(GitHubApiError {
                status: 500,
                message: "blob storage unavailable".to_string(),
            });
        }
        let mut state = self.state.lock().unwrap();
        let sha = state.next_id("blob", content);
        state.blobs.insert(sha.clone(), content.to_string());
        Ok(sha)
    }

    async fn create_tree(&self, base_tree: &str, entries: &[TreeEntry]) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        let mut tree = state
            .trees
            .get(base_tree)
            .cloned()
            .ok_or_else(|| not_found("tree"))?;
        for entry in entries {
            if !state.blobs.contains_key(&entry.sha) {
                return Err(not_found("blob"));
            }
            tree.insert(entry.path.clone(), entry.sha.clone());
        }
        let sha = state.next_id("tree", &format!("{:?}", tree));
        state.trees.insert(sha.clone(), tree);
        Ok(sha)
    }

    async fn create_commit(&self, message: &str, tree: &str, parent: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        if !state.trees.contains_key(tree) {
            return Err(not_found("tree"));
        }
        let sha = state.next_id("commit", message);
        state.commits.insert(
            sha.clone(),
            Commit {
                tree: tree.to_string(),
                parent: Some(parent.to_string()),
                message: message.to_string(),
            },
        );
        Ok(sha)
    }

    async fn update_branch(&self, sha: &str, force: bool) -> Result<()> {
        if self.race_next_update.swap(false, Ordering::SeqCst) {
            self.push_external(&[("app/page.tsx", "concurrent edit")], "Concurrent edit");
        }

        let mut state = self.state.lock().unwrap();
        if !state.commits.contains_key(sha) {
            return Err(anyhow::Error::new(GitHubApiError {
                status: 422,
                message: "Object does not exist".to_string(),
            }));
        }
        if !force && !state.is_ancestor(&state.head, sha) {
            return Err(anyhow::Error::new(GitHubApiError {
                status: 422,
                message: "Update is not a fast forward".to_string(),
            }));
        }
        state.head = sha.to_string();
        Ok(())
    }

    fn commit_url(&self, sha: &str) -> String {
        format!("https://github.com/studio/site/commit/{}", sha)
    }
}

fn entry(path: &str, kind: &str, sha: &str, content: Option<String>) -> ContentEntry {
    ContentEntry {
        name: path.rsplit('/').next().unwrap_or(path).to_string(),
        path: path.to_string(),
        sha: sha.to_string(),
        kind: kind.to_string(),
        encoding: content.as_ref().map(|_| "base64".to_string()),
        content,
    }
}

/// Base64 with a line break every 60 characters, as the contents API sends it.
fn wrapped_base64(content: &str) -> String {
    let encoded = BASE64.encode(content.as_bytes());
    encoded
        .as_bytes()
        .chunks(60)
        .map(|chunk| format!("{}\n", String::from_utf8_lossy(chunk)))
        .collect()
}

impl RepoContents for MemoryRepo {
    fn describe(&self) -> String {
        "studio/site@main".to_string()
    }

    async fn get_contents(&self, path: &str) -> Result<ContentsResponse> {
        let mut state = self.state.lock().unwrap();
        state.fetched.push(path.to_string());
        let commit = &state.commits[&state.head];
        let tree = &state.trees[&commit.tree];

        if let Some(blob) = tree.get(path) {
            let content = wrapped_base64(&state.blobs[blob]);
            return Ok(ContentsResponse::File(entry(path, "file", blob, Some(content))));
        }

        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{}/", path)
        };
        let mut children: BTreeMap<String, ContentEntry> = BTreeMap::new();
        for (file, blob) in tree.iter().filter(|(file, _)| file.starts_with(&prefix)) {
            let rest = &file[prefix.len()..];
            match rest.split_once('/') {
                Some((dir, _)) => {
                    let dir_path = format!("{}{}", prefix, dir);
                    children
                        .entry(dir_path.clone())
                        .or_insert_with(|| entry(&dir_path, "dir", "tree", None));
                }
                None => {
                    children.insert(file.clone(), entry(file, "file", blob, None));
                }
            }
        }
        if children.is_empty() {
            return Err(not_found("path"));
        }
        Ok(ContentsResponse::Dir(children.into_values().collect()))
    }

    async fn put_contents(
        &self,
        path: &str,
        content: &str,
        message: &str,
        sha: Option<&str>,
    ) -> Result<PutContentsCommit> {
        let mut state = self.state.lock().unwrap();
        state.puts.push((path.to_string(), sha.map(str::to_string)));

        let head = state.head.clone();
        let mut files = Self::files_of_commit(&state, &head);
        let current = state.trees[&state.commits[&head].tree].get(path).cloned();
        match (current.as_deref(), sha) {
            (Some(_), None) => anyhow::bail!(GitHubApiError {
                status: 422,
                message: "\"sha\" wasn't supplied".to_string(),
            }),
            (current, Some(sha)) if current != Some(sha) => anyhow::bail!(GitHubApiError {
                status: 409,
                message: format!("{} does not match {}", path, sha),
            }),
            _ => {}
        }

        files.insert(path.to_string(), content.to_string());
        let sha = state.commit_raw(files, Some(head), message);
        state.head = sha.clone();
        Ok(PutContentsCommit {
            html_url: Some(self.commit_url(&sha)),
            sha,
        })
    }

    async fn search_code_paths(&self, query: &str) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        let head = state.head.clone();
        let query = query.to_lowercase();
        Ok(Self::files_of_commit(&state, &head)
            .into_iter()
            .filter(|(_, content)| content.to_lowercase().contains(&query))
            .map(|(path, _)| path)
            .collect())
    }
}
