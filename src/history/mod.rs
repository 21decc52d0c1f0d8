//! Append-only conversation history.
//!
//! Each conversation is a JSON Lines file in the history directory, one [`Turn`] per line.
//! Lines are written whole with a single write on an append-mode handle, so a log never holds
//! a partial turn from this process.

use crate::error::{ChatlineError, Result};
use crate::turn::Turn;
use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, instrument};

const LOG_EXTENSION: &str = "jsonl";

/// Name of one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(name: &str) -> Result<Self> {
        let valid_chars = name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

        if name.is_empty() || name.starts_with('.') || !valid_chars {
            return Err(ChatlineError::InvalidInput(format!(
                "Invalid conversation name '{}': use letters, digits, '-', '_' or '.'",
                name
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self("default".to_string())
    }
}

impl FromStr for ConversationId {
    type Err = ChatlineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Summary of one stored conversation.
#[derive(Debug, Clone)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub turns: usize,
    pub modified: Option<DateTime<Local>>,
}

/// File-backed history store.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the conversation logs.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of a conversation's log.
    pub fn path(&self, conversation: &ConversationId) -> PathBuf {
        self.dir
            .join(format!("{}.{}", conversation.as_str(), LOG_EXTENSION))
    }

    /// Load every turn of a conversation, oldest first.
    ///
    /// A missing log is created empty. A line that does not parse is an error.
    #[instrument(skip(self), fields(conversation = %conversation))]
    pub fn load(&self, conversation: &ConversationId) -> Result<Vec<Turn>> {
        let path = self.path(conversation);
        if !path.exists() {
            self.touch(&path)?;
            debug!("Created empty history log {}", path.display());
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&path)?;
        let turns = parse_log(&path, &contents)?;
        debug!("Loaded {} turns from {}", turns.len(), path.display());
        Ok(turns)
    }

    /// Append one turn to the end of a conversation's log.
    pub fn append(&self, conversation: &ConversationId, turn: &Turn) -> Result<()> {
        let path = self.path(conversation);
        fs::create_dir_all(&self.dir)?;

        let mut line = serde_json::to_string(turn)?;
        line.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Truncate a conversation's log to empty.
    pub fn clear(&self, conversation: &ConversationId) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::File::create(self.path(conversation))?;
        debug!("Cleared history for {}", conversation);
        Ok(())
    }

    /// List stored conversations, sorted by name.
    pub fn list(&self) -> Result<Vec<ConversationSummary>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(LOG_EXTENSION) {
                continue;
            }
            let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| ConversationId::new(s).ok())
            else {
                continue;
            };

            let contents = fs::read_to_string(&path)?;
            let turns = contents.lines().filter(|l| !l.trim().is_empty()).count();
            let modified = fs::metadata(&path)
                .and_then(|m| m.modified())
                .ok()
                .map(DateTime::<Local>::from);

            summaries.push(ConversationSummary { id, turns, modified });
        }

        summaries.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(summaries)
    }

    fn touch(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        OpenOptions::new().create(true).append(true).open(path)?;
        Ok(())
    }
}

fn parse_log(path: &Path, contents: &str) -> Result<Vec<Turn>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|source| ChatlineError::HistoryCorrupt {
                path: path.to_path_buf(),
                line: index + 1,
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn::Role;

    fn store() -> (tempfile::TempDir, HistoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history"));
        (dir, store)
    }

    #[test]
    fn test_load_missing_creates_empty_log() {
        let (_dir, store) = store();
        let id = ConversationId::default();
        assert!(store.load(&id).unwrap().is_empty());
        assert!(store.path(&id).exists());
    }

    #[test]
    fn test_append_then_load_roundtrip() {
        let (_dir, store) = store();
        let id = ConversationId::default();

        store.append(&id, &Turn::user("hi")).unwrap();
        store.append(&id, &Turn::assistant("Hello! How can I help?")).unwrap();

        let turns = store.load(&id).unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].text(), "hi");
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].text(), "Hello! How can I help?");
    }

    #[test]
    fn test_clear_empties_log() {
        let (_dir, store) = store();
        let id = ConversationId::new("work").unwrap();

        store.append(&id, &Turn::user("one")).unwrap();
        store.append(&id, &Turn::assistant("two")).unwrap();
        store.clear(&id).unwrap();

        assert!(store.load(&id).unwrap().is_empty());
    }

    #[test]
    fn test_conversations_are_isolated() {
        let (_dir, store) = store();
        let work = ConversationId::new("work").unwrap();
        let home = ConversationId::new("home").unwrap();

        store.append(&work, &Turn::user("deadline?")).unwrap();

        assert_eq!(store.load(&work).unwrap().len(), 1);
        assert!(store.load(&home).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_line_is_fatal() {
        let (_dir, store) = store();
        let id = ConversationId::default();
        store.append(&id, &Turn::user("fine")).unwrap();

        let mut file = OpenOptions::new().append(true).open(store.path(&id)).unwrap();
        writeln!(file, "{{'role': 'user', 'content': 'python repr'}}").unwrap();

        match store.load(&id) {
            Err(ChatlineError::HistoryCorrupt { line, .. }) => assert_eq!(line, 2),
            other => panic!("Expected HistoryCorrupt, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let (_dir, store) = store();
        let id = ConversationId::default();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(
            store.path(&id),
            "{\"role\":\"user\",\"content\":\"a\"}\n\n{\"role\":\"assistant\",\"content\":\"b\"}\n",
        )
        .unwrap();

        assert_eq!(store.load(&id).unwrap().len(), 2);
    }

    #[test]
    fn test_list_conversations() {
        let (_dir, store) = store();
        store.append(&ConversationId::new("zeta").unwrap(), &Turn::user("z")).unwrap();
        store.append(&ConversationId::default(), &Turn::user("a")).unwrap();
        store.append(&ConversationId::default(), &Turn::assistant("b")).unwrap();

        let list = store.list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id.as_str(), "default");
        assert_eq!(list[0].turns, 2);
        assert_eq!(list[1].id.as_str(), "zeta");
    }

    #[test]
    fn test_conversation_id_validation() {
        assert!(ConversationId::new("project-x_2.1").is_ok());
        assert!(ConversationId::new("").is_err());
        assert!(ConversationId::new("../etc/passwd").is_err());
        assert!(ConversationId::new(".hidden").is_err());
        assert!(ConversationId::new("a b").is_err());
    }
}
