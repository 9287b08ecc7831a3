// Credential store: a `KEY=VALUE` file in the working directory holding the
// agent's identity and registration extras.
//
// Reads go through `dotenvy` so quoted values and comments parse the same
// way any other `.env` tooling would see them. Writes are partial updates:
// matching lines are rewritten in place, new keys are appended, and every
// other line in the file is left untouched. The new contents go to a
// temporary file beside the target which is then renamed over it, so a
// failed write never leaves a truncated file behind.

use crate::error::StoreError;
use crate::models::AgentIdentity;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub const KEY_API_KEY: &str = "MOLTBOOK_API_KEY";
pub const KEY_ID: &str = "MOLTBOOK_ID";
pub const KEY_NAME: &str = "MOLTBOOK_NAME";
pub const KEY_CLAIM_URL: &str = "MOLTBOOK_CLAIM_URL";
pub const KEY_VERIFY_CODE: &str = "MOLTBOOK_VERIFY_CODE";

pub const DEFAULT_DISPLAY_NAME: &str = "Unknown Agent";

/// File-backed key/value store for agent credentials.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    inherit_process_env: bool,
}

impl CredentialStore {
    /// Store backed by `path`. Identity keys missing from the file are
    /// looked up in the process environment.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CredentialStore {
            path: path.into(),
            inherit_process_env: true,
        }
    }

    /// Only consult the file, never the process environment.
    pub fn ignore_process_env(mut self) -> Self {
        self.inherit_process_env = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All key/value pairs in file order. A missing file yields no entries.
    pub fn entries(&self) -> Result<Vec<(String, String)>, StoreError> {
        let iter = match dotenvy::from_path_iter(&self.path) {
            Ok(iter) => iter,
            Err(e) if e.not_found() => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        iter.map(|item| {
            item.map_err(|source| StoreError::Read {
                path: self.path.clone(),
                source,
            })
        })
        .collect()
    }

    /// Read the current identity snapshot. The first run, with no file and
    /// no key in the environment, yields an identity without credentials.
    pub fn load(&self) -> Result<AgentIdentity, StoreError> {
        let entries = self.entries()?;
        let lookup = |key: &str| -> Option<String> {
            entries
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .filter(|v| !v.is_empty())
                .or_else(|| {
                    if self.inherit_process_env {
                        std::env::var(key).ok().filter(|v| !v.is_empty())
                    } else {
                        None
                    }
                })
        };

        let identity = AgentIdentity {
            id: lookup(KEY_ID),
            api_key: lookup(KEY_API_KEY),
            display_name: lookup(KEY_NAME).unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string()),
        };
        debug!(
            path = %self.path.display(),
            has_credentials = identity.has_credentials(),
            "loaded credentials"
        );
        Ok(identity)
    }

    /// Replace `identity` with what is on disk now.
    pub fn reload(&self, identity: &mut AgentIdentity) -> Result<(), StoreError> {
        *identity = self.load()?;
        Ok(())
    }

    /// Write every non-empty value in `mapping`, keeping all other lines.
    /// The file is created if needed and flushed to disk before returning.
    pub fn save<I, K, V>(&self, mapping: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let updates: Vec<(String, String)> = mapping
            .into_iter()
            .filter(|(_, v)| !v.as_ref().is_empty())
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect();
        if updates.is_empty() {
            return Ok(());
        }

        let existing = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let mut written = vec![false; updates.len()];
        let mut lines: Vec<String> = existing
            .lines()
            .map(|line| match line_key(line) {
                Some((key, exported)) => match updates.iter().position(|(k, _)| k == key) {
                    Some(idx) => {
                        written[idx] = true;
                        let entry = format_entry(&updates[idx].0, &updates[idx].1);
                        if exported {
                            format!("export {entry}")
                        } else {
                            entry
                        }
                    }
                    None => line.to_string(),
                },
                None => line.to_string(),
            })
            .collect();
        for (idx, (key, value)) in updates.iter().enumerate() {
            if !written[idx] {
                lines.push(format_entry(key, value));
            }
        }

        let mut contents = lines.join("\n");
        contents.push('\n');

        replace_file(&self.path, &contents).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;

        let keys: Vec<&str> = updates.iter().map(|(k, _)| k.as_str()).collect();
        info!(path = %self.path.display(), keys = ?keys, "saved credentials");
        Ok(())
    }
}

/// Swap `contents` in for `path` via a synced temporary file in the same
/// directory. On error the old file is untouched and the temporary removed.
fn replace_file(path: &Path, contents: &str) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Key of an assignment line and whether it carried `export`. Comments and
/// blanks have no key.
fn line_key(line: &str) -> Option<(&str, bool)> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let (trimmed, exported) = match trimmed.strip_prefix("export ") {
        Some(rest) => (rest, true),
        None => (trimmed, false),
    };
    let (key, _) = trimmed.split_once('=')?;
    Some((key.trim(), exported))
}

fn format_entry(key: &str, value: &str) -> String {
    if !value.contains('\'') && !value.contains('\n') {
        return format!("{key}='{value}'");
    }
    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '$' => escaped.push_str("\\$"),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    format!("{key}=\"{escaped}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> CredentialStore {
        CredentialStore::new(dir.path().join(".env")).ignore_process_env()
    }

    #[test]
    fn missing_file_loads_empty_identity() {
        let dir = TempDir::new().unwrap();
        let identity = store_in(&dir).load().unwrap();
        assert!(!identity.has_credentials());
        assert_eq!(identity.id, None);
        assert_eq!(identity.display_name, DEFAULT_DISPLAY_NAME);
    }

    #[test]
    fn save_then_load_round_trips_identity() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .save([
                (KEY_ID, "agent-42"),
                (KEY_API_KEY, "moltbook_sk_abc"),
                (KEY_NAME, "Crab Bot"),
            ])
            .unwrap();

        let identity = store.load().unwrap();
        assert_eq!(identity.id.as_deref(), Some("agent-42"));
        assert_eq!(identity.api_key.as_deref(), Some("moltbook_sk_abc"));
        assert_eq!(identity.display_name, "Crab Bot");
    }

    #[test]
    fn save_preserves_unrelated_lines_and_skips_empty_values() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            "# local settings\nOTHER_TOKEN=\"keep me\"\nMOLTBOOK_API_KEY=old\n",
        )
        .unwrap();

        store
            .save([(KEY_API_KEY, "new-key"), (KEY_CLAIM_URL, "")])
            .unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.starts_with("# local settings\n"));
        assert!(!text.contains(KEY_CLAIM_URL));

        let entries = store.entries().unwrap();
        assert_eq!(
            entries,
            vec![
                ("OTHER_TOKEN".to_string(), "keep me".to_string()),
                (KEY_API_KEY.to_string(), "new-key".to_string()),
            ]
        );
    }

    #[test]
    fn new_keys_are_appended_in_order() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "EXISTING=1").unwrap();

        store
            .save([(KEY_ID, "7"), (KEY_VERIFY_CODE, "reef-X4B2")])
            .unwrap();

        let keys: Vec<String> = store.entries().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["EXISTING", KEY_ID, KEY_VERIFY_CODE]);
    }

    #[test]
    fn awkward_values_survive_a_rewrite() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .save([(KEY_NAME, "O'Brien's \"bot\" $HOME")])
            .unwrap();
        assert_eq!(
            store.load().unwrap().display_name,
            "O'Brien's \"bot\" $HOME"
        );
    }

    #[test]
    fn reload_replaces_stale_values() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut identity = AgentIdentity {
            id: Some("stale".into()),
            api_key: Some("stale-key".into()),
            display_name: "Stale".into(),
        };

        store.save([(KEY_API_KEY, "fresh-key")]).unwrap();
        store.reload(&mut identity).unwrap();
        store.reload(&mut identity).unwrap();

        assert_eq!(identity.api_key.as_deref(), Some("fresh-key"));
        assert_eq!(identity.id, None);
        assert_eq!(identity.display_name, DEFAULT_DISPLAY_NAME);
    }

    #[test]
    fn empty_key_in_file_is_not_a_credential() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "MOLTBOOK_API_KEY=\n").unwrap();
        assert!(!store.load().unwrap().has_credentials());
    }

    #[test]
    fn unreadable_file_is_a_read_side_error() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path()).ignore_process_env();
        let err = store.save([(KEY_API_KEY, "k")]).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn write_failure_surfaces() {
        let dir = TempDir::new().unwrap();
        // A trailing slash makes the final rename fail after the read found nothing.
        let store = CredentialStore::new(format!("{}/.env/", dir.path().display()))
            .ignore_process_env();

        let err = store.save([(KEY_API_KEY, "k")]).unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn failed_replace_keeps_previous_contents() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join(".env");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("kept"), "UNRELATED_SECRET='k'\n").unwrap();

        assert!(replace_file(&target, "MOLTBOOK_API_KEY='x'\n").is_err());

        assert_eq!(
            fs::read_to_string(target.join("kept")).unwrap(),
            "UNRELATED_SECRET='k'\n"
        );
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn save_leaves_no_temporary_files() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save([(KEY_API_KEY, "one")]).unwrap();
        store.save([(KEY_API_KEY, "two")]).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(".env")]);
        assert_eq!(store.load().unwrap().api_key.as_deref(), Some("two"));
    }

    #[test]
    fn exported_lines_keep_their_prefix() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "export MOLTBOOK_API_KEY=old\nexport OTHER=1\n").unwrap();

        store.save([(KEY_API_KEY, "new")]).unwrap();

        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "export MOLTBOOK_API_KEY='new'\nexport OTHER=1\n"
        );
        assert_eq!(store.load().unwrap().api_key.as_deref(), Some("new"));
    }
}
