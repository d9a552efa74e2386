//! File metadata stored as extended attributes.
//!
//! Each field of [`FileAttributes`] lives in its own attribute under the
//! `user.sugar.` namespace. Text is stored as UTF-8, timestamps as decimal
//! microseconds since the Unix epoch, and tags as one comma-separated list.
//! A field set to `None` has its attribute removed on save.
//!
//! [`AttributeStore`] does the reading and writing through an
//! [`AttributeBackend`]: [`XattrBackend`] talks to the filesystem, while
//! [`MemoryBackend`] keeps everything in memory.
//!
//! # Example
//!
//! ```
//! use tessera::attributes::{AttributeStore, FileAttributes, MemoryBackend};
//!
//! let store = AttributeStore::new(MemoryBackend::new());
//! let path = std::env::temp_dir();
//!
//! let mut attrs = FileAttributes::new();
//! attrs.title = Some("Field notes".into());
//! store.save(&mut attrs, &path).unwrap();
//!
//! assert_eq!(store.title(&path).unwrap().as_deref(), Some("Field notes"));
//! ```

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tessera_core::logging::targets;

use crate::error::{AttributeError, AttributeResult};

/// Namespace shared by every attribute key.
pub const ATTRIBUTE_PREFIX: &str = "user.sugar.";

/// Attribute keys.
pub mod keys {
    /// Human-readable title.
    pub const TITLE: &str = "user.sugar.title";
    /// Free-form description.
    pub const DESCRIPTION: &str = "user.sugar.description";
    /// Comma-separated tags.
    pub const TAGS: &str = "user.sugar.tags";
    /// Name of the activity that created the file.
    pub const ACTIVITY: &str = "user.sugar.activity";
    /// Creation time, microseconds since the epoch.
    pub const CREATION_TIME: &str = "user.sugar.creation_time";
    /// Modification time, microseconds since the epoch.
    pub const MODIFICATION_TIME: &str = "user.sugar.modification_time";
    /// Path of a preview image.
    pub const PREVIEW_PATH: &str = "user.sugar.preview_path";
}

/// Current wall-clock time in microseconds since the Unix epoch.
pub fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

fn system_time_micros(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp_micros()
}

/// Metadata attached to a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileAttributes {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Comma-separated tag list, as stored.
    pub tags: Option<String>,
    pub activity: Option<String>,
    pub preview_path: Option<String>,
    /// Microseconds since the epoch; 0 when unknown.
    pub creation_time: i64,
    /// Microseconds since the epoch; 0 when unknown.
    pub modification_time: i64,
}

impl FileAttributes {
    /// Create empty attributes with both times set to now.
    pub fn new() -> Self {
        let now = now_micros();
        Self {
            creation_time: now,
            modification_time: now,
            ..Self::default()
        }
    }

    /// The tags as a list, trimmed, with empty entries dropped.
    pub fn tag_list(&self) -> Vec<String> {
        self.tags.as_deref().map(split_tags).unwrap_or_default()
    }

    /// Replace the tags. An empty list clears them.
    pub fn set_tag_list<S: AsRef<str>>(&mut self, tags: &[S]) {
        self.tags = join_tags(tags);
    }
}

fn split_tags(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}

fn join_tags<S: AsRef<str>>(tags: &[S]) -> Option<String> {
    if tags.is_empty() {
        return None;
    }
    Some(tags.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(","))
}

/// Raw access to a file's attributes.
pub trait AttributeBackend {
    /// Read an attribute. Returns `Ok(None)` if it is not set.
    fn get(&self, path: &Path, key: &str) -> AttributeResult<Option<String>>;

    /// Write an attribute.
    fn set(&self, path: &Path, key: &str, value: &str) -> AttributeResult<()>;

    /// Remove an attribute. Removing an absent attribute succeeds.
    fn remove(&self, path: &Path, key: &str) -> AttributeResult<()>;
}

/// Extended attributes on the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct XattrBackend;

impl XattrBackend {
    /// Returns true if this platform has extended attributes at all.
    pub fn is_supported() -> bool {
        xattr::SUPPORTED_PLATFORM
    }

    fn io_error(path: &Path, key: &str, source: io::Error) -> AttributeError {
        if source.kind() == io::ErrorKind::Unsupported {
            return AttributeError::Unsupported;
        }
        AttributeError::Io {
            path: path.to_path_buf(),
            key: key.to_string(),
            source,
        }
    }
}

impl AttributeBackend for XattrBackend {
    fn get(&self, path: &Path, key: &str) -> AttributeResult<Option<String>> {
        if !Self::is_supported() {
            return Err(AttributeError::Unsupported);
        }
        let Some(raw) = xattr::get(path, key).map_err(|e| Self::io_error(path, key, e))? else {
            return Ok(None);
        };
        String::from_utf8(raw).map(Some).map_err(|e| AttributeError::InvalidValue {
            key: key.to_string(),
            value: String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }

    fn set(&self, path: &Path, key: &str, value: &str) -> AttributeResult<()> {
        if !Self::is_supported() {
            return Err(AttributeError::Unsupported);
        }
        xattr::set(path, key, value.as_bytes()).map_err(|e| Self::io_error(path, key, e))
    }

    fn remove(&self, path: &Path, key: &str) -> AttributeResult<()> {
        if !Self::is_supported() {
            return Err(AttributeError::Unsupported);
        }
        let Err(err) = xattr::remove(path, key) else {
            return Ok(());
        };
        // The "no such attribute" errno differs between platforms, so ask
        // the file whether the key is still there.
        match xattr::list(path).map(|mut names| names.any(|name| name == key)) {
            Ok(false) => Ok(()),
            _ => Err(Self::io_error(path, key, err)),
        }
    }
}

/// Attributes kept in memory, keyed by path.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<(PathBuf, String), String>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored attributes across all paths.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl AttributeBackend for MemoryBackend {
    fn get(&self, path: &Path, key: &str) -> AttributeResult<Option<String>> {
        Ok(self
            .entries
            .lock()
            .get(&(path.to_path_buf(), key.to_string()))
            .cloned())
    }

    fn set(&self, path: &Path, key: &str, value: &str) -> AttributeResult<()> {
        self.entries
            .lock()
            .insert((path.to_path_buf(), key.to_string()), value.to_string());
        Ok(())
    }

    fn remove(&self, path: &Path, key: &str) -> AttributeResult<()> {
        self.entries
            .lock()
            .remove(&(path.to_path_buf(), key.to_string()));
        Ok(())
    }
}

/// Reads and writes [`FileAttributes`] through a backend.
#[derive(Debug, Default)]
pub struct AttributeStore<B: AttributeBackend = XattrBackend> {
    backend: B,
}

impl AttributeStore<XattrBackend> {
    /// A store over real extended attributes.
    pub fn xattr() -> Self {
        Self::new(XattrBackend)
    }
}

impl<B: AttributeBackend> AttributeStore<B> {
    /// Create a store over `backend`.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Read every attribute of `path`.
    ///
    /// Missing times fall back to the filesystem's creation and
    /// modification times when they are available.
    pub fn load(&self, path: impl AsRef<Path>) -> AttributeResult<FileAttributes> {
        let path = path.as_ref();
        let mut attrs = FileAttributes {
            title: self.backend.get(path, keys::TITLE)?,
            description: self.backend.get(path, keys::DESCRIPTION)?,
            tags: self.backend.get(path, keys::TAGS)?,
            activity: self.backend.get(path, keys::ACTIVITY)?,
            preview_path: self.backend.get(path, keys::PREVIEW_PATH)?,
            creation_time: self.get_time(path, keys::CREATION_TIME)?,
            modification_time: self.get_time(path, keys::MODIFICATION_TIME)?,
        };

        if attrs.creation_time == 0 || attrs.modification_time == 0 {
            if let Ok(metadata) = fs::metadata(path) {
                if attrs.creation_time == 0 {
                    attrs.creation_time = metadata.created().map(system_time_micros).unwrap_or(0);
                }
                if attrs.modification_time == 0 {
                    attrs.modification_time =
                        metadata.modified().map(system_time_micros).unwrap_or(0);
                }
            }
        }

        tracing::trace!(target: targets::ATTRIBUTES, path = %path.display(), ?attrs, "loaded attributes");
        Ok(attrs)
    }

    /// Read every attribute of `path` into `attrs`, replacing its contents.
    pub fn load_into(&self, attrs: &mut FileAttributes, path: impl AsRef<Path>) -> AttributeResult<()> {
        *attrs = self.load(path)?;
        Ok(())
    }

    /// Write every attribute to `path`, stamping the modification time.
    ///
    /// All keys are attempted even if one fails; the first failure is
    /// returned.
    pub fn save(&self, attrs: &mut FileAttributes, path: impl AsRef<Path>) -> AttributeResult<()> {
        let path = path.as_ref();
        attrs.modification_time = now_micros();

        let creation = attrs.creation_time.to_string();
        let modification = attrs.modification_time.to_string();
        let writes: [(&str, Option<&str>); 7] = [
            (keys::TITLE, attrs.title.as_deref()),
            (keys::DESCRIPTION, attrs.description.as_deref()),
            (keys::TAGS, attrs.tags.as_deref()),
            (keys::ACTIVITY, attrs.activity.as_deref()),
            (keys::PREVIEW_PATH, attrs.preview_path.as_deref()),
            (keys::CREATION_TIME, Some(creation.as_str())),
            (keys::MODIFICATION_TIME, Some(modification.as_str())),
        ];

        let mut first_error = None;
        for (key, value) in writes {
            if let Err(err) = self.put(path, key, value) {
                tracing::warn!(
                    target: targets::ATTRIBUTES,
                    path = %path.display(),
                    key,
                    error = %err,
                    "failed to write attribute"
                );
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// The title of `path`.
    pub fn title(&self, path: impl AsRef<Path>) -> AttributeResult<Option<String>> {
        self.backend.get(path.as_ref(), keys::TITLE)
    }

    /// Set or clear the title of `path`.
    pub fn set_title(&self, path: impl AsRef<Path>, title: Option<&str>) -> AttributeResult<()> {
        self.put(path.as_ref(), keys::TITLE, title)
    }

    /// The description of `path`.
    pub fn description(&self, path: impl AsRef<Path>) -> AttributeResult<Option<String>> {
        self.backend.get(path.as_ref(), keys::DESCRIPTION)
    }

    /// Set or clear the description of `path`.
    pub fn set_description(
        &self,
        path: impl AsRef<Path>,
        description: Option<&str>,
    ) -> AttributeResult<()> {
        self.put(path.as_ref(), keys::DESCRIPTION, description)
    }

    /// The tags of `path`, trimmed. Empty if none are set.
    pub fn tags(&self, path: impl AsRef<Path>) -> AttributeResult<Vec<String>> {
        Ok(self
            .backend
            .get(path.as_ref(), keys::TAGS)?
            .as_deref()
            .map(split_tags)
            .unwrap_or_default())
    }

    /// Replace the tags of `path`. An empty list removes the attribute.
    pub fn set_tags<S: AsRef<str>>(&self, path: impl AsRef<Path>, tags: &[S]) -> AttributeResult<()> {
        let joined = join_tags(tags);
        self.put(path.as_ref(), keys::TAGS, joined.as_deref())
    }

    /// Record `activity` as the creator of `path`.
    ///
    /// Also stamps the creation time if the file does not have one yet.
    pub fn mark_as_created_by(&self, path: impl AsRef<Path>, activity: &str) -> AttributeResult<()> {
        let path = path.as_ref();
        self.backend.set(path, keys::ACTIVITY, activity)?;
        if self.get_time(path, keys::CREATION_TIME)? == 0 {
            self.backend
                .set(path, keys::CREATION_TIME, &now_micros().to_string())?;
        }
        tracing::debug!(target: targets::ATTRIBUTES, path = %path.display(), activity, "marked creator");
        Ok(())
    }

    fn put(&self, path: &Path, key: &str, value: Option<&str>) -> AttributeResult<()> {
        match value {
            Some(value) => self.backend.set(path, key, value),
            None => self.backend.remove(path, key),
        }
    }

    /// Read a timestamp, treating a missing or malformed value as 0.
    fn get_time(&self, path: &Path, key: &str) -> AttributeResult<i64> {
        let Some(text) = self.backend.get(path, key)? else {
            return Ok(0);
        };
        match text.trim().parse() {
            Ok(value) => Ok(value),
            Err(_) => {
                tracing::warn!(
                    target: targets::ATTRIBUTES,
                    path = %path.display(),
                    key,
                    value = %text,
                    "ignoring malformed timestamp"
                );
                Ok(0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store() -> AttributeStore<MemoryBackend> {
        AttributeStore::new(MemoryBackend::new())
    }

    #[test]
    fn test_new_stamps_both_times() {
        let before = now_micros();
        let attrs = FileAttributes::new();
        assert!(attrs.creation_time >= before);
        assert_eq!(attrs.creation_time, attrs.modification_time);
        assert!(attrs.title.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let store = memory_store();
        let path = Path::new("/journal/entry.odt");
        let mut attrs = FileAttributes::new();
        attrs.title = Some("Test Title".into());
        attrs.description = Some("Test Description".into());
        attrs.activity = Some("org.laptop.WriteActivity".into());
        attrs.creation_time = 1_700_000_000_000_000;

        store.save(&mut attrs, path).unwrap();
        let loaded = store.load(path).unwrap();

        assert_eq!(loaded, attrs);
        assert_eq!(
            store.backend().get(path, keys::CREATION_TIME).unwrap().as_deref(),
            Some("1700000000000000")
        );
    }

    #[test]
    fn test_save_bumps_modification_time() {
        let store = memory_store();
        let mut attrs = FileAttributes::new();
        attrs.modification_time = 1;

        store.save(&mut attrs, "/journal/a").unwrap();

        assert!(attrs.modification_time > 1);
    }

    #[test]
    fn test_save_removes_cleared_fields() {
        let store = memory_store();
        let path = Path::new("/journal/b");
        store.set_title(path, Some("Old")).unwrap();

        let mut attrs = FileAttributes::new();
        store.save(&mut attrs, path).unwrap();

        assert_eq!(store.title(path).unwrap(), None);
        assert_eq!(store.backend().len(), 2);
    }

    #[test]
    fn test_load_into_replaces_fields() {
        let store = memory_store();
        let path = Path::new("/journal/c");
        store.set_description(path, Some("fresh")).unwrap();

        let mut attrs = FileAttributes::new();
        attrs.title = Some("stale".into());
        store.load_into(&mut attrs, path).unwrap();

        assert_eq!(attrs.title, None);
        assert_eq!(attrs.description.as_deref(), Some("fresh"));
    }

    #[test]
    fn test_tags_are_joined_and_trimmed() {
        let store = memory_store();
        let path = Path::new("/journal/d");

        store.set_tags(path, &["tag1", "tag2", "tag3"]).unwrap();
        assert_eq!(
            store.backend().get(path, keys::TAGS).unwrap().as_deref(),
            Some("tag1,tag2,tag3")
        );

        store.backend().set(path, keys::TAGS, " tag1 , tag2,, tag3 ").unwrap();
        assert_eq!(store.tags(path).unwrap(), vec!["tag1", "tag2", "tag3"]);

        store.set_tags::<&str>(path, &[]).unwrap();
        assert!(store.tags(path).unwrap().is_empty());
        assert_eq!(store.backend().get(path, keys::TAGS).unwrap(), None);
    }

    #[test]
    fn test_mark_as_created_by_keeps_existing_creation_time() {
        let store = memory_store();
        let fresh = Path::new("/journal/e");
        let stamped = Path::new("/journal/f");
        store.backend().set(stamped, keys::CREATION_TIME, "42").unwrap();

        store.mark_as_created_by(fresh, "org.sugarlabs.Paint").unwrap();
        store.mark_as_created_by(stamped, "org.sugarlabs.Paint").unwrap();

        let fresh = store.load(fresh).unwrap();
        assert_eq!(fresh.activity.as_deref(), Some("org.sugarlabs.Paint"));
        assert!(fresh.creation_time > 42);
        assert_eq!(store.load(stamped).unwrap().creation_time, 42);
    }

    #[test]
    fn test_malformed_time_reads_as_zero() {
        let store = memory_store();
        let path = Path::new("/journal/not-on-disk");
        store.backend().set(path, keys::CREATION_TIME, "yesterday").unwrap();

        let attrs = store.load(path).unwrap();
        assert_eq!(attrs.creation_time, 0);
        assert_eq!(attrs.modification_time, 0);
    }

    #[test]
    fn test_missing_times_fall_back_to_filesystem() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let store = memory_store();

        let attrs = store.load(file.path()).unwrap();

        assert!(attrs.modification_time > 0);
    }

    #[test]
    fn test_tag_list_helpers() {
        let mut attrs = FileAttributes::default();
        assert!(attrs.tag_list().is_empty());
        attrs.set_tag_list(&["a", "b"]);
        assert_eq!(attrs.tags.as_deref(), Some("a,b"));
        assert_eq!(attrs.tag_list(), vec!["a", "b"]);
    }

    /// A temporary file on a filesystem that accepts `user.` attributes, or
    /// `None` when neither the temp dir nor the crate dir does.
    fn xattr_file() -> Option<tempfile::NamedTempFile> {
        if !XattrBackend::is_supported() {
            return None;
        }
        let candidates = [
            tempfile::NamedTempFile::new(),
            tempfile::NamedTempFile::new_in(env!("CARGO_MANIFEST_DIR")),
        ];
        let file = candidates
            .into_iter()
            .flatten()
            .find(|file| xattr::set(file.path(), "user.sugar.check", b"1").is_ok());
        match file {
            Some(file) => {
                xattr::remove(file.path(), "user.sugar.check").unwrap();
                Some(file)
            }
            None => {
                eprintln!("skipping: user extended attributes are unsupported here");
                None
            }
        }
    }

    #[test]
    fn test_xattr_save_and_load() {
        let Some(file) = xattr_file() else { return };
        let store = AttributeStore::xattr();
        let mut attrs = FileAttributes::new();
        attrs.title = Some("Field notes".into());
        attrs.set_tag_list(&["science", "outdoor"]);
        attrs.activity = Some("org.laptop.WriteActivity".into());

        store.save(&mut attrs, file.path()).unwrap();
        let loaded = store.load(file.path()).unwrap();

        assert_eq!(loaded, attrs);
        assert_eq!(
            xattr::get(file.path(), keys::TITLE).unwrap().as_deref(),
            Some(&b"Field notes"[..])
        );
    }

    #[test]
    fn test_xattr_remove_clears_key() {
        let Some(file) = xattr_file() else { return };
        let store = AttributeStore::xattr();

        store.set_title(file.path(), Some("Draft")).unwrap();
        store.set_title(file.path(), None).unwrap();
        assert_eq!(store.title(file.path()).unwrap(), None);

        // Removing an attribute that is not there succeeds.
        store.set_title(file.path(), None).unwrap();
        store.backend().remove(file.path(), keys::PREVIEW_PATH).unwrap();
    }

    #[test]
    fn test_xattr_non_utf8_value_can_be_cleared() {
        let Some(file) = xattr_file() else { return };
        let store = AttributeStore::xattr();
        xattr::set(file.path(), keys::TITLE, &[0xff, 0xfe]).unwrap();

        assert!(matches!(
            store.title(file.path()),
            Err(AttributeError::InvalidValue { .. })
        ));

        store.set_title(file.path(), None).unwrap();
        assert_eq!(xattr::get(file.path(), keys::TITLE).unwrap(), None);

        xattr::set(file.path(), keys::TITLE, &[0xff, 0xfe]).unwrap();
        let mut attrs = FileAttributes::new();
        store.save(&mut attrs, file.path()).unwrap();
        assert_eq!(xattr::get(file.path(), keys::TITLE).unwrap(), None);
    }
}
