//! Domain models for save requests and their outcomes.
//!
//! # Design
//! - Requests own their payload and are consumed by value, so a drained source is never reused.
//! - Validation of caller-supplied names happens here, before any resolver or writer runs.

mod outcome;
mod payload;

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::error::{CoreResult, SaveError};

pub use outcome::{SaveFailure, SaveResult};
pub use payload::{SavePayload, SeekableSource};

/// Receives fractional progress in `[0.0, 1.0]` while a payload is written.
pub trait ProgressSink: Send + Sync {
    /// Report the fraction of the payload written so far.
    fn report(&self, fraction: f64);
}

impl<F> ProgressSink for F
where
    F: Fn(f64) + Send + Sync,
{
    fn report(&self, fraction: f64) {
        self(fraction);
    }
}

/// Input to a single save.
pub struct SaveRequest {
    file_name: String,
    initial_directory: Option<PathBuf>,
    payload: SavePayload,
    progress: Option<Arc<dyn ProgressSink>>,
}

pub(crate) struct SaveRequestParts {
    pub(crate) file_name: String,
    pub(crate) initial_directory: Option<PathBuf>,
    pub(crate) payload: SavePayload,
    pub(crate) progress: Option<Arc<dyn ProgressSink>>,
}

impl SaveRequest {
    /// Build a request for `file_name` backed by `payload`.
    #[must_use]
    pub fn new(file_name: impl Into<String>, payload: SavePayload) -> Self {
        Self {
            file_name: file_name.into(),
            initial_directory: None,
            payload,
            progress: None,
        }
    }

    /// Hint the directory the destination picker should start in. Empty paths are ignored.
    #[must_use]
    pub fn with_initial_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        self.initial_directory = (!directory.as_os_str().is_empty()).then_some(directory);
        self
    }

    /// Report write progress to `sink`. Requires a payload with a known length.
    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Suggested file name, possibly with an extension.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Directory hint for the picker, if any.
    #[must_use]
    pub fn initial_directory(&self) -> Option<&Path> {
        self.initial_directory.as_deref()
    }

    /// Whether the request reports progress.
    #[must_use]
    pub const fn reports_progress(&self) -> bool {
        self.progress.is_some()
    }

    /// Borrow the payload, e.g. to inspect its length.
    #[must_use]
    pub const fn payload(&self) -> &SavePayload {
        &self.payload
    }

    pub(crate) fn into_parts(self) -> SaveRequestParts {
        SaveRequestParts {
            file_name: self.file_name,
            initial_directory: self.initial_directory,
            payload: self.payload,
            progress: self.progress,
        }
    }
}

impl fmt::Debug for SaveRequest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SaveRequest")
            .field("file_name", &self.file_name)
            .field("initial_directory", &self.initial_directory)
            .field("payload", &self.payload)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Several payloads saved into one resolved directory, written in name order.
#[derive(Debug, Default)]
pub struct BulkSaveRequest {
    files: BTreeMap<String, SavePayload>,
}

impl BulkSaveRequest {
    /// Create an empty bulk request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::InvalidRequest`] if the name is invalid or already present.
    /// Names are compared after normalisation, so `./a.txt` and `a.txt` collide.
    pub fn insert(&mut self, file_name: impl Into<String>, payload: SavePayload) -> CoreResult<()> {
        let file_name = normalized_file_name(&file_name.into())?;
        match self.files.entry(file_name) {
            Entry::Occupied(entry) => Err(SaveError::invalid(
                "file_name",
                "duplicate",
                Some(entry.key().clone()),
            )),
            Entry::Vacant(entry) => {
                entry.insert(payload);
                Ok(())
            }
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the request has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Entry names in write order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub(crate) fn into_entries(self) -> impl Iterator<Item = (String, SavePayload)> {
        self.files.into_iter()
    }
}

/// Canonical `/`-joined form of a valid relative name; `.` and repeated separators vanish.
pub(crate) fn normalized_file_name(file_name: &str) -> CoreResult<String> {
    validate_file_name(file_name)?;
    let parts: Vec<_> = Path::new(file_name)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();
    Ok(parts.join("/"))
}

/// Reject names that are empty or could escape the destination directory.
pub(crate) fn validate_file_name(file_name: &str) -> CoreResult<()> {
    if file_name.trim().is_empty() {
        return Err(SaveError::invalid("file_name", "empty", None));
    }

    let path = Path::new(file_name);
    let mut components = 0_usize;
    for component in path.components() {
        match component {
            Component::Normal(_) => components += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(SaveError::invalid(
                    "file_name",
                    "parent_traversal",
                    Some(file_name.to_string()),
                ));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(SaveError::invalid(
                    "file_name",
                    "absolute",
                    Some(file_name.to_string()),
                ));
            }
        }
    }

    if components == 0 || path.file_name().is_none() {
        return Err(SaveError::invalid(
            "file_name",
            "no_file_component",
            Some(file_name.to_string()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FailureKind;
    use std::sync::Mutex;

    #[test]
    fn file_name_validation_rejects_escapes() {
        assert!(validate_file_name("report.pdf").is_ok());
        assert!(validate_file_name("exports/2024/report.pdf").is_ok());
        assert!(validate_file_name("README").is_ok());

        for bad in ["", "   ", "../secret", "a/../../b", "/etc/passwd", ".", "./"] {
            let error = validate_file_name(bad).expect_err(bad);
            assert_eq!(error.kind(), FailureKind::InvalidRequest, "{bad}");
        }
    }

    #[test]
    fn empty_initial_directory_is_ignored() {
        let request =
            SaveRequest::new("a.txt", SavePayload::from_bytes(Vec::new())).with_initial_directory("");
        assert!(request.initial_directory().is_none());

        let request = SaveRequest::new("a.txt", SavePayload::from_bytes(Vec::new()))
            .with_initial_directory("/home/user/Documents");
        assert_eq!(
            request.initial_directory(),
            Some(Path::new("/home/user/Documents"))
        );
    }

    #[test]
    fn closures_act_as_progress_sinks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let sink: Arc<dyn ProgressSink> = Arc::new(move |value: f64| {
            if let Ok(mut values) = sink_seen.lock() {
                values.push(value);
            }
        });
        sink.report(0.5);
        sink.report(1.0);

        let request =
            SaveRequest::new("a.txt", SavePayload::from_bytes(vec![1_u8])).with_progress(sink);
        assert!(request.reports_progress());
        assert_eq!(*seen.lock().expect("lock"), vec![0.5, 1.0]);
    }

    #[test]
    fn bulk_request_rejects_duplicates_and_orders_names() -> CoreResult<()> {
        let mut bulk = BulkSaveRequest::new();
        assert!(bulk.is_empty());
        bulk.insert("b.txt", SavePayload::from_bytes(b"b".to_vec()))?;
        bulk.insert("a.txt", SavePayload::from_bytes(b"a".to_vec()))?;

        let duplicate = bulk
            .insert("a.txt", SavePayload::from_bytes(b"again".to_vec()))
            .expect_err("duplicate should fail");
        assert!(matches!(
            duplicate,
            SaveError::InvalidRequest {
                reason: "duplicate",
                ..
            }
        ));
        assert!(bulk.insert("../x", SavePayload::from_bytes(Vec::new())).is_err());

        assert_eq!(bulk.len(), 2);
        assert_eq!(bulk.names().collect::<Vec<_>>(), vec!["a.txt", "b.txt"]);
        Ok(())
    }

    #[test]
    fn bulk_request_treats_equivalent_spellings_as_duplicates() -> CoreResult<()> {
        let mut bulk = BulkSaveRequest::new();
        bulk.insert("./a.txt", SavePayload::from_bytes(b"first".to_vec()))?;
        bulk.insert("x//nested.txt", SavePayload::from_bytes(b"n".to_vec()))?;

        for spelling in ["a.txt", "./././a.txt", "x/nested.txt", "x/./nested.txt"] {
            let error = bulk
                .insert(spelling, SavePayload::from_bytes(b"second".to_vec()))
                .expect_err(spelling);
            assert!(
                matches!(
                    error,
                    SaveError::InvalidRequest {
                        reason: "duplicate",
                        ..
                    }
                ),
                "{spelling}"
            );
        }

        assert_eq!(bulk.len(), 2);
        assert_eq!(bulk.names().collect::<Vec<_>>(), vec!["a.txt", "x/nested.txt"]);
        Ok(())
    }

    #[test]
    fn normalized_names_drop_current_dir_and_empty_segments() -> CoreResult<()> {
        assert_eq!(normalized_file_name("./reports//q3.pdf")?, "reports/q3.pdf");
        assert_eq!(normalized_file_name("plain.txt")?, "plain.txt");
        assert!(normalized_file_name("a/../b").is_err());
        Ok(())
    }
}
