use std::fmt;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;

/// MIME type accepted verbatim besides the `text/` family.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Externally-owned bytes handed over with a share event.
///
/// The host opens the stream through whatever resolver it has; the core only
/// ever reads it once per materialization.
pub trait ShareSource: Send + Sync {
    fn open(&self) -> std::io::Result<Box<dyn Read + Send>>;

    /// Human-readable identity of the source, for logs.
    fn describe(&self) -> String;
}

/// Cloneable handle to a [`ShareSource`].
pub type SourceReference = Arc<dyn ShareSource>;

/// A file already present on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ShareSource for FileSource {
    fn open(&self) -> std::io::Result<Box<dyn Read + Send>> {
        let file = std::fs::File::open(&self.path)?;
        Ok(Box::new(file))
    }

    fn describe(&self) -> String {
        format!("file://{}", self.path.display())
    }
}

/// Bytes the host has already pulled out of its content resolver.
#[derive(Clone)]
pub struct MemorySource {
    uri: String,
    bytes: Arc<[u8]>,
}

impl MemorySource {
    pub fn new(uri: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            uri: uri.into(),
            bytes: Arc::from(bytes),
        }
    }
}

impl ShareSource for MemorySource {
    fn open(&self) -> std::io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.bytes.clone())))
    }

    fn describe(&self) -> String {
        format!("{} ({} bytes)", self.uri, self.bytes.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareAction {
    Send,
    Other(String),
}

impl fmt::Display for ShareAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShareAction::Send => f.write_str("send"),
            ShareAction::Other(action) => f.write_str(action),
        }
    }
}

impl From<&str> for ShareAction {
    fn from(action: &str) -> Self {
        if action.eq_ignore_ascii_case("send") {
            ShareAction::Send
        } else {
            ShareAction::Other(action.to_string())
        }
    }
}

/// Inbound share event as delivered by the host platform.
#[derive(Clone)]
pub struct ShareEvent {
    pub action: ShareAction,
    pub mime_type: Option<String>,
    pub source: Option<SourceReference>,
}

impl ShareEvent {
    pub fn send(mime_type: Option<&str>, source: impl ShareSource + 'static) -> Self {
        Self {
            action: ShareAction::Send,
            mime_type: mime_type.map(str::to_string),
            source: Some(Arc::new(source) as SourceReference),
        }
    }

    pub fn is_send(&self) -> bool {
        self.action == ShareAction::Send
    }
}

impl fmt::Debug for ShareEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShareEvent")
            .field("action", &self.action)
            .field("mime_type", &self.mime_type)
            .field("source", &self.source.as_ref().map(|s| s.describe()))
            .finish()
    }
}

/// Allow-list on the declared MIME type; the content itself is never sniffed.
pub fn is_accepted_mime_type(mime_type: Option<&str>) -> bool {
    match mime_type {
        None => true,
        Some(t) => t.starts_with("text/") || t == OCTET_STREAM || t.starts_with('*'),
    }
}
