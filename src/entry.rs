//! File entries listed in the encrypted manifest.

/// One manifest record.
///
/// Every entry is described twice in the manifest: once with the name in the
/// host's legacy 8-bit code page, once in UTF-8. The legacy name is kept as raw
/// bytes because it is generally not valid UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileEntry {
    /// Name in the legacy 8-bit encoding.
    pub name_legacy: Vec<u8>,
    /// Name in UTF-8. Empty when the reader had to drop the UTF-8 section.
    pub name_utf8: String,
    /// Plaintext size, or `-1` for directories and unknown sizes.
    pub size: i64,
    /// Platform attribute bitmask.
    pub attribute: i32,
    /// Modification time, Unix seconds.
    pub change_unix_time: i64,
    /// Creation time, Unix seconds.
    pub create_unix_time: i64,
}

impl FileEntry {
    /// Entry whose legacy and UTF-8 names are the same text.
    ///
    /// Good enough for ASCII names; callers with a real code-page conversion
    /// should set [`name_legacy`](Self::name_legacy) themselves.
    pub fn new(name: &str, size: i64) -> Self {
        Self {
            name_legacy: name.as_bytes().to_vec(),
            name_utf8: name.to_string(),
            size,
            ..Self::default()
        }
    }

    /// Directory entry (size `-1`).
    pub fn directory(name: &str) -> Self {
        Self::new(name, -1)
    }

    #[must_use]
    pub fn with_attribute(mut self, attribute: i32) -> Self {
        self.attribute = attribute;
        self
    }

    #[must_use]
    pub fn with_times(mut self, change_unix_time: i64, create_unix_time: i64) -> Self {
        self.change_unix_time = change_unix_time;
        self.create_unix_time = create_unix_time;
        self
    }

    /// Size contributed to the payload stream (`0` for `-1` entries).
    pub fn payload_size(&self) -> u64 {
        u64::try_from(self.size).unwrap_or(0)
    }

    pub fn has_known_size(&self) -> bool {
        self.size >= 0
    }
}
