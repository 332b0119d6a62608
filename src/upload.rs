//! # Upload Normalization
//!
//! The multipart layer hands the binder raw upload descriptors: maps with a
//! temporary path, the client's filename, the declared size and media type, and
//! a transport error code. A form field may carry one descriptor or an ordered
//! array of them.
//!
//! [`FileValueNormalizer`] turns those shapes into an explicit
//! [`NormalizedUpload`] so nothing downstream has to probe the shape again:
//!
//! | Raw shape                                  | Result                      |
//! |--------------------------------------------|-----------------------------|
//! | map containing the temp-path key           | `Single(UploadedFile)`      |
//! | non-empty array of such maps               | `List(Vec<UploadedFile>)`   |
//! | anything else                              | `Unrecognized(raw)`         |
//!
//! Normalization never fails and never touches the filesystem.

use crate::value::RawValue;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

/// Descriptor key holding the temporary storage path
pub const DEFAULT_TEMP_PATH_KEY: &str = "tmp_name";
const NAME_KEY: &str = "name";
const SIZE_KEY: &str = "size";
const TYPE_KEY: &str = "type";
const ERROR_KEY: &str = "error";

/// Transport-level upload status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadError {
    /// Upload completed
    Ok,
    /// Exceeded the server-wide size limit
    IniSize,
    /// Exceeded the form's declared size limit
    FormSize,
    /// Only part of the file arrived
    Partial,
    /// No file was sent
    NoFile,
    /// No temporary directory available
    NoTmpDir,
    /// Could not write the file to disk
    CantWrite,
    /// An extension stopped the upload
    Extension,
    /// Any other code
    Unknown(u32),
}

impl UploadError {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => UploadError::Ok,
            1 => UploadError::IniSize,
            2 => UploadError::FormSize,
            3 => UploadError::Partial,
            4 => UploadError::NoFile,
            6 => UploadError::NoTmpDir,
            7 => UploadError::CantWrite,
            8 => UploadError::Extension,
            other => UploadError::Unknown(other),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            UploadError::Ok => 0,
            UploadError::IniSize => 1,
            UploadError::FormSize => 2,
            UploadError::Partial => 3,
            UploadError::NoFile => 4,
            UploadError::NoTmpDir => 6,
            UploadError::CantWrite => 7,
            UploadError::Extension => 8,
            UploadError::Unknown(code) => code,
        }
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::Ok => write!(f, "the file uploaded successfully"),
            UploadError::IniSize => write!(f, "the file exceeds the server upload size limit"),
            UploadError::FormSize => write!(f, "the file exceeds the form's size limit"),
            UploadError::Partial => write!(f, "the file was only partially uploaded"),
            UploadError::NoFile => write!(f, "no file was uploaded"),
            UploadError::NoTmpDir => write!(f, "missing a temporary folder"),
            UploadError::CantWrite => write!(f, "failed to write the file to disk"),
            UploadError::Extension => write!(f, "an extension stopped the file upload"),
            UploadError::Unknown(code) => write!(f, "unknown upload error (code {code})"),
        }
    }
}

/// An uploaded file as exposed to controllers.
///
/// Built one-to-one from a raw descriptor. Serializes back into the descriptor
/// layout (`tmp_name`, `name`, `size`, `type`, `error`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    #[serde(rename = "tmp_name")]
    path: PathBuf,
    #[serde(rename = "name")]
    client_name: String,
    size: u64,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    media_type: Option<String>,
    #[serde(rename = "error")]
    error_code: u32,
}

impl UploadedFile {
    pub fn new(path: impl Into<PathBuf>, client_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            client_name: client_name.into(),
            size: 0,
            media_type: None,
            error_code: 0,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn with_error(mut self, error: UploadError) -> Self {
        self.error_code = error.code();
        self
    }

    /// Build from a raw descriptor map; `None` unless `temp_key` holds a string.
    ///
    /// Sizes and error codes may be JSON numbers or numeric strings; anything
    /// unparseable reads as zero.
    pub fn from_descriptor(map: &Map<String, Value>, temp_key: &str) -> Option<Self> {
        let path = PathBuf::from(map.get(temp_key)?.as_str()?);
        let client_name = map
            .get(NAME_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let media_type = map
            .get(TYPE_KEY)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Some(Self {
            path,
            client_name,
            size: map.get(SIZE_KEY).and_then(as_u64).unwrap_or(0),
            media_type,
            error_code: map
                .get(ERROR_KEY)
                .and_then(as_u64)
                .and_then(|c| u32::try_from(c).ok())
                .unwrap_or(0),
        })
    }

    /// Temporary storage path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Filename as sent by the client
    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    /// Declared size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Declared media type, if any
    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    pub fn error(&self) -> UploadError {
        UploadError::from_code(self.error_code)
    }

    /// True when the transport reported no error
    pub fn is_ok(&self) -> bool {
        self.error_code == 0
    }

    /// Lowercased extension of the client filename
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.client_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
    }

    /// Raw descriptor representation, used when reporting binding errors
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Result of normalizing a raw upload value.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedUpload {
    Single(UploadedFile),
    List(Vec<UploadedFile>),
    /// Shape matched neither form; the raw value is returned untouched
    Unrecognized(Value),
}

impl From<NormalizedUpload> for RawValue {
    fn from(upload: NormalizedUpload) -> Self {
        match upload {
            NormalizedUpload::Single(file) => RawValue::File(file),
            NormalizedUpload::List(files) => RawValue::Files(files),
            NormalizedUpload::Unrecognized(raw) => RawValue::Json(raw),
        }
    }
}

/// Turns raw upload descriptors into [`UploadedFile`] values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileValueNormalizer {
    temp_key: String,
}

impl Default for FileValueNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_TEMP_PATH_KEY)
    }
}

impl FileValueNormalizer {
    pub fn new(temp_key: impl Into<String>) -> Self {
        Self {
            temp_key: temp_key.into(),
        }
    }

    pub fn temp_key(&self) -> &str {
        &self.temp_key
    }

    /// Normalize one raw upload value.
    pub fn normalize(&self, raw: &Value) -> NormalizedUpload {
        match raw {
            Value::Object(map) => match UploadedFile::from_descriptor(map, &self.temp_key) {
                Some(file) => NormalizedUpload::Single(file),
                None => NormalizedUpload::Unrecognized(raw.clone()),
            },
            Value::Array(items) if !items.is_empty() => {
                let files: Option<Vec<UploadedFile>> = items
                    .iter()
                    .map(|item| {
                        item.as_object()
                            .and_then(|map| UploadedFile::from_descriptor(map, &self.temp_key))
                    })
                    .collect();
                match files {
                    Some(files) => NormalizedUpload::List(files),
                    None => NormalizedUpload::Unrecognized(raw.clone()),
                }
            }
            _ => NormalizedUpload::Unrecognized(raw.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_descriptor() {
        let raw = json!({"tmp_name": "/tmp/x", "name": "a.png", "size": 10, "type": "image/png", "error": 0});
        let NormalizedUpload::Single(file) = FileValueNormalizer::default().normalize(&raw) else {
            panic!("expected single file");
        };
        assert_eq!(file.path(), Path::new("/tmp/x"));
        assert_eq!(file.client_name(), "a.png");
        assert_eq!(file.size(), 10);
        assert_eq!(file.media_type(), Some("image/png"));
        assert!(file.is_ok());
        assert_eq!(file.extension().as_deref(), Some("png"));
    }

    #[test]
    fn test_list_preserves_order() {
        let raw = json!([
            {"tmp_name": "/tmp/a", "name": "a.txt"},
            {"tmp_name": "/tmp/b", "name": "b.txt"},
            {"tmp_name": "/tmp/c", "name": "c.txt"}
        ]);
        let NormalizedUpload::List(files) = FileValueNormalizer::default().normalize(&raw) else {
            panic!("expected file list");
        };
        let names: Vec<_> = files.iter().map(UploadedFile::client_name).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn test_unrecognized_shapes_pass_through() {
        let n = FileValueNormalizer::default();
        for raw in [
            json!({"name": "a.png", "size": 10}),
            json!([{"tmp_name": "/tmp/a"}, {"name": "no-path"}]),
            json!([]),
            json!("plain"),
            json!(42),
        ] {
            assert_eq!(n.normalize(&raw), NormalizedUpload::Unrecognized(raw.clone()));
        }
    }

    #[test]
    fn test_non_string_temp_path_is_unrecognized() {
        let n = FileValueNormalizer::default();
        for raw in [
            json!({"tmp_name": null, "name": "a.png"}),
            json!({"tmp_name": ["/tmp/a", "/tmp/b"], "name": ["a", "b"]}),
            json!({"tmp_name": 17}),
            json!([{"tmp_name": "/tmp/a"}, {"tmp_name": null}]),
        ] {
            assert_eq!(n.normalize(&raw), NormalizedUpload::Unrecognized(raw.clone()));
        }
    }

    #[test]
    fn test_string_size_and_error_code() {
        let raw = json!({"tmp_name": "/tmp/x", "size": "2048", "error": "4"});
        let NormalizedUpload::Single(file) = FileValueNormalizer::default().normalize(&raw) else {
            panic!("expected single file");
        };
        assert_eq!(file.size(), 2048);
        assert_eq!(file.error(), UploadError::NoFile);
        assert!(!file.is_ok());
    }

    #[test]
    fn test_custom_temp_key() {
        let raw = json!({"tmp": "/tmp/x", "name": "a.png"});
        assert!(matches!(
            FileValueNormalizer::new("tmp").normalize(&raw),
            NormalizedUpload::Single(_)
        ));
        assert!(matches!(
            FileValueNormalizer::default().normalize(&raw),
            NormalizedUpload::Unrecognized(_)
        ));
    }

    #[test]
    fn test_upload_error_codes() {
        for code in [0, 1, 2, 3, 4, 6, 7, 8, 42] {
            assert_eq!(UploadError::from_code(code).code(), code);
        }
        assert_eq!(UploadError::from_code(5), UploadError::Unknown(5));
    }

    #[test]
    fn test_to_json_uses_descriptor_keys() {
        let file = UploadedFile::new("/tmp/x", "a.png").with_size(3);
        assert_eq!(
            file.to_json(),
            json!({"tmp_name": "/tmp/x", "name": "a.png", "size": 3, "error": 0})
        );
    }
}
