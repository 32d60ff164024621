use std::{
    cell::RefCell,
    fmt, fs, io,
    path::{Path, PathBuf},
};

use schemars::{json_schema, JsonSchema};
use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

/// A path to a file on disk, as written in the configuration (`relative`) and
/// resolved against the directory of the configuration file (`absolute`).
#[derive(Debug, Clone)]
pub struct FilePath {
    pub relative: String,
    pub absolute: String,
}

impl Serialize for FilePath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.relative)
    }
}

// Deserialization has no context argument, so the directory that relative
// paths are resolved against is carried in a thread-local.
thread_local!(static CONTEXT_START_PATH: RefCell<Option<PathBuf>> = const { RefCell::new(None) });

pub fn with_start_path<F, T>(start_path: &Path, f: F) -> T
where
    F: FnOnce() -> T,
{
    CONTEXT_START_PATH.with(|ctx| {
        *ctx.borrow_mut() = Some(start_path.to_path_buf());
    });

    let result = f();

    CONTEXT_START_PATH.with(|ctx| {
        *ctx.borrow_mut() = None;
    });

    result
}

impl JsonSchema for FilePath {
    fn schema_name() -> std::borrow::Cow<'static, str> {
        "FilePath".into()
    }

    fn json_schema(_generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
        json_schema!({
            "type": "string",
            "format": "path"
        })
    }

    fn inline_schema() -> bool {
        true
    }
}

struct FilePathVisitor;

impl<'de> Visitor<'de> for FilePathVisitor {
    type Value = FilePath;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string representing a relative file path")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        CONTEXT_START_PATH.with(|ctx| match ctx.borrow().as_ref() {
            Some(start_path) => FilePath::resolve_relative(start_path, v)
                .map_err(|err| E::custom(format!("Failed to canonicalize path '{}': {}", v, err))),
            None => Err(E::custom(
                "FilePath deserialization context (start_path) is not set",
            )),
        })
    }
}

impl<'de> Deserialize<'de> for FilePath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(FilePathVisitor)
    }
}

impl FilePath {
    fn resolve_relative(base_path: &Path, relative_path: &str) -> io::Result<FilePath> {
        let canonical_path = fs::canonicalize(base_path.join(relative_path))?;

        Ok(FilePath {
            relative: relative_path.to_string(),
            absolute: canonical_path.to_string_lossy().to_string(),
        })
    }

    pub fn read_to_string(&self) -> io::Result<String> {
        fs::read_to_string(&self.absolute)
    }
}
