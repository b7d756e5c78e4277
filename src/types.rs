use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Target platform for the compiled output.
///
/// - `Node`: every source file is compiled on its own.
/// - `Browser`: the entry module and its dependency graph are bundled into a
///   single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Node,
    Browser,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Node => "node",
            Platform::Browser => "browser",
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Platform::Node
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "node" => Ok(Platform::Node),
            "browser" => Ok(Platform::Browser),
            other => Err(format!(
                "platform {other} not supported (expected \"node\" or \"browser\")"
            )),
        }
    }
}

/// Source language dialect.
///
/// `Es6` is emitted as written. Any other dialect goes through the configured
/// transpiler first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Language {
    Es6,
    Other(String),
}

impl Language {
    pub fn as_str(&self) -> &str {
        match self {
            Language::Es6 => "es6",
            Language::Other(name) => name,
        }
    }

    pub fn is_es6(&self) -> bool {
        matches!(self, Language::Es6)
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::Es6
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" => Err("language must not be empty".to_string()),
            "es6" => Ok(Language::Es6),
            other => Ok(Language::Other(other.to_string())),
        }
    }
}

/// Where the incremental cache lives between invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStorageMode {
    /// Store entries in `<target>/.pipewright-cache`.
    File,
    /// Keep entries for the lifetime of the process only.
    Memory,
}

impl Default for CacheStorageMode {
    fn default() -> Self {
        CacheStorageMode::Memory
    }
}
