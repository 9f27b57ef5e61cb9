//! Compiler configuration.
//!
//! Settings come from two places: an optional `lolc.toml` file and the
//! command line, with CLI flags winning. The file keeps per-project
//! defaults like the C compiler command and the runtime library
//! directory out of every invocation:
//!
//! ```toml
//! [build]
//! cc = "clang"
//! runtime_dir = "target/release"
//!
//! [dump]
//! rpn = true
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct CompilerConfig {
    /// Write the token stream to stderr.
    pub dump_tokens: bool,
    /// Write the parsed expression tree to stderr.
    pub dump_ast: bool,
    /// Write the lowered instruction stream to stderr.
    pub dump_rpn: bool,
    /// C compiler command for `build`; falls back to `$CC`, then `cc`.
    pub cc: Option<String>,
    /// Directory containing `liblol_runtime.a`.
    pub runtime_dir: Option<PathBuf>,
    /// Keep the intermediate `.c` file after `build`.
    pub keep_c: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    build: BuildSection,
    #[serde(default)]
    dump: DumpSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct BuildSection {
    cc: Option<String>,
    runtime_dir: Option<PathBuf>,
    #[serde(default)]
    keep_c: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DumpSection {
    #[serde(default)]
    tokens: bool,
    #[serde(default)]
    ast: bool,
    #[serde(default)]
    rpn: bool,
}

impl CompilerConfig {
    pub fn from_toml(text: &str) -> Result<Self, String> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|error| format!("invalid config: {error}"))?;
        Ok(Self {
            dump_tokens: file.dump.tokens,
            dump_ast: file.dump.ast,
            dump_rpn: file.dump.rpn,
            cc: file.build.cc,
            runtime_dir: file.build.runtime_dir,
            keep_c: file.build.keep_c,
        })
    }

    /// Load configuration. An explicit path must exist; otherwise
    /// `lolc.toml` in the current directory is used when present, and
    /// defaults apply when it is not.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        let path = match path {
            Some(explicit) => explicit.to_path_buf(),
            None => {
                let implicit = PathBuf::from("lolc.toml");
                if !implicit.exists() {
                    return Ok(Self::default());
                }
                implicit
            }
        };
        let text = fs::read_to_string(&path)
            .map_err(|error| format!("failed to read {}: {error}", path.display()))?;
        Self::from_toml(&text)
    }
}
