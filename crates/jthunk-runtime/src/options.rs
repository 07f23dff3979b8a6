//! Compile options and platform flag handling.

use std::path::PathBuf;
use std::sync::OnceLock;

use crate::errors::{BindError, BindResult};

/// Default name of the virtual file presented to the compiler.
const DEFAULT_FILE_NAME: &str = "code.cpp";

/// Flags the in-memory execution engine cannot honor. Debug and profiling
/// instrumentation emit symbols the engine has nowhere to put, so these are
/// rejected up front instead of silently dropped.
const REJECTED_FLAGS: [&str; 2] = ["-g", "-pg"];

/// Options for one compilation: the virtual file name plus platform flags.
///
/// Flags are validated as they are added, so a `CompileOptions` value that
/// exists is always valid to hand to a [`CompilerService`].
///
/// [`CompilerService`]: crate::module::CompilerService
#[derive(Debug, Clone)]
pub struct CompileOptions {
    file_name: String,
    flags: Vec<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_FILE_NAME.to_string(),
            flags: Vec::new(),
        }
    }
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different virtual file name.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Add a compiler flag, rejecting unsupported or blank flags.
    pub fn flag(mut self, flag: impl Into<String>) -> BindResult<Self> {
        let flag = flag.into();
        validate_flag(&flag)?;
        self.flags.push(flag);
        Ok(self)
    }

    /// Add several compiler flags, rejecting unsupported or blank flags.
    pub fn flags(mut self, flags: impl IntoIterator<Item = String>) -> BindResult<Self> {
        for flag in flags {
            validate_flag(&flag)?;
            self.flags.push(flag);
        }
        Ok(self)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn flag_list(&self) -> &[String] {
        &self.flags
    }

    /// Re-check every flag. Compiler service implementations call this
    /// before doing any work.
    pub fn validate(&self) -> BindResult<()> {
        for flag in &self.flags {
            validate_flag(flag)?;
        }
        Ok(())
    }
}

fn validate_flag(flag: &str) -> BindResult<()> {
    let trimmed = flag.trim();
    if trimmed.is_empty() {
        return Err(BindError::configuration("blank compiler flag"));
    }
    if REJECTED_FLAGS.contains(&trimmed) {
        return Err(BindError::configuration(format!(
            "unsupported compiler flag: {} (instrumented code cannot run on the in-memory execution engine)",
            trimmed
        )));
    }
    Ok(())
}

static JNI_INCLUDE_FLAGS: OnceLock<Vec<String>> = OnceLock::new();

/// Include flags for the JNI headers of the JDK named by `JAVA_HOME`.
///
/// Computed once per process; the computation is idempotent, so a race on
/// first use is harmless. Returns an empty slice when `JAVA_HOME` is unset
/// or the include directories do not exist.
pub fn jni_include_flags() -> &'static [String] {
    JNI_INCLUDE_FLAGS.get_or_init(|| {
        let Some(java_home) = std::env::var_os("JAVA_HOME") else {
            return Vec::new();
        };
        let java_home = PathBuf::from(java_home);
        ["include", "include/linux", "include/darwin"]
            .iter()
            .map(|sub| java_home.join(sub))
            .filter(|dir| dir.is_dir())
            .map(|dir| format!("-I{}", dir.display()))
            .collect()
    })
}
