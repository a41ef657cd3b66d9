//! The external documentation generator.
//!
//! Library keywords come from libdoc XML that an interpreter-side script
//! writes into an output directory. The script prints one JSON object:
//!
//! ```text
//! {
//!   "libraries": { "<name>": { "name", "status", "message", "xmlLibdocPath", "sourcePath" } },
//!   "environment": { "pythonVersion", "pythonExecutable", "platform", "moduleSearchPath", ... }
//! }
//! ```
//!
//! Every failure mode (spawn error, non-zero exit, no output, non-JSON
//! output) turns into an `error` record for each requested library.

use std::path::{Path, PathBuf};
use std::process::Command;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryStatus {
    Success,
    #[default]
    Error,
    Pending,
}

/// One library as reported by the generator and kept in the library cache.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntry {
    pub name: String,
    pub status: LibraryStatus,
    /// Documentation comes from a bundled or project libdoc file.
    #[serde(default, rename = "fallback")]
    pub is_fallback: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, alias = "xmlLibdocPath")]
    pub documentation_path: Option<PathBuf>,
    #[serde(default)]
    pub source_path: Option<PathBuf>,
}

impl LibraryEntry {
    pub fn error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: LibraryStatus::Error,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn fallback(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            status: LibraryStatus::Success,
            is_fallback: true,
            documentation_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == LibraryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == LibraryStatus::Error
    }
}

const NOT_PROCESSED: &str = "Not processed yet";
const NOT_AVAILABLE: &str = "n/a";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentStatus {
    Success,
    #[default]
    Error,
}

/// What the generator knows about the interpreter it ran in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Environment {
    pub status: EnvironmentStatus,
    pub message: String,
    #[serde(alias = "pythonExecutable")]
    pub executable: String,
    #[serde(alias = "pythonVersion")]
    pub interpreter_version: String,
    pub platform: String,
    pub module_search_path: Vec<String>,
    pub python_path: String,
    pub jython_path: String,
    pub class_path: String,
    pub ironpython_path: String,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            status: EnvironmentStatus::Error,
            message: NOT_PROCESSED.into(),
            executable: NOT_PROCESSED.into(),
            interpreter_version: NOT_PROCESSED.into(),
            platform: NOT_PROCESSED.into(),
            module_search_path: Vec::new(),
            python_path: NOT_PROCESSED.into(),
            jython_path: NOT_PROCESSED.into(),
            class_path: NOT_PROCESSED.into(),
            ironpython_path: NOT_PROCESSED.into(),
        }
    }
}

impl Environment {
    /// The error state: everything but the executable is unknown.
    pub fn failed(message: impl Into<String>, executable: &str) -> Self {
        Self {
            status: EnvironmentStatus::Error,
            message: message.into(),
            executable: executable.to_string(),
            interpreter_version: NOT_AVAILABLE.into(),
            platform: NOT_AVAILABLE.into(),
            module_search_path: Vec::new(),
            python_path: NOT_AVAILABLE.into(),
            jython_path: NOT_AVAILABLE.into(),
            class_path: NOT_AVAILABLE.into(),
            ironpython_path: NOT_AVAILABLE.into(),
        }
    }

    /// Env-var style fields, for reports.
    pub fn variables(&self) -> [(&'static str, &str); 4] {
        [
            ("PYTHONPATH", &self.python_path),
            ("JYTHONPATH", &self.jython_path),
            ("CLASSPATH", &self.class_path),
            ("IRONPYTHONPATH", &self.ironpython_path),
        ]
    }
}

#[derive(Debug, Default, Deserialize)]
struct GeneratorOutput {
    #[serde(default)]
    libraries: IndexMap<String, LibraryEntry>,
    #[serde(default)]
    environment: Option<Environment>,
}

/// What to generate, and where.
#[derive(Clone, Copy, Debug)]
pub struct GenerateRequest<'a> {
    pub executable: &'a str,
    pub library_names: &'a [String],
    pub module_search_paths: &'a [String],
    pub output_dir: &'a Path,
}

/// Raw result of one generator run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawOutput {
    pub exit_ok: bool,
    /// Standard output followed by standard error.
    pub output: String,
}

impl RawOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            exit_ok: true,
            output: output.into(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            exit_ok: false,
            output: output.into(),
        }
    }
}

pub trait DocGenerator: Send + Sync {
    fn generate(&self, request: &GenerateRequest<'_>) -> Result<RawOutput>;
}

impl<F> DocGenerator for F
where
    F: Fn(&GenerateRequest<'_>) -> Result<RawOutput> + Send + Sync,
{
    fn generate(&self, request: &GenerateRequest<'_>) -> Result<RawOutput> {
        self(request)
    }
}

/// Runs `<executable> <script> <names,> <paths,> <output dir>`.
#[derive(Clone, Debug)]
pub struct ProcessGenerator {
    script: PathBuf,
}

impl ProcessGenerator {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl DocGenerator for ProcessGenerator {
    fn generate(&self, request: &GenerateRequest<'_>) -> Result<RawOutput> {
        let output = Command::new(request.executable)
            .arg(&self.script)
            .arg(request.library_names.join(","))
            .arg(request.module_search_paths.join(","))
            .arg(request.output_dir)
            .output()
            .map_err(|err| {
                Error::Generator(format!(
                    "Error occurred running '{}': '{err}'",
                    request.executable
                ))
            })?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(RawOutput {
            exit_ok: output.status.success(),
            output: text,
        })
    }
}

/// Outcome of one acquisition attempt, before it is merged into the cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Acquisition {
    pub libraries: Vec<LibraryEntry>,
    pub environment: Environment,
}

impl Acquisition {
    /// Every requested library failed with the same message.
    pub fn failed(names: &[String], message: &str, executable: &str) -> Self {
        Self {
            libraries: names
                .iter()
                .map(|name| LibraryEntry::error(name.as_str(), message))
                .collect(),
            environment: Environment::failed(message, executable),
        }
    }
}

/// Run the generator and interpret its output.
pub fn acquire(generator: &dyn DocGenerator, request: &GenerateRequest<'_>) -> Acquisition {
    let names = request.library_names;
    if request.executable.trim().is_empty() {
        return Acquisition::failed(names, "Bad arguments: executable missing", request.executable);
    }
    if request.output_dir.as_os_str().is_empty() {
        return Acquisition::failed(
            names,
            "Bad arguments: output directory missing",
            request.executable,
        );
    }

    let raw = match generator.generate(request) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(error = %err, "documentation generator could not run");
            return Acquisition::failed(names, &err.to_string(), request.executable);
        }
    };
    match interpret(&raw) {
        Ok(output) => {
            let environment = match output.environment {
                Some(mut environment) => {
                    environment.status = EnvironmentStatus::Success;
                    environment.message.clear();
                    if environment.executable.is_empty() || environment.executable == NOT_PROCESSED {
                        environment.executable = request.executable.to_string();
                    }
                    environment
                }
                None => Environment::failed("Environment information not available", request.executable),
            };
            debug!(libraries = output.libraries.len(), "generator finished");
            Acquisition {
                libraries: output.libraries.into_values().collect(),
                environment,
            }
        }
        Err(message) => {
            warn!(%message, "documentation generator failed");
            Acquisition::failed(names, &message, request.executable)
        }
    }
}

/// Decode generator output, or return the message to report.
fn interpret(raw: &RawOutput) -> std::result::Result<GeneratorOutput, String> {
    if raw.output.trim().is_empty() {
        return Err("No response received from documentation generator".into());
    }
    if !raw.exit_ok {
        return Err(raw.output.clone());
    }
    serde_json::from_str(&raw.output).map_err(|_| raw.output.clone())
}
