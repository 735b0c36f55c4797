//! Project discovery and loading
//!
//! Finds every definition file under the project's definition folder, parses
//! them (optionally on the rayon pool) and merges the results. Files are
//! always handled in sorted relative-path order, so the first failure
//! reported does not depend on scheduling.

use crate::merged::{MergeError, MergedModel};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tmdlguard_core::{Config, ErrorCategory, Failure, LintWarning, SourcePosition};
use tmdlguard_syntax::{FormatError, ParsedDocument, TmdlParser};
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

/// One discovered definition file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the definition folder, `/` separated
    pub document: String,
    pub path: PathBuf,
}

/// A parsed and merged project
#[derive(Debug, Clone)]
pub struct LoadedProject {
    pub root: PathBuf,
    /// Documents in the order they were merged
    pub documents: Vec<String>,
    pub model: MergedModel,
    pub warnings: Vec<LintWarning>,
}

/// Errors raised while turning a directory into a merged model
#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("TMDL folder not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Not a valid TMDL project. Missing '{definition_dir}' folder in: {root}")]
    InvalidStructure {
        root: PathBuf,
        definition_dir: String,
    },

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("File {path} is {size} bytes, larger than the {limit} byte limit")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },
}

impl AssemblyError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::PathNotFound(_) => ErrorCategory::PathNotFound,
            Self::InvalidStructure { .. } => ErrorCategory::InvalidStructure,
            Self::Format(_) => ErrorCategory::FormatError,
            Self::Merge(_) => ErrorCategory::SerializationError,
            Self::DirectoryNotFound(_) => ErrorCategory::DirectoryNotFound,
            Self::Io { .. } | Self::FileTooLarge { .. } => ErrorCategory::UnexpectedError,
        }
    }

    /// Convert to a failure diagnostic
    pub fn to_failure(&self) -> Failure {
        match self {
            Self::Format(err) => err.to_failure(),
            Self::Merge(err) => err.to_failure(),
            Self::Io { .. } | Self::FileTooLarge { .. } => {
                Failure::new(self.category(), self.to_string())
                    .with_detail(format!("stage: load; {self}"))
            }
            _ => Failure::new(self.category(), self.to_string()),
        }
    }
}

/// Loads a project directory according to a config
pub struct ProjectLoader<'c> {
    config: &'c Config,
}

impl<'c> ProjectLoader<'c> {
    pub fn new(config: &'c Config) -> Self {
        Self { config }
    }

    /// Discover, parse and merge every definition file under `root`
    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn load(&self, root: &Path) -> Result<LoadedProject, AssemblyError> {
        if !root.is_dir() {
            return Err(AssemblyError::PathNotFound(root.to_path_buf()));
        }

        let definition = root.join(&self.config.definition_dir);
        if !definition.is_dir() {
            return Err(AssemblyError::InvalidStructure {
                root: root.to_path_buf(),
                definition_dir: self.config.definition_dir.clone(),
            });
        }

        let files = self.discover(&definition)?;
        info!(files = files.len(), parallel = self.config.parallel, "discovered definition files");

        let results: Vec<Result<ParsedDocument, AssemblyError>> = if self.config.parallel {
            files.par_iter().map(|file| self.load_file(file)).collect()
        } else {
            files.iter().map(|file| self.load_file(file)).collect()
        };
        let parsed = results.into_iter().collect::<Result<Vec<_>, _>>()?;

        let documents = parsed.iter().map(|doc| doc.document.clone()).collect();
        let warnings = parsed
            .iter()
            .flat_map(|doc| doc.warnings.iter().cloned())
            .collect();
        let model = MergedModel::from_documents(parsed)?;

        Ok(LoadedProject {
            root: root.to_path_buf(),
            documents,
            model,
            warnings,
        })
    }

    /// List definition files sorted by relative path
    pub fn discover(&self, definition: &Path) -> Result<Vec<SourceFile>, AssemblyError> {
        let config = self.config;
        let walker = WalkDir::new(definition).into_iter().filter_entry(|entry| {
            let ignored = entry.depth() > 0
                && entry.file_type().is_dir()
                && entry.file_name().to_str().map_or(false, |name| config.is_ignored_dir(name));
            !ignored
        });

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.map_err(walk_error)?;
            if !entry.file_type().is_file() || !self.has_extension(entry.path()) {
                continue;
            }

            let relative = entry.path().strip_prefix(definition).unwrap_or(entry.path());
            files.push(SourceFile {
                document: document_name(relative),
                path: entry.path().to_path_buf(),
            });
        }

        files.sort_by(|a, b| a.document.cmp(&b.document));
        Ok(files)
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case(&self.config.extension))
    }

    fn load_file(&self, file: &SourceFile) -> Result<ParsedDocument, AssemblyError> {
        let size = std::fs::metadata(&file.path)
            .map_err(|e| io_error(&file.path, e))?
            .len();
        if size > self.config.max_file_bytes {
            return Err(AssemblyError::FileTooLarge {
                path: file.path.clone(),
                size,
                limit: self.config.max_file_bytes,
            });
        }

        let bytes = std::fs::read(&file.path).map_err(|e| io_error(&file.path, e))?;
        let text = decode(bytes, &file.document)?;

        let parsed = TmdlParser::new()
            .with_lints(self.config.lint.enabled)
            .parse(&text, &file.document)?;
        debug!(document = %file.document, objects = parsed.objects.len(), "loaded file");
        Ok(parsed)
    }
}

fn document_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn decode(bytes: Vec<u8>, document: &str) -> Result<String, FormatError> {
    String::from_utf8(bytes).map_err(|err| {
        let valid = err.utf8_error().valid_up_to();
        let bytes = err.as_bytes();
        let line_start = bytes[..valid]
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        let line_end = bytes[valid..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(bytes.len(), |i| valid + i);
        let line = bytes[..valid].iter().filter(|&&b| b == b'\n').count() + 1;
        let text = String::from_utf8_lossy(&bytes[line_start..line_end]);

        FormatError::new(
            "File is not valid UTF-8.",
            SourcePosition::new(document, line, text.trim_end_matches('\r')),
        )
    })
}

fn io_error(path: &Path, err: std::io::Error) -> AssemblyError {
    if err.kind() == std::io::ErrorKind::NotFound {
        if let Some(parent) = path.parent().filter(|p| !p.exists()) {
            return AssemblyError::DirectoryNotFound(parent.to_path_buf());
        }
    }
    AssemblyError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn walk_error(err: walkdir::Error) -> AssemblyError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
    let not_found = err
        .io_error()
        .map_or(false, |io| io.kind() == std::io::ErrorKind::NotFound);

    if not_found {
        AssemblyError::DirectoryNotFound(path)
    } else {
        AssemblyError::Io {
            path,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_names_use_forward_slashes() {
        let relative = Path::new("tables").join("Sales.tmdl");
        assert_eq!(document_name(&relative), "tables/Sales.tmdl");
    }

    #[test]
    fn invalid_utf8_reports_line() {
        let bytes = b"table Sales\n\tcolumn \xff\n".to_vec();
        let err = decode(bytes, "tables/Sales.tmdl").unwrap_err();

        assert_eq!(err.message, "File is not valid UTF-8.");
        assert_eq!(err.position.line, 2);
        assert_eq!(err.position.line_text, "\tcolumn \u{fffd}");
    }

    #[test]
    fn error_categories() {
        assert_eq!(
            AssemblyError::PathNotFound(PathBuf::from("x")).category(),
            ErrorCategory::PathNotFound
        );
        let err = AssemblyError::FileTooLarge {
            path: PathBuf::from("big.tmdl"),
            size: 20,
            limit: 10,
        };
        assert_eq!(err.category(), ErrorCategory::UnexpectedError);
        assert!(err.to_failure().detail.unwrap().contains("10 byte limit"));
    }
}
