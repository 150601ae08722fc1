//! Declaration registry with optional on-disk storage
//!
//! - Declarations stored at `<dir>/declaration_<name>.json`
//! - One file per declaration
//! - Registered declarations are immutable
//! - Malformed files abort loading
//!
//! Custom field and record checks are function values and do not survive
//! a save/load round trip; re-attach them in code.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::errors::{DeclarationError, DeclarationResult};
use super::types::RecordDeclaration;
use crate::observability::{Event, Logger, Severity};

/// Registry of named declarations, backed by a directory of JSON files.
pub struct DeclarationLoader {
    /// Directory containing declaration files
    dir: PathBuf,
    /// Loaded declarations indexed by name
    declarations: HashMap<String, RecordDeclaration>,
    /// Lowest severity written to the log
    log_level: Option<Severity>,
}

impl DeclarationLoader {
    /// Creates a loader for the given directory.
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            declarations: HashMap::new(),
            log_level: None,
        }
    }

    /// Set the logging threshold; the loader is silent by default.
    pub fn with_log_level(mut self, level: Option<Severity>) -> Self {
        self.log_level = level;
        self
    }

    /// Returns the declaration directory path.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Loads all declaration files from the directory.
    ///
    /// A missing directory loads nothing. Returns the number of files loaded.
    pub fn load_all(&mut self) -> DeclarationResult<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let entries = fs::read_dir(&self.dir).map_err(|e| io_error(&self.dir, e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| io_error(&self.dir, e))?.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        // Deterministic load order
        paths.sort();

        for path in &paths {
            self.load_file(path)?;
        }

        let count = paths.len().to_string();
        let dir = self.dir.display().to_string();
        self.log(
            Severity::Info,
            Event::DeclarationsLoaded,
            &[("count", count.as_str()), ("dir", dir.as_str())],
        );

        Ok(paths.len())
    }

    /// Loads and registers a single declaration file.
    pub fn load_file(&mut self, path: &Path) -> DeclarationResult<&RecordDeclaration> {
        let content = fs::read_to_string(path).map_err(|e| io_error(path, e))?;

        // Deserializing also runs the structural checks
        let declaration: RecordDeclaration =
            serde_json::from_str(&content).map_err(|e| DeclarationError::Malformed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        self.insert(declaration)
    }

    /// Registers a declaration built in code.
    pub fn register(&mut self, declaration: RecordDeclaration) -> DeclarationResult<&RecordDeclaration> {
        declaration.validate_structure()?;
        self.insert(declaration)
    }

    fn insert(&mut self, declaration: RecordDeclaration) -> DeclarationResult<&RecordDeclaration> {
        let name = declaration.name().to_string();
        if self.declarations.contains_key(&name) {
            return Err(DeclarationError::AlreadyRegistered(name));
        }
        Ok(self.declarations.entry(name).or_insert(declaration))
    }

    /// Gets a declaration by name.
    pub fn get(&self, name: &str) -> Option<&RecordDeclaration> {
        self.declarations.get(name)
    }

    /// Gets a declaration by name, failing if absent.
    pub fn require(&self, name: &str) -> DeclarationResult<&RecordDeclaration> {
        self.get(name)
            .ok_or_else(|| DeclarationError::NotFound(name.to_string()))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.declarations.contains_key(name)
    }

    /// Returns registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.declarations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn count(&self) -> usize {
        self.declarations.len()
    }

    /// Saves a declaration to disk.
    ///
    /// Existing files are never overwritten.
    pub fn save(&self, declaration: &RecordDeclaration) -> DeclarationResult<PathBuf> {
        let path = self.dir.join(format!("declaration_{}.json", declaration.name()));

        if path.exists() {
            return Err(DeclarationError::FileExists(path.display().to_string()));
        }

        fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))?;

        let content =
            serde_json::to_string_pretty(declaration).map_err(|e| DeclarationError::Malformed {
                path: path.display().to_string(),
                reason: format!("Failed to serialize declaration: {}", e),
            })?;

        fs::write(&path, content).map_err(|e| io_error(&path, e))?;

        let shown = path.display().to_string();
        self.log(
            Severity::Info,
            Event::DeclarationSaved,
            &[("name", declaration.name()), ("path", shown.as_str())],
        );

        Ok(path)
    }

    fn log(&self, severity: Severity, event: Event, fields: &[(&str, &str)]) {
        if self.log_level.map_or(false, |threshold| severity >= threshold) {
            Logger::log(severity, event.as_str(), fields);
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> DeclarationError {
    DeclarationError::Io {
        path: path.display().to_string(),
        source,
    }
}
