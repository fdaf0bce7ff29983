//! Source loading
//!
//! Loads input files, follows `include directives (each included file is
//! compiled as an additional input, never spliced into the including text),
//! and pulls missing module definitions out of library directories the way
//! a `-y`/`+libext` search does.

use crate::ast::SourceFile;
use crate::design::Design;
use crate::error::{FrontendError, Result};
use crate::parse::parse_file;
use indexmap::IndexSet;
use std::path::{Path, PathBuf};

/// Options controlling how sources are located and preprocessed
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    pub include_dirs: Vec<PathBuf>,
    pub system_include_dirs: Vec<PathBuf>,
    pub defines: Vec<String>,
    pub undefines: Vec<String>,
    pub lib_dirs: Vec<PathBuf>,
    /// Extensions tried during library search; defaults to `v` and `sv`
    pub lib_exts: Vec<String>,
}

/// Accumulates parsed source files for one compilation
pub struct SourceLoader {
    options: SourceOptions,
    defines: IndexSet<String>,
    loaded: IndexSet<PathBuf>,
    files: Vec<SourceFile>,
}

impl SourceLoader {
    pub fn new(options: SourceOptions) -> Self {
        let mut defines: IndexSet<String> = options.defines.iter().cloned().collect();
        for undef in &options.undefines {
            defines.shift_remove(undef);
        }
        SourceLoader {
            options,
            defines,
            loaded: IndexSet::new(),
            files: Vec::new(),
        }
    }

    /// Load and parse one file (plus anything it `include`s), returning the
    /// index of the file itself within the loader
    pub fn load_file(&mut self, path: &Path) -> Result<usize> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if let Some(idx) = self.loaded.get_index_of(&canonical) {
            return Ok(idx);
        }
        let text = std::fs::read_to_string(path).map_err(|source| FrontendError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.load_text(&path.display().to_string(), text, canonical, path.parent())
    }

    /// Parse in-memory text as if it had been read from `path`
    pub fn load_memory(&mut self, path: &str, text: String) -> Result<usize> {
        self.load_text(path, text, PathBuf::from(path), None)
    }

    fn load_text(
        &mut self,
        path: &str,
        text: String,
        canonical: PathBuf,
        parent: Option<&Path>,
    ) -> Result<usize> {
        // `loaded` and `files` stay index-aligned: one entry each per file
        if let Some(idx) = self.loaded.get_index_of(&canonical) {
            return Ok(idx);
        }
        let file = parse_file(path, text, &mut self.defines)?;
        let includes = file.includes.clone();
        let idx = self.files.len();
        self.files.push(file);
        self.loaded.insert(canonical);

        for include in includes {
            if let Some(found) = self.find_include(&include, parent) {
                self.load_file(&found)?;
            }
        }
        Ok(idx)
    }

    fn find_include(&self, name: &str, parent: Option<&Path>) -> Option<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(parent) = parent {
            candidates.push(parent.join(name));
        }
        for dir in &self.options.include_dirs {
            candidates.push(dir.join(name));
        }
        for dir in &self.options.system_include_dirs {
            candidates.push(dir.join(name));
        }
        candidates.into_iter().find(|c| c.is_file())
    }

    /// Resolve instantiated-but-undefined modules through the library
    /// search path, repeating until no further definitions turn up
    pub fn load_libraries(&mut self) -> Result<()> {
        if self.options.lib_dirs.is_empty() {
            return Ok(());
        }
        let dirs = self.options.lib_dirs.clone();
        let exts: Vec<String> = if self.options.lib_exts.is_empty() {
            vec!["v".to_string(), "sv".to_string()]
        } else {
            self.options.lib_exts.clone()
        };

        loop {
            let defined: IndexSet<String> = self
                .files
                .iter()
                .flat_map(|f| f.modules.iter().map(|m| m.name.clone()))
                .collect();
            let missing: IndexSet<String> = self
                .files
                .iter()
                .flat_map(|f| f.modules.iter())
                .flat_map(|m| m.instances.iter().map(|i| i.module_name.clone()))
                .filter(|name| !defined.contains(name))
                .collect();

            let mut progressed = false;
            for name in missing {
                'search: for dir in &dirs {
                    for ext in &exts {
                        let candidate = dir.join(format!("{}.{}", name, ext));
                        if candidate.is_file() {
                            self.load_file(&candidate)?;
                            progressed = true;
                            break 'search;
                        }
                    }
                }
            }
            if !progressed {
                return Ok(());
            }
        }
    }

    /// Finish loading and build the elaborated design
    pub fn into_design(self) -> Result<Design> {
        Design::new(self.files)
    }
}
