use crate::error::Result;
use log::warn;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Extensions the document loader probes for.
const DOCUMENT_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Scanner for API documents under a document root.
///
/// The `DocumentScanner` recursively walks the root directory and collects every
/// YAML file. Hidden directories (those starting with `.`) are skipped.
///
/// # Example
///
/// ```no_run
/// use openapi_mock::scanner::DocumentScanner;
/// use std::path::PathBuf;
///
/// let scanner = DocumentScanner::new(PathBuf::from("./apidoc"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} documents", result.documents.len());
/// ```
pub struct DocumentScanner {
    root_path: PathBuf,
}

/// Result of a directory scan.
pub struct ScanResult {
    /// Paths of all discovered documents, sorted
    pub documents: Vec<PathBuf>,
    /// Warning messages for entries that could not be accessed
    pub warnings: Vec<String>,
}

impl DocumentScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Scans the directory tree and collects all document files.
    ///
    /// Inaccessible entries are logged and recorded as warnings; scanning continues.
    pub fn scan(&self) -> Result<ScanResult> {
        let mut documents = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .into_iter()
            .filter_entry(|e| e.path() == self.root_path || !e.file_name().to_string_lossy().starts_with('.'))
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    let is_document = path
                        .extension()
                        .and_then(|s| s.to_str())
                        .is_some_and(|ext| DOCUMENT_EXTENSIONS.contains(&ext));
                    if path.is_file() && is_document {
                        documents.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        documents.sort();
        Ok(ScanResult {
            documents,
            warnings,
        })
    }
}
