//! Key management service for XP3 title keys.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::CryptoError;
use crate::keys::{XorKey, builtin_keys, parse_key_hex, parse_title};

/// Environment variable pointing at a key file or directory of key files.
pub const KEYS_PATH_ENV: &str = "XP3_KEYS_PATH";

/// Service for managing title keys.
pub struct KeyService {
    /// Map of title identifier to XOR key pair.
    keys: HashMap<String, XorKey>,
}

impl KeyService {
    /// Create a new key service with the built-in keys.
    pub fn new() -> Self {
        let keys = builtin_keys();
        info!("Loaded {} built-in title keys", keys.len());

        Self { keys }
    }

    /// Create a key service with no pre-loaded keys.
    pub fn empty() -> Self {
        Self {
            keys: HashMap::new(),
        }
    }

    /// Get a key by title identifier.
    pub fn get_key(&self, title: &str) -> Option<XorKey> {
        self.keys.get(title).copied()
    }

    /// Get a key by title identifier, failing if it is unknown.
    pub fn require_key(&self, title: &str) -> Result<XorKey, CryptoError> {
        self.get_key(title)
            .ok_or_else(|| CryptoError::KeyNotFound(title.to_string()))
    }

    /// Add a key to the service.
    pub fn add_key(&mut self, title: impl Into<String>, key: XorKey) {
        self.keys.insert(title.into(), key);
    }

    /// Get the number of keys in the service.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Iterate over registered titles in no particular order.
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    /// Load keys from a file.
    ///
    /// Lines are `title,keyhex` (CSV), `title\tkeyhex` (TSV) or
    /// `title keyhex [description]` (TXT); the key hex is the primary
    /// byte followed by the initial byte. Malformed lines are skipped
    /// with a warning.
    pub fn load_key_file(&mut self, path: &Path) -> Result<usize, CryptoError> {
        let content = fs::read_to_string(path)?;

        // Detect format based on file extension or content
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        match ext {
            "csv" => Ok(self.load_delimited_keys(&content, ',', "CSV")),
            "tsv" => Ok(self.load_delimited_keys(&content, '\t', "TSV")),
            "txt" => Ok(self.load_txt_keys(&content)),
            _ => {
                // Try to auto-detect format
                if content.contains(',') {
                    Ok(self.load_delimited_keys(&content, ',', "CSV"))
                } else if content.contains('\t') {
                    Ok(self.load_delimited_keys(&content, '\t', "TSV"))
                } else {
                    Ok(self.load_txt_keys(&content))
                }
            }
        }
    }

    /// Load keys from a single-character-delimited format (`title<sep>keyhex`).
    fn load_delimited_keys(&mut self, content: &str, sep: char, format: &str) -> usize {
        let mut loaded = 0;

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }

            let parts: Vec<&str> = line.split(sep).collect();
            if parts.len() < 2 {
                warn!(
                    "Skipping invalid {} line {}: {}",
                    format,
                    line_num + 1,
                    line
                );
                continue;
            }

            if self.add_parsed_key(parts[0], parts[1], line_num) {
                loaded += 1;
            }
        }

        info!("Loaded {} keys from {} file", loaded, format);
        loaded
    }

    /// Load keys from TXT format (`title keyhex [description]`).
    fn load_txt_keys(&mut self, content: &str) -> usize {
        let mut loaded = 0;

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 2 {
                warn!("Skipping invalid TXT line {}: {}", line_num + 1, line);
                continue;
            }

            if self.add_parsed_key(parts[0], parts[1], line_num) {
                loaded += 1;
            }
        }

        info!("Loaded {} keys from TXT file", loaded);
        loaded
    }

    /// Parse one `title`/`keyhex` pair, warning on malformed fields.
    fn add_parsed_key(&mut self, title: &str, key_hex: &str, line_num: usize) -> bool {
        match (parse_title(title), parse_key_hex(key_hex)) {
            (Ok(title), Ok(key)) => {
                self.add_key(title, key);
                true
            }
            (Err(e), _) => {
                warn!("Failed to parse title on line {}: {}", line_num + 1, e);
                false
            }
            (_, Err(e)) => {
                warn!("Failed to parse key hex on line {}: {}", line_num + 1, e);
                false
            }
        }
    }

    /// Load keys from the location named by `XP3_KEYS_PATH`, if set.
    pub fn load_from_env(&mut self) -> Result<usize, CryptoError> {
        let Ok(path) = std::env::var(KEYS_PATH_ENV) else {
            return Ok(0);
        };

        let path = PathBuf::from(path);
        if !path.exists() {
            warn!("{} points at missing path {:?}", KEYS_PATH_ENV, path);
            return Ok(0);
        }

        if path.is_dir() {
            self.load_keys_from_dir(&path)
        } else {
            self.load_key_file(&path)
        }
    }

    /// Load all key files from a directory.
    fn load_keys_from_dir(&mut self, dir: &Path) -> Result<usize, CryptoError> {
        let mut total_loaded = 0;

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

                // Only load files with appropriate extensions
                if name.ends_with(".csv")
                    || name.ends_with(".tsv")
                    || name.ends_with(".txt")
                    || name.contains("key")
                {
                    match self.load_key_file(&path) {
                        Ok(count) => {
                            total_loaded += count;
                            debug!("Loaded {} keys from {:?}", count, path);
                        }
                        Err(e) => {
                            warn!("Failed to load keys from {:?}: {}", path, e);
                        }
                    }
                }
            }
        }

        Ok(total_loaded)
    }
}

impl Default for KeyService {
    fn default() -> Self {
        Self::new()
    }
}
