//! File system utility helpers (BOM-aware readers, etc.)
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Read a source file as UTF-8 text, stripping UTF-8 BOM if present.
pub fn read_source_file(path: &Path) -> Result<String> {
    let mut content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read source file {}", path.display()))?;
    if content.starts_with('\u{FEFF}') {
        content = content.trim_start_matches('\u{FEFF}').to_string();
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_bom_is_stripped() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all("\u{FEFF}x = 1\n".as_bytes()).unwrap();
        let content = read_source_file(file.path()).unwrap();
        assert_eq!(content, "x = 1\n");
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = read_source_file(Path::new("/definitely/not/here.rb")).unwrap_err();
        assert!(err.to_string().contains("Failed to read source file"));
    }
}
