use std::path::Path;

const UNKNOWN_ASSET: &str = "unknown";

/// Resolves the asset id of each row of one source file.
///
/// A non-blank, trimmed per-row label wins. Otherwise the row gets the file
/// default: the name of the directory holding the file, or failing that the
/// file name up to its first underscore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResolver {
    fallback: String,
}

impl AssetResolver {
    pub fn for_file(path: &Path) -> Self {
        Self {
            fallback: file_default_asset(path),
        }
    }

    pub fn resolve(&self, label: Option<&str>) -> String {
        match label.map(str::trim) {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => self.fallback.clone(),
        }
    }
}

fn file_default_asset(path: &Path) -> String {
    let dir_name = path
        .parent()
        .and_then(Path::file_name)
        .and_then(|n| n.to_str())
        .map(str::trim)
        .filter(|n| !n.is_empty());
    if let Some(dir) = dir_name {
        return dir.to_string();
    }

    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.split('_').next())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(UNKNOWN_ASSET)
        .to_string()
}
