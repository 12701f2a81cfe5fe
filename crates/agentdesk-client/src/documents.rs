/// A markdown document known to the backend.
///
/// The listing endpoint returns bare path strings; `from_path` derives the
/// filename key and a display title from them.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DocumentItem {
    /// Path exactly as reported by the backend.
    pub filepath: String,
    /// Last path segment; the key used by the document endpoints.
    pub filename: String,
    /// Display title: file stem with `_`/`-` mapped to spaces.
    pub title: String,
}

impl DocumentItem {
    /// Builds an item from a backend path string.
    pub fn from_path(path: impl Into<String>) -> Self {
        let filepath = path.into();
        let filename = filepath
            .rsplit('/')
            .next()
            .unwrap_or(filepath.as_str())
            .to_string();
        let title = title_from_filename(&filename);
        Self {
            filepath,
            filename,
            title,
        }
    }
}

fn title_from_filename(filename: &str) -> String {
    let stem = match filename.rsplit_once('.') {
        Some(("", _)) | None => filename,
        Some((stem, _)) => stem,
    };
    stem.chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect()
}
