//! Lexical path normalisation

/// Returns the canonical form of `path`.
///
/// Works on the string alone, the file system is never touched:
/// 1. Adds a leading `/` if missing.
/// 2. Collapses runs of `/` into one.
/// 3. Drops `.` segments.
/// 4. Resolves `..` against the previous segment; `..` at the root is dropped.
///
/// A trailing `/` survives when the input had one (or ended in `/.`).
/// An empty input becomes `/`.
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let trailing = path.len() > 1 && (path.ends_with('/') || path.ends_with("/."));

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut cleaned = String::with_capacity(path.len() + 1);
    for segment in &segments {
        cleaned.push('/');
        cleaned.push_str(segment);
    }

    if cleaned.is_empty() {
        cleaned.push('/');
    } else if trailing {
        cleaned.push('/');
    }
    cleaned
}
