//! Project directories: starter templates and plain-file exports.
//!
//! A project directory holds `index.html`, `style.css` and a script file.
//! Both `index.js` and `script.js` are accepted when reading; writing always
//! produces `index.js`.

use crate::{Error, Result, SourceBundle, SourceKind};
use log::debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const HTML_FILE: &str = "index.html";
pub const CSS_FILE: &str = "style.css";
pub const JS_FILE: &str = "index.js";
pub const JS_FILE_ALT: &str = "script.js";

/// Path a source kind is written to inside `dir`.
pub fn source_path(dir: &Path, kind: SourceKind) -> PathBuf {
    match kind {
        SourceKind::Html => dir.join(HTML_FILE),
        SourceKind::Css => dir.join(CSS_FILE),
        SourceKind::Js => dir.join(JS_FILE),
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::ProjectError(format!("failed to read {}: {}", path.display(), e))),
    }
}

/// Script path actually present in `dir`, preferring `index.js`.
pub fn script_path(dir: &Path) -> PathBuf {
    let primary = dir.join(JS_FILE);
    if !primary.exists() && dir.join(JS_FILE_ALT).exists() {
        return dir.join(JS_FILE_ALT);
    }
    primary
}

/// Load a bundle from a project directory.
///
/// `index.html` is required; a missing stylesheet or script reads as empty.
pub fn load_dir(dir: &Path) -> Result<SourceBundle> {
    let html_path = dir.join(HTML_FILE);
    let html = read_optional(&html_path)?
        .ok_or_else(|| Error::MissingSource(html_path.clone()))?;
    let css = read_optional(&dir.join(CSS_FILE))?.unwrap_or_default();
    let js = read_optional(&script_path(dir))?.unwrap_or_default();
    debug!(
        "loaded project {} (html={}B css={}B js={}B)",
        dir.display(),
        html.len(),
        css.len(),
        js.len()
    );
    Ok(SourceBundle { html, css, js })
}

/// Write a bundle out as a project directory, creating it if needed.
///
/// Refuses to overwrite an existing `index.html` unless `overwrite` is set.
pub fn write_dir(dir: &Path, bundle: &SourceBundle, overwrite: bool) -> Result<()> {
    fs::create_dir_all(dir)
        .map_err(|e| Error::ProjectError(format!("failed to create {}: {}", dir.display(), e)))?;
    let html_path = dir.join(HTML_FILE);
    if !overwrite && html_path.exists() {
        return Err(Error::ProjectError(format!(
            "{} already exists (use overwrite to replace it)",
            html_path.display()
        )));
    }
    for kind in SourceKind::ALL {
        let path = source_path(dir, kind);
        fs::write(&path, bundle.get(kind))
            .map_err(|e| Error::ProjectError(format!("failed to write {}: {}", path.display(), e)))?;
    }
    debug!("wrote project {}", dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_load_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let bundle = SourceBundle::starter();
        write_dir(tmp.path(), &bundle, false).unwrap();
        assert_eq!(load_dir(tmp.path()).unwrap(), bundle);
    }

    #[test]
    fn refuses_overwrite_by_default() {
        let tmp = tempfile::tempdir().unwrap();
        write_dir(tmp.path(), &SourceBundle::starter(), false).unwrap();
        let err = write_dir(tmp.path(), &SourceBundle::default(), false).unwrap_err();
        assert!(matches!(err, Error::ProjectError(_)));
        write_dir(tmp.path(), &SourceBundle::default(), true).unwrap();
        assert_eq!(load_dir(tmp.path()).unwrap(), SourceBundle::default());
    }

    #[test]
    fn missing_html_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(CSS_FILE), "p{}").unwrap();
        assert!(matches!(load_dir(tmp.path()), Err(Error::MissingSource(p)) if p.ends_with(HTML_FILE)));
    }

    #[test]
    fn unreadable_stylesheet_is_not_reported_as_missing() {
        let tmp = tempfile::tempdir().unwrap();
        write_dir(tmp.path(), &SourceBundle::starter(), false).unwrap();
        fs::remove_file(tmp.path().join(CSS_FILE)).unwrap();
        fs::create_dir(tmp.path().join(CSS_FILE)).unwrap();
        assert!(matches!(load_dir(tmp.path()), Err(Error::ProjectError(_))));
    }

    #[test]
    fn optional_files_and_script_alias() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(HTML_FILE), "<p>x</p>").unwrap();
        let b = load_dir(tmp.path()).unwrap();
        assert_eq!(b.css, "");
        assert_eq!(b.js, "");

        fs::write(tmp.path().join(JS_FILE_ALT), "alt()").unwrap();
        assert_eq!(load_dir(tmp.path()).unwrap().js, "alt()");

        fs::write(tmp.path().join(JS_FILE), "main()").unwrap();
        assert_eq!(load_dir(tmp.path()).unwrap().js, "main()");
    }
}
