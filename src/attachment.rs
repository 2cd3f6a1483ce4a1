//! File intake: read a local file whole and encode it as an attachment.

use crate::model::Attachment;
use base64::Engine;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub(crate) const ACCEPTED: [&str; 6] = [
    "image/png",
    "image/jpeg",
    "image/webp",
    "image/heic",
    "image/heif",
    "application/pdf",
];

#[derive(Debug, Error)]
pub(crate) enum IntakeError {
    #[error("can't read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{name} is {mime}, only images and PDFs please")]
    Unsupported { name: String, mime: String },
}

/// Expands a leading `~/` to the home directory.
pub(crate) fn expand_path(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(dirs) = directories::BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    PathBuf::from(raw)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub(crate) fn classify(path: &Path) -> Result<String, IntakeError> {
    let mime = mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream");
    if ACCEPTED.contains(&mime) {
        Ok(mime.to_string())
    } else {
        Err(IntakeError::Unsupported {
            name: display_name(path),
            mime: mime.to_string(),
        })
    }
}

pub(crate) fn encode(path: &Path, mime_type: String, bytes: &[u8]) -> Attachment {
    Attachment {
        data: base64::engine::general_purpose::STANDARD.encode(bytes),
        mime_type,
        name: display_name(path),
    }
}

/// Reads the whole file into memory. No size limit.
pub(crate) async fn load(path: &Path) -> Result<Attachment, IntakeError> {
    let mime = classify(path)?;
    let bytes = tokio::fs::read(path).await.map_err(|source| IntakeError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(encode(path, mime, &bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn only_images_and_pdf_are_accepted() {
        assert_eq!(classify(Path::new("a/b/photo.JPG")).unwrap(), "image/jpeg");
        assert_eq!(classify(Path::new("notes.pdf")).unwrap(), "application/pdf");
        assert_eq!(classify(Path::new("x.webp")).unwrap(), "image/webp");
        let err = classify(Path::new("song.mp3")).unwrap_err();
        assert!(matches!(err, IntakeError::Unsupported { ref name, .. } if name == "song.mp3"));
        assert!(classify(Path::new("Makefile")).is_err());
    }

    #[test]
    fn tilde_expands_to_home() {
        let p = expand_path("  ~/pics/cat.png ");
        assert!(p.ends_with("pics/cat.png"));
        assert!(!p.starts_with("~"));
        assert_eq!(expand_path("/tmp/a.png"), PathBuf::from("/tmp/a.png"));
    }

    #[tokio::test]
    async fn load_reads_and_encodes_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.pdf");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"%PDF-1").unwrap();
        drop(f);

        let att = load(&path).await.unwrap();
        assert_eq!(att.name, "hello.pdf");
        assert_eq!(att.mime_type, "application/pdf");
        assert_eq!(att.data, "JVBERi0x");
        assert_eq!(att.base64_payload(), Some("JVBERi0x"));
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("gone.png")).await.unwrap_err();
        assert!(matches!(err, IntakeError::Read { .. }));
    }
}
