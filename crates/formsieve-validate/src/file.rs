//! Uploaded file validation and content type detection.

use crate::limits::LimitUnit;
use crate::options::{FileMoveContext, Options};
use crate::validator::Validator;
use async_trait::async_trait;
use formsieve_core::{DetectedType, FileCategory, FileEntry, Result, SieveError};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// Bytes read from the start of a file when sniffing its content.
const SNIFF_LEN: usize = 8192;

pub const DOCUMENT_EXTS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "odp", "rtf", "txt", "csv",
];

pub const ARCHIVE_EXTS: &[&str] = &["zip", "gz", "tgz", "tar", "7z", "rar", "bz2", "xz"];

/// Container formats whose client extension is trusted once the container
/// itself was recognised.
const CONTAINER_FAMILIES: &[(&str, &[&str])] = &[
    ("zip", &["docx", "xlsx", "pptx", "odt", "ods", "odp", "epub", "jar", "apk"]),
    ("doc", &["xls", "ppt", "msg"]),
    ("gz", &["tgz"]),
    ("mp4", &["m4v"]),
    (
        "txt",
        &["csv", "json", "xml", "md", "html", "htm", "svg", "rtf", "log", "yaml", "yml"],
    ),
];

/// Identifies the content type of an uploaded file.
#[async_trait]
pub trait FileTypeDetector: Send + Sync {
    /// Returns [`DetectedType::unknown`] for unrecognised content.
    async fn detect(&self, path: &Path) -> Result<DetectedType>;
}

/// Magic number sniffer with a UTF-8 text fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagicDetector;

impl MagicDetector {
    pub fn new() -> Self {
        Self
    }

    /// Identify content from its leading bytes.
    pub fn sniff(bytes: &[u8]) -> DetectedType {
        let starts = |magic: &[u8]| bytes.starts_with(magic);
        let at = |offset: usize, magic: &[u8]| {
            bytes.get(offset..offset + magic.len()) == Some(magic)
        };

        let (mime, ext) = if starts(b"\x89PNG\r\n\x1a\n") {
            ("image/png", "png")
        } else if starts(b"\xff\xd8\xff") {
            ("image/jpeg", "jpg")
        } else if starts(b"GIF87a") || starts(b"GIF89a") {
            ("image/gif", "gif")
        } else if starts(b"RIFF") && at(8, b"WEBP") {
            ("image/webp", "webp")
        } else if starts(b"RIFF") && at(8, b"WAVE") {
            ("audio/wav", "wav")
        } else if starts(b"RIFF") && at(8, b"AVI ") {
            ("video/x-msvideo", "avi")
        } else if starts(b"BM") && bytes.len() > 14 {
            ("image/bmp", "bmp")
        } else if starts(b"\x00\x00\x01\x00") {
            ("image/x-icon", "ico")
        } else if starts(b"II*\x00") || starts(b"MM\x00*") {
            ("image/tiff", "tif")
        } else if starts(b"%PDF") {
            ("application/pdf", "pdf")
        } else if starts(b"PK\x03\x04") {
            ("application/zip", "zip")
        } else if starts(b"\x1f\x8b") {
            ("application/gzip", "gz")
        } else if starts(b"7z\xbc\xaf\x27\x1c") {
            ("application/x-7z-compressed", "7z")
        } else if starts(b"Rar!\x1a\x07") {
            ("application/vnd.rar", "rar")
        } else if starts(b"BZh") {
            ("application/x-bzip2", "bz2")
        } else if starts(b"\xfd7zXZ\x00") {
            ("application/x-xz", "xz")
        } else if starts(b"\xd0\xcf\x11\xe0\xa1\xb1\x1a\xe1") {
            ("application/msword", "doc")
        } else if starts(b"ID3") || [b"\xff\xfb", b"\xff\xf3", b"\xff\xf2"].iter().any(|m| starts(*m)) {
            ("audio/mpeg", "mp3")
        } else if starts(b"OggS") {
            ("audio/ogg", "ogg")
        } else if starts(b"fLaC") {
            ("audio/flac", "flac")
        } else if at(4, b"ftyp") {
            match bytes.get(8..12) {
                Some(b"M4A ") => ("audio/mp4", "m4a"),
                Some(b"qt  ") => ("video/quicktime", "mov"),
                _ => ("video/mp4", "mp4"),
            }
        } else if starts(b"\x1a\x45\xdf\xa3") {
            if bytes.windows(4).any(|w| w == b"webm") {
                ("video/webm", "webm")
            } else {
                ("video/x-matroska", "mkv")
            }
        } else if at(257, b"ustar") {
            ("application/x-tar", "tar")
        } else if is_text(bytes) {
            ("text/plain", "txt")
        } else {
            return DetectedType::unknown();
        };
        DetectedType::new(mime, ext)
    }
}

fn is_text(bytes: &[u8]) -> bool {
    if bytes.is_empty() || bytes.contains(&0) {
        return false;
    }
    match std::str::from_utf8(bytes) {
        Ok(_) => true,
        // A multi-byte character cut off by the sniff window.
        Err(e) => e.error_len().is_none() && e.valid_up_to() + 4 > bytes.len(),
    }
}

#[async_trait]
impl FileTypeDetector for MagicDetector {
    async fn detect(&self, path: &Path) -> Result<DetectedType> {
        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| SieveError::File(format!("cannot open {}: {e}", path.display())))?;
        let mut buf = vec![0u8; SNIFF_LEN];
        let mut filled = 0;
        while filled < buf.len() {
            let read = file
                .read(&mut buf[filled..])
                .await
                .map_err(|e| SieveError::File(format!("cannot read {}: {e}", path.display())))?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        buf.truncate(filled);
        Ok(Self::sniff(&buf))
    }
}

/// The detected extension, or the client's one when it belongs to the same
/// container family.
fn effective_ext(detected: &DetectedType, entry: &FileEntry) -> String {
    let name_ext = entry.name_ext();
    if let Some(name_ext) = &name_ext {
        if *name_ext == detected.ext {
            return detected.ext.clone();
        }
        let same_family = CONTAINER_FAMILIES
            .iter()
            .any(|(base, members)| *base == detected.ext && members.contains(&name_ext.as_str()));
        let alias = matches!(
            (detected.ext.as_str(), name_ext.as_str()),
            ("jpg", "jpeg") | ("tif", "tiff")
        );
        if same_family || alias {
            return name_ext.clone();
        }
    }
    if detected.is_unknown() {
        return name_ext.unwrap_or_default();
    }
    detected.ext.clone()
}

fn in_category(category: FileCategory, mime: &str, ext: &str) -> bool {
    match category {
        FileCategory::Image => mime.starts_with("image/"),
        FileCategory::Audio => mime.starts_with("audio/"),
        FileCategory::Video => mime.starts_with("video/"),
        FileCategory::Media => ["image/", "audio/", "video/"].iter().any(|p| mime.starts_with(p)),
        FileCategory::Document => DOCUMENT_EXTS.contains(&ext),
        FileCategory::Archive => ARCHIVE_EXTS.contains(&ext),
    }
}

async fn content_key(path: &Path, ext: &str) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| SieveError::File(format!("cannot read {}: {e}", path.display())))?;
    let digest = hex::encode(Sha256::digest(&bytes));
    Ok(if ext.is_empty() {
        digest
    } else {
        format!("{digest}.{ext}")
    })
}

/// Move `from` into `dir` as `file_name`, copying when a rename is not possible.
async fn move_into(from: &Path, dir: &Path, file_name: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| SieveError::File(format!("cannot create {}: {e}", dir.display())))?;
    let dest = dir.join(file_name);
    if tokio::fs::rename(from, &dest).await.is_err() {
        tokio::fs::copy(from, &dest).await.map_err(|e| {
            SieveError::File(format!("cannot move {} to {}: {e}", from.display(), dest.display()))
        })?;
        tokio::fs::remove_file(from)
            .await
            .map_err(|e| SieveError::File(format!("cannot remove {}: {e}", from.display())))?;
    }
    Ok(dest)
}

impl Validator {
    /// Validate an uploaded file in place.
    ///
    /// On success `entry` carries the detected `mime`, the effective `ext` and
    /// its content `key`, plus `path` once moved.
    pub async fn validate_file(
        &mut self,
        field: &str,
        entry: &mut FileEntry,
        index: usize,
        options: &Options,
    ) -> Result<bool> {
        self.check_file(field, entry, index, None, options).await
    }

    pub async fn validate_image(
        &mut self,
        field: &str,
        entry: &mut FileEntry,
        index: usize,
        options: &Options,
    ) -> Result<bool> {
        self.check_file(field, entry, index, Some(FileCategory::Image), options)
            .await
    }

    pub async fn validate_audio(
        &mut self,
        field: &str,
        entry: &mut FileEntry,
        index: usize,
        options: &Options,
    ) -> Result<bool> {
        self.check_file(field, entry, index, Some(FileCategory::Audio), options)
            .await
    }

    pub async fn validate_video(
        &mut self,
        field: &str,
        entry: &mut FileEntry,
        index: usize,
        options: &Options,
    ) -> Result<bool> {
        self.check_file(field, entry, index, Some(FileCategory::Video), options)
            .await
    }

    /// Image, audio or video.
    pub async fn validate_media(
        &mut self,
        field: &str,
        entry: &mut FileEntry,
        index: usize,
        options: &Options,
    ) -> Result<bool> {
        self.check_file(field, entry, index, Some(FileCategory::Media), options)
            .await
    }

    pub async fn validate_document(
        &mut self,
        field: &str,
        entry: &mut FileEntry,
        index: usize,
        options: &Options,
    ) -> Result<bool> {
        self.check_file(field, entry, index, Some(FileCategory::Document), options)
            .await
    }

    pub async fn validate_archive(
        &mut self,
        field: &str,
        entry: &mut FileEntry,
        index: usize,
        options: &Options,
    ) -> Result<bool> {
        self.check_file(field, entry, index, Some(FileCategory::Archive), options)
            .await
    }

    /// Dispatch a file entry by its category preset.
    pub async fn validate_file_as(
        &mut self,
        category: Option<FileCategory>,
        field: &str,
        entry: &mut FileEntry,
        index: usize,
        options: &Options,
    ) -> Result<bool> {
        self.check_file(field, entry, index, category, options).await
    }

    async fn check_file(
        &mut self,
        field: &str,
        entry: &mut FileEntry,
        index: usize,
        category: Option<FileCategory>,
        options: &Options,
    ) -> Result<bool> {
        self.begin(field, index);
        let name = entry.name.clone();

        let size = if entry.size > 0 {
            entry.size
        } else {
            tokio::fs::metadata(&entry.tmp_path)
                .await
                .map(|m| m.len())
                .map_err(|e| SieveError::File(format!("cannot stat {}: {e}", entry.tmp_path.display())))?
        };
        if !self.check_limits(&name, size as f64, LimitUnit::Bytes, options)? {
            return Ok(false);
        }

        let detector = self.detector.clone();
        let detected = detector.detect(&entry.tmp_path).await?;
        let ext = effective_ext(&detected, entry);

        if let Some(category) = category {
            if !in_category(category, &detected.mime, &ext) {
                let template = options
                    .err
                    .clone()
                    .unwrap_or_else(|| format!("{{value}} is not a valid {} file", category.as_str()));
                return self.fail(&template, &name);
            }
        }
        let ext_allowed = options
            .exts
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&ext));
        if !options.exts.is_empty() && !ext_allowed {
            let err = options.ext_err.as_deref().unwrap_or("{value} is not an allowed file type");
            return self.fail(err, &name);
        }

        if !self.run_shared_checks(&name, None, options)? {
            return Ok(false);
        }

        entry.mime = detected.mime;
        entry.key = content_key(&entry.tmp_path, &ext).await?;
        entry.ext = ext;
        formsieve_core::trace_debug!(field = %field, index = index, mime = %entry.mime, key = %entry.key, "file accepted");

        if let Some(dir) = &options.move_to {
            let dest = move_into(&entry.tmp_path, dir, &entry.key).await?;
            entry.path = Some(dest);
        } else if let Some(hook) = &options.move_with {
            let ctx = FileMoveContext {
                field: field.to_string(),
                index,
                entry: entry.clone(),
            };
            match hook.call(ctx).await {
                Ok(updated) => *entry = updated,
                Err(msg) if msg.is_empty() => return self.fail("{value} could not be moved", &name),
                Err(msg) => return self.fail(&msg, &name),
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR\x00\x00\x00\x01\x00\x00\x00\x01";

    fn upload(name: &str, bytes: &[u8]) -> (NamedTempFile, FileEntry) {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(bytes).unwrap();
        let entry = FileEntry::new(name, tmp.path(), bytes.len() as u64);
        (tmp, entry)
    }

    #[test]
    fn sniffs_common_signatures() {
        assert_eq!(MagicDetector::sniff(PNG).ext, "png");
        assert_eq!(MagicDetector::sniff(b"%PDF-1.7\n").ext, "pdf");
        assert_eq!(MagicDetector::sniff(b"PK\x03\x04rest").ext, "zip");
        assert_eq!(MagicDetector::sniff(b"RIFF\x00\x00\x00\x00WEBPVP8 ").mime, "image/webp");
        assert_eq!(MagicDetector::sniff(b"\x00\x00\x00\x18ftypmp42").ext, "mp4");
        assert_eq!(MagicDetector::sniff(b"plain text, caf\xc3\xa9").ext, "txt");
        assert!(MagicDetector::sniff(b"\x00\x01\x02binary").is_unknown());
        assert!(MagicDetector::sniff(b"").is_unknown());
    }

    #[tokio::test]
    async fn png_named_txt_fails_document_check() {
        let (_tmp, mut entry) = upload("notes.txt", PNG);
        let mut v = Validator::new();
        assert!(!v.validate_document("notes", &mut entry, 0, &Options::new()).await.unwrap());
        assert_eq!(v.errors().get("notes"), Some("notes.txt is not a valid document file"));

        let (_tmp2, mut entry2) = upload("notes.txt", PNG);
        let txt_only = Options::new().exts(["txt"]);
        assert!(!v.validate_file("plain", &mut entry2, 0, &txt_only).await.unwrap());
        assert_eq!(v.errors().get("plain"), Some("notes.txt is not an allowed file type"));
    }

    #[tokio::test]
    async fn accepted_image_gets_type_ext_and_key() {
        let (_tmp, mut entry) = upload("avatar.PNG", PNG);
        let mut v = Validator::new();
        assert!(v.validate_image("avatar", &mut entry, 0, &Options::new()).await.unwrap());
        assert_eq!(entry.mime, "image/png");
        assert_eq!(entry.ext, "png");
        let expected = format!("{}.png", hex::encode(Sha256::digest(PNG)));
        assert_eq!(entry.key, expected);
        assert!(entry.path.is_none());
    }

    #[tokio::test]
    async fn size_limits_use_byte_units() {
        let (_tmp, mut entry) = upload("big.pdf", &[b"%PDF".as_slice(), [b' '; 2048].as_slice()].concat());
        let mut v = Validator::new();
        let options = Options::new().max("1kb");
        assert!(!v.validate_document("cv", &mut entry, 0, &options).await.unwrap());
        assert_eq!(v.errors().get("cv"), Some("cv should not exceed 1kb"));
    }

    #[tokio::test]
    async fn move_to_directory_names_file_by_key() {
        let (tmp, mut entry) = upload("doc.pdf", b"%PDF-1.4 body");
        let dir = TempDir::new().unwrap();
        let options = Options::new().move_to(dir.path().join("uploads"));
        let mut v = Validator::new();
        assert!(v.validate_document("doc", &mut entry, 0, &options).await.unwrap());

        let dest = entry.path.clone().unwrap();
        assert_eq!(dest, dir.path().join("uploads").join(&entry.key));
        assert!(dest.exists());
        assert!(!tmp.path().exists());
    }

    #[tokio::test]
    async fn move_hook_error_becomes_field_error() {
        let (_tmp, mut entry) = upload("a.pdf", b"%PDF-1.4");
        let options = Options::new().move_with(|ctx| {
            async move { Err(format!("storage for {} is full", ctx.field)) }.boxed()
        });
        let mut v = Validator::new();
        assert!(!v.validate_file("upload", &mut entry, 0, &options).await.unwrap());
        assert_eq!(v.errors().get("upload"), Some("storage for upload is full"));
    }

    #[tokio::test]
    async fn missing_temp_file_is_fatal() {
        let mut entry = FileEntry::new("gone.png", "/nonexistent/formsieve/upload", 10);
        let mut v = Validator::new();
        let err = v.validate_file("gone", &mut entry, 0, &Options::new()).await.unwrap_err();
        assert!(matches!(err, SieveError::File(_)));
    }
}
