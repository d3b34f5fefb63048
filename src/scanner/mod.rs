mod exif;

pub use self::exif::{extract, ExtractedMetadata};

use crate::error::{GeoPicError, Result};
use geopic_common::PhotoRecord;
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "heic"];

/// 取り込み可能な拡張子か（大文字小文字は区別しない）
pub fn is_allowed_file(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// アップロードされたファイル名を安全なベース名にする
///
/// ディレクトリ成分を落とし、空白は `_`、英数字と `._-` 以外は除去、
/// 先頭末尾の `.` `_` も除去する。
pub fn secure_filename(name: &str) -> String {
    lazy_static::lazy_static! {
        static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
        static ref UNSAFE_RE: Regex = Regex::new(r"[^A-Za-z0-9_.\-]").unwrap();
    }

    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let joined = WHITESPACE_RE.replace_all(base.trim(), "_");
    let cleaned = UNSAFE_RE.replace_all(&joined, "");
    cleaned.trim_matches(['.', '_']).to_string()
}

/// 取り込み境界: ファイルのバイト列・検証済みファイル名・保存先からレコード候補を作る
pub fn build_record(bytes: &[u8], filename: &str, storage_path: &Path) -> PhotoRecord {
    let meta = extract(bytes);
    PhotoRecord {
        filename: filename.to_string(),
        storage_path: storage_path.to_string_lossy().to_string(),
        coordinates: meta.coordinates,
        taken_at: meta.taken_at,
    }
}

/// 引数のファイル/フォルダから取り込み対象の画像を集める
///
/// フォルダは直下のみ走査する。対応外の拡張子は `rejected` に入る。
pub fn scan_sources(paths: &[PathBuf]) -> Result<ScanResult> {
    let mut result = ScanResult::default();

    for path in paths {
        if !path.exists() {
            return Err(GeoPicError::FileNotFound(path.display().to_string()));
        }

        if path.is_file() {
            result.push(path.to_path_buf());
            continue;
        }

        let mut entries: Vec<PathBuf> = WalkDir::new(path)
            .max_depth(1) // 直下のみ（再帰しない）
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();

        // ファイル名でソート
        entries.sort();
        for entry in entries {
            result.push(entry);
        }
    }

    Ok(result)
}

#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub images: Vec<PathBuf>,
    pub rejected: Vec<PathBuf>,
}

impl ScanResult {
    fn push(&mut self, path: PathBuf) {
        let allowed = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(is_allowed_file)
            .unwrap_or(false);
        if allowed {
            self.images.push(path);
        } else {
            self.rejected.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;

    #[test]
    fn test_is_allowed_file() {
        assert!(is_allowed_file("a.jpg"));
        assert!(is_allowed_file("a.JPG"));
        assert!(is_allowed_file("a.jpeg"));
        assert!(is_allowed_file("a.png"));
        assert!(is_allowed_file("a.HEIC"));
        assert!(!is_allowed_file("a.txt"));
        assert!(!is_allowed_file("a.gif"));
        assert!(!is_allowed_file("jpg"));
    }

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("My Photo.jpg"), "My_Photo.jpg");
        assert_eq!(secure_filename("../../etc/passwd"), "passwd");
        assert_eq!(secure_filename(r"C:\photos\IMG 01.JPG"), "IMG_01.JPG");
        assert_eq!(secure_filename(".hidden.png"), "hidden.png");
        assert_eq!(secure_filename("a<b>c.jpg"), "abc.jpg");
        assert_eq!(secure_filename(".."), "");
    }

    #[test]
    fn test_build_record_without_exif() {
        let record = build_record(b"plain bytes", "a.jpg", Path::new("/uploads/a.jpg"));
        assert_eq!(record.filename, "a.jpg");
        assert_eq!(record.storage_path, "/uploads/a.jpg");
        assert_eq!(record.coordinates, None);
        assert_eq!(record.taken_at, None);
    }

    #[test]
    fn test_build_record_with_gps() {
        let bytes = super::exif::tests::tiff_with(&super::exif::tests::gps_fields("S", "E"));
        let record = build_record(&bytes, "gps.jpg", Path::new("/uploads/gps.jpg"));
        let coords = record.coordinates.unwrap();
        assert!(coords.latitude < 0.0);
        assert!(coords.longitude > 0.0);
    }

    #[test]
    fn test_scan_sources_not_found() {
        let result = scan_sources(&[PathBuf::from("/nonexistent/folder")]);
        assert!(matches!(result, Err(GeoPicError::FileNotFound(_))));
    }

    #[test]
    fn test_scan_sources_folder() {
        let temp_dir = tempfile::tempdir().unwrap();

        File::create(temp_dir.path().join("c.jpg")).unwrap().write_all(b"dummy").unwrap();
        File::create(temp_dir.path().join("a.JPG")).unwrap().write_all(b"dummy").unwrap();
        File::create(temp_dir.path().join("b.heic")).unwrap().write_all(b"dummy").unwrap();
        File::create(temp_dir.path().join("readme.txt")).unwrap().write_all(b"text").unwrap();
        fs::create_dir(temp_dir.path().join("nested")).unwrap();
        File::create(temp_dir.path().join("nested").join("d.jpg")).unwrap();

        let result = scan_sources(&[temp_dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = result
            .images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.heic", "c.jpg"]);
        assert_eq!(result.rejected.len(), 1);
    }
}
