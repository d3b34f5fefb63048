//! アップロードフォルダの管理
//!
//! 実ファイルの持ち主はこのモジュール。カタログはファイルの有無を観測するだけなので、
//! 取り込み・削除・全消去ではカタログ更新の後にここでファイルを扱う。

use crate::catalog::{is_plain_filename, Catalog};
use crate::error::{GeoPicError, Result};
use crate::scanner;
use geopic_common::PhotoRecord;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 1ファイルの取り込み結果
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    Ingested(PhotoRecord),
    /// 同名ファイルがアップロードフォルダに既にある
    Skipped(String),
}

/// 写真をアップロードフォルダへコピーし、メタデータを抽出してカタログに登録
pub fn ingest_file(catalog: &Catalog, source: &Path, upload_dir: &Path) -> Result<IngestOutcome> {
    let original_name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let filename = scanner::secure_filename(&original_name);

    if filename.is_empty() || !scanner::is_allowed_file(&filename) {
        return Err(GeoPicError::UnsupportedFile(original_name));
    }

    let bytes = std::fs::read(source)?;

    // 保存パスは絶対パスで記録する（実行ディレクトリに依存させない）
    std::fs::create_dir_all(upload_dir)?;
    let dest = std::fs::canonicalize(upload_dir)?.join(&filename);
    if dest.exists() {
        log::info!("既存ファイルのためスキップ: {}", dest.display());
        return Ok(IngestOutcome::Skipped(filename));
    }
    std::fs::write(&dest, &bytes)?;

    let record = scanner::build_record(&bytes, &filename, &dest);
    if record.coordinates.is_none() {
        log::debug!("位置情報なし: {}", filename);
    }
    if let Err(e) = catalog.upsert(&record) {
        remove_backing_file(&dest);
        return Err(e);
    }

    Ok(IngestOutcome::Ingested(record))
}

/// カタログから削除した後に実ファイルを消す
///
/// ファイル削除の失敗はログに残すだけ。削除した場合は `true`。
pub fn remove_backing_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("ファイルを削除できません {}: {}", path.display(), e);
            false
        }
    }
}

/// 1枚削除: レコード削除が成功してからファイルを消す
///
/// カタログにない名前はアップロードフォルダ直下のファイルとしてのみ扱う。
pub fn delete_photo(catalog: &Catalog, filename: &str, upload_dir: &Path) -> Result<DeleteSummary> {
    let path = match catalog.get(filename)? {
        Some(record) => Some(PathBuf::from(record.storage_path)),
        None if is_plain_filename(filename) => Some(upload_dir.join(filename)),
        None => {
            log::warn!("アップロードフォルダ外のファイル名は削除しません: {}", filename);
            None
        }
    };

    let removed_record = catalog.delete(filename)?;
    let removed_file = path.as_deref().map(remove_backing_file).unwrap_or(false);

    Ok(DeleteSummary {
        removed_record,
        removed_file,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteSummary {
    pub removed_record: bool,
    pub removed_file: bool,
}

/// 全消去: カタログを空にしてからアップロードフォルダ直下のファイルを消す
///
/// (削除レコード数, 削除ファイル数) を返す。
pub fn clear_all(catalog: &Catalog, upload_dir: &Path) -> Result<(usize, usize)> {
    let records = catalog.clear()?;

    if !upload_dir.exists() {
        return Ok((records, 0));
    }

    let files = WalkDir::new(upload_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| remove_backing_file(e.path()))
        .count();

    Ok((records, files))
}
