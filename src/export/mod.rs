pub mod kmz;

use crate::catalog::Catalog;
use crate::error::{GeoPicError, Result};
use chrono::{DateTime, Local};
use geopic_common::{filter_records, parse_geofence, PhotoRecord, Ring};
use std::path::{Path, PathBuf};

pub const KMZ_MIME_TYPE: &str = "application/vnd.google-earth.kmz";

/// エクスポートの種類（出力ファイル名の接頭辞に使う）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    All,
    Geofence,
}

impl ExportKind {
    fn prefix(self) -> &'static str {
        match self {
            ExportKind::All => "geopic",
            ExportKind::Geofence => "geofence",
        }
    }

    /// `geopic_YYYYmmdd_HHMMSS.kmz` / `geofence_YYYYmmdd_HHMMSS.kmz`
    pub fn file_name(self, now: DateTime<Local>) -> String {
        format!("{}_{}.kmz", self.prefix(), now.format("%Y%m%d_%H%M%S"))
    }
}

/// 生成済みのKMZ
#[derive(Debug, Clone)]
pub struct KmzExport {
    pub bytes: Vec<u8>,
    pub kind: ExportKind,
    /// Placemark になった写真の数
    pub placemarks: usize,
}

impl KmzExport {
    pub fn file_name(&self, now: DateTime<Local>) -> String {
        self.kind.file_name(now)
    }
}

fn qualifies(record: &PhotoRecord) -> bool {
    !record.filename.is_empty() && record.has_coordinates()
}

/// 選択済みレコードからKMZを生成
///
/// 対象が1件もなければ空のアーカイブではなく `NothingToExport` を返す。
pub fn export_selection(records: &[PhotoRecord]) -> Result<Vec<u8>> {
    if !records.iter().any(qualifies) {
        return Err(GeoPicError::NothingToExport);
    }
    kmz::build_archive(records)
}

/// カタログから位置情報付きの写真を取り出し（ジオフェンスがあれば絞り込み）、KMZを生成
pub fn export_catalog(catalog: &Catalog, geofence: Option<&Ring>) -> Result<KmzExport> {
    let listing = catalog.list(true)?;
    if listing.pruned > 0 {
        println!("- 実ファイルのない写真を{}件カタログから削除しました", listing.pruned);
    }

    let (records, kind) = match geofence {
        Some(ring) => (filter_records(listing.records, ring), ExportKind::Geofence),
        None => (listing.records, ExportKind::All),
    };

    let bytes = export_selection(&records)?;
    Ok(KmzExport {
        bytes,
        kind,
        placemarks: records.iter().filter(|r| qualifies(r)).count(),
    })
}

/// ジオフェンスファイル（GeoJSON Polygon）を読み込む
pub fn load_geofence(path: &Path) -> Result<Ring> {
    if !path.exists() {
        return Err(GeoPicError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    parse_geofence(&content).map_err(|e| match e {
        geopic_common::Error::Geofence(msg) => GeoPicError::InvalidGeofence(msg),
        other => GeoPicError::Common(other),
    })
}

/// 出力先がディレクトリ（または拡張子なし）ならその中に既定名で置く
pub fn output_path(output: &Path, file_name: &str) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        output.join(file_name)
    } else {
        output.to_path_buf()
    }
}

/// KMZを書き出して出力パスを返す
pub fn write_export(export: &KmzExport, output: &Path) -> Result<PathBuf> {
    let path = output_path(output, &export.file_name(Local::now()));
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&path, &export.bytes)?;
    Ok(path)
}
