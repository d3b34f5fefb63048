//! KMZ（KML + 画像を同梱したZIP）の生成
//!
//! - doc.kml: 位置情報を持つ写真ごとに1つの Placemark
//! - images/<filename>: 読み込めた画像の生バイト

use crate::error::Result;
use geopic_common::{Coordinates, PhotoRecord};
use rayon::prelude::*;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::Path;

pub const KML_FILE_NAME: &str = "doc.kml";
pub const IMAGE_DIR: &str = "images";
pub const DOCUMENT_NAME: &str = "GeoPic Export";

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// CDATAセクションで囲む。内容中の `]]>` はセクションを分割して埋め込む。
fn cdata(value: &str) -> String {
    format!("<![CDATA[{}]]>", value.replace("]]>", "]]]]><![CDATA[>"))
}

pub fn image_entry_name(filename: &str) -> String {
    format!("{}/{}", IMAGE_DIR, filename)
}

/// Placemark の説明欄に入れるHTML断片
fn description_html(record: &PhotoRecord) -> String {
    let mut html = format!(
        "<p><img src='{}' style='max-width:480px'></p>",
        escape_xml(&image_entry_name(&record.filename))
    );
    if let Some(taken_at) = record.taken_at.as_deref().filter(|t| !t.is_empty()) {
        html.push_str(&format!("<p><small>{}</small></p>", escape_xml(taken_at)));
    }
    html
}

/// 座標とファイル名を持つレコードのみ Placemark にする
fn placemark_target(record: &PhotoRecord) -> Option<Coordinates> {
    if record.filename.is_empty() {
        return None;
    }
    record.coordinates
}

pub fn build_kml(records: &[PhotoRecord]) -> String {
    let mut kml = String::new();
    kml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    kml.push('\n');
    kml.push_str(r#"<kml xmlns="http://www.opengis.net/kml/2.2" xmlns:gx="http://www.google.com/kml/ext/2.2">"#);
    kml.push('\n');
    kml.push_str("<Document>\n");
    kml.push_str(&format!("  <name>{}</name>\n", escape_xml(DOCUMENT_NAME)));

    for record in records {
        let Some(coords) = placemark_target(record) else {
            continue;
        };
        kml.push_str("  <Placemark>\n");
        kml.push_str(&format!("    <name>{}</name>\n", escape_xml(&record.filename)));
        kml.push_str(&format!(
            "    <description>{}</description>\n",
            cdata(&description_html(record))
        ));
        kml.push_str(&format!(
            "    <Point><coordinates>{},{},0</coordinates></Point>\n",
            coords.longitude, coords.latitude
        ));
        kml.push_str("  </Placemark>\n");
    }

    kml.push_str("</Document>\n");
    kml.push_str("</kml>");
    kml
}

/// 実ファイルを読む。欠落・読み込み不可は `None`（エクスポートは続行）。
fn read_image(record: &PhotoRecord) -> Option<Vec<u8>> {
    if record.filename.is_empty() || record.storage_path.is_empty() {
        return None;
    }
    let path = Path::new(&record.storage_path);
    if !path.is_file() {
        log::warn!("KMZ: 画像が見つかりません: {}", path.display());
        return None;
    }
    match std::fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            log::warn!("KMZ: 画像を読み込めません {}: {}", path.display(), e);
            None
        }
    }
}

/// KMZアーカイブを生成
///
/// 1件の不正なレコードで全体を失敗させない。画像の読み込みは並列だが、
/// アーカイブ内の順序は入力順のまま。
pub fn build_archive(records: &[PhotoRecord]) -> Result<Vec<u8>> {
    let kml = build_kml(records);

    let images: Vec<Option<Vec<u8>>> = records.par_iter().map(read_image).collect();

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options: zip::write::FileOptions<'_, ()> =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file(KML_FILE_NAME, options)?;
    zip.write_all(kml.as_bytes())?;

    let mut written = HashSet::new();
    for (record, bytes) in records.iter().zip(images) {
        let Some(bytes) = bytes else {
            continue;
        };
        let entry = image_entry_name(&record.filename);
        if !written.insert(entry.clone()) {
            log::debug!("KMZ: 重複した画像をスキップ: {}", entry);
            continue;
        }
        zip.start_file(entry, options)?;
        zip.write_all(&bytes)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
