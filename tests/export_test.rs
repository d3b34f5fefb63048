//! KMZエクスポートの統合テスト
//!
//! 生成したアーカイブを zip で読み戻して中身を検証

use geopic::catalog::Catalog;
use geopic::common::{parse_geofence, PhotoRecord};
use geopic::error::GeoPicError;
use geopic::export::{self, kmz, ExportKind};
use std::io::{Cursor, Read};
use std::path::Path;
use tempfile::tempdir;

fn entry_names(bytes: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("ZIPとして読めない");
    archive.file_names().map(|n| n.to_string()).collect()
}

fn read_entry(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("ZIPとして読めない");
    let mut file = archive.by_name(name).expect("エントリがない");
    let mut content = Vec::new();
    file.read_to_end(&mut content).unwrap();
    content
}

fn read_kml(bytes: &[u8]) -> String {
    String::from_utf8(read_entry(bytes, kmz::KML_FILE_NAME)).expect("KMLがUTF-8でない")
}

fn located(dir: &Path, name: &str, lat: f64, lng: f64) -> PhotoRecord {
    let path = dir.join(name);
    std::fs::write(&path, format!("image:{}", name)).unwrap();
    PhotoRecord::new(name, path.to_string_lossy().to_string()).with_coordinates(lat, lng)
}

/// 空の入力でも doc.kml だけのアーカイブになる
#[test]
fn test_empty_archive_has_only_document() {
    let bytes = kmz::build_archive(&[]).unwrap();

    assert_eq!(entry_names(&bytes), vec![kmz::KML_FILE_NAME.to_string()]);
    let kml = read_kml(&bytes);
    assert!(kml.contains("<Document>"));
    assert!(!kml.contains("<Placemark>"));
}

/// 実ファイルがあれば images/ に同梱、座標は lng,lat の順
#[test]
fn test_archive_bundles_existing_image() {
    let dir = tempdir().expect("Failed to create temp dir");
    let record = located(dir.path(), "a.jpg", 1.0, 2.0).with_taken_at("2024-03-15 10:22:05");

    let bytes = kmz::build_archive(&[record]).unwrap();

    let names = entry_names(&bytes);
    assert!(names.contains(&"doc.kml".to_string()));
    assert!(names.contains(&"images/a.jpg".to_string()));
    assert_eq!(read_entry(&bytes, "images/a.jpg"), b"image:a.jpg");

    let kml = read_kml(&bytes);
    assert!(kml.contains("<coordinates>2,1,0</coordinates>"));
    assert!(kml.contains("<name>a.jpg</name>"));
    assert!(kml.contains("<small>2024-03-15 10:22:05</small>"));
    assert!(kml.contains("images/a.jpg"));
}

/// 実ファイルがなくても Placemark は出力し、画像だけ省く
#[test]
fn test_missing_image_keeps_placemark() {
    let record = PhotoRecord::new("ghost.jpg", "/nonexistent/ghost.jpg").with_coordinates(5.0, 6.0);

    let bytes = kmz::build_archive(&[record]).unwrap();

    assert_eq!(entry_names(&bytes), vec!["doc.kml".to_string()]);
    let kml = read_kml(&bytes);
    assert_eq!(kml.matches("<Placemark>").count(), 1);
    assert!(kml.contains("<coordinates>6,5,0</coordinates>"));
}

/// 入力順のまま Placemark が並ぶ
#[test]
fn test_placemark_order_follows_input() {
    let dir = tempdir().expect("Failed to create temp dir");
    let records = vec![
        located(dir.path(), "zeta.jpg", 1.0, 1.0),
        located(dir.path(), "alpha.jpg", 2.0, 2.0),
        located(dir.path(), "mid.jpg", 3.0, 3.0),
    ];

    let kml = read_kml(&kmz::build_archive(&records).unwrap());

    let zeta = kml.find("<name>zeta.jpg</name>").unwrap();
    let alpha = kml.find("<name>alpha.jpg</name>").unwrap();
    let mid = kml.find("<name>mid.jpg</name>").unwrap();
    assert!(zeta < alpha && alpha < mid);
}

/// 名前にXML特殊文字を含んでも壊れない
#[test]
fn test_kml_escapes_names() {
    let record = PhotoRecord::new("a&b<c>.jpg", "/nonexistent/x.jpg").with_coordinates(0.0, 0.0);
    let kml = kmz::build_kml(&[record]);
    assert!(kml.contains("<name>a&amp;b&lt;c&gt;.jpg</name>"));
}

/// カタログ全件エクスポート
#[test]
fn test_export_catalog_all() {
    let dir = tempdir().expect("Failed to create temp dir");
    let catalog = Catalog::open_in_memory().unwrap();
    catalog.upsert(&located(dir.path(), "a.jpg", 35.0, 139.0)).unwrap();
    catalog.upsert(&located(dir.path(), "b.jpg", 34.0, 135.0)).unwrap();
    let nogps = dir.path().join("c.jpg");
    std::fs::write(&nogps, b"c").unwrap();
    catalog
        .upsert(&PhotoRecord::new("c.jpg", nogps.to_string_lossy().to_string()))
        .unwrap();

    let export = export::export_catalog(&catalog, None).unwrap();

    assert_eq!(export.kind, ExportKind::All);
    assert_eq!(export.placemarks, 2);
    let names = entry_names(&export.bytes);
    assert!(names.contains(&"images/a.jpg".to_string()));
    assert!(names.contains(&"images/b.jpg".to_string()));
    assert!(!names.contains(&"images/c.jpg".to_string()));
}

/// ジオフェンスで一部だけ出力
#[test]
fn test_export_catalog_geofence_subset() {
    let dir = tempdir().expect("Failed to create temp dir");
    let catalog = Catalog::open_in_memory().unwrap();
    catalog.upsert(&located(dir.path(), "inside.jpg", 5.0, 5.0)).unwrap();
    catalog.upsert(&located(dir.path(), "outside.jpg", 50.0, 50.0)).unwrap();

    let ring = parse_geofence(
        r#"{"type":"Polygon","coordinates":[[[0,0],[10,0],[10,10],[0,10],[0,0]]]}"#,
    )
    .unwrap();

    let export = export::export_catalog(&catalog, Some(&ring)).unwrap();

    assert_eq!(export.kind, ExportKind::Geofence);
    assert_eq!(export.placemarks, 1);
    let kml = read_kml(&export.bytes);
    assert!(kml.contains("<name>inside.jpg</name>"));
    assert!(!kml.contains("outside.jpg"));
}

/// ジオフェンス内に1枚もなければエラー
#[test]
fn test_export_catalog_geofence_selects_nothing() {
    let dir = tempdir().expect("Failed to create temp dir");
    let catalog = Catalog::open_in_memory().unwrap();
    catalog.upsert(&located(dir.path(), "far.jpg", 50.0, 50.0)).unwrap();

    let ring = parse_geofence(
        r#"{"type":"Polygon","coordinates":[[[0,0],[10,0],[10,10],[0,10]]]}"#,
    )
    .unwrap();

    let result = export::export_catalog(&catalog, Some(&ring));
    assert!(matches!(result, Err(GeoPicError::NothingToExport)));
}

/// 位置情報のある写真がなければエラー
#[test]
fn test_export_catalog_empty() {
    let catalog = Catalog::open_in_memory().unwrap();
    let result = export::export_catalog(&catalog, None);
    assert!(matches!(result, Err(GeoPicError::NothingToExport)));
}

/// ジオフェンスファイルの読み込み
#[test]
fn test_load_geofence_file() {
    let dir = tempdir().expect("Failed to create temp dir");

    let good = dir.path().join("fence.json");
    std::fs::write(
        &good,
        r#"{"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[0,0],[4,0],[4,4],[0,4]]]}}"#,
    )
    .unwrap();
    let ring = export::load_geofence(&good).unwrap();
    assert!(ring.contains(2.0, 2.0));

    let bad = dir.path().join("point.json");
    std::fs::write(&bad, r#"{"type":"Point","coordinates":[1,2]}"#).unwrap();
    assert!(matches!(
        export::load_geofence(&bad),
        Err(GeoPicError::InvalidGeofence(_))
    ));

    assert!(matches!(
        export::load_geofence(&dir.path().join("none.json")),
        Err(GeoPicError::FileNotFound(_))
    ));
}

/// 書き出し先がディレクトリなら既定名で保存
#[test]
fn test_write_export_into_directory() {
    let dir = tempdir().expect("Failed to create temp dir");
    let catalog = Catalog::open_in_memory().unwrap();
    catalog.upsert(&located(dir.path(), "a.jpg", 1.0, 1.0)).unwrap();

    let export = export::export_catalog(&catalog, None).unwrap();
    let out_dir = dir.path().join("out");
    let path = export::write_export(&export, &out_dir).unwrap();

    assert!(path.starts_with(&out_dir));
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("geopic_") && name.ends_with(".kmz"));
    assert_eq!(std::fs::read(&path).unwrap(), export.bytes);
}
