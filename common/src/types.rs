//! カタログの型定義
//!
//! - Coordinates: 緯度経度（常にペアで保持）
//! - PhotoRecord: カタログ上の写真1件

use serde::{Deserialize, Serialize};

/// 10進度の座標（緯度・経度）
///
/// 片方だけの座標は存在しないため、`Option<Coordinates>` で有無を表す。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// DBの nullable カラム2つから組み立てる（両方揃った場合のみ）
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(lat), Some(lng)) => Some(Self::new(lat, lng)),
            _ => None,
        }
    }
}

/// カタログ上の写真レコード
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "PhotoEntry")]
pub struct PhotoRecord {
    /// 一意なファイル名（表示名を兼ねる）
    pub filename: String,

    /// 実ファイルの保存先
    pub storage_path: String,

    pub coordinates: Option<Coordinates>,

    /// 撮影日時（`YYYY-MM-DD HH:MM:SS`、解析不能時は生の値）
    pub taken_at: Option<String>,
}

impl PhotoRecord {
    pub fn new(filename: impl Into<String>, storage_path: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            storage_path: storage_path.into(),
            coordinates: None,
            taken_at: None,
        }
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.coordinates = Some(Coordinates::new(latitude, longitude));
        self
    }

    pub fn with_taken_at(mut self, taken_at: impl Into<String>) -> Self {
        self.taken_at = Some(taken_at.into());
        self
    }

    pub fn latitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.longitude)
    }

    pub fn has_coordinates(&self) -> bool {
        self.coordinates.is_some()
    }
}

/// JSON出力用のフラットな表現（filename, path, lat, lng, taken_at）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoEntry {
    pub filename: String,
    pub path: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub taken_at: Option<String>,
}

impl From<PhotoRecord> for PhotoEntry {
    fn from(record: PhotoRecord) -> Self {
        Self {
            lat: record.latitude(),
            lng: record.longitude(),
            filename: record.filename,
            path: record.storage_path,
            taken_at: record.taken_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_from_parts_requires_both() {
        assert_eq!(
            Coordinates::from_parts(Some(1.0), Some(2.0)),
            Some(Coordinates::new(1.0, 2.0))
        );
        assert_eq!(Coordinates::from_parts(Some(1.0), None), None);
        assert_eq!(Coordinates::from_parts(None, Some(2.0)), None);
        assert_eq!(Coordinates::from_parts(None, None), None);
    }

    #[test]
    fn test_photo_record_builder() {
        let record = PhotoRecord::new("a.jpg", "/uploads/a.jpg")
            .with_coordinates(35.5, 139.7)
            .with_taken_at("2024-03-15 10:22:05");

        assert_eq!(record.latitude(), Some(35.5));
        assert_eq!(record.longitude(), Some(139.7));
        assert!(record.has_coordinates());
        assert_eq!(record.taken_at.as_deref(), Some("2024-03-15 10:22:05"));
    }

    #[test]
    fn test_photo_record_json_is_flat() {
        let record = PhotoRecord::new("a.jpg", "/uploads/a.jpg").with_coordinates(1.0, 2.0);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["filename"], "a.jpg");
        assert_eq!(json["path"], "/uploads/a.jpg");
        assert_eq!(json["lat"], 1.0);
        assert_eq!(json["lng"], 2.0);
        assert!(json["taken_at"].is_null());
    }
}
