//! EXIFからGPS座標と撮影日時を抽出
//!
//! 抽出は失敗しない。タグの欠落・不正はすべて「値なし」に落とす。

use exif::{Exif, In, Tag, Value};
use geopic_common::{decode_capture_time, decode_dms_values, Coordinates, Rational};
use std::io::Cursor;

/// 抽出結果（いずれも欠落しうる）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedMetadata {
    pub coordinates: Option<Coordinates>,
    pub taken_at: Option<String>,
}

pub fn extract(bytes: &[u8]) -> ExtractedMetadata {
    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(bytes)) {
        Ok(exif) => exif,
        Err(e) => {
            log::debug!("EXIFなし: {}", e);
            return ExtractedMetadata::default();
        }
    };

    ExtractedMetadata {
        coordinates: extract_coordinates(&exif),
        taken_at: extract_taken_at(&exif),
    }
}

/// 緯度・経度とそれぞれの参照タグ、4つすべて揃った場合のみ座標を返す
fn extract_coordinates(exif: &Exif) -> Option<Coordinates> {
    let lat = exif.get_field(Tag::GPSLatitude, In::PRIMARY)?;
    let lat_ref = exif.get_field(Tag::GPSLatitudeRef, In::PRIMARY)?;
    let lng = exif.get_field(Tag::GPSLongitude, In::PRIMARY)?;
    let lng_ref = exif.get_field(Tag::GPSLongitudeRef, In::PRIMARY)?;

    let latitude = decode_dms_values(&rationals(&lat.value)?, &ascii(&lat_ref.value)?);
    let longitude = decode_dms_values(&rationals(&lng.value)?, &ascii(&lng_ref.value)?);

    let coordinates = Coordinates::from_parts(latitude, longitude);
    if coordinates.is_none() {
        log::warn!("GPSタグが不正なため座標を無視します");
    }
    coordinates
}

/// DateTimeOriginal を優先し、なければ DateTime
fn extract_taken_at(exif: &Exif) -> Option<String> {
    let field = exif
        .get_field(Tag::DateTimeOriginal, In::PRIMARY)
        .or_else(|| exif.get_field(Tag::DateTime, In::PRIMARY))?;

    let raw = ascii(&field.value).unwrap_or_else(|| field.display_value().to_string());
    Some(decode_capture_time(&raw))
}

fn rationals(value: &Value) -> Option<Vec<Rational>> {
    match value {
        Value::Rational(values) => Some(
            values
                .iter()
                .map(|r| Rational::new(r.num, r.denom))
                .collect(),
        ),
        _ => None,
    }
}

fn ascii(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(lines) => lines
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}
