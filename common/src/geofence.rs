//! ジオフェンス（点の多角形内判定）
//!
//! 単一の単純な多角形（穴なし）に対するレイキャスティング。
//! 内部では (x, y) = (経度, 緯度) として扱い、呼び出し側は (緯度, 経度) を渡す。
//!
//! 辺・頂点上の点の判定は浮動小数点の比較次第で、どちらになるかは保証しない。

use crate::error::{Error, Result};
use crate::types::PhotoRecord;
use serde_json::Value;

/// 多角形の外周リング（(経度, 緯度) の順序付き頂点列）
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    vertices: Vec<(f64, f64)>,
}

impl Ring {
    pub fn new(vertices: Vec<(f64, f64)>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[(f64, f64)] {
        &self.vertices
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        point_in_polygon(lat, lng, &self.vertices)
    }
}

/// 閉じたリング（先頭 == 末尾）の重複頂点を除いた頂点数
fn distinct_vertex_count(ring: &[(f64, f64)]) -> usize {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 1 && first == last => ring.len() - 1,
        _ => ring.len(),
    }
}

/// レイキャスティングによる内外判定
///
/// 頂点3未満の多角形は何も含まない。
pub fn point_in_polygon(lat: f64, lng: f64, ring: &[(f64, f64)]) -> bool {
    if distinct_vertex_count(ring) < 3 {
        return false;
    }

    let (x, y) = (lng, lat);
    let n = ring.len();
    let mut inside = false;

    for i in 0..n {
        let (p1x, p1y) = ring[i];
        let (p2x, p2y) = ring[(i + 1) % n];

        if y > p1y.min(p2y) && y <= p1y.max(p2y) && x <= p1x.max(p2x) {
            // p1y == p2y の辺は上の条件を満たさないので除算は安全
            let crosses = p1x == p2x || x <= (y - p1y) * (p2x - p1x) / (p2y - p1y) + p1x;
            if crosses {
                inside = !inside;
            }
        }
    }

    inside
}

/// 座標を持ち、かつリング内にあるレコードだけを残す（順序は維持）
pub fn filter_records(records: Vec<PhotoRecord>, ring: &Ring) -> Vec<PhotoRecord> {
    records
        .into_iter()
        .filter(|r| {
            r.coordinates
                .map(|c| ring.contains(c.latitude, c.longitude))
                .unwrap_or(false)
        })
        .collect()
}

/// ジオフェンスJSONを解析
///
/// 受け付ける形:
/// - `{"type":"Polygon","coordinates":[[[lng,lat],...]]}`
/// - 上記を `geometry` に持つ Feature
/// - 上記を `geofence` キーに持つリクエスト本体
///
/// 外周リング（最初のリング）のみ使用する。
pub fn parse_geofence(json: &str) -> Result<Ring> {
    let value: Value = serde_json::from_str(json)?;
    ring_from_value(&value)
}

fn ring_from_value(value: &Value) -> Result<Ring> {
    if let Some(inner) = value.get("geofence") {
        return ring_from_value(inner);
    }
    if let Some(geometry) = value.get("geometry") {
        return ring_from_value(geometry);
    }

    if let Some(kind) = value.get("type").and_then(Value::as_str) {
        if kind != "Polygon" {
            return Err(Error::Geofence(format!("unsupported geometry type: {}", kind)));
        }
    }

    let outer = value
        .get("coordinates")
        .and_then(Value::as_array)
        .and_then(|rings| rings.first())
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Geofence("missing polygon coordinates".into()))?;

    let vertices = outer
        .iter()
        .map(|pair| match pair.as_array().map(Vec::as_slice) {
            Some([lng, lat, ..]) => match (lng.as_f64(), lat.as_f64()) {
                (Some(lng), Some(lat)) => Ok((lng, lat)),
                _ => Err(Error::Geofence(format!("non-numeric vertex: {}", pair))),
            },
            _ => Err(Error::Geofence(format!("invalid vertex: {}", pair))),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Ring::new(vertices))
}
