//! 座標・撮影日時コーデック
//!
//! EXIFの度分秒（有理数3つ）+ 方位参照を符号付き10進度へ変換し、
//! 撮影日時文字列を `YYYY-MM-DD HH:MM:SS` に正規化する。
//! どちらも失敗時はエラーにせず「値なし」または生の値を返す。

use chrono::NaiveDateTime;

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";
const NORMALIZED_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// EXIFの符号なし有理数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub num: u32,
    pub denom: u32,
}

impl Rational {
    pub fn new(num: u32, denom: u32) -> Self {
        Self { num, denom }
    }

    /// 分母0は `None`
    pub fn to_f64(self) -> Option<f64> {
        if self.denom == 0 {
            None
        } else {
            Some(self.num as f64 / self.denom as f64)
        }
    }
}

/// 方位参照（GPSLatitudeRef / GPSLongitudeRef）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    /// "N" / "s" / " W\0" などを解釈
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim_matches(|c: char| c.is_whitespace() || c == '\0');
        let mut chars = trimmed.chars();
        let first = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        match first.to_ascii_uppercase() {
            'N' => Some(Hemisphere::North),
            'S' => Some(Hemisphere::South),
            'E' => Some(Hemisphere::East),
            'W' => Some(Hemisphere::West),
            _ => None,
        }
    }

    pub fn sign(self) -> f64 {
        match self {
            Hemisphere::South | Hemisphere::West => -1.0,
            Hemisphere::North | Hemisphere::East => 1.0,
        }
    }
}

/// 度分秒 → 符号付き10進度
///
/// `dd = d + m/60 + s/3600`、南緯・西経は負。
/// 分母0や不正な方位参照は `None`。
pub fn decode_dms(
    degrees: Rational,
    minutes: Rational,
    seconds: Rational,
    hemisphere_ref: &str,
) -> Option<f64> {
    let hemisphere = Hemisphere::parse(hemisphere_ref)?;
    let d = degrees.to_f64()?;
    let m = minutes.to_f64()?;
    let s = seconds.to_f64()?;
    Some(hemisphere.sign() * (d + m / 60.0 + s / 3600.0))
}

/// EXIFタグの値配列（3要素以上）から変換
pub fn decode_dms_values(values: &[Rational], hemisphere_ref: &str) -> Option<f64> {
    match values {
        [d, m, s, ..] => decode_dms(*d, *m, *s, hemisphere_ref),
        _ => None,
    }
}

/// 撮影日時を `YYYY-MM-DD HH:MM:SS` に正規化
///
/// 解析できない場合は入力をそのまま返す（捨てない）。
pub fn decode_capture_time(raw: &str) -> String {
    let candidate = raw.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    match NaiveDateTime::parse_from_str(candidate, EXIF_DATETIME_FORMAT) {
        Ok(dt) => dt.format(NORMALIZED_DATETIME_FORMAT).to_string(),
        Err(_) => raw.to_string(),
    }
}
