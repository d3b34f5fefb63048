//! GeoPic Common Library
//!
//! CLI・カタログ・エクスポートで共有される型と純粋ロジック

pub mod types;
pub mod codec;
pub mod geofence;
pub mod error;

pub use types::{Coordinates, PhotoRecord};
pub use codec::{decode_capture_time, decode_dms, decode_dms_values, Hemisphere, Rational};
pub use geofence::{filter_records, parse_geofence, point_in_polygon, Ring};
pub use error::{Error, Result};
