use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeoPicError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("対応していないファイル形式です: {0}")]
    UnsupportedFile(String),

    #[error("ファイル名が不正です: {0}")]
    InvalidFilename(String),

    #[error("ジオフェンスが不正です: {0}")]
    InvalidGeofence(String),

    #[error("エクスポート対象の写真がありません")]
    NothingToExport,

    #[error("データベースエラー: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("ZIP生成エラー: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] geopic_common::Error),
}

pub type Result<T> = std::result::Result<T, GeoPicError>;
