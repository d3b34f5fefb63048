use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "geopic")]
#[command(about = "写真の位置情報カタログ・KMZエクスポートツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// カタログDBのパス（設定ファイルより優先）
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// アップロードフォルダ（設定ファイルより優先）
    #[arg(long, global = true)]
    pub uploads: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 写真を取り込む（フォルダは直下のみ）
    Ingest {
        /// 写真ファイルまたはフォルダ
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// カタログを一覧表示（実ファイルのない写真は自動削除）
    List {
        /// 位置情報のある写真のみ
        #[arg(long)]
        gps: bool,

        /// JSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 写真に座標を設定
    Associate {
        filename: String,

        /// 緯度（10進度）
        #[arg(allow_negative_numbers = true)]
        lat: f64,

        /// 経度（10進度）
        #[arg(allow_negative_numbers = true)]
        lng: f64,
    },

    /// ファイル名・撮影日時を変更
    Edit {
        filename: String,

        /// 新しいファイル名
        #[arg(long)]
        rename: Option<String>,

        /// 撮影日時（例: 2024-03-15 10:22:05）
        #[arg(long)]
        taken_at: Option<String>,
    },

    /// 写真をカタログとアップロードフォルダから削除
    Delete { filename: String },

    /// すべての写真を削除
    Clear {
        /// 確認を省略
        #[arg(short, long)]
        yes: bool,
    },

    /// 実ファイルのないレコードを削除
    Prune,

    /// KMZを出力
    Export {
        /// 出力ファイル/ディレクトリ
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// ジオフェンス（GeoJSON Polygon）ファイル
        #[arg(short, long)]
        geofence: Option<PathBuf>,
    },

    /// 設定を表示/編集
    Config {
        /// カタログDBのパスを設定
        #[arg(long)]
        set_db: Option<PathBuf>,

        /// アップロードフォルダを設定
        #[arg(long)]
        set_uploads: Option<PathBuf>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
