use anyhow::Context;
use clap::Parser;
use dialoguer::Confirm;
use geopic::catalog::{Catalog, RenameOutcome};
use geopic::cli::{Cli, Commands};
use geopic::config::Config;
use geopic::error::GeoPicError;
use geopic::storage::{self, IngestOutcome};
use geopic::{export, scanner};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = Config::load()?;

    let db_path = config.database_path(cli.db.as_deref());
    let upload_dir = config.upload_dir(cli.uploads.as_deref());
    let open_catalog = || {
        Catalog::open(&db_path)
            .with_context(|| format!("カタログを開けません: {}", db_path.display()))
    };

    match cli.command {
        Commands::Ingest { paths } => {
            let catalog = open_catalog()?;
            println!("📸 geopic - 写真取り込み\n");

            let scan = scanner::scan_sources(&paths)?;
            for rejected in &scan.rejected {
                println!("- 対応していない形式: {}", rejected.display());
            }

            let bar = ProgressBar::new(scan.images.len() as u64);
            bar.set_style(
                ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );

            let mut ingested = 0usize;
            let mut located = 0usize;
            let mut skipped = Vec::new();
            for path in &scan.images {
                bar.set_message(path.display().to_string());
                match storage::ingest_file(&catalog, path, &upload_dir) {
                    Ok(IngestOutcome::Ingested(record)) => {
                        ingested += 1;
                        if record.has_coordinates() {
                            located += 1;
                        }
                    }
                    Ok(IngestOutcome::Skipped(name)) => skipped.push(name),
                    Err(GeoPicError::UnsupportedFile(name)) => {
                        bar.println(format!("- 対応していないファイル名: {}", name));
                    }
                    Err(e) => return Err(e).with_context(|| format!("取り込み失敗: {}", path.display())),
                }
                bar.inc(1);
            }
            bar.finish_and_clear();

            for name in &skipped {
                println!("- 既に存在するためスキップ: {}", name);
            }
            println!("✔ {}枚を取り込み（位置情報あり: {}枚）", ingested, located);
        }

        Commands::List { gps, json } => {
            let catalog = open_catalog()?;
            let listing = catalog.list(gps)?;

            if json {
                let body = serde_json::json!({ "photos": listing.records });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                if listing.pruned > 0 {
                    println!("- 実ファイルのない写真を{}件削除しました", listing.pruned);
                }
                for record in &listing.records {
                    let position = record
                        .coordinates
                        .map(|c| format!("{:.6}, {:.6}", c.latitude, c.longitude))
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{}\t{}\t{}",
                        record.taken_at.as_deref().unwrap_or("-"),
                        position,
                        record.filename
                    );
                }
                println!("\n{}件", listing.records.len());
            }
        }

        Commands::Associate { filename, lat, lng } => {
            let catalog = open_catalog()?;
            if catalog.update_coordinates(&filename, lat, lng)? {
                println!("✔ 座標を設定しました: {} ({}, {})", filename, lat, lng);
            } else {
                println!("写真が見つかりません: {}", filename);
            }
        }

        Commands::Edit { filename, rename, taken_at } => {
            let mut catalog = open_catalog()?;
            match catalog.rename_and_or_retime(&filename, rename.as_deref(), taken_at.as_deref())? {
                RenameOutcome::Applied { filename: current } => {
                    println!("✔ 更新しました: {}", current);
                }
                RenameOutcome::NotFound => println!("写真が見つかりません: {}", filename),
                RenameOutcome::DestinationExists(path) => {
                    println!("変更先が既に存在します: {}", path.display());
                }
                RenameOutcome::SourceMissing(path) => {
                    println!("元ファイルが見つかりません: {}", path.display());
                }
            }
        }

        Commands::Delete { filename } => {
            let catalog = open_catalog()?;
            let summary = storage::delete_photo(&catalog, &filename, &upload_dir)?;
            if summary.removed_record || summary.removed_file {
                println!("✔ 削除しました: {}", filename);
            } else {
                println!("写真が見つかりません: {}", filename);
            }
        }

        Commands::Clear { yes } => {
            let confirmed = yes
                || Confirm::new()
                    .with_prompt("すべての写真をカタログとアップロードフォルダから削除しますか？")
                    .default(false)
                    .interact()?;
            if !confirmed {
                println!("中止しました");
                return Ok(());
            }

            let catalog = open_catalog()?;
            let (records, files) = storage::clear_all(&catalog, &upload_dir)?;
            println!("✔ {}件のレコードと{}個のファイルを削除しました", records, files);
        }

        Commands::Prune => {
            let catalog = open_catalog()?;
            let pruned = catalog.prune_missing()?;
            println!("✔ {}件のレコードを削除しました", pruned);
        }

        Commands::Export { output, geofence } => {
            let catalog = open_catalog()?;
            println!("🗺  geopic - KMZエクスポート\n");

            let ring = geofence
                .as_deref()
                .map(export::load_geofence)
                .transpose()?;

            let kmz = match export::export_catalog(&catalog, ring.as_ref()) {
                Ok(kmz) => kmz,
                Err(GeoPicError::NothingToExport) if ring.is_some() => {
                    anyhow::bail!("ジオフェンス内に写真がありません");
                }
                Err(GeoPicError::NothingToExport) => {
                    anyhow::bail!("位置情報のある写真がありません");
                }
                Err(e) => return Err(e.into()),
            };

            let output_dir = output.unwrap_or_else(|| PathBuf::from("."));
            let path = export::write_export(&kmz, &output_dir)?;
            println!("✔ {}件の写真を出力: {}", kmz.placemarks, path.display());
            log::debug!("content-type: {}", export::KMZ_MIME_TYPE);
        }

        Commands::Config { set_db, set_uploads, show } => {
            run_config(config, set_db, set_uploads, show)?;
        }
    }

    Ok(())
}

fn run_config(
    mut config: Config,
    set_db: Option<PathBuf>,
    set_uploads: Option<PathBuf>,
    show: bool,
) -> anyhow::Result<()> {
    let changed = set_db.is_some() || set_uploads.is_some();

    if let Some(path) = set_db {
        config.database_path = Some(path);
    }
    if let Some(path) = set_uploads {
        config.upload_dir = Some(path);
    }
    if changed {
        config.save()?;
        println!("✔ 設定を保存しました: {}", Config::config_path()?.display());
    }

    if show || !changed {
        println!("設定:");
        println!("  カタログDB: {}", config.database_path(None).display());
        println!("  アップロードフォルダ: {}", config.upload_dir(None).display());
    }
    Ok(())
}
