//! 写真カタログ（SQLite）
//!
//! レコードの永続化はこのモジュールだけが行う。実ファイルの存在は観測するだけで、
//! 削除・クリアでファイルには触れない（ファイル削除は呼び出し側の責務）。
//! 例外はリネームで、ファイル移動とレコード更新を1つの操作として扱う。

pub mod schema;

use crate::error::{GeoPicError, Result};
use geopic_common::{Coordinates, PhotoRecord};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};

/// 一覧取得の結果
#[derive(Debug, Clone, Default)]
pub struct Listing {
    /// `taken_at` 昇順（NULLが先頭、同値はファイル名順）
    pub records: Vec<PhotoRecord>,
    /// 実ファイルが消えていたため削除したレコード数
    pub pruned: usize,
}

/// リネーム/撮影日時変更の結果
#[derive(Debug, Clone, PartialEq)]
pub enum RenameOutcome {
    /// 適用済み（`filename` は変更後の名前）
    Applied { filename: String },
    /// 対象レコードなし（何もしない）
    NotFound,
    /// 変更先に既にファイル/レコードがある（何もしない）
    DestinationExists(PathBuf),
    /// 変更元の実ファイルがない（何もしない）
    SourceMissing(PathBuf),
}

/// ファイル移動の取り消し情報
struct StagedMove {
    from: PathBuf,
    to: PathBuf,
}

impl StagedMove {
    fn stage(from: PathBuf, to: PathBuf) -> Result<Self> {
        std::fs::rename(&from, &to)?;
        Ok(Self { from, to })
    }

    fn undo(&self) {
        if let Err(e) = std::fs::rename(&self.to, &self.from) {
            log::error!(
                "リネームの取り消しに失敗: {} -> {}: {}",
                self.to.display(),
                self.from.display(),
                e
            );
        }
    }
}

/// カタログのハンドル
///
/// プロセス起動時に1度だけ開き、終了まで保持する。
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    /// DBファイルを開く（なければ作成）
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        log::debug!("カタログDB: {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// ファイル名をキーに挿入または全項目上書き
    pub fn upsert(&self, record: &PhotoRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO photos (filename, path, lat, lng, taken_at) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(filename) DO UPDATE SET
                path = excluded.path,
                lat = excluded.lat,
                lng = excluded.lng,
                taken_at = excluded.taken_at",
            params![
                record.filename,
                record.storage_path,
                record.latitude(),
                record.longitude(),
                record.taken_at,
            ],
        )?;
        Ok(())
    }

    /// 一覧を取得する
    ///
    /// 取得前に実ファイルのないレコードを削除するため、読み取り専用ではない。
    pub fn list(&self, only_with_coordinates: bool) -> Result<Listing> {
        let pruned = self.prune_missing()?;

        let sql = if only_with_coordinates {
            "SELECT filename, path, lat, lng, taken_at FROM photos
             WHERE lat IS NOT NULL AND lng IS NOT NULL
             ORDER BY taken_at, filename"
        } else {
            "SELECT filename, path, lat, lng, taken_at FROM photos
             ORDER BY taken_at, filename"
        };

        let mut stmt = self.conn.prepare(sql)?;
        let records = stmt
            .query_map([], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Listing { records, pruned })
    }

    /// 実ファイルが存在しないレコードを削除し、件数を返す
    pub fn prune_missing(&self) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;

        let missing: Vec<String> = {
            let mut stmt = tx.prepare("SELECT filename, path FROM photos")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut missing = Vec::new();
            for row in rows {
                let (filename, path) = row?;
                if !path.is_empty() && !Path::new(&path).is_file() {
                    missing.push(filename);
                }
            }
            missing
        };

        for filename in &missing {
            tx.execute("DELETE FROM photos WHERE filename = ?1", [filename])?;
        }
        tx.commit()?;

        if !missing.is_empty() {
            log::info!("実ファイルのないレコードを{}件削除しました", missing.len());
        }
        Ok(missing.len())
    }

    pub fn get(&self, filename: &str) -> Result<Option<PhotoRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT filename, path, lat, lng, taken_at FROM photos WHERE filename = ?1",
                [filename],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// 座標を設定（手動ピン留め）
    ///
    /// 該当レコードがなければ何もせず `false`。
    pub fn update_coordinates(&self, filename: &str, lat: f64, lng: f64) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE photos SET lat = ?1, lng = ?2 WHERE filename = ?3",
            params![lat, lng, filename],
        )?;
        Ok(changed > 0)
    }

    /// ファイル名変更と撮影日時変更
    ///
    /// 1. 現在の保存先を取得
    /// 2. 変更先にファイルがあれば拒否
    /// 3. ファイルを移動
    /// 4. filename と path を更新
    /// 5. 変更後の名前で taken_at を更新
    ///
    /// DB更新はすべて1トランザクション内で行い、コミットに失敗した場合は
    /// ファイル移動も元に戻す。
    pub fn rename_and_or_retime(
        &mut self,
        filename: &str,
        new_filename: Option<&str>,
        taken_at: Option<&str>,
    ) -> Result<RenameOutcome> {
        // ファイル移動より前に書き込みロックを取る
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current_path: Option<String> = tx
            .query_row(
                "SELECT path FROM photos WHERE filename = ?1",
                [filename],
                |row| row.get(0),
            )
            .optional()?;
        let Some(current_path) = current_path else {
            return Ok(RenameOutcome::NotFound);
        };

        let rename = match new_filename.filter(|name| *name != filename) {
            Some(new_name) => {
                validate_filename(new_name)?;

                let old_path = PathBuf::from(&current_path);
                let new_path = old_path
                    .parent()
                    .map(|dir| dir.join(new_name))
                    .unwrap_or_else(|| PathBuf::from(new_name));

                if new_path.exists() || filename_taken(&tx, new_name)? {
                    return Ok(RenameOutcome::DestinationExists(new_path));
                }
                if !old_path.is_file() {
                    return Ok(RenameOutcome::SourceMissing(old_path));
                }
                Some((new_name, StagedMove::stage(old_path, new_path)?))
            }
            None => None,
        };

        let target = rename.as_ref().map(|(name, _)| *name).unwrap_or(filename);
        let committed = commit_changes(
            tx,
            filename,
            rename.as_ref().map(|(name, staged)| (*name, staged.to.as_path())),
            taken_at,
        );

        if let Err(e) = committed {
            if let Some((_, staged)) = &rename {
                staged.undo();
            }
            return Err(e);
        }

        Ok(RenameOutcome::Applied {
            filename: target.to_string(),
        })
    }

    /// レコードのみ削除（ファイルはそのまま）。該当なしは `false`。
    pub fn delete(&self, filename: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM photos WHERE filename = ?1", [filename])?;
        Ok(changed > 0)
    }

    /// 全レコード削除（ファイルはそのまま）。削除件数を返す。
    pub fn clear(&self) -> Result<usize> {
        let changed = self.conn.execute("DELETE FROM photos", [])?;
        Ok(changed)
    }
}

fn commit_changes(
    tx: Transaction<'_>,
    filename: &str,
    rename: Option<(&str, &Path)>,
    taken_at: Option<&str>,
) -> Result<()> {
    let mut target = filename;

    if let Some((new_name, new_path)) = rename {
        tx.execute(
            "UPDATE photos SET filename = ?1, path = ?2 WHERE filename = ?3",
            params![new_name, new_path.to_string_lossy(), filename],
        )?;
        target = new_name;
    }

    if let Some(taken_at) = taken_at {
        tx.execute(
            "UPDATE photos SET taken_at = ?1 WHERE filename = ?2",
            params![taken_at, target],
        )?;
    }

    tx.commit()?;
    Ok(())
}

fn filename_taken(tx: &Transaction<'_>, filename: &str) -> Result<bool> {
    let exists: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM photos WHERE filename = ?1)",
        [filename],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// 変更後のファイル名はディレクトリ成分を含まない単一の名前に限る
/// ディレクトリ成分を含まない単純なファイル名か
pub fn is_plain_filename(name: &str) -> bool {
    let is_basename = Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
    !name.is_empty() && is_basename && !name.contains(['/', '\\'])
}

fn validate_filename(name: &str) -> Result<()> {
    if !is_plain_filename(name) {
        return Err(GeoPicError::InvalidFilename(name.to_string()));
    }
    Ok(())
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<PhotoRecord> {
    Ok(PhotoRecord {
        filename: row.get(0)?,
        storage_path: row.get(1)?,
        coordinates: Coordinates::from_parts(row.get(2)?, row.get(3)?),
        taken_at: row.get(4)?,
    })
}
