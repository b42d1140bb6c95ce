//! スキャンの排他制御（同一出力ファイルへの同時書き込み防止）
//!
//! 同じインベントリファイルに対して2つのスキャンが同時に走ると、
//! 後から保存した側が先の結果を上書きしてしまう。出力ファイルの隣に
//! `<output>.lock` を作成して1プロセスのみが書き込めるようにする。
//!
//! - クロスプラットフォームファイルロック（fs2）
//! - ロックファイルにJSON形式でPID・開始時刻・出力パスを記録
//! - 残留ロックの自動検出と解除（PID検証）
//! - Dropトレイトでの自動解除

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// ロックファイルに保存されるスキャン情報
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LockInfo {
    /// スキャンプロセスのPID
    pub pid: u32,
    /// スキャン開始時刻（UTC）
    pub started_at: DateTime<Utc>,
    /// 対象のインベントリファイル
    pub output: PathBuf,
}

/// ロック操作に関するエラー型
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// 同じ出力ファイルに対して既にスキャンが実行中
    #[error("Scan already running for {} (PID: {pid}, started: {started_at})", .output.display())]
    AlreadyRunning {
        /// 対象のインベントリファイル
        output: PathBuf,
        /// 既存プロセスのPID
        pid: u32,
        /// 開始時刻
        started_at: DateTime<Utc>,
    },

    /// ロック取得に失敗
    #[error("Failed to acquire scan lock: {0}")]
    AcquireFailed(#[source] std::io::Error),

    /// ロック解除に失敗
    #[error("Failed to release scan lock: {0}")]
    ReleaseFailed(#[source] std::io::Error),

    /// ロックファイルが破損
    #[error("Scan lock file corrupted: {0}")]
    Corrupted(String),

    /// ロックディレクトリの作成に失敗
    #[error("Failed to create lock directory: {0}")]
    DirectoryCreationFailed(#[source] std::io::Error),
}

/// 出力ファイルに対応するロックファイルパス
///
/// 例: `data/live_servers.json` → `data/live_servers.json.lock`
pub fn lock_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    output.with_file_name(name)
}

/// 指定PIDのプロセスが存在するか確認
pub fn is_process_running(pid: u32) -> bool {
    use sysinfo::{Pid, System};

    let mut system = System::new();
    system.refresh_processes();
    system.process(Pid::from_u32(pid)).is_some()
}

/// ロックファイルからロック情報を読み取る
///
/// - `Ok(None)`: ロックファイルが存在しない
/// - `Err(LockError::Corrupted)`: 読み取れない、またはJSONが不正
pub fn read_lock_info(path: &Path) -> Result<Option<LockInfo>, LockError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| LockError::Corrupted(format!("Failed to read lock file: {}", e)))?;
    let info = serde_json::from_str(&content)
        .map_err(|e| LockError::Corrupted(format!("Invalid JSON in lock file: {}", e)))?;

    Ok(Some(info))
}

/// スキャンのファイルロック
///
/// スコープを抜けるか `release()` を呼ぶとロックが解除され、ロックファイルが削除される。
pub struct ScanLock {
    lock_file: Option<File>,
    lock_path: PathBuf,
    info: LockInfo,
}

impl std::fmt::Debug for ScanLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanLock")
            .field("lock_path", &self.lock_path)
            .field("info", &self.info)
            .finish()
    }
}

/// ロックファイルの置き換えを検出したときの再試行回数
const ACQUIRE_ATTEMPTS: usize = 3;

impl ScanLock {
    /// 出力ファイルのロックを取得する
    ///
    /// 既存のロックファイルは削除せず、開いてからファイルロックを試みる。
    /// ロックを取れた場合のみ内容を確認し、記録されたPIDのプロセスが存在しない
    /// 残留ロックや破損したロックファイルはその場で上書きする。
    /// 他のハンドルがロック中なら内容が空でも置き換えない。
    pub fn acquire(output: &Path) -> Result<Self, LockError> {
        let path = lock_path(output);

        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(LockError::DirectoryCreationFailed)?;
        }

        for _ in 0..ACQUIRE_ATTEMPTS {
            let mut file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)
                .map_err(LockError::AcquireFailed)?;

            // 非ブロッキング（競合時は他プロセスが保持中）
            if let Err(e) = file.try_lock_exclusive() {
                return Err(held_error(&path, e));
            }

            // ロック待ちの間に解放側が削除した場合は開き直す
            if !still_linked(&file, &path) {
                continue;
            }

            let mut content = String::new();
            file.read_to_string(&mut content)
                .map_err(LockError::AcquireFailed)?;
            if !content.trim().is_empty() {
                match serde_json::from_str::<LockInfo>(&content) {
                    Ok(existing)
                        if existing.pid != std::process::id()
                            && is_process_running(existing.pid) =>
                    {
                        let _ = file.unlock();
                        return Err(LockError::AlreadyRunning {
                            output: existing.output,
                            pid: existing.pid,
                            started_at: existing.started_at,
                        });
                    }
                    Ok(existing) => warn!(
                        pid = existing.pid,
                        "Stale scan lock detected (process not running), taking over"
                    ),
                    Err(e) => warn!(error = %e, "Replacing corrupted scan lock file"),
                }
            }

            let info = LockInfo {
                pid: std::process::id(),
                started_at: Utc::now(),
                output: output.to_path_buf(),
            };
            write_info(&mut file, &info).map_err(LockError::AcquireFailed)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let permissions = std::fs::Permissions::from_mode(0o600);
                file.set_permissions(permissions)
                    .map_err(LockError::AcquireFailed)?;
            }

            debug!(path = %path.display(), pid = info.pid, "Scan lock acquired");

            return Ok(Self {
                lock_file: Some(file),
                lock_path: path,
                info,
            });
        }

        Err(LockError::AcquireFailed(std::io::Error::other(
            "Scan lock file kept changing while acquiring",
        )))
    }

    /// ロック情報
    pub fn info(&self) -> &LockInfo {
        &self.info
    }

    /// ロックファイルのパス
    pub fn path(&self) -> &Path {
        &self.lock_path
    }

    /// ロックを明示的に解除する
    pub fn release(mut self) -> Result<(), LockError> {
        self.release_internal()
    }

    fn release_internal(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.lock_file.take() {
            // ロック保持中に削除し、解放後に別プロセスの新しいロックファイルを消さない
            #[cfg(unix)]
            {
                if still_linked(&file, &self.lock_path) {
                    std::fs::remove_file(&self.lock_path).map_err(LockError::ReleaseFailed)?;
                }
                file.unlock().map_err(LockError::ReleaseFailed)?;
            }

            #[cfg(not(unix))]
            {
                file.unlock().map_err(LockError::ReleaseFailed)?;
                drop(file);
                if self.lock_path.exists() {
                    std::fs::remove_file(&self.lock_path).map_err(LockError::ReleaseFailed)?;
                }
            }

            debug!(path = %self.lock_path.display(), "Scan lock released");
        }
        Ok(())
    }
}

/// ロック取得に失敗したときのエラー
///
/// 保持側がまだ内容を書いていない場合は `AlreadyRunning` を組み立てられない。
fn held_error(path: &Path, e: std::io::Error) -> LockError {
    if e.kind() != std::io::ErrorKind::WouldBlock {
        return LockError::AcquireFailed(e);
    }
    match read_lock_info(path) {
        Ok(Some(info)) => LockError::AlreadyRunning {
            output: info.output,
            pid: info.pid,
            started_at: info.started_at,
        },
        _ => LockError::AcquireFailed(std::io::Error::new(
            std::io::ErrorKind::WouldBlock,
            "Scan lock is held by another process",
        )),
    }
}

/// 開いているファイルがまだ `path` に存在するか
#[cfg(unix)]
fn still_linked(file: &File, path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (file.metadata(), std::fs::metadata(path)) {
        (Ok(open), Ok(linked)) => open.dev() == linked.dev() && open.ino() == linked.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn still_linked(_file: &File, path: &Path) -> bool {
    path.exists()
}

fn write_info(file: &mut File, info: &LockInfo) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(info).map_err(std::io::Error::other)?;
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(json.as_bytes())?;
    file.flush()
}

impl Drop for ScanLock {
    fn drop(&mut self) {
        if let Err(e) = self.release_internal() {
            warn!("Failed to release scan lock on drop: {}", e);
        }
    }
}
