//! Scheduled and one-shot backup runs
//!
//! A backup run archives the configured directory, encrypts it and hands
//! the encrypted file to a delivery step. The file's lifetime is scoped:
//! [`EncryptedBackup`] removes it on drop, in success and failure paths
//! alike, unless the caller explicitly keeps it. The daily loop mirrors a
//! cron trigger: sleep until the configured local time, run, report, repeat.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime};
use tracing::{error, info, warn};

use crate::archive::{archive_and_encrypt_blocking, ArchiveEncryptor, Archiver, ZipArchiver};
use crate::config::{Config, ScheduleConfig};
use crate::crypto::Cipher;
use crate::error::Result;

/// Build a backup filename: `{label}-{YYYYmmdd-HHMMSS}.zip.enc`
pub fn backup_file_name(label: &str, now: NaiveDateTime) -> String {
    format!("{}-{}.zip.enc", label, now.format("%Y%m%d-%H%M%S"))
}

/// Time until the next occurrence of the scheduled local time.
pub fn next_run_delay(schedule: ScheduleConfig, now: NaiveDateTime) -> Duration {
    let target_time = NaiveTime::from_hms_opt(schedule.hour.min(23), schedule.minute.min(59), 0)
        .unwrap_or(NaiveTime::MIN);

    let mut target = now.date().and_time(target_time);
    if target <= now {
        target += chrono::Duration::days(1);
    }

    (target - now).to_std().unwrap_or(Duration::from_secs(60))
}

/// An encrypted backup file with a scoped lifetime.
///
/// Dropping the guard removes the file; call [`keep`](Self::keep) to detach
/// it (e.g. when the CLI user asked for the file itself). Removal failures
/// are logged, never escalated.
#[derive(Debug)]
pub struct EncryptedBackup {
    path: PathBuf,
    iterations: u32,
    keep: bool,
}

impl EncryptedBackup {
    /// Path of the encrypted file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Iteration count the packet was encrypted with. In random mode this
    /// is the only copy of that information.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Detach the file from the guard; it will not be removed on drop.
    pub fn keep(mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }
}

impl Drop for EncryptedBackup {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), "Failed to remove backup file: {}", e);
            }
        }
    }
}

/// One configured backup: source directory, destination naming, schedule.
pub struct BackupJob<A: Archiver = ZipArchiver> {
    encryptor: Arc<ArchiveEncryptor<A>>,
    source_dir: PathBuf,
    output_dir: PathBuf,
    label: String,
    schedule: ScheduleConfig,
}

impl BackupJob<ZipArchiver> {
    /// Build a job from configuration, using the zip archiver.
    pub fn from_config(config: &Config) -> Self {
        BackupJob {
            encryptor: Arc::new(ArchiveEncryptor::new(Cipher::new(config.secret()))),
            source_dir: config.source_dir.clone(),
            output_dir: config.output_dir.clone(),
            label: config.label.clone(),
            schedule: config.schedule,
        }
    }
}

impl<A: Archiver + Send + Sync + 'static> BackupJob<A> {
    /// The encryptor backing this job.
    pub fn encryptor(&self) -> &ArchiveEncryptor<A> {
        &self.encryptor
    }

    /// Run one backup on the blocking pool and return the scoped result.
    pub async fn run_once(&self) -> Result<EncryptedBackup> {
        let file_name = backup_file_name(&self.label, Local::now().naive_local());
        let dest = self.output_dir.join(file_name);

        info!(
            source = %self.source_dir.display(),
            dest = %dest.display(),
            "Starting backup run"
        );

        let (path, iterations) = archive_and_encrypt_blocking(
            self.encryptor.clone(),
            self.source_dir.clone(),
            dest,
            None,
        )
        .await?;

        Ok(EncryptedBackup {
            path,
            iterations,
            keep: false,
        })
    }

    /// Run backups forever at the configured daily time.
    ///
    /// Each run's result is handed to `deliver`, which owns the guard: drop
    /// it once the file has been transmitted and it is removed, or call
    /// [`EncryptedBackup::keep`] to leave it on disk. Errors in a run or
    /// its delivery are logged and the loop continues.
    pub async fn run_daily<F>(&self, mut deliver: F)
    where
        F: FnMut(EncryptedBackup) -> Result<()>,
    {
        loop {
            let delay = next_run_delay(self.schedule, Local::now().naive_local());
            info!(
                hour = self.schedule.hour,
                minute = self.schedule.minute,
                in_secs = delay.as_secs(),
                "Next scheduled backup"
            );
            tokio::time::sleep(delay).await;

            match self.run_once().await {
                Ok(backup) => {
                    if let Err(e) = deliver(backup) {
                        error!("Backup delivery failed: {}", e);
                    }
                }
                Err(e) => error!("Scheduled backup failed: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Secret;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 10)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_backup_file_name_format() {
        let name = backup_file_name("homelab", at(3, 7, 9));
        assert_eq!(name, "homelab-20240510-030709.zip.enc");
    }

    #[test]
    fn test_next_run_later_today() {
        let schedule = ScheduleConfig { hour: 4, minute: 30 };
        let delay = next_run_delay(schedule, at(3, 0, 0));
        assert_eq!(delay, Duration::from_secs(90 * 60));
    }

    #[test]
    fn test_next_run_wraps_to_tomorrow() {
        let schedule = ScheduleConfig { hour: 4, minute: 30 };
        let delay = next_run_delay(schedule, at(5, 0, 0));
        assert_eq!(delay, Duration::from_secs(23 * 3600 + 30 * 60));
    }

    #[test]
    fn test_next_run_exact_time_waits_full_day() {
        let schedule = ScheduleConfig { hour: 4, minute: 30 };
        let delay = next_run_delay(schedule, at(4, 30, 0));
        assert_eq!(delay, Duration::from_secs(24 * 3600));
    }

    #[test]
    fn test_guard_removes_file_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.zip.enc");
        fs::write(&path, b"packet").unwrap();

        let backup = EncryptedBackup {
            path: path.clone(),
            iterations: 42,
            keep: false,
        };
        assert_eq!(backup.iterations(), 42);
        drop(backup);
        assert!(!path.exists());
    }

    #[test]
    fn test_keep_detaches_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.zip.enc");
        fs::write(&path, b"packet").unwrap();

        let backup = EncryptedBackup {
            path: path.clone(),
            iterations: 42,
            keep: false,
        };
        let kept = backup.keep();
        assert_eq!(kept, path);
        assert!(path.exists());
    }

    #[test]
    fn test_guard_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let backup = EncryptedBackup {
            path: dir.path().join("never-written.enc"),
            iterations: 42,
            keep: false,
        };
        drop(backup); // must not panic
    }

    #[tokio::test]
    async fn test_run_once_produces_decryptable_backup() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("data");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("file.txt"), b"contents").unwrap();

        let config = Config {
            password: "hunter2".to_string(),
            iterations_password: "second".to_string(),
            source_dir: source,
            output_dir: dir.path().to_path_buf(),
            label: "unittest".to_string(),
            ..Config::default()
        };
        let job = BackupJob::from_config(&config);

        let backup = job.run_once().await.unwrap();
        assert!(backup.path().exists());
        let name = backup.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("unittest-") && name.ends_with(".zip.enc"));

        let packet = fs::read(backup.path()).unwrap();
        assert!(job
            .encryptor()
            .cipher()
            .decrypt(&packet, backup.iterations())
            .is_ok());

        let path = backup.path().to_path_buf();
        drop(backup);
        assert!(!path.exists());
    }

    #[test]
    fn test_unconfigured_job_unusable() {
        let config = Config::default();
        let job = BackupJob::from_config(&config);
        assert!(!Secret::new(config.password, config.iterations_password).is_configured());
        // The cipher inside rejects work without a password
        assert!(job.encryptor().cipher().encrypt(b"x", None).is_err());
    }
}
