use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, info};

use crate::error::Result;
use crate::models::LogFileInfo;

const LOG_PREFIX: &str = "eqlog_";
const LOG_EXTENSION: &str = ".txt";

/// `eqlog_*.txt` files in `dir` modified within `max_age` of `now`, newest first
pub fn list_recent_logs(dir: &Path, max_age: Duration, now: SystemTime) -> Result<Vec<LogFileInfo>> {
    let mut logs: Vec<(SystemTime, LogFileInfo)> = Vec::new();

    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) if name.starts_with(LOG_PREFIX) && name.ends_with(LOG_EXTENSION) => {
                name.to_string()
            }
            _ => continue,
        };

        // Follows symlinks, like the is_file check above
        let (metadata, modified) = match std::fs::metadata(&path).and_then(|m| {
            let modified = m.modified()?;
            Ok((m, modified))
        }) {
            Ok(v) => v,
            Err(e) => {
                debug!("Skipping {} (metadata unavailable: {})", filename, e);
                continue;
            }
        };
        // Future mtimes count as age zero
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age > max_age {
            debug!("Skipping {} (last modified {}s ago)", filename, age.as_secs());
            continue;
        }

        let size_bytes = metadata.len();
        logs.push((
            modified,
            LogFileInfo {
                filename,
                path,
                size_bytes,
                size_display: format_size(size_bytes),
                modified: modified.into(),
            },
        ));
    }

    logs.sort_by(|a, b| b.0.cmp(&a.0));
    info!("Found {} recent log(s) in {}", logs.len(), dir.display());

    Ok(logs.into_iter().map(|(_, info)| info).collect())
}

/// Read a whole log into memory; `None` if the file does not exist
pub fn load_log(path: &Path) -> Result<Option<String>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Character token of `eqlog_<Character>_<Server>.txt`
pub fn character_name(filename: &str) -> Option<String> {
    let stem = filename.strip_suffix(LOG_EXTENSION).unwrap_or(filename);
    stem.split('_')
        .nth(1)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Write `excluded_lines_<character>.log` into `dir`, replacing any earlier
/// copy. Nothing is written when there are no lines.
pub fn write_excluded_lines(dir: &Path, character: &str, lines: &[String]) -> Result<Option<PathBuf>> {
    if lines.is_empty() {
        return Ok(None);
    }

    let path = dir.join(format!("excluded_lines_{}.log", character));
    let mut contents = lines.join("\n");
    contents.push('\n');
    std::fs::write(&path, contents)?;
    info!("Wrote {} excluded line(s) to {}", lines.len(), path.display());

    Ok(Some(path))
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    const DAY: Duration = Duration::from_secs(86_400);

    fn touch(dir: &Path, name: &str, modified: SystemTime) {
        let file = File::create(dir.join(name)).unwrap();
        file.set_modified(modified).unwrap();
    }

    #[test]
    fn lists_recent_logs_newest_first() {
        let tmp = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        touch(tmp.path(), "eqlog_Old_test.txt", now - 3 * DAY);
        touch(tmp.path(), "eqlog_New_test.txt", now - DAY);
        touch(tmp.path(), "eqlog_Stale_test.txt", now - 8 * DAY);
        touch(tmp.path(), "notes.txt", now);
        touch(tmp.path(), "eqlog_Bob_test.log", now);
        std::fs::create_dir(tmp.path().join("eqlog_dir.txt")).unwrap();

        let logs = list_recent_logs(tmp.path(), 7 * DAY, now).unwrap();
        let names: Vec<&str> = logs.iter().map(|l| l.filename.as_str()).collect();
        assert_eq!(names, vec!["eqlog_New_test.txt", "eqlog_Old_test.txt"]);
        assert_eq!(logs[0].path, tmp.path().join("eqlog_New_test.txt"));
        assert_eq!(logs[0].size_display, "0 B");
    }

    #[test]
    fn recency_uses_supplied_clock() {
        let tmp = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        touch(tmp.path(), "eqlog_Bob_test.txt", now);

        assert_eq!(list_recent_logs(tmp.path(), 7 * DAY, now).unwrap().len(), 1);
        assert!(list_recent_logs(tmp.path(), 7 * DAY, now + 8 * DAY).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_log_uses_target_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        let target = tmp.path().join("archive.dat");
        std::fs::write(&target, vec![b'x'; 5000]).unwrap();
        File::options()
            .write(true)
            .open(&target)
            .unwrap()
            .set_modified(now - 30 * DAY)
            .unwrap();
        std::os::unix::fs::symlink(&target, tmp.path().join("eqlog_Bob_x.txt")).unwrap();

        assert!(list_recent_logs(tmp.path(), 7 * DAY, now).unwrap().is_empty());

        let logs = list_recent_logs(tmp.path(), 60 * DAY, now).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].filename, "eqlog_Bob_x.txt");
        assert_eq!(logs[0].size_bytes, 5000);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        touch(tmp.path(), "eqlog_Ann_x.txt", now);
        std::os::unix::fs::symlink(tmp.path().join("gone.txt"), tmp.path().join("eqlog_Ghost_x.txt")).unwrap();

        let logs = list_recent_logs(tmp.path(), 7 * DAY, now).unwrap();
        let names: Vec<&str> = logs.iter().map(|l| l.filename.as_str()).collect();
        assert_eq!(names, vec!["eqlog_Ann_x.txt"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        assert!(list_recent_logs(&missing, DAY, SystemTime::now()).is_err());
    }

    #[test]
    fn load_log_reports_missing_file_as_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load_log(&tmp.path().join("eqlog_Nobody_x.txt")).unwrap().is_none());

        let path = tmp.path().join("eqlog_Bob_x.txt");
        std::fs::write(&path, "line one\nline two\n").unwrap();
        assert_eq!(load_log(&path).unwrap().as_deref(), Some("line one\nline two\n"));
    }

    #[test]
    fn character_name_is_second_token() {
        assert_eq!(character_name("eqlog_Bob_povar.txt").as_deref(), Some("Bob"));
        assert_eq!(character_name("eqlog_Alice.txt").as_deref(), Some("Alice"));
        assert_eq!(character_name("eqlog.txt"), None);
    }

    #[test]
    fn excluded_lines_overwrite_and_skip_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(write_excluded_lines(tmp.path(), "Bob", &[]).unwrap().is_none());
        assert!(!tmp.path().join("excluded_lines_Bob.log").exists());

        let first = vec!["a".to_string(), "b".to_string()];
        write_excluded_lines(tmp.path(), "Bob", &first).unwrap();
        let path = write_excluded_lines(tmp.path(), "Bob", &["c".to_string()])
            .unwrap()
            .unwrap();
        assert_eq!(path, tmp.path().join("excluded_lines_Bob.log"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "c\n");
    }

    #[test]
    fn formats_sizes() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1_048_576), "5.0 MB");
        assert_eq!(format_size(3 * 1_073_741_824), "3.0 GB");
    }
}
