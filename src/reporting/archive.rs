//! Dated report archive: `<root>/<YYYY>/<MM>/<period>_<YYYYmmdd_HHMMSS>.md`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike};
use chrono_tz::Tz;

use super::Period;
use crate::error::ReportError;

/// Write `text` under the year/month folder for `now`. Returns the file path.
pub fn archive_report(
    root: &Path,
    period: Period,
    text: &str,
    now: DateTime<Tz>,
) -> Result<PathBuf, ReportError> {
    let folder = root
        .join(now.year().to_string())
        .join(format!("{:02}", now.month()));
    fs::create_dir_all(&folder).map_err(|e| ReportError::Archive {
        path: folder.clone(),
        reason: e.to_string(),
    })?;

    let path = folder.join(format!("{period}_{}.md", now.format("%Y%m%d_%H%M%S")));
    fs::write(&path, text).map_err(|e| ReportError::Archive {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    tracing::info!(period = %period, path = %path.display(), "Report archived");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn partitions_by_year_and_month() {
        let dir = tempfile::tempdir().unwrap();
        let now = chrono_tz::Asia::Shanghai
            .with_ymd_and_hms(2026, 3, 1, 9, 0, 7)
            .unwrap();

        let path = archive_report(dir.path(), Period::Weekly, "report body", now).unwrap();
        assert_eq!(
            path,
            dir.path().join("2026").join("03").join("weekly_20260301_090007.md")
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "report body");
    }

    #[test]
    fn distinct_periods_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let now = chrono_tz::Asia::Shanghai
            .with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .unwrap();
        let mut paths: Vec<_> = Period::ALL
            .iter()
            .map(|p| archive_report(dir.path(), *p, "x", now).unwrap())
            .collect();
        paths.dedup();
        assert_eq!(paths.len(), 4);
    }
}
