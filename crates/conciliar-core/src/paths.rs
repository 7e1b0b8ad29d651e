//! Dynamic per-company folder resolution.
//!
//! Invoice XMLs live under `base/<year>/<month>` where year and month come
//! from the current processing period (month without zero padding, matching
//! how the folders are created). Resolution only reports; it never creates
//! directories, and a missing folder is a skip for that company, not an
//! error.

use std::path::{Path, PathBuf};

use crate::dates::Period;

/// Outcome of resolving one company's dynamic XML folder.
#[derive(Debug, Clone)]
pub struct DynamicPath {
    pub base_path: PathBuf,
    pub dynamic_path: PathBuf,
    pub exists: bool,
    pub message: String,
}

/// Build the dynamic path for `period` without touching the filesystem.
pub fn build_dynamic_path(base: &Path, period: Period) -> PathBuf {
    base.join(period.year.to_string()).join(period.month.to_string())
}

/// Resolve a company base folder to its current-period folder and report
/// whether it exists.
pub fn resolve(base: &Path, period: Period) -> DynamicPath {
    let dynamic_path = build_dynamic_path(base, period);
    let exists = dynamic_path.is_dir();

    let message = if exists {
        "current period folder found".to_string()
    } else {
        format!("folder {period} does not exist")
    };

    DynamicPath {
        base_path: base.to_path_buf(),
        dynamic_path,
        exists,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn period(y: i32, m: u32) -> Period {
        Period::of(NaiveDate::from_ymd_opt(y, m, 15).unwrap())
    }

    #[test]
    fn joins_year_and_month_without_padding() {
        let path = build_dynamic_path(Path::new("/data/3101263133"), period(2025, 7));
        assert!(path.ends_with("2025/7"));
    }

    #[test]
    fn reports_missing_folder_without_creating_it() {
        let tmp = tempfile::tempdir().unwrap();
        let resolved = resolve(tmp.path(), period(2025, 7));

        assert!(!resolved.exists);
        assert!(!resolved.dynamic_path.exists());
        assert!(resolved.message.contains("7/2025"));
    }

    #[test]
    fn reports_existing_folder() {
        let tmp = tempfile::tempdir().unwrap();
        let dynamic = tmp.path().join("2025").join("7");
        std::fs::create_dir_all(&dynamic).unwrap();

        let resolved = resolve(tmp.path(), period(2025, 7));
        assert!(resolved.exists);
        assert_eq!(resolved.dynamic_path, dynamic);
    }
}
