use crate::error::AppError;
use std::fs::{self, FileTimes, OpenOptions};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif"];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Recursively collects image files under `dir`, in file-name order per directory.
///
/// Entries that cannot be read are logged and skipped.
pub fn find_image_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    if !dir.is_dir() {
        return Err(format!("Path is not a directory: {}", dir.display()).into());
    }

    let mut images = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                continue;
            }
        };

        // Follows symlinks so linked images are picked up.
        if !entry.path().is_file() {
            continue;
        }

        if is_image_file(entry.path()) {
            images.push(entry.into_path());
        }
    }

    Ok(images)
}

/// Labels become directory names, so each must be one plain path component.
pub fn validate_label(label: &str) -> Result<(), AppError> {
    let mut components = Path::new(label).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name.to_str() == Some(label) => Ok(()),
        _ => Err(format!("Class label cannot be used as a folder name: '{}'", label).into()),
    }
}

/// Wipes `output_dir` and recreates it with one empty subfolder per label.
pub fn prepare_output_dir(output_dir: &Path, labels: &[String]) -> Result<(), AppError> {
    for label in labels {
        validate_label(label)?;
    }

    if output_dir.exists() {
        fs::remove_dir_all(output_dir).map_err(|e| AppError {
            message: format!("Failed to remove {}: {}", output_dir.display(), e),
        })?;
    }

    fs::create_dir_all(output_dir).map_err(|e| AppError {
        message: format!("Failed to create {}: {}", output_dir.display(), e),
    })?;

    for label in labels {
        let class_dir = output_dir.join(label);
        fs::create_dir_all(&class_dir).map_err(|e| AppError {
            message: format!("Failed to create {}: {}", class_dir.display(), e),
        })?;
    }

    Ok(())
}

/// Copies contents, modified and accessed times, and permissions.
///
/// On failure nothing is left at `dest`.
pub fn copy_preserving_metadata(src: &Path, dest: &Path) -> Result<(), AppError> {
    fs::copy(src, dest).map_err(|e| AppError {
        message: format!("Failed to copy {} to {}: {}", src.display(), dest.display(), e),
    })?;

    if let Err(e) = copy_metadata(src, dest) {
        let _ = fs::remove_file(dest);
        return Err(AppError {
            message: format!("Failed to carry metadata over to {}: {}", dest.display(), e),
        });
    }

    Ok(())
}

fn copy_metadata(src: &Path, dest: &Path) -> Result<(), AppError> {
    let meta = fs::metadata(src)?;
    let mut times = FileTimes::new();
    if let Ok(modified) = meta.modified() {
        times = times.set_modified(modified);
    }
    if let Ok(accessed) = meta.accessed() {
        times = times.set_accessed(accessed);
    }

    // fs::copy carried over the source permissions; a read-only copy can't be
    // opened for writing, so unlock it until the times are set.
    let mut writable = meta.permissions();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        writable.set_mode(writable.mode() | 0o200);
    }
    #[cfg(not(unix))]
    writable.set_readonly(false);
    fs::set_permissions(dest, writable)?;

    let file = OpenOptions::new().write(true).open(dest)?;
    file.set_times(times)?;
    drop(file);

    fs::set_permissions(dest, meta.permissions())?;
    Ok(())
}
