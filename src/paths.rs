use std::path::PathBuf;
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the debug crop directory: `<exe_dir>/cropped_images/`
///
/// Crops are written here instead of a temporary directory when debug mode
/// is on, and left behind for inspection.
pub fn get_cropped_dir() -> PathBuf {
    get_exe_dir().join("cropped_images")
}
