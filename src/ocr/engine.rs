use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use tempfile::TempDir;
use thiserror::Error;

/// Failure to turn one crop into text.
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("failed to write crop {path}: {source}")]
    SaveCrop {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Exit {
        program: PathBuf,
        status: ExitStatus,
        stderr: String,
    },
}

/// Turns a cropped image into text.
///
/// `label` names the crop for scratch files and log lines.
pub trait Recognizer {
    fn recognize(&self, crop: &DynamicImage, label: &str) -> Result<String, RecognitionError>;
}

/// Where crops are written before recognition.
///
/// The temporary variant is deleted when dropped, whatever path the run
/// took to get there. The kept variant is the debug directory and is never
/// cleaned up.
#[derive(Debug)]
pub enum ScratchDir {
    Temp(TempDir),
    Kept(PathBuf),
}

impl ScratchDir {
    /// Creates the scratch directory for one process run.
    pub fn create(debug: bool) -> std::io::Result<Self> {
        if debug {
            let dir = crate::paths::get_cropped_dir();
            std::fs::create_dir_all(&dir)?;
            log::info!("Debug mode: keeping crops in {}", dir.display());
            Ok(ScratchDir::Kept(dir))
        } else {
            Ok(ScratchDir::Temp(tempfile::Builder::new().prefix("cropped_images").tempdir()?))
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            ScratchDir::Temp(dir) => dir.path(),
            ScratchDir::Kept(dir) => dir,
        }
    }

    /// Whether crops stay on disk after they were read.
    pub fn keeps_crops(&self) -> bool {
        matches!(self, ScratchDir::Kept(_))
    }
}

/// Runs an external OCR tool as `<program> -i <crop.png>` and reads stdout.
pub struct CommandRecognizer {
    program: PathBuf,
    scratch: ScratchDir,
}

impl CommandRecognizer {
    pub fn new(program: impl Into<PathBuf>, scratch: ScratchDir) -> Self {
        Self {
            program: program.into(),
            scratch,
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }
}

impl CommandRecognizer {
    fn run(&self, crop_path: &Path) -> Result<String, RecognitionError> {
        let output = Command::new(&self.program)
            .arg("-i")
            .arg(crop_path)
            .output()
            .map_err(|source| RecognitionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RecognitionError::Exit {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Recognizer for CommandRecognizer {
    /// Crops are deleted once read unless the scratch directory keeps them.
    fn recognize(&self, crop: &DynamicImage, label: &str) -> Result<String, RecognitionError> {
        let crop_path = self.scratch.path().join(format!("cropped_{}.png", label));
        crop.save(&crop_path)
            .map_err(|source| RecognitionError::SaveCrop {
                path: crop_path.clone(),
                source,
            })?;

        let result = self.run(&crop_path);

        if !self.scratch.keeps_crops() {
            if let Err(e) = std::fs::remove_file(&crop_path) {
                log::debug!("Failed to remove {}: {}", crop_path.display(), e);
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn blank() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::new(4, 4))
    }

    #[test]
    fn test_temp_scratch_removed_on_drop() {
        let scratch = ScratchDir::create(false).unwrap();
        let path = scratch.path().to_path_buf();
        assert!(path.is_dir());
        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let scratch = ScratchDir::create(false).unwrap();
        let recognizer = CommandRecognizer::new("definitely-not-an-ocr-tool-xyz", scratch);

        let err = recognizer.recognize(&blank(), "t_1").unwrap_err();
        assert!(matches!(err, RecognitionError::Spawn { .. }));
        assert!(!recognizer.scratch_dir().join("cropped_t_1.png").exists());
    }

    #[test]
    fn test_kept_scratch_retains_crops() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::Kept(dir.path().to_path_buf());
        assert!(scratch.keeps_crops());
        let recognizer = CommandRecognizer::new("definitely-not-an-ocr-tool-xyz", scratch);

        assert!(recognizer.recognize(&blank(), "t_1").is_err());
        assert!(dir.path().join("cropped_t_1.png").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_stdout_and_exit_status() {
        // `echo` prints its arguments, `false` always fails
        let ok = CommandRecognizer::new("echo", ScratchDir::create(false).unwrap());
        let text = ok.recognize(&blank(), "a_1").unwrap();
        let expected = ok.scratch_dir().join("cropped_a_1.png");
        assert_eq!(text.trim(), format!("-i {}", expected.display()));
        // Scratch stays empty between crops
        assert_eq!(std::fs::read_dir(ok.scratch_dir()).unwrap().count(), 0);

        let bad = CommandRecognizer::new("false", ScratchDir::create(false).unwrap());
        match bad.recognize(&blank(), "a_1").unwrap_err() {
            RecognitionError::Exit { status, .. } => assert!(!status.success()),
            other => panic!("unexpected error: {other}"),
        }
    }
}
