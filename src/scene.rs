//! Per-scene context, threaded explicitly instead of process-wide statics.

use log::warn;
use std::env;
use std::io;
use std::path::{Path, PathBuf};

/// Scene-wide state the engine and bridge need: the scene's name and its
/// working directory. Passed explicitly into bridge construction so multiple
/// scenes can coexist in tests and in the application.
#[derive(Debug, Clone)]
pub struct SceneContext {
    scene_name: Option<String>,
    working_dir: PathBuf,
}

impl SceneContext {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            scene_name: None,
            working_dir: working_dir.into(),
        }
    }

    pub fn with_scene_name(mut self, name: &str) -> Self {
        self.scene_name = Some(name.to_string());
        self
    }

    pub fn scene_name(&self) -> Option<&str> {
        self.scene_name.as_deref()
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

/// RAII switch of the process working directory, restored on drop.
///
/// The working directory is a process-wide mutable resource: two bridges
/// needing different working directories must not execute concurrently. The
/// per-bridge execution mutex serializes runs within one bridge; hosts that
/// run several bridges at once are responsible for giving them the same
/// working directory.
pub struct WorkingDirGuard {
    previous: PathBuf,
}

impl WorkingDirGuard {
    pub fn enter(dir: &Path) -> io::Result<Self> {
        let previous = env::current_dir()?;
        env::set_current_dir(dir)?;
        Ok(Self { previous })
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        if let Err(err) = env::set_current_dir(&self.previous) {
            warn!(
                "failed to restore working directory to '{}': {}",
                self.previous.display(),
                err
            );
        }
    }
}
