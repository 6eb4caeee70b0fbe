//! Startup asset loading with progress reporting.
//!
//! Every file goes through a `LoadingManager`, which logs start, progress,
//! errors and completion. A file that fails to load is replaced by its
//! built-in counterpart so the game always starts.

use std::path::Path;

use crate::arena::{load_arena_from_path, ArenaFile};
use crate::player_anim::AnimationRegistry;

#[derive(Debug, Default)]
pub struct LoadingManager {
    items_total: usize,
    items_done: usize,
    failures: Vec<String>,
    started: bool,
    complete: bool,
}

impl LoadingManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file about to load. Only the first file logs the start line.
    pub fn start(&mut self, url: &str) {
        self.items_total += 1;
        self.complete = false;
        if !self.started {
            self.started = true;
            log::info!(
                "Started loading file: {url}. Loaded {} of {} files.",
                self.items_done,
                self.items_total
            );
        }
    }

    pub fn progress(&mut self, url: &str) {
        self.items_done += 1;
        log::info!(
            "Loading file: {url}. Loaded {} of {} files.",
            self.items_done,
            self.items_total
        );
        self.finish();
    }

    /// A failed file still counts as done so loading can complete.
    pub fn error(&mut self, url: &str, err: &str) {
        self.items_done += 1;
        log::error!("There was an error loading {url}: {err}");
        self.failures.push(url.to_string());
        self.finish();
    }

    /// Logs completion once every started file has finished. Returns whether
    /// loading is complete.
    pub fn finish(&mut self) -> bool {
        if self.complete {
            return true;
        }
        if self.started && self.items_done >= self.items_total {
            self.complete = true;
            log::info!("Loading complete!");
        }
        self.complete
    }

    pub fn items_total(&self) -> usize {
        self.items_total
    }

    #[allow(dead_code)]
    pub fn items_done(&self) -> usize {
        self.items_done
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }
}

pub struct LoadedAssets {
    pub arena: ArenaFile,
    pub animations: AnimationRegistry,
}

pub fn load_assets(
    loading: &mut LoadingManager,
    arena_path: &Path,
    animation_path: &Path,
) -> LoadedAssets {
    let arena_url = arena_path.display().to_string();
    let animation_url = animation_path.display().to_string();
    loading.start(&arena_url);
    loading.start(&animation_url);

    let arena = match load_arena_from_path(arena_path) {
        Ok(arena) => {
            loading.progress(&arena_url);
            arena
        }
        Err(err) => {
            loading.error(&arena_url, &err);
            log::warn!("Falling back to the built-in meadow arena");
            ArenaFile::builtin()
        }
    };

    let animations = match load_animations(animation_path) {
        Ok(animations) => {
            loading.progress(&animation_url);
            animations
        }
        Err(err) => {
            loading.error(&animation_url, &err);
            log::warn!("Falling back to the built-in bunny clips");
            AnimationRegistry::with_builtin()
        }
    };

    LoadedAssets { arena, animations }
}

/// A fresh registry holding only the clips of `path`.
pub fn load_animations(path: &Path) -> Result<AnimationRegistry, String> {
    let mut registry = AnimationRegistry::new();
    registry.load_file(path)?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player_anim::{BUILTIN_ANIMATION_ID, CLIP_RUN};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "bunny_loading_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn completes_after_every_started_item_finishes() {
        let mut loading = LoadingManager::new();
        assert!(!loading.finish(), "nothing started yet");
        loading.start("a.json");
        loading.start("b.json");
        loading.progress("a.json");
        assert!(!loading.finish());
        loading.error("b.json", "missing");
        assert!(loading.finish());
        assert_eq!(loading.items_done(), 2);
        assert_eq!(loading.items_total(), 2);
        assert_eq!(loading.failures(), ["b.json".to_string()]);
    }

    #[test]
    fn missing_files_fall_back_to_builtins() {
        let arena_path = temp_file_path("missing_arena");
        let animation_path = temp_file_path("missing_anim");
        let mut loading = LoadingManager::new();

        let assets = load_assets(&mut loading, &arena_path, &animation_path);

        assert_eq!(assets.arena.arena_id, ArenaFile::builtin().arena_id);
        assert!(assets
            .animations
            .resolve_clip(Some(BUILTIN_ANIMATION_ID), CLIP_RUN)
            .is_some());
        assert_eq!(loading.failures().len(), 2);
        assert!(loading.finish());
    }

    #[test]
    fn valid_files_are_used() {
        let arena_path = temp_file_path("arena");
        let animation_path = temp_file_path("anim");
        fs::write(&arena_path, r#"{ "version": "0.1", "arena_id": "pond" }"#)
            .expect("write arena");
        fs::write(
            &animation_path,
            r#"{ "version": "0.1", "animation_id": "hare",
                 "clips": { "run": { "looping": true, "keyframes": [ { "time_ms": 0 } ] } } }"#,
        )
        .expect("write animation");

        let mut loading = LoadingManager::new();
        let assets = load_assets(&mut loading, &arena_path, &animation_path);

        assert_eq!(assets.arena.arena_id, "pond");
        assert!(assets.animations.resolve_clip(Some("hare"), "run").is_some());
        assert!(assets
            .animations
            .resolve_clip(Some(BUILTIN_ANIMATION_ID), "run")
            .is_none());
        assert!(loading.failures().is_empty());

        let _ = fs::remove_file(arena_path);
        let _ = fs::remove_file(animation_path);
    }
}
