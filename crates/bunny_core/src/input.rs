//! Keyboard state tracking with both edge-triggered and level-triggered queries.
//!
//! - **Level-triggered (held):** `is_held(key)` is true every frame the key is
//!   physically down. Movement reads this.
//!
//! - **Edge-triggered (just_pressed / just_released):** true only for the frame
//!   the transition happened. Jumping reads these: the jump fires on the press
//!   edge and re-arms on the release edge. They are cleared by `end_frame()`,
//!   which the main loop calls only after at least one fixed simulation step has
//!   consumed them, so a tap landing on a zero-step frame is not dropped.

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    W,
    A,
    S,
    D,
    Space,
    Escape,
    F3,
    F4,
    P,
    R,
}

#[derive(Debug, Default)]
pub struct InputState {
    held: HashSet<Key>,
    just_pressed: HashSet<Key>,
    just_released: HashSet<Key>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&mut self, key: Key) {
        if self.held.insert(key) {
            self.just_pressed.insert(key);
        }
    }

    pub fn key_up(&mut self, key: Key) {
        if self.held.remove(&key) {
            self.just_released.insert(key);
        }
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn is_just_pressed(&self, key: Key) -> bool {
        self.just_pressed.contains(&key)
    }

    pub fn is_just_released(&self, key: Key) -> bool {
        self.just_released.contains(&key)
    }

    /// True if any of `keys` is held.
    pub fn any_held(&self, keys: &[Key]) -> bool {
        keys.iter().any(|k| self.is_held(*k))
    }

    /// Release every held key, recording a release edge for each. Used when
    /// the window loses focus and key-up events will never arrive.
    pub fn release_all(&mut self) {
        self.just_released.extend(self.held.drain());
        self.just_pressed.clear();
    }

    pub fn end_frame(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_down_sets_held_and_just_pressed() {
        let mut input = InputState::new();
        input.key_down(Key::Up);
        assert!(input.is_held(Key::Up));
        assert!(input.is_just_pressed(Key::Up));
    }

    #[test]
    fn test_key_up_clears_held_sets_just_released() {
        let mut input = InputState::new();
        input.key_down(Key::Space);
        input.key_up(Key::Space);
        assert!(!input.is_held(Key::Space));
        assert!(input.is_just_released(Key::Space));
    }

    #[test]
    fn test_os_key_repeat_is_absorbed() {
        let mut input = InputState::new();
        input.key_down(Key::Space);
        input.end_frame();
        // Auto-repeat delivers another press while the key is still down.
        input.key_down(Key::Space);
        assert!(input.is_held(Key::Space));
        assert!(!input.is_just_pressed(Key::Space));
    }

    #[test]
    fn test_key_up_without_down_is_no_op() {
        let mut input = InputState::new();
        input.key_up(Key::Left);
        assert!(!input.is_just_released(Key::Left));
        assert!(!input.is_held(Key::Left));
    }

    #[test]
    fn test_end_frame_clears_edges_but_keeps_held() {
        let mut input = InputState::new();
        input.key_down(Key::Right);
        input.key_down(Key::Space);
        input.end_frame();
        assert!(!input.is_just_pressed(Key::Right));
        assert!(!input.is_just_pressed(Key::Space));
        assert!(input.is_held(Key::Right));
        assert!(input.is_held(Key::Space));

        input.key_up(Key::Space);
        assert!(input.is_just_released(Key::Space));
        input.end_frame();
        assert!(!input.is_just_released(Key::Space));
    }

    #[test]
    fn test_multiple_keys_independent() {
        let mut input = InputState::new();
        input.key_down(Key::Up);
        input.key_down(Key::Left);
        input.key_up(Key::Up);
        assert!(!input.is_held(Key::Up));
        assert!(input.is_held(Key::Left));
        assert!(!input.is_just_released(Key::Left));
    }

    #[test]
    fn test_any_held() {
        let mut input = InputState::new();
        assert!(!input.any_held(&[Key::Up, Key::W]));
        input.key_down(Key::W);
        assert!(input.any_held(&[Key::Up, Key::W]));
    }

    #[test]
    fn test_release_all_emits_release_edges_for_held_keys() {
        let mut input = InputState::new();
        input.key_down(Key::Down);
        input.key_down(Key::Space);
        input.release_all();
        assert!(!input.is_held(Key::Down));
        assert!(!input.is_just_pressed(Key::Down));
        assert!(input.is_just_released(Key::Down));
        assert!(input.is_just_released(Key::Space));
        assert!(!input.is_just_released(Key::Left));
    }

    #[test]
    fn test_press_after_release_all_is_a_fresh_edge() {
        let mut input = InputState::new();
        input.key_down(Key::Space);
        input.release_all();
        input.end_frame();
        input.key_down(Key::Space);
        assert!(input.is_just_pressed(Key::Space));
    }
}
