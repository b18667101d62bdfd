// ABOUTME: Core constants and utilities for Trellis
// ABOUTME: Foundational package providing shared functionality across all Trellis packages

pub mod constants;

// Re-export constants
pub use constants::{database_file, trellis_dir};

/// Generate a unique entity ID
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn trellis_dir_respects_home() {
        std::env::set_var("HOME", "/tmp/trellis-test-home");
        let dir = trellis_dir();
        assert!(dir.ends_with(".trellis"));
    }
}
