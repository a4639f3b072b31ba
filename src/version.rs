// Version information for the embedding service

/// Semantic version number, reported by GET /health
pub const VERSION_NUMBER: &str = "1.0.0";

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Embedding Service v{}", VERSION_NUMBER)
}
