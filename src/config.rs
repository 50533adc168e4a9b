use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Sattva";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the application data directory
/// ~/Sattva/ on all platforms (user-visible by design)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join(APP_NAME)
}

/// Path of the practice database file
pub fn database_path() -> PathBuf {
    app_data_dir().join("practice.db")
}

/// Default tracing filter when RUST_LOG is unset
pub fn default_log_filter() -> String {
    format!("info,{}=debug", env!("CARGO_PKG_NAME"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("Sattva"));
    }

    #[test]
    fn database_under_app_data() {
        let db = database_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with("practice.db"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.3.0");
    }

    #[test]
    fn default_filter_enables_crate_debug() {
        let filter = default_log_filter();
        assert!(filter.starts_with("info,"));
        assert!(filter.contains("=debug"));
    }
}
