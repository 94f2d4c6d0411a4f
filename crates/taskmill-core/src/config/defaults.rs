//! Default configuration values

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "taskmill.toml";

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "taskmill.yaml";

/// Default manifest location, relative to the project root
pub const DEFAULT_MANIFEST_PATH: &str = ".taskmill/manifest.json";

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_TOML,
        DEFAULT_CONFIG_YAML,
        ".taskmill.toml",
        ".taskmill.yaml",
    ]
}
