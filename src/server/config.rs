use super::RequestsLoggingLevel;

#[derive(Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub requests_logging_level: RequestsLoggingLevel,
    /// Externally visible base URL, used to build verification links.
    pub public_base_url: String,
    /// Built frontend directory to serve statically, if any.
    pub frontend_dir_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 5000,
            requests_logging_level: RequestsLoggingLevel::Path,
            public_base_url: "http://localhost:5000".to_owned(),
            frontend_dir_path: None,
        }
    }
}
