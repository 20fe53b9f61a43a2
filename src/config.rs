use rocket::figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub generator: GeneratorConfig,
    pub images: ImageConfig,
    pub logging: LoggingConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_connections: u32,
    pub acquire_timeout: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    pub root: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GeneratorConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    /// Request timeout in seconds for generateContent calls.
    pub timeout: u64,
    /// Encodings the generation service rejects; uploads and prepared
    /// images in these formats are converted before use.
    pub disallowed_formats: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ImageConfig {
    /// Target bounding box (square) for prepared images.
    pub max_dimension: u32,
    pub jpeg_quality: u8,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "tryon.db".to_string(),
            max_connections: 8,
            acquire_timeout: 5,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: "./storage".to_string(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash-image-preview".to_string(),
            timeout: 90,
            disallowed_formats: ["avif", "heic", "bmp", "tiff", "gif", "ico"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_dimension: 1024,
            jpeg_quality: 95,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            allow_credentials: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            storage: StorageConfig::default(),
            generator: GeneratorConfig::default(),
            images: ImageConfig::default(),
            logging: LoggingConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from multiple sources in priority order:
    /// 1. Built-in defaults
    /// 2. Tryon.toml (base configuration file)
    /// 3. Environment variables (prefixed with TRYON_)
    /// 4. GEMINI_API_KEY environment variable (the conventional name)
    pub fn load() -> Result<Self, rocket::figment::Error> {
        let figment = Figment::new()
            .merge(Toml::string(&toml::to_string(&Config::default()).unwrap()))
            .merge(Toml::file("Tryon.toml"))
            .merge(Env::prefixed("TRYON_").split("_"))
            .merge(Env::raw().only(&["GEMINI_API_KEY"]).map(|_| "generator.api_key".into()));

        figment.extract()
    }
}
