use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_PAGE_LENGTH: usize = 10;

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config::from_env()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub page_length: usize,
}

impl Config {
    pub fn from_env() -> Config {
        Config {
            api_url: get_env_or_default("DRIVESEARCH_API_URL", DEFAULT_API_URL),
            page_length: parse_page_length(env::var("DRIVESEARCH_PAGE_LENGTH").ok().as_deref()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: DEFAULT_API_URL.to_string(),
            page_length: DEFAULT_PAGE_LENGTH,
        }
    }
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Zero or unparsable lengths fall back to the widget default.
pub fn parse_page_length(raw: Option<&str>) -> usize {
    match raw.map(str::trim).and_then(|s| s.parse::<usize>().ok()) {
        Some(n) if n > 0 => n,
        Some(_) | None => {
            if let Some(raw) = raw {
                log::warn!("ignoring page length {raw:?}, using {DEFAULT_PAGE_LENGTH}");
            }
            DEFAULT_PAGE_LENGTH
        }
    }
}

#[test]
fn test_parse_page_length() {
    assert_eq!(parse_page_length(None), DEFAULT_PAGE_LENGTH);
    assert_eq!(parse_page_length(Some("25")), 25);
    assert_eq!(parse_page_length(Some(" 5 ")), 5);
    assert_eq!(parse_page_length(Some("0")), DEFAULT_PAGE_LENGTH);
    assert_eq!(parse_page_length(Some("-3")), DEFAULT_PAGE_LENGTH);
    assert_eq!(parse_page_length(Some("ten")), DEFAULT_PAGE_LENGTH);
}
