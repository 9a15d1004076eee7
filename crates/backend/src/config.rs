use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_STYLE_URL: &str = "mapbox://styles/mapbox/light-v11";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    /// Served under `/static`.
    pub assets_dir: PathBuf,
    /// Built frontend bundle, served under `/dist` and `/assets`.
    pub dist_dir: PathBuf,
    /// Company feed loaded at startup.
    pub data_path: PathBuf,
    pub mapbox_token: Option<String>,
    pub mapbox_style: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source, so tests don't have to touch the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| format!("Invalid PORT {:?}: {}", raw, e))?,
            None => DEFAULT_PORT,
        };
        let path = |key: &str, default: &str| PathBuf::from(lookup(key).unwrap_or_else(|| default.to_string()));

        Ok(Config {
            port,
            assets_dir: path("ASSETS_DIR", "assets"),
            dist_dir: path("DIST_DIR", "dist"),
            data_path: path("DATA_PATH", "data/companies.json"),
            mapbox_token: lookup("MAPBOX_TOKEN")
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            mapbox_style: lookup("MAPBOX_STYLE").unwrap_or_else(|| DEFAULT_STYLE_URL.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.assets_dir, PathBuf::from("assets"));
        assert_eq!(config.dist_dir, PathBuf::from("dist"));
        assert_eq!(config.data_path, PathBuf::from("data/companies.json"));
        assert_eq!(config.mapbox_token, None);
        assert_eq!(config.mapbox_style, DEFAULT_STYLE_URL);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("DATA_PATH", "/srv/feed.json"),
            ("MAPBOX_TOKEN", "pk.test"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.data_path, PathBuf::from("/srv/feed.json"));
        assert_eq!(config.mapbox_token.as_deref(), Some("pk.test"));
    }

    #[test]
    fn test_blank_token_is_none() {
        let config = Config::from_lookup(lookup(&[("MAPBOX_TOKEN", "  ")])).unwrap();
        assert!(config.mapbox_token.is_none());
    }

    #[test]
    fn test_bad_port_is_an_error() {
        let err = Config::from_lookup(lookup(&[("PORT", "http")])).unwrap_err();
        assert!(err.contains("PORT"));
    }
}
