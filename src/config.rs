use std::env;

/// Server configuration read from the environment.
pub struct Config {
    pub port: u16,
    pub frontend_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            frontend_path: env::var("FRONTEND_PATH").ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test because the PORT variable is process-global.
    #[test]
    fn test_port_parsing() {
        env::remove_var("PORT");
        assert_eq!(Config::from_env().port, 3000);

        env::set_var("PORT", "8123");
        assert_eq!(Config::from_env().port, 8123);

        env::set_var("PORT", "not-a-port");
        assert_eq!(Config::from_env().port, 3000);
        env::remove_var("PORT");
    }
}
