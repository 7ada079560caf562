use tracing::info;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
}

impl Config {
    pub fn load() -> Self {
        let port = match dotenv::var("PORT") {
            Ok(raw) => raw.parse().expect("PORT must be a number"),
            Err(_) => {
                info!("PORT not set, using 8080");
                8080
            }
        };
        let database_url = dotenv::var("DATABASE_URL").unwrap_or_else(|_| {
            info!("DATABASE_URL not set, using sqlite://confcentral.db");
            "sqlite://confcentral.db".to_owned()
        });

        Self { port, database_url }
    }
}
