use once_cell::sync::Lazy;
use std::env;

pub struct Config {
    server_port: u16,
    database_url: String,
    secret_key: String,
    require_auth: bool,
}

impl Config {
    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    pub fn require_auth(&self) -> bool {
        self.require_auth
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv::dotenv().ok();

    let server_port = env::var("SERVER_PORT")
        .unwrap_or_else(|_| "8000".to_owned())
        .parse()
        .expect("SERVER_PORT must be a port number");
    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://uda.db".to_owned());
    let secret_key =
        env::var("SECRET_KEY").unwrap_or_else(|_| "insecure-dev-secret-key".to_owned());
    let require_auth = env::var("REQUIRE_AUTH")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    if secret_key.len() < 16 {
        panic!("SECRET_KEY must be at least 16 characters");
    }

    Config {
        server_port,
        database_url,
        secret_key,
        require_auth,
    }
});
