#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Database")]
#[group(id = "database")]
pub struct Database {
    /// A full connection URL, taking precedence over the individual settings.
    ///
    /// Useful for pointing the ingestion at a non-PostgreSQL backend, like `sqlite::memory:`.
    #[arg(id = "db-url", long, env = "DB_URL")]
    pub url: Option<String>,
    #[arg(id = "db-user", long, env = "DB_USER", default_value = "sbomgraph")]
    pub username: String,
    #[arg(
        id = "db-password",
        long,
        env = "DB_PASSWORD",
        default_value = "sbomgraph"
    )]
    pub password: String,
    #[arg(id = "db-host", long, env = "DB_HOST", default_value = "localhost")]
    pub host: String,
    #[arg(id = "db-port", long, env = "DB_PORT", default_value_t = 5432)]
    pub port: u16,
    #[arg(id = "db-name", long, env = "DB_NAME", default_value = "sbomgraph")]
    pub name: String,
    #[arg(id = "db-max-conn", long, env = "DB_MAX_CONN", default_value_t = 75)]
    pub max_conn: u32,
    #[arg(id = "db-min-conn", long, env = "DB_MIN_CONN", default_value_t = 25)]
    pub min_conn: u32,
    /// Seconds to wait for a connection to be established.
    #[arg(
        id = "db-connect-timeout",
        long,
        env = "DB_CONNECT_TIMEOUT",
        default_value_t = 8
    )]
    pub connect_timeout: u64,
    /// Seconds to wait for a connection to be handed out by the pool.
    #[arg(
        id = "db-acquire-timeout",
        long,
        env = "DB_ACQUIRE_TIMEOUT",
        default_value_t = 30
    )]
    pub acquire_timeout: u64,
}

impl Database {
    /// Build the configuration from the `DB_*` environment variables only.
    pub fn from_env() -> Result<Database, clap::Error> {
        #[derive(clap::Parser)]
        struct Cli {
            #[command(flatten)]
            database: Database,
        }

        use clap::Parser;
        Ok(Cli::try_parse_from(Vec::<String>::new())?.database)
    }

    /// An in-memory SQLite database, living as long as its single connection.
    pub fn in_memory() -> Database {
        Database {
            url: Some("sqlite::memory:".into()),
            username: Default::default(),
            password: Default::default(),
            host: Default::default(),
            port: 0,
            name: "memory".into(),
            max_conn: 1,
            min_conn: 1,
            connect_timeout: 8,
            acquire_timeout: 30,
        }
    }

    pub fn to_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.username, self.password, self.host, self.port, self.name
            ),
        }
    }
}
