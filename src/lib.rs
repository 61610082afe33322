use std::sync::Arc;

use opentelemetry_tide::TideExt;
use structopt::StructOpt;

pub mod db;
pub mod models;
pub mod telemetry;
pub mod web;

#[cfg(test)]
mod test_utils;

#[derive(Clone, Debug)]
pub struct State {
    pub photos: Arc<dyn db::photos::PhotoProvider>,
    pub tera: Arc<tera::Tera>,
}

#[derive(Debug)]
pub enum Error {
    TemplateParseError(tera::Error),
    TelemetryInitError(anyhow::Error),
    DatabaseError(db::Error),
    ServerError(std::io::Error),
}

impl From<Error> for u8 {
    fn from(error: Error) -> u8 {
        match error {
            Error::TemplateParseError(_) => 3,
            Error::TelemetryInitError(_) => 4,
            Error::DatabaseError(_) => 5,
            Error::ServerError(_) => 6,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::TemplateParseError(err) => {
                write!(f, "Template parsing error: {}", err)
            },
            Error::TelemetryInitError(err) => {
                write!(f, "Failed to init telemetry: {:#}", err)
            },
            Error::DatabaseError(err) => {
                write!(f, "Database error: {}", err)
            },
            Error::ServerError(err) => {
                write!(f, "Server error: {}", err)
            },
        }
    }
}

#[derive(Debug, StructOpt)]
pub struct Args {
    /// Host address to bind to.
    #[structopt(long, default_value = "localhost", env = "PHOTOGRAM_BIND_ADDRESS")]
    address: String,
    /// Port to bind to.
    #[structopt(long, default_value = "8166", env = "PHOTOGRAM_BIND_PORT")]
    port: u16,

    /// PostgreSQL database url.
    #[structopt(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Don't apply pending database migrations on startup.
    #[structopt(long)]
    skip_migrations: bool,

    /// Path to Tera templates directory
    #[structopt(
        long,
        parse(from_os_str),
        default_value = "./templates",
        env = "PHOTOGRAM_TEMPLATE_PATH"
    )]
    template_path: std::path::PathBuf,
}

fn load_templates(template_path: &std::path::Path) -> Result<tera::Tera, Error> {
    let glob = template_path.join("**/*.html");
    tera::Tera::new(&glob.to_string_lossy()).map_err(Error::TemplateParseError)
}

pub async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    let args = Args::from_args();

    telemetry::init().map_err(Error::TelemetryInitError)?;

    let pool = db::get_pool(&args.database_url)
        .await
        .map_err(Error::DatabaseError)?;

    if args.skip_migrations {
        tracing::info!("Skipping database migrations");
    } else {
        db::run_migrations(&pool)
            .await
            .map_err(Error::DatabaseError)?;
    }

    let tera = load_templates(&args.template_path)?;

    let state = State {
        photos: Arc::new(pool),
        tera: Arc::new(tera),
    };
    let mut app = tide::with_state(state);

    app.with_default_tracing_middleware();

    web::mount(&mut app);

    tracing::info!(address = %args.address, port = args.port, "Starting server");
    let address: &str = args.address.as_ref();
    app.listen((address, args.port))
        .await
        .map_err(Error::ServerError)?;

    Ok(())
}
