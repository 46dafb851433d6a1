use database::{DatabaseConnectionInfo, PgDatabase};
use registry::{database::Database, memory::MemoryDatabase, seed};
use web::{config::WebConfig, start_web_server, WebState};

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = WebConfig::from_env();

    if config.in_memory {
        log::warn!("running against the in-memory store, nothing will be persisted");
        serve(MemoryDatabase::new(), &config).await;
        return;
    }

    // database
    let database_connection_info = DatabaseConnectionInfo::from_env()
        .expect("expected database connection info in env.");
    let database = PgDatabase::connect(database_connection_info)
        .await
        .expect("could not connect to database.");

    serve(database, &config).await;
}

async fn serve<D: Database>(database: D, config: &WebConfig) {
    let state = WebState::new(database);

    if config.seed_locations {
        if let Err(why) = seed::run(&state.locations).await {
            log::error!("could not seed locations: {}", why);
        }
    }

    if let Err(why) = start_web_server(state, &config.address).await {
        log::error!("web server stopped: {}", why);
    }
}
