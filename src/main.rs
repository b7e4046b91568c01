use std::sync::Arc;

use clap::{Arg, ArgAction, Command};
use log::{info, warn};

use cypher_lens::api::run_server;
use cypher_lens::db::neo4j::{DbSettings, Neo4jConnection};
use cypher_lens::gql::query_interface::QueryService;
use cypher_lens::persistence::settings::AppSettings;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = Command::new("Cypher-Lens")
        .about("Run Cypher queries against Neo4j and view the results as a table and a graph")
        .arg(Arg::new("bind").long("bind").value_name("ADDR").help("Listen address (overrides settings)"))
        .arg(Arg::new("port").long("port").value_name("PORT").value_parser(clap::value_parser!(u16)).help("Listen port (overrides settings)"))
        .arg(Arg::new("no_api_log").long("no-api-log").action(ArgAction::SetTrue).help("Do not write the API traffic log"))
        .get_matches();

    let mut settings = AppSettings::load().unwrap_or_else(|e| {
        warn!("failed to read settings, using defaults: {}", e);
        AppSettings::default()
    });
    if let Some(bind) = matches.get_one::<String>("bind") { settings.api_bind_addr = bind.clone(); }
    if let Some(port) = matches.get_one::<u16>("port") { settings.api_port = *port; }
    if matches.get_flag("no_api_log") { settings.api_log_enabled = false; }

    // The one database handle for the process; connects on first query
    let db = DbSettings::from_env();
    info!("database target: {:?}", db);
    let connection = Arc::new(Neo4jConnection::new(db));
    let service = QueryService::new(connection);

    run_server(&settings, service).await
}
