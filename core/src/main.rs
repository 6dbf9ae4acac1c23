mod cors;

use actix_web::{
    App, HttpServer,
    web::{self},
};
use common::env_config::Config;
use gate::Gate;
use usage::UsageAccountant;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();
    let config_data = config.clone();
    let origin = config.cors_allowed_origin.clone();

    // init logger
    logger::setup(&config.log_file, config.console_logging_enabled)
        .expect("Failed to set up logger");

    // init usage store
    let store = usage::setup_store(&config)
        .await
        .expect("Failed to set up usage store");
    let accountant = UsageAccountant::from_config(store, &config);
    let gate = web::Data::new(Gate::new(accountant, config.quota_read_policy));

    log::info!(
        "Starting {} server on {}:{} (usage store: {}, quota reads: {:?})",
        config.environment,
        config.server_host,
        config.server_port,
        config.usage_store,
        config.quota_read_policy
    );

    HttpServer::new(move || {
        App::new()
            .app_data(gate.clone())
            .app_data(web::Data::new(config_data.clone()))
            .wrap(logger::middleware()) // 3rd
            .wrap(extractor::middleware(&config_data.jwt_config)) // 2nd
            .wrap(cors::middleware(&origin)) // 1st
            .service(
                web::scope("/api")
                    .service(api_tiers::mount_tiers())
                    .service(
                        web::scope("/dashboard")
                            .wrap(gate::auth_middleware())
                            .service(gate::mount_dashboard()),
                    )
                    .service(
                        web::scope("/v1")
                            .wrap(gate::auth_middleware())
                            .service(gate::mount_actions()),
                    ),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
