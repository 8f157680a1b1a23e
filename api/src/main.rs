use actix_web::{middleware::Logger, web::Data, App, HttpServer};
use anyhow::Context;
use docstore::{DocumentStore, MemoryStore, MongoStore};
use dotenv::dotenv;
use keyvalue_portal::{FirebaseIdentity, IdentityProvider, MemoryIdentity};
use log::{info, warn};
use std::sync::Arc;

mod auth;
use auth::middleware::AuthenticateMiddlewareFactory;

mod config;
use config::ServerConfig;

mod error;
mod routes;

mod state;
use state::WebServerData;

mod websockets;

async fn open_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match &config.mongo_uri {
        Some(uri) => {
            let store = MongoStore::init(uri, &config.mongo_database)
                .await
                .with_context(|| "connect to MongoDB")?;
            store.ping().await.with_context(|| "ping MongoDB")?;
            info!("using MongoDB database {}", config.mongo_database);
            Ok(Arc::new(store))
        }
        None => {
            warn!("No MONGOURI set, keeping documents in memory");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn identity_provider(config: &ServerConfig) -> Arc<dyn IdentityProvider> {
    match &config.firebase_api_key {
        Some(key) => {
            let mut firebase = FirebaseIdentity::new(key.clone());
            if let Some(url) = &config.firebase_auth_url {
                info!("using identity toolkit at {}", url);
                firebase = firebase.with_base_url(url.clone());
            }
            Arc::new(firebase)
        }
        None => {
            warn!("No FIREBASE_API_KEY set, accounts live in memory");
            Arc::new(MemoryIdentity::new())
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = ServerConfig::from_env()?;
    let store = open_store(&config).await?;
    let identity = identity_provider(&config);
    let server_data = WebServerData::new(store, identity, config.request_timeout)
        .with_session_ttl(config.session_ttl);

    info!("server starting on {}", config.bind_addr);
    HttpServer::new(move || {
        App::new()
            .app_data(Data::new(server_data.clone()))
            .wrap(Logger::default())
            .wrap(AuthenticateMiddlewareFactory::new(server_data.clone()))
            .configure(routes::configure)
    })
    .bind(config.bind_addr)?
    .run()
    .await?;

    Ok(())
}
