//! Lantern server binary

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lantern::{
    config::Args,
    objects::{FsObjectStore, ObjectStore},
    server,
    store::{DocumentStore, MemoryStore, MongoClient, MongoStore},
};

/// Connect the document store; dev mode falls back to memory
async fn connect_store(args: &Args) -> anyhow::Result<(Arc<dyn DocumentStore>, &'static str)> {
    let Some(uri) = args.mongodb_uri.as_deref() else {
        if args.dev_mode {
            warn!("No MONGODB_URI set (dev mode, using in-memory store)");
            return Ok((Arc::new(MemoryStore::new()), "memory"));
        }
        anyhow::bail!("MONGODB_URI is required in production");
    };

    let connected = match MongoClient::new(uri, &args.mongodb_db).await {
        Ok(client) => {
            let store = MongoStore::new(client);
            store.ensure_indexes().await.map(|_| store)
        }
        Err(e) => Err(e),
    };

    match connected {
        Ok(store) => {
            info!("MongoDB connected successfully");
            Ok((Arc::new(store), "mongodb"))
        }
        Err(e) if args.dev_mode => {
            warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
            Ok((Arc::new(MemoryStore::new()), "memory"))
        }
        Err(e) => Err(anyhow::anyhow!("MongoDB connection failed: {}", e)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("lantern={},info", args.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Lantern - site content service");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB database: {}", args.mongodb_db);
    info!("Objects: {}", args.objects_dir.display());
    info!("Public URL: {}", args.public_base_url);
    info!("Admins: {}", args.admin_allowlist().len());
    info!("======================================");

    let (store, store_kind) = match connect_store(&args).await {
        Ok(connected) => connected,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let objects: Arc<dyn ObjectStore> =
        Arc::new(FsObjectStore::new(&args.objects_dir, &args.objects_base_url()).await?);

    let state = Arc::new(server::AppState::new(args, store, store_kind, objects)?);

    if let Err(e) = server::run(state).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
