use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use folio_media::application::ImageFetchService;
use folio_media::domain::entities::{ImageSpec, Transformations};
use folio_media::infrastructure::image::{
    CacheStore, CdnConfig, HttpImageFetcher, build_address, build_responsive_set,
};
use folio_media::infrastructure::{AppConfig, CliArgs, Command, StorageManager};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = &config.log_path {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let mut config = StorageManager::new()?.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

async fn open_store(config: &AppConfig) -> Arc<CacheStore> {
    let store = Arc::new(
        CacheStore::new(config.cache.effective_directory()).with_ttl(config.cache.ttl()),
    );
    if let Err(e) = store.open().await {
        warn!(error = %e, "Cache store unavailable, continuing without cache");
    }
    store
}

fn fetch_service(config: &AppConfig, store: Arc<CacheStore>) -> Result<ImageFetchService> {
    let fetcher = HttpImageFetcher::new(config.network.timeout(), &config.network.user_agent)?;
    Ok(ImageFetchService::new(store, Arc::new(fetcher)))
}

async fn run(args: CliArgs, config: AppConfig, cdn: CdnConfig) -> Result<()> {
    match args.command {
        Command::Url {
            public_id,
            size,
            transforms,
        } => {
            let custom: Transformations = transforms.into_iter().collect();
            let transformations = size.map_or_else(
                || custom.clone(),
                |preset| preset.transformations().merged_with(&custom),
            );
            println!("{}", build_address(&cdn, &public_id, &transformations));
        }
        Command::Responsive {
            public_id,
            size,
            transforms,
            sizes,
            json,
            prefetch,
        } => {
            let spec = ImageSpec::new(public_id)
                .with_size(size)
                .with_transformations(transforms.into_iter().collect());
            let set = build_responsive_set(&cdn, &spec, sizes.as_deref());

            if json {
                println!("{}", serde_json::to_string_pretty(&set)?);
            } else {
                println!("primary:     {}", set.primary);
                println!("placeholder: {}", set.placeholder);
                println!("srcset:      {}", set.srcset());
                println!("sizes:       {}", set.size_hints);
            }

            if prefetch {
                let store = open_store(&config).await;
                let service = fetch_service(&config, store.clone())?;
                for (address, result) in service.prefetch(set.addresses()).await {
                    match result {
                        Ok(source) => println!("{:>7}  {address}", source.to_string()),
                        Err(e) => println!(" failed  {address}: {e}"),
                    }
                }
                println!("{}", store.stats());
                store.close();
            }
        }
        Command::Fetch { address, output } => {
            let store = open_store(&config).await;
            let service = fetch_service(&config, store.clone())?;
            let outcome = service.fetch_with_cache(&address).await?;

            if let Some(path) = output {
                tokio::fs::write(&path, &outcome.payload).await?;
                info!(path = %path.display(), "Payload written");
            }
            println!(
                "{} bytes from {} (cache write: {:?})",
                outcome.payload.len(),
                outcome.source,
                outcome.cache_write
            );
            store.close();
        }
        Command::Inspect { address } => {
            let store = open_store(&config).await;
            match store.inspect(&address).await {
                Some(header) => println!("{}", serde_json::to_string_pretty(&header)?),
                None => println!("not cached: {address}"),
            }
            store.close();
        }
        Command::Evict { address } => {
            let store = open_store(&config).await;
            let service = fetch_service(&config, store.clone())?;
            service.evict(&address).await;
            store.close();
        }
        Command::Clear => {
            let store = open_store(&config).await;
            let service = fetch_service(&config, store.clone())?;
            service.clear().await;
            println!("cleared {}", store.root().display());
            store.close();
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    init_logging(&config)?;

    info!(version = folio_media::VERSION, "Starting {}", folio_media::NAME);

    let cdn = config.cdn.to_cdn_config()?;

    run(args, config, cdn).await
}
