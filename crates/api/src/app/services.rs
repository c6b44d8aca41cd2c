use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;

use gbau_infra::config::{AppConfig, StorageBackend};
use gbau_infra::repository::{
    InMemoryOrderRepository, InMemoryProductRepository, InMemoryVariantRepository, OrderRepository,
    PostgresRepository, ProductRepository, VariantRepository,
};
use gbau_infra::services::{OrderService, Paging, ProductService, VariantService};
use gbau_infra::storage::{FilesystemObjectStorage, InMemoryObjectStorage, ObjectStorage};

/// Use-case services shared by every handler.
pub struct AppServices {
    pub products: ProductService,
    pub variants: VariantService,
    pub orders: OrderService,
}

struct Repositories {
    products: Arc<dyn ProductRepository>,
    variants: Arc<dyn VariantRepository>,
    orders: Arc<dyn OrderRepository>,
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let repos = if config.use_persistent_stores {
        build_persistent_repositories(config).await?
    } else {
        build_in_memory_repositories()
    };
    let storage = build_storage(config).await?;
    let paging = Paging::new(config.app_url.clone(), config.page_limit);

    Ok(AppServices {
        products: ProductService::new(repos.products.clone(), repos.variants.clone(), paging.clone()),
        variants: VariantService::new(repos.products.clone(), repos.variants.clone(), storage, paging.clone()),
        orders: OrderService::new(repos.orders, repos.variants, repos.products, paging),
    })
}

fn build_in_memory_repositories() -> Repositories {
    tracing::info!("using in-memory stores");
    Repositories {
        products: Arc::new(InMemoryProductRepository::new()),
        variants: Arc::new(InMemoryVariantRepository::new()),
        orders: Arc::new(InMemoryOrderRepository::new()),
    }
}

async fn build_persistent_repositories(config: &AppConfig) -> anyhow::Result<Repositories> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")?;

    let pool = PgPool::connect(database_url)
        .await
        .context("failed to connect to Postgres")?;

    let repo = Arc::new(PostgresRepository::new(pool));
    repo.migrate().await.context("failed to apply schema")?;
    tracing::info!("using Postgres stores");

    Ok(Repositories {
        products: repo.clone(),
        variants: repo.clone(),
        orders: repo,
    })
}

async fn build_storage(config: &AppConfig) -> anyhow::Result<Arc<dyn ObjectStorage>> {
    match &config.storage {
        StorageBackend::Memory => Ok(Arc::new(InMemoryObjectStorage::new(config.storage_public_url.clone()))),
        StorageBackend::Filesystem { dir } => {
            let storage = FilesystemObjectStorage::new(dir, config.storage_public_url.clone())
                .await
                .with_context(|| format!("failed to prepare storage dir {}", dir.display()))?;
            Ok(Arc::new(storage))
        }
        #[cfg(feature = "s3")]
        StorageBackend::S3 {
            bucket,
            region,
            endpoint,
        } => {
            let storage = match endpoint {
                Some(endpoint) => {
                    gbau_infra::storage::S3ObjectStorage::with_endpoint(bucket.clone(), endpoint, region.as_deref())
                        .await
                }
                None => gbau_infra::storage::S3ObjectStorage::new(bucket.clone(), region.as_deref()).await,
            };
            Ok(Arc::new(storage))
        }
        #[cfg(not(feature = "s3"))]
        StorageBackend::S3 { .. } => {
            anyhow::bail!("STORAGE_BACKEND=s3 requires the s3 feature")
        }
    }
}
