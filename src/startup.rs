use crate::{
    aws_clients::{create_dynamodb_client, create_s3_client, create_sdk_config},
    cleanup::{CleanupPolicy, CleanupQueue},
    config::{Backend, Config},
    domain::{FileStorage, MemeRepository},
    errors::AppError,
    memory::{InMemoryFileStorage, InMemoryMemeRepository},
    repositories::DynamoDbMemeRepository,
    storage::{PublicUrlBase, S3FileStorage},
    AppState,
};
use aws_sdk_dynamodb::{
    types::{AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType},
    Client as DynamoDbClient,
};
use aws_sdk_s3::{
    types::{BucketLocationConstraint, CreateBucketConfiguration},
    Client as S3Client,
};
use std::sync::Arc;
use tracing;

/// Creates the DynamoDB table if it doesn't exist.
async fn create_dynamodb_table_if_not_exists(client: &DynamoDbClient, table_name: &str) -> Result<(), AppError> {
    let result = client
        .create_table()
        .table_name(table_name)
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name("meme_id")
                .attribute_type(ScalarAttributeType::S)
                .build()?,
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name("meme_id")
                .key_type(KeyType::Hash)
                .build()?,
        )
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await;

    match result {
        Ok(_) => {
            tracing::info!("Startup: Table '{}' created successfully or setup initiated.", table_name);
            Ok(())
        }
        Err(e) if e.as_service_error().is_some_and(|se| se.is_resource_in_use_exception()) => {
            tracing::info!("Startup: Table '{}' already exists, no action needed.", table_name);
            Ok(())
        }
        Err(e) => {
            let context = format!("Startup: Error creating DynamoDB table '{}'", table_name);
            tracing::error!("{}: {:?}", context, e);
            Err(AppError::InitError(format!("{}: {}", context, e)))
        }
    }
}

/// Ensures the S3 bucket exists, creating it with the correct location constraint if needed.
async fn ensure_s3_bucket_exists(client: &S3Client, bucket_name: &str, region_str: &str) -> Result<(), AppError> {
    let mut create_bucket_req_builder = client.create_bucket().bucket(bucket_name);
    // us-east-1 rejects an explicit location constraint
    if region_str != "us-east-1" {
        create_bucket_req_builder = create_bucket_req_builder.create_bucket_configuration(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region_str))
                .build(),
        );
    }

    match create_bucket_req_builder.send().await {
        Ok(_) => {
            tracing::info!("Startup: S3 bucket '{}' created.", bucket_name);
            Ok(())
        }
        Err(sdk_err) if sdk_err.as_service_error().is_some_and(|se| se.is_bucket_already_owned_by_you() || se.is_bucket_already_exists()) => {
            tracing::info!("Startup: S3 bucket '{}' already exists.", bucket_name);
            Ok(())
        }
        Err(sdk_err) => {
            let context = format!("Startup: Error creating S3 bucket '{}'", bucket_name);
            tracing::error!("{}: {:?}", context, sdk_err);
            Err(AppError::InitError(format!("{}: {}", context, sdk_err)))
        }
    }
}

/// Initializes required AWS resources (DynamoDB table, S3 bucket).
pub async fn init_resources(
    db_client: &DynamoDbClient,
    s3_client: &S3Client,
    config: &Config,
) -> Result<(), AppError> {
    tracing::info!("Startup: Initializing AWS resources...");
    create_dynamodb_table_if_not_exists(db_client, &config.memes_table_name).await?;
    ensure_s3_bucket_exists(s3_client, &config.meme_bucket_name, &config.aws_region).await?;
    tracing::info!("Startup: AWS resource initialization complete.");
    Ok(())
}

/// Wires backends, the cleanup worker and the admin token into the shared state.
pub async fn build_state(config: &Config) -> Result<Arc<AppState>, AppError> {
    let (meme_repo, file_storage): (Arc<dyn MemeRepository>, Arc<dyn FileStorage>) = match config.backend {
        Backend::Aws => {
            let sdk_config = create_sdk_config(config).await;
            let db_client = create_dynamodb_client(&sdk_config);
            let s3_client = create_s3_client(&sdk_config);

            init_resources(&db_client, &s3_client, config).await?;

            let public_base = PublicUrlBase::from_parts(
                config.public_base_url.as_deref(),
                config.localstack_endpoint.as_deref(),
                &config.aws_region,
            );
            let repo: Arc<dyn MemeRepository> =
                Arc::new(DynamoDbMemeRepository::new(db_client, config.memes_table_name.clone()));
            let storage: Arc<dyn FileStorage> =
                Arc::new(S3FileStorage::new(s3_client, config.meme_bucket_name.clone(), public_base));
            (repo, storage)
        }
        Backend::Memory => {
            tracing::warn!("Startup: Using in-memory backends, nothing will be persisted");
            let base_url = config
                .public_base_url
                .clone()
                .unwrap_or_else(|| format!("http://{}", config.bind_address));
            let repo: Arc<dyn MemeRepository> = Arc::new(InMemoryMemeRepository::new());
            let storage: Arc<dyn FileStorage> = Arc::new(InMemoryFileStorage::new(base_url));
            (repo, storage)
        }
    };

    if config.admin_token.is_none() {
        tracing::warn!("Startup: ADMIN_TOKEN is not set, deleting memes is disabled");
    }

    let cleanup = CleanupQueue::spawn(file_storage.clone(), CleanupPolicy::new(config.cleanup_max_elapsed));

    Ok(Arc::new(AppState {
        meme_repo,
        file_storage,
        cleanup,
        admin_token: config.admin_token.clone(),
    }))
}
