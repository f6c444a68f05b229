use crate::{
    domain::MemeRepository,
    errors::RepoError,
    models::{sort_newest_first, Meme},
};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_dynamodb::{
    types::{AttributeValue, ReturnValue},
    Client as DynamoDbClient,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{self, info};
use uuid::Uuid;

const KEY_ATTR: &str = "meme_id";

#[derive(Debug, Clone)]
pub struct DynamoDbMemeRepository {
    client: DynamoDbClient,
    table_name: String, // Store the table name
}

impl DynamoDbMemeRepository {
    /// Creates a new repository instance configured for a specific table.
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        info!(%table_name, "Initializing DynamoDbMemeRepository");
        Self { client, table_name }
    }

    fn parse_item(&self, item: &HashMap<String, AttributeValue>) -> Result<Meme, RepoError> {
        item_to_meme(item).ok_or_else(|| {
            let item_id = item.get(KEY_ATTR).and_then(|v| v.as_s().ok());
            tracing::error!(item.id = ?item_id, table_name = %self.table_name, "DynamoDB: Failed to parse item into Meme");
            RepoError::DataCorruption(format!(
                "Failed to parse item {:?} from DynamoDB table '{}'",
                item_id, self.table_name
            ))
        })
    }
}

#[async_trait]
impl MemeRepository for DynamoDbMemeRepository {
    /// Stores a new `Meme` using PutItem, refusing to overwrite an existing id.
    async fn create(&self, meme: &Meme) -> Result<(), RepoError> {
        let result = self.client
            .put_item()
            .table_name(&self.table_name) // Use stored table name
            .set_item(Some(meme_to_item(meme)))
            .condition_expression("attribute_not_exists(#id)")
            .expression_attribute_names("#id", KEY_ATTR)
            .send()
            .await;

        match result {
            Ok(_) => {
                tracing::debug!(meme_id = %meme.id, table_name = %self.table_name, "DynamoDB: Meme stored");
                Ok(())
            }
            Err(e) if e.as_service_error().is_some_and(|se| se.is_conditional_check_failed_exception()) => {
                Err(RepoError::Duplicate(meme.id))
            }
            Err(e) => Err(RepoError::BackendError(anyhow::Error::new(e).context(format!(
                "DynamoDB (table: {}): Failed to put meme (id: {})",
                self.table_name, meme.id
            )))),
        }
    }

    /// Retrieves a `Meme` from DynamoDB using GetItem.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Meme>, RepoError> {
        let id_str = id.to_string();
        let resp = self.client
            .get_item()
            .table_name(&self.table_name) // Use stored table name
            .key(KEY_ATTR, AttributeValue::S(id_str.clone()))
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to get meme (id: {})", self.table_name, id_str))
            .map_err(RepoError::BackendError)?;

        match resp.item {
            Some(item) => self.parse_item(&item).map(Some),
            None => Ok(None), // Item not found is not an error
        }
    }

    /// Lists all memes using DynamoDB Scan. Handles pagination.
    async fn list_all(&self) -> Result<Vec<Meme>, RepoError> {
        tracing::debug!("DynamoDB: Scanning table '{}' for all memes", self.table_name);
        let mut memes: Vec<Meme> = Vec::new();
        let mut last_evaluated_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let resp = self.client
                .scan()
                .table_name(&self.table_name)
                .set_exclusive_start_key(last_evaluated_key.take())
                .send()
                .await
                .context(format!("DynamoDB: Failed to scan table '{}'", self.table_name))
                .map_err(RepoError::BackendError)?;

            if let Some(items) = resp.items {
                tracing::debug!("DynamoDB Scan (table: {}): Returned {} items", self.table_name, items.len());
                for item in &items {
                    // Fail fast if data in the table is corrupt
                    memes.push(self.parse_item(item)?);
                }
            }

            // Check for next page
            last_evaluated_key = resp.last_evaluated_key;
            if last_evaluated_key.is_none() {
                break;
            }
            tracing::debug!("DynamoDB Scan (table: {}): Continuing with LastEvaluatedKey...", self.table_name);
        }

        // Scan order is arbitrary
        sort_newest_first(&mut memes);

        tracing::info!("DynamoDB (table: {}): Successfully listed {} memes", self.table_name, memes.len());
        Ok(memes)
    }

    /// Sets a new title with UpdateItem. The condition keeps a concurrent delete from
    /// being undone by an update that would otherwise recreate a partial item.
    async fn update_title(&self, id: Uuid, title: &str) -> Result<Meme, RepoError> {
        let id_str = id.to_string();
        tracing::debug!(meme_id = %id_str, table_name = %self.table_name, "DynamoDB: Updating title");

        let result = self.client
            .update_item()
            .table_name(&self.table_name)
            .key(KEY_ATTR, AttributeValue::S(id_str.clone()))
            .update_expression("SET #title = :title")
            .condition_expression("attribute_exists(#id)")
            .expression_attribute_names("#title", "title")
            .expression_attribute_names("#id", KEY_ATTR)
            .expression_attribute_values(":title", AttributeValue::S(title.to_string()))
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        match result {
            Ok(output) => {
                let item = output.attributes.ok_or_else(|| {
                    RepoError::DataCorruption(format!("DynamoDB: UpdateItem for {} returned no attributes", id_str))
                })?;
                self.parse_item(&item)
            }
            Err(e) if e.as_service_error().is_some_and(|se| se.is_conditional_check_failed_exception()) => {
                Err(RepoError::NotFound(id))
            }
            Err(e) => Err(RepoError::BackendError(anyhow::Error::new(e).context(format!(
                "DynamoDB (table: {}): Failed to update title (id: {})",
                self.table_name, id_str
            )))),
        }
    }

    /// Deletes an item using DeleteItem and hands back the old attributes.
    async fn delete(&self, id: Uuid) -> Result<Meme, RepoError> {
        let id_str = id.to_string();
        tracing::debug!(meme_id = %id_str, table_name = %self.table_name, "DynamoDB: Deleting item");

        let result = self.client
            .delete_item()
            .table_name(&self.table_name) // Use stored table name
            .key(KEY_ATTR, AttributeValue::S(id_str.clone()))
            // DeleteItem succeeds even if the item is missing; the condition makes that visible
            .condition_expression("attribute_exists(#id)")
            .expression_attribute_names("#id", KEY_ATTR)
            .return_values(ReturnValue::AllOld)
            .send()
            .await;

        match result {
            Ok(output) => {
                let item = output.attributes.ok_or_else(|| {
                    RepoError::DataCorruption(format!("DynamoDB: DeleteItem for {} returned no attributes", id_str))
                })?;
                tracing::debug!(meme_id = %id_str, table_name = %self.table_name, "DynamoDB: Item deleted");
                self.parse_item(&item)
            }
            Err(e) if e.as_service_error().is_some_and(|se| se.is_conditional_check_failed_exception()) => {
                Err(RepoError::NotFound(id))
            }
            Err(e) => Err(RepoError::BackendError(anyhow::Error::new(e).context(format!(
                "DynamoDB (table: {}): Failed to delete meme (id: {})",
                self.table_name, id_str
            )))),
        }
    }
}

fn meme_to_item(meme: &Meme) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::from([
        (KEY_ATTR.to_string(), AttributeValue::S(meme.id.to_string())),
        ("title".to_string(), AttributeValue::S(meme.title.clone())),
        ("image_url".to_string(), AttributeValue::S(meme.image_url.clone())),
        ("created_at".to_string(), AttributeValue::S(meme.created_at.to_rfc3339())),
    ]);
    if let Some(file_name) = &meme.file_name {
        item.insert("file_name".to_string(), AttributeValue::S(file_name.clone()));
    }
    item
}

// Helper function to convert DynamoDB item map to Meme struct
// Remains internal to this module.
fn item_to_meme(item: &HashMap<String, AttributeValue>) -> Option<Meme> {
    let id = item
        .get(KEY_ATTR)?
        .as_s()
        .ok()
        .and_then(|s| Uuid::parse_str(s).ok())?;
    let title = item.get("title")?.as_s().ok()?.to_string();
    let image_url = item.get("image_url")?.as_s().ok()?.to_string();
    // Records written before keys were tracked have no file_name
    let file_name = item
        .get("file_name")
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string());
    let created_at = item
        .get("created_at")?
        .as_s()
        .ok()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())?
        .with_timezone(&Utc);

    Some(Meme {
        id,
        title,
        image_url,
        file_name,
        created_at,
    })
}
