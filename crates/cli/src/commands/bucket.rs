//! namespace, mb and rb commands

use anyhow::{Context, Result};

use super::CommandContext;

/// Print the namespace of the configured account.
pub async fn namespace(ctx: &CommandContext) -> Result<()> {
    let namespace: String = ctx
        .client
        .get_namespace()
        .await
        .context("Failed to get namespace")?;
    println!("{}", namespace);
    Ok(())
}

/// Create a bucket in the configured namespace.
pub async fn make(ctx: &CommandContext, bucket: &str) -> Result<()> {
    validate_bucket_name(bucket)?;
    tracing::debug!("Creating bucket {} in namespace {}", bucket, ctx.namespace);

    ctx.client
        .create_bucket(&ctx.namespace, bucket, None)
        .await
        .with_context(|| format!("Failed to create bucket '{}'", bucket))?;

    ctx.info(&format!("make_bucket: {}", bucket));
    Ok(())
}

/// Delete an empty bucket.
pub async fn remove(ctx: &CommandContext, bucket: &str) -> Result<()> {
    validate_bucket_name(bucket)?;
    tracing::debug!("Removing bucket {} in namespace {}", bucket, ctx.namespace);

    ctx.client
        .delete_bucket(&ctx.namespace, bucket)
        .await
        .with_context(|| format!("Failed to delete bucket '{}'. Bucket may not be empty.", bucket))?;

    ctx.info(&format!("remove_bucket: {}", bucket));
    Ok(())
}

fn validate_bucket_name(bucket: &str) -> Result<()> {
    if bucket.is_empty() {
        anyhow::bail!("Bucket name cannot be empty");
    }
    if bucket.contains('/') {
        anyhow::bail!("Bucket name cannot contain '/': {}", bucket);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::memory_context;

    #[tokio::test]
    async fn test_make_and_remove_bucket() {
        let (ctx, store) = memory_context();

        make(&ctx, "photos").await.unwrap();
        assert!(store.bucket_exists("photos"));

        remove(&ctx, "photos").await.unwrap();
        assert!(!store.bucket_exists("photos"));
    }

    #[tokio::test]
    async fn test_remove_missing_bucket_fails() {
        let (ctx, _store) = memory_context();
        let err = remove(&ctx, "absent").await.unwrap_err();
        assert!(err.to_string().contains("absent"));
    }

    #[test]
    fn test_bucket_name_validation() {
        assert!(validate_bucket_name("").is_err());
        assert!(validate_bucket_name("a/b").is_err());
        assert!(validate_bucket_name("ok-bucket").is_ok());
    }
}
