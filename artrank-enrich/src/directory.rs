//! DBLP-backed author directory

use async_trait::async_trait;
use std::sync::Arc;

use artrank_net::{DblpClient, LookupStats};

use crate::{AuthorDirectory, EnrichError, SharedDirectory};

#[async_trait]
impl AuthorDirectory for DblpClient {
    async fn search_author(&self, name: &str) -> Result<Option<String>, EnrichError> {
        Ok(DblpClient::search_author(self, name).await?)
    }

    async fn fetch_affiliation(&self, id: &str) -> Result<Option<String>, EnrichError> {
        Ok(DblpClient::fetch_affiliation(self, id).await?)
    }

    fn name(&self) -> &str {
        "dblp"
    }

    fn lookup_stats(&self) -> LookupStats {
        self.stats()
    }
}

/// Wrap a DBLP client as a shared directory
pub fn dblp_directory(client: DblpClient) -> SharedDirectory {
    Arc::new(client)
}
