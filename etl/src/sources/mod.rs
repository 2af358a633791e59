pub mod evocon;

pub use evocon::EvoconClient;

use async_trait::async_trait;
use common::Result;
use serde_json::Value;

use crate::catalog::Resource;

/// A data source that pulls every raw record one catalogued resource exposes
/// for its date window.
#[async_trait]
pub trait Extract: Send + Sync {
    /// Short name for logs and the run summary.
    fn name(&self) -> &str;

    async fn fetch(&self, resource: &Resource) -> Result<Vec<Value>>;
}
