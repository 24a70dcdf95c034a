use super::{validate_bucket_name, PlatformError};
use crate::model::{Bucket, BucketSpec};
use async_trait::async_trait;
use reconcile_framework::HostedResource;

#[async_trait]
impl HostedResource for Bucket {
    const KIND: &'static str = "bucket";
    type Spec = BucketSpec;
    type Action = ();
    type ActionResult = ();
    type Context = ();
    type Error = PlatformError;

    fn from_spec(arn: String, name: &str, spec: BucketSpec) -> Result<Self, Self::Error> {
        validate_bucket_name(name)?;
        Ok(Self {
            arn,
            name: name.to_string(),
            tags: spec.tags,
        })
    }

    async fn on_replace(&mut self, spec: BucketSpec, _ctx: &()) -> Result<(), Self::Error> {
        self.tags = spec.tags;
        Ok(())
    }

    async fn handle_action(&mut self, _action: (), _ctx: &()) -> Result<(), Self::Error> {
        Ok(())
    }
}
