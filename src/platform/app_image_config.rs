use super::{validate_name, PlatformError};
use crate::model::{AppImageConfig, AppImageConfigSpec};
use async_trait::async_trait;
use reconcile_framework::HostedResource;

#[async_trait]
impl HostedResource for AppImageConfig {
    const KIND: &'static str = "app-image-config";
    type Spec = AppImageConfigSpec;
    type Action = ();
    type ActionResult = ();
    type Context = ();
    type Error = PlatformError;

    fn from_spec(arn: String, name: &str, spec: AppImageConfigSpec) -> Result<Self, Self::Error> {
        validate_name(Self::KIND, name)?;
        Ok(Self {
            arn,
            name: name.to_string(),
            jupyter_lab: spec.jupyter_lab,
            tags: spec.tags,
        })
    }

    async fn on_replace(&mut self, spec: AppImageConfigSpec, _ctx: &()) -> Result<(), Self::Error> {
        self.jupyter_lab = spec.jupyter_lab;
        self.tags = spec.tags;
        Ok(())
    }

    async fn handle_action(&mut self, _action: (), _ctx: &()) -> Result<(), Self::Error> {
        Ok(())
    }
}
