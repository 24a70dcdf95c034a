use crate::clients::{
    AppImageConfigClient, BucketClient, ClientError, DomainClient, IdentityClient, ImageClient,
    ImageVersionClient, UserProfileClient,
};
use crate::model::{
    AppImageConfig, Bucket, Domain, Image, ImageVersion, NetworkPlacement, RolePolicy, UserProfile,
};
use crate::platform::DomainContext;
use crate::studio::StudioHandler;
use reconcile_framework::{Hosted, ServiceActor};
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info};

/// The hosted workspace platform: one service actor per resource kind.
///
/// `PlatformSystem` is responsible for:
/// - **Lifecycle Management**: starting every service and stopping them again
/// - **Dependency Wiring**: injecting the clients a service validates against
///
/// # Wiring
///
/// | Service | Context |
/// |---------|---------|
/// | image, app image config, bucket, role | `()` |
/// | image version | [`ImageClient`] |
/// | domain | [`DomainContext`] (image versions, app image configs) |
/// | user profile | [`DomainClient`] |
///
/// # Example
///
/// ```ignore
/// let platform = PlatformSystem::new("local", 32);
/// platform.seed_domain("d-studio", NetworkPlacement::default()).await?;
///
/// let handler = platform.handler();
/// // ... reconcile chains through `handler` ...
/// drop(handler);
///
/// platform.shutdown().await?;
/// ```
pub struct PlatformSystem {
    pub images: ImageClient,
    pub image_versions: ImageVersionClient,
    pub app_image_configs: AppImageConfigClient,
    pub domains: DomainClient,
    pub buckets: BucketClient,
    pub user_profiles: UserProfileClient,
    pub identity: IdentityClient,
    handles: Vec<JoinHandle<()>>,
}

impl PlatformSystem {
    /// Spawns every service. Must be called inside a Tokio runtime.
    pub fn new(region: &str, capacity: usize) -> Self {
        // 1. Create services
        let (image_actor, images) = ServiceActor::<Image>::new(capacity, region);
        let (version_actor, image_versions) = ServiceActor::<ImageVersion>::new(capacity, region);
        let (config_actor, app_image_configs) =
            ServiceActor::<AppImageConfig>::new(capacity, region);
        let (domain_actor, domains) = ServiceActor::<Domain>::new(capacity, region);
        let (bucket_actor, buckets) = ServiceActor::<Bucket>::new(capacity, region);
        let (profile_actor, user_profiles) = ServiceActor::<UserProfile>::new(capacity, region);
        let (role_actor, identity) = ServiceActor::<RolePolicy>::new(capacity, region);

        let images = ImageClient::new(images);
        let image_versions = ImageVersionClient::new(image_versions);
        let app_image_configs = AppImageConfigClient::new(app_image_configs);
        let domains = DomainClient::new(domains);

        // 2. Start them with their contexts
        let handles = vec![
            tokio::spawn(image_actor.run(())),
            tokio::spawn(version_actor.run(images.clone())),
            tokio::spawn(config_actor.run(())),
            tokio::spawn(domain_actor.run(DomainContext {
                image_versions: image_versions.clone(),
                app_image_configs: app_image_configs.clone(),
            })),
            tokio::spawn(bucket_actor.run(())),
            tokio::spawn(profile_actor.run(domains.clone())),
            tokio::spawn(role_actor.run(())),
        ];
        info!(region, services = handles.len(), "Platform started");

        Self {
            images,
            image_versions,
            app_image_configs,
            domains,
            buckets: BucketClient::new(buckets),
            user_profiles: UserProfileClient::new(user_profiles),
            identity: IdentityClient::new(identity),
            handles,
        }
    }

    /// Provisions a domain the way an external network stack would.
    pub async fn seed_domain(
        &self,
        domain_id: &str,
        network: NetworkPlacement,
    ) -> Result<Hosted<Domain>, ClientError> {
        self.domains.provision(domain_id, network).await
    }

    /// Handler for reconciling studio chains against this platform.
    pub fn handler(&self) -> StudioHandler {
        StudioHandler {
            images: self.images.clone(),
            image_versions: self.image_versions.clone(),
            app_image_configs: self.app_image_configs.clone(),
            domains: self.domains.clone(),
            buckets: self.buckets.clone(),
            user_profiles: self.user_profiles.clone(),
        }
    }

    /// Drops every client and waits for the services to stop.
    ///
    /// Services hold clients of the services they validate against, so each one stops
    /// once its dependents have stopped. Handlers obtained from [`Self::handler`] must be
    /// dropped first.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        info!("Shutting down platform...");
        let Self {
            images,
            image_versions,
            app_image_configs,
            domains,
            buckets,
            user_profiles,
            identity,
            handles,
        } = self;
        drop((
            images,
            image_versions,
            app_image_configs,
            domains,
            buckets,
            user_profiles,
            identity,
        ));

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Service task failed");
                return Err(e);
            }
        }
        info!("Platform shutdown complete.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile_framework::ServiceHandle;

    #[tokio::test]
    async fn test_start_seed_and_shutdown() {
        let platform = PlatformSystem::new("local", 8);
        let domain = platform
            .seed_domain("d-1", NetworkPlacement::default())
            .await
            .unwrap();
        assert_eq!(domain.arn, "arn:platform:local:domain/d-1/1");

        let again = platform
            .seed_domain("d-1", NetworkPlacement::default())
            .await
            .unwrap();
        assert_eq!(again.arn, domain.arn);
        assert!(platform.domains.describe("d-1").await.unwrap().is_some());

        platform.shutdown().await.unwrap();
    }
}
