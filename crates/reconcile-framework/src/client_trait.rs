//! Typed handles over a [`ServiceClient`].
//!
//! Application clients wrap one `ServiceClient<T>` each and add the verbs of their kind
//! (publishing a version, provisioning a domain). [`ServiceHandle`] gives every one of
//! them the same read and delete calls, with errors already mapped to the client's own
//! error type.
use crate::{Hosted, HostedResource, ServiceClient, ServiceError};
use async_trait::async_trait;

/// Read and delete calls shared by every typed client.
///
/// ```rust
/// use reconcile_framework::{HostedResource, ServiceClient, ServiceError, ServiceHandle};
/// use async_trait::async_trait;
///
/// #[derive(Clone, Debug)]
/// struct Repository { retention_days: u32 }
///
/// #[derive(Debug, thiserror::Error)]
/// enum RepositoryError {
///     #[error("retention must be at least one day")]
///     NoRetention,
///     #[error("repository service: {0}")]
///     Service(#[from] ServiceError),
/// }
///
/// #[async_trait]
/// impl HostedResource for Repository {
///     const KIND: &'static str = "repository";
///     type Spec = u32;
///     type Action = ();
///     type ActionResult = ();
///     type Context = ();
///     type Error = RepositoryError;
///
///     fn from_spec(_arn: String, _name: &str, days: u32) -> Result<Self, Self::Error> {
///         if days == 0 {
///             return Err(RepositoryError::NoRetention);
///         }
///         Ok(Self { retention_days: days })
///     }
///     async fn on_replace(&mut self, days: u32, _: &()) -> Result<(), Self::Error> {
///         self.retention_days = days;
///         Ok(())
///     }
///     async fn handle_action(&mut self, _: (), _: &()) -> Result<(), Self::Error> { Ok(()) }
/// }
///
/// struct RepositoryClient {
///     inner: ServiceClient<Repository>,
/// }
///
/// impl RepositoryClient {
///     /// Retention of an existing repository, built on the provided `describe`.
///     async fn retention(&self, name: &str) -> Result<Option<u32>, RepositoryError> {
///         Ok(self.describe(name).await?.map(|hosted| hosted.resource.retention_days))
///     }
/// }
///
/// #[async_trait]
/// impl ServiceHandle<Repository> for RepositoryClient {
///     type Error = RepositoryError;
///
///     fn inner(&self) -> &ServiceClient<Repository> {
///         &self.inner
///     }
///
///     fn map_error(e: ServiceError) -> Self::Error {
///         RepositoryError::Service(e)
///     }
/// }
///
/// async fn retire(client: RepositoryClient) -> Result<(), RepositoryError> {
///     if client.retention("artifacts").await?.is_some_and(|days| days > 30) {
///         client.delete_if_present("artifacts").await?;
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait ServiceHandle<T: HostedResource>: Send + Sync {
    type Error: Send + Sync;

    fn inner(&self) -> &ServiceClient<T>;

    /// Turns a service failure into the client's error type.
    fn map_error(e: ServiceError) -> Self::Error;

    /// `None` if no resource of this kind has that name.
    #[tracing::instrument(skip(self), fields(kind = T::KIND))]
    async fn describe(&self, name: &str) -> Result<Option<Hosted<T>>, Self::Error> {
        tracing::debug!("Describe");
        self.inner().describe(name).await.map_err(Self::map_error)
    }

    /// Fails with the mapped [`ServiceError::NotFound`] if the resource is missing.
    #[tracing::instrument(skip(self), fields(kind = T::KIND))]
    async fn delete(&self, name: &str) -> Result<(), Self::Error> {
        tracing::debug!("Delete");
        self.inner().delete(name).await.map_err(Self::map_error)
    }

    /// Like [`delete`](Self::delete), but a missing resource counts as deleted.
    #[tracing::instrument(skip(self), fields(kind = T::KIND))]
    async fn delete_if_present(&self, name: &str) -> Result<(), Self::Error> {
        match self.inner().delete(name).await {
            Err(e) if e.is_not_found() => {
                tracing::debug!("Already gone");
                Ok(())
            }
            other => other.map_err(Self::map_error),
        }
    }
}
