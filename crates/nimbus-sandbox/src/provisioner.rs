//! Sandbox provisioning: how the pipeline obtains a fresh `Sandbox` for
//! a job. A separate seam from the `Sandbox` trait itself so the
//! pipeline can be built against either a real container runtime or the
//! in-process `LocalSandbox`, without branching on that choice itself.

use crate::error::SandboxError;
use crate::local::LocalSandbox;
use crate::remote::RemoteSandbox;
use crate::sandbox::Sandbox;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait SandboxProvisioner: Send + Sync {
    async fn provision(&self, job_id: &str) -> Result<Arc<dyn Sandbox>, SandboxError>;
}

/// Provisions sandboxes against the external container-sandbox runtime
/// (spec §1 "the container-sandbox runtime").
pub struct RemoteSandboxProvisioner {
    base_url: String,
}

impl RemoteSandboxProvisioner {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into() }
    }
}

#[async_trait]
impl SandboxProvisioner for RemoteSandboxProvisioner {
    async fn provision(&self, job_id: &str) -> Result<Arc<dyn Sandbox>, SandboxError> {
        let sandbox = RemoteSandbox::provision(self.base_url.clone(), job_id).await?;
        Ok(Arc::new(sandbox))
    }
}

/// Provisions in-process sandboxes over `tempfile` directories. Used
/// when no external sandbox-runtime endpoint is configured, so the
/// single binary remains runnable standalone.
#[derive(Default)]
pub struct LocalSandboxProvisioner;

#[async_trait]
impl SandboxProvisioner for LocalSandboxProvisioner {
    async fn provision(&self, job_id: &str) -> Result<Arc<dyn Sandbox>, SandboxError> {
        let sandbox = LocalSandbox::new(job_id)?;
        Ok(Arc::new(sandbox))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_provisioner_yields_a_usable_sandbox() {
        let provisioner = LocalSandboxProvisioner;
        let sandbox = provisioner.provision("job_prov0001").await.unwrap();
        sandbox.write_file("a.txt", b"x").await.unwrap();
        assert!(sandbox.file_exists("a.txt").await.unwrap());
    }
}
