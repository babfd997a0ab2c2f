//! Client bootstrap state machine
//!
//! `Unbootstrapped -> KeysLoaded | KeysGenerated -> ContactUpToDate |
//! ContactPublished -> Ready`, with `Failed` reachable from any step.
//! Each transition is a compare-and-swap from the expected previous state,
//! so observers holding [`Bootstrapper::state`] never see a skipped step.

use metrics::counter;
use std::sync::Arc;
use tracing::{error, info};

use crate::atomic::AtomicCell;
use crate::client::{Client, ClientOptions};
use crate::core_contacts::ContactStatus;
use crate::core_identity::{AccountSigner, IdentityStore, KeyOrigin};
use crate::core_transport::Transport;
use crate::error::{ClientError, ClientResult};
use crate::telemetry::Timer;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BootstrapState {
    #[default]
    Unbootstrapped,
    KeysLoaded,
    KeysGenerated,
    ContactUpToDate,
    ContactPublished,
    Ready,
    Failed(String),
}

impl BootstrapState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BootstrapState::Ready | BootstrapState::Failed(_))
    }
}

pub struct Bootstrapper {
    transport: Arc<dyn Transport>,
    options: ClientOptions,
    state: Arc<AtomicCell<BootstrapState>>,
}

impl Bootstrapper {
    pub fn new(transport: Arc<dyn Transport>, options: ClientOptions) -> Self {
        Self {
            transport,
            options,
            state: Arc::new(AtomicCell::default()),
        }
    }

    /// Shared handle to the current state
    pub fn state(&self) -> Arc<AtomicCell<BootstrapState>> {
        self.state.clone()
    }

    /// Drive the machine to `Ready`. Any failure leaves it in `Failed` and
    /// surfaces as [`ClientError::Creation`]; nothing is retried.
    pub async fn run(self, signer: &dyn AccountSigner) -> ClientResult<Client> {
        let timer = Timer::new("courier.bootstrap.duration_ms");

        match self.bootstrap(signer).await {
            Ok(client) => {
                timer.stop();
                counter!("courier.bootstrap.completed").increment(1);
                info!(address = %client.address(), "Client ready");
                Ok(client)
            }
            Err(e) => {
                let reason = match e {
                    ClientError::Creation(reason) => reason,
                    other => other.to_string(),
                };
                self.state.set(BootstrapState::Failed(reason.clone()));
                counter!("courier.bootstrap.failed").increment(1);
                error!(address = %signer.address(), error = %reason, "Client bootstrap failed");
                Err(ClientError::Creation(reason))
            }
        }
    }

    async fn bootstrap(&self, signer: &dyn AccountSigner) -> ClientResult<Client> {
        let mut store = IdentityStore::new(self.transport.clone(), self.options.crypto.clone());
        if let Some(diagnostics) = &self.options.diagnostics {
            store = store.with_diagnostics(diagnostics.clone());
        }

        let loaded = store.load_or_create(signer).await?;
        let keys_state = match loaded.origin {
            KeyOrigin::Loaded => BootstrapState::KeysLoaded,
            KeyOrigin::Generated => BootstrapState::KeysGenerated,
        };
        self.advance(&BootstrapState::Unbootstrapped, keys_state.clone())?;

        let client = Client::from_bundle(loaded.bundle, self.transport.clone(), self.options.clone())?;

        let contact_state = match client.ensure_user_contact_published().await? {
            ContactStatus::UpToDate => BootstrapState::ContactUpToDate,
            ContactStatus::Published { .. } => BootstrapState::ContactPublished,
        };
        self.advance(&keys_state, contact_state.clone())?;
        self.advance(&contact_state, BootstrapState::Ready)?;

        Ok(client)
    }

    fn advance(&self, from: &BootstrapState, to: BootstrapState) -> ClientResult<()> {
        let label = format!("{:?}", to);
        if self.state.compare_and_swap(from, to) {
            info!(state = %label, "Bootstrap advanced");
            Ok(())
        } else {
            Err(ClientError::Creation(format!(
                "unexpected bootstrap state {:?}, expected {:?}",
                self.state.get(),
                from
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_transport::InMemoryTransport;
    use crate::test_utils::{seeded_wallet, RejectingSigner};

    #[tokio::test]
    async fn test_fresh_account_generates_and_publishes() {
        let transport = Arc::new(InMemoryTransport::new());
        let bootstrapper = Bootstrapper::new(transport.clone(), ClientOptions::default());
        let state = bootstrapper.state();

        bootstrapper.run(&seeded_wallet(1)).await.unwrap();

        assert_eq!(state.get(), BootstrapState::Ready);
        // Key bundle, then contact records
        assert_eq!(transport.publish_count(), 2);
    }

    #[tokio::test]
    async fn test_signer_refusal_fails() {
        let transport = Arc::new(InMemoryTransport::new());
        let bootstrapper = Bootstrapper::new(transport.clone(), ClientOptions::default());
        let state = bootstrapper.state();

        let result = bootstrapper.run(&RejectingSigner::new("0xdead")).await;

        assert!(matches!(result, Err(ClientError::Creation(_))));
        assert!(matches!(state.get(), BootstrapState::Failed(_)));
        assert!(state.get().is_terminal());
        assert_eq!(transport.publish_count(), 0);
    }

    #[tokio::test]
    async fn test_offline_fails() {
        let transport = Arc::new(InMemoryTransport::new());
        transport.set_offline(true);
        let bootstrapper = Bootstrapper::new(transport, ClientOptions::default());
        let state = bootstrapper.state();

        assert!(bootstrapper.run(&seeded_wallet(2)).await.is_err());
        assert!(matches!(state.get(), BootstrapState::Failed(_)));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!BootstrapState::Unbootstrapped.is_terminal());
        assert!(!BootstrapState::KeysGenerated.is_terminal());
        assert!(BootstrapState::Ready.is_terminal());
    }
}
