//! Connection management: the state machine behind the adapters and
//! connections screen.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::error::{FlowError, LoadError, ValidationError};
use crate::models::{Adapter, Connection};
use crate::session::SessionContext;

/// Load state of the connections screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed,
}

/// Credential values entered for the currently selected adapter, in the
/// adapter's descriptor order.
///
/// Values live only as long as the form: a successful connect discards them,
/// and nothing here is ever persisted or logged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialSet {
    entries: Vec<(String, String)>,
}

impl CredentialSet {
    /// One blank entry per descriptor, in descriptor order.
    fn reset_for(&mut self, adapter: &Adapter) {
        self.entries = adapter
            .required_credentials
            .iter()
            .map(|field| (field.name.clone(), String::new()))
            .collect();
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    /// Record a value for a known key; unknown keys are ignored.
    fn set(&mut self, name: &str, value: String) {
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value,
            None => debug!(field = name, "ignoring value for unknown credential field"),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    fn payload(&self) -> HashMap<String, String> {
        self.entries.iter().cloned().collect()
    }
}

/// Approval seam for the destructive disconnect action.
#[async_trait]
pub trait DisconnectGate: Send + Sync {
    /// Return true to proceed with disconnecting `connection_id`.
    async fn confirm(&self, connection_id: &str) -> bool;
}

/// Gate that approves every disconnect, for non-interactive use.
pub struct ApproveAll;

#[async_trait]
impl DisconnectGate for ApproveAll {
    async fn confirm(&self, _connection_id: &str) -> bool {
        true
    }
}

/// State machine behind the connections screen.
///
/// Created in `Loading`; [`load`](Self::load) settles it into `Ready` or
/// `Failed`. While a connect or disconnect is in flight the form mutators are
/// no-ops and further submissions are rejected locally.
pub struct ConnectionManager {
    ctx: SessionContext,
    state: LoadState,
    adapters: Vec<Adapter>,
    connections: Vec<Connection>,
    selected: Option<String>,
    credentials: CredentialSet,
    submitting: bool,
    form_error: Option<String>,
}

impl ConnectionManager {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            state: LoadState::Loading,
            adapters: Vec::new(),
            connections: Vec::new(),
            selected: None,
            credentials: CredentialSet::default(),
            submitting: false,
            form_error: None,
        }
    }

    /// Fetch the adapter catalog and the connection list concurrently. Both
    /// must succeed to reach `Ready`; either failure collapses the screen to
    /// `Failed` and the user sees only the generic [`LoadError`] line.
    pub async fn load(&mut self) {
        self.state = LoadState::Loading;
        match tokio::try_join!(
            self.ctx.client.list_adapters(),
            self.ctx.client.list_connections()
        ) {
            Ok((adapters, connections)) => {
                info!(
                    adapters = adapters.len(),
                    connections = connections.len(),
                    "integration data loaded"
                );
                self.adapters = adapters;
                self.connections = connections;
                self.state = LoadState::Ready;
            }
            Err(load_failure) => {
                error!(error = %load_failure, "initial integration load failed");
                self.state = LoadState::Failed;
            }
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// The generic line shown when the screen is `Failed`.
    pub fn load_error(&self) -> Option<LoadError> {
        matches!(self.state, LoadState::Failed).then_some(LoadError)
    }

    pub fn adapters(&self) -> &[Adapter] {
        &self.adapters
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn selected_adapter(&self) -> Option<&Adapter> {
        let selected = self.selected.as_deref()?;
        self.adapters.iter().find(|adapter| adapter.id == selected)
    }

    pub fn credentials(&self) -> &CredentialSet {
        &self.credentials
    }

    pub fn form_error(&self) -> Option<&str> {
        self.form_error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Select an adapter (or clear the selection with `None`).
    ///
    /// Every selection resets the credential set to one blank entry per
    /// descriptor of the chosen adapter, including re-selecting the adapter
    /// that was already active.
    pub fn select_adapter(&mut self, adapter_id: Option<&str>) {
        if self.submitting {
            return;
        }
        self.form_error = None;

        match adapter_id {
            Some(id) => {
                if let Some(adapter) = self.adapters.iter().find(|adapter| adapter.id == id) {
                    self.selected = Some(adapter.id.clone());
                    self.credentials.reset_for(adapter);
                } else {
                    debug!(adapter_id = id, "selected adapter is not in the catalog");
                    self.selected = None;
                    self.credentials.clear();
                }
            }
            None => {
                self.selected = None;
                self.credentials.clear();
            }
        }
    }

    /// Record a credential value for the selected adapter.
    pub fn set_credential(&mut self, name: &str, value: impl Into<String>) {
        if self.submitting {
            return;
        }
        self.credentials.set(name, value.into());
    }

    /// Submit the credential form for the selected adapter.
    ///
    /// The only local requirement is that an adapter is selected; credential
    /// completeness is judged by the backend. On success the selection and
    /// credentials are discarded and the connection list is re-fetched in
    /// full. On failure the form keeps everything the user entered.
    pub async fn submit_connect(&mut self) -> Result<Connection, FlowError> {
        if self.submitting {
            return Err(ValidationError::new("A request is already in flight").into());
        }
        let Some(system) = self.selected.clone() else {
            let invalid = ValidationError::new("Select an adapter before connecting");
            self.form_error = Some(invalid.message().to_string());
            return Err(invalid.into());
        };

        let adapter_name = self
            .selected_adapter()
            .map(|adapter| adapter.name.clone())
            .unwrap_or_else(|| system.clone());

        self.submitting = true;
        self.form_error = None;
        let result = self.ctx.client.connect(&system, &self.credentials.payload()).await;
        self.submitting = false;

        match result {
            Ok(connection) => {
                info!(system = %system, connection_id = %connection.id, "connected");
                self.ctx
                    .notices
                    .post_success(format!("Connected to {}", adapter_name));
                self.selected = None;
                self.credentials.clear();
                self.refresh_connections().await;
                Ok(connection)
            }
            Err(connect_error) => {
                let message = connect_error.user_message("Connection failed");
                self.form_error = Some(message.clone());
                self.ctx.notices.post_error(message);
                Err(connect_error.into())
            }
        }
    }

    /// Disconnect a connection after the gate approves.
    ///
    /// A declined gate is a silent no-op: no request is issued and no error
    /// is recorded.
    pub async fn disconnect(
        &mut self,
        connection_id: &str,
        gate: &dyn DisconnectGate,
    ) -> Result<(), FlowError> {
        if self.submitting {
            return Err(ValidationError::new("A request is already in flight").into());
        }
        if !gate.confirm(connection_id).await {
            debug!(connection_id, "disconnect declined");
            return Ok(());
        }

        let display = self
            .connections
            .iter()
            .find(|connection| connection.id == connection_id)
            .map(|connection| connection.name.clone())
            .unwrap_or_else(|| connection_id.to_string());

        self.submitting = true;
        let result = self.ctx.client.disconnect(connection_id).await;
        self.submitting = false;

        match result {
            Ok(_ack) => {
                info!(connection_id, "disconnected");
                self.ctx
                    .notices
                    .post_success(format!("Disconnected {}", display));
                self.refresh_connections().await;
                Ok(())
            }
            Err(disconnect_error) => {
                let message = disconnect_error.user_message("Disconnect failed");
                self.ctx.notices.post_error(message);
                Err(disconnect_error.into())
            }
        }
    }

    /// Re-fetch the full connection list after a successful mutation. The
    /// response replaces the cache wholesale; a failure here drops the list
    /// region into the same generic failed state as a failed initial load,
    /// without disturbing the mutation's own outcome.
    async fn refresh_connections(&mut self) {
        match self.ctx.client.list_connections().await {
            Ok(connections) => {
                self.connections = connections;
                self.state = LoadState::Ready;
            }
            Err(refresh_error) => {
                error!(error = %refresh_error, "connection list refresh failed");
                self.state = LoadState::Failed;
            }
        }
    }
}
