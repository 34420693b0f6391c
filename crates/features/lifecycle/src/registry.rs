//! The host registry: operation handlers over managed servers.
//!
//! Every operation validates the current state and either performs the
//! transition or fails synchronously without side effects. Configuration
//! changes against a running server set the restart/reload flags instead of
//! mutating runtime state.

use crate::error::LifecycleError;
use crate::state::{Operation, OperationOutcome, ServerState, ServerStatus};
use fxhash::FxHashMap;
use parking_lot::RwLock;
use tracing::{debug, info};

#[derive(Debug)]
struct ManagedServer {
    state: ServerState,
    restart_required: bool,
    reload_required: bool,
}

impl ManagedServer {
    const fn new(state: ServerState) -> Self {
        Self { state, restart_required: false, reload_required: false }
    }
}

/// Registry of managed servers with synchronous operation handlers.
#[derive(Debug, Default)]
pub struct HostRegistry {
    servers: RwLock<FxHashMap<String, ManagedServer>>,
}

impl HostRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a server; `auto_start` registers it already running.
    /// Re-registering an existing name is a no-op.
    pub fn register(&self, name: impl Into<String>, auto_start: bool) {
        let name = name.into();
        let state = if auto_start { ServerState::Running } else { ServerState::Stopped };
        let mut servers = self.servers.write();
        if !servers.contains_key(&name) {
            info!(server = %name, %state, "Managed server registered");
            servers.insert(name, ManagedServer::new(state));
        }
    }

    /// Applies a lifecycle operation.
    ///
    /// # Errors
    /// Returns [`LifecycleError::UnknownServer`] for an unregistered name and
    /// [`LifecycleError::OperationFailed`] for an illegal transition; the
    /// server state is unchanged on failure.
    pub fn apply(&self, name: &str, operation: Operation) -> Result<OperationOutcome, LifecycleError> {
        let mut servers = self.servers.write();
        let server = servers.get_mut(name).ok_or_else(|| LifecycleError::UnknownServer {
            message: name.to_owned().into(),
            context: None,
        })?;

        let from = server.state;
        let to = transition(from, operation).ok_or_else(|| LifecycleError::OperationFailed {
            message: format!("cannot {operation} a {from} server").into(),
            context: Some(name.to_owned().into()),
        })?;

        server.state = to;
        match operation {
            // A full restart clears both pending-change flags, a reload only
            // the reload flag.
            Operation::Restart | Operation::Start => {
                server.restart_required = false;
                server.reload_required = false;
            },
            Operation::Reload => server.reload_required = false,
            _ => {},
        }

        debug!(server = %name, %operation, %from, %to, "Lifecycle operation applied");
        Ok(OperationOutcome { from, to })
    }

    /// Flags that a configuration change requires a restart to take effect.
    ///
    /// Stopped servers pick the change up on their next start, so only
    /// running (or suspended) servers are flagged.
    ///
    /// # Errors
    /// Returns [`LifecycleError::UnknownServer`] for an unregistered name.
    pub fn require_restart(&self, name: &str) -> Result<(), LifecycleError> {
        self.flag(name, |server| server.restart_required = true)
    }

    /// Flags that a configuration change requires a reload to take effect.
    ///
    /// # Errors
    /// Returns [`LifecycleError::UnknownServer`] for an unregistered name.
    pub fn require_reload(&self, name: &str) -> Result<(), LifecycleError> {
        self.flag(name, |server| server.reload_required = true)
    }

    /// Status of one server.
    ///
    /// # Errors
    /// Returns [`LifecycleError::UnknownServer`] for an unregistered name.
    pub fn status(&self, name: &str) -> Result<ServerStatus, LifecycleError> {
        let servers = self.servers.read();
        let server = servers.get(name).ok_or_else(|| LifecycleError::UnknownServer {
            message: name.to_owned().into(),
            context: None,
        })?;
        Ok(ServerStatus {
            name: name.to_owned(),
            state: server.state,
            restart_required: server.restart_required,
            reload_required: server.reload_required,
        })
    }

    /// Statuses of every registered server, sorted by name.
    #[must_use]
    pub fn statuses(&self) -> Vec<ServerStatus> {
        let servers = self.servers.read();
        let mut statuses: Vec<ServerStatus> = servers
            .iter()
            .map(|(name, server)| ServerStatus {
                name: name.clone(),
                state: server.state,
                restart_required: server.restart_required,
                reload_required: server.reload_required,
            })
            .collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }

    fn flag(
        &self,
        name: &str,
        f: impl FnOnce(&mut ManagedServer),
    ) -> Result<(), LifecycleError> {
        let mut servers = self.servers.write();
        let server = servers.get_mut(name).ok_or_else(|| LifecycleError::UnknownServer {
            message: name.to_owned().into(),
            context: None,
        })?;
        if server.state != ServerState::Stopped {
            f(server);
        }
        Ok(())
    }
}

/// The transition table. `None` marks an illegal operation for the state.
const fn transition(from: ServerState, operation: Operation) -> Option<ServerState> {
    use Operation as Op;
    use ServerState as St;

    match (from, operation) {
        (St::Stopped, Op::Start) => Some(St::Running),
        (St::Running | St::Suspended, Op::Stop) => Some(St::Stopped),
        (St::Running | St::Suspended, Op::Restart) => Some(St::Running),
        (St::Running, Op::Reload) => Some(St::Running),
        (St::Running, Op::Suspend) => Some(St::Suspended),
        (St::Suspended, Op::Resume) => Some(St::Running),
        _ => None,
    }
}
