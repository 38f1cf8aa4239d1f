//! Stateful sessions on a connection.

use std::fmt;
use std::sync::Arc;

use crate::connection::Connection;
use crate::error::{ConnectorError, Result};
use crate::gateway::{Gateway, SessionProvider};

/// Keeps the calls made between `start_session` and `end_session` in one
/// backend context, so that backend state set by one call is seen by the
/// next.
///
/// An optional session provider is registered with the gateway for the
/// duration of the session. Dropping a session unregisters its provider
/// but leaves the backend context alone; call `end_session` to end it.
pub struct Session<'c, 'gw, G: Gateway> {
    connection: &'c Connection<'gw, G>,
    provider: Option<Arc<dyn SessionProvider>>,
    registered: bool,
    active: bool,
}

impl<'c, 'gw, G: Gateway> Session<'c, 'gw, G> {
    pub fn new(connection: &'c Connection<'gw, G>) -> Session<'c, 'gw, G> {
        Session {
            connection,
            provider: None,
            registered: false,
            active: false,
        }
    }

    pub fn with_provider(
        connection: &'c Connection<'gw, G>,
        provider: Arc<dyn SessionProvider>,
    ) -> Session<'c, 'gw, G> {
        Session {
            connection,
            provider: Some(provider),
            registered: false,
            active: false,
        }
    }

    pub fn provider(&self) -> Option<&Arc<dyn SessionProvider>> {
        self.provider.as_ref()
    }

    /// Takes effect at the next `start_session`. Replacing a provider that
    /// is registered fails with `Configuration`; end the session first.
    pub fn set_provider(&mut self, provider: Option<Arc<dyn SessionProvider>>) -> Result<()> {
        if self.registered {
            return Err(ConnectorError::Configuration(
                "session provider is registered; end the session first".to_string(),
            ));
        }
        self.provider = provider;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn start_session(&mut self) -> Result<()> {
        let destination = self.connection.destination()?;
        let gateway = self.connection.gateway();
        if let (Some(provider), false) = (&self.provider, self.registered) {
            gateway
                .register_session_provider(provider)
                .map_err(|source| ConnectorError::Session {
                    message: "session provider could not be registered".to_string(),
                    source,
                })?;
            self.registered = true;
        }
        gateway
            .begin_context(destination)
            .map_err(|source| ConnectorError::Session {
                message: format!(
                    "context on {} could not be started",
                    self.connection.config_name()
                ),
                source,
            })?;
        self.active = true;
        log::debug!("session started on {}", self.connection.config_name());
        Ok(())
    }

    /// Unregister and clear the provider, if any, and end the context, if
    /// started. Ending a session that has neither does nothing.
    pub fn end_session(&mut self) -> Result<()> {
        let gateway = self.connection.gateway();
        if let (Some(provider), true) = (self.provider.clone(), self.registered) {
            gateway
                .unregister_session_provider(&provider)
                .map_err(|source| ConnectorError::Session {
                    message: "session provider could not be unregistered".to_string(),
                    source,
                })?;
            self.registered = false;
        }
        self.provider = None;
        if self.active {
            let destination = self.connection.destination()?;
            gateway
                .end_context(destination)
                .map_err(|source| ConnectorError::Session {
                    message: format!(
                        "context on {} could not be ended",
                        self.connection.config_name()
                    ),
                    source,
                })?;
            self.active = false;
            log::debug!("session ended on {}", self.connection.config_name());
        }
        Ok(())
    }
}

impl<'c, 'gw, G: Gateway> Drop for Session<'c, 'gw, G> {
    fn drop(&mut self) {
        if let (Some(provider), true) = (self.provider.take(), self.registered) {
            if let Err(e) = self
                .connection
                .gateway()
                .unregister_session_provider(&provider)
            {
                log::warn!("unable to unregister session provider: {}", e);
            }
        }
        if self.active {
            log::warn!(
                "session on {} dropped while its context is still open",
                self.connection.config_name()
            );
        }
    }
}

impl<'c, 'gw, G: Gateway> fmt::Debug for Session<'c, 'gw, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("connection", &self.connection.config_name())
            .field("provider", &self.provider)
            .field("active", &self.active)
            .finish()
    }
}
