//! Destination lifecycle and the transaction bound to it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::DestinationCatalog;
use crate::connparams::DestinationConfig;
use crate::error::{ConnectorError, Result};
use crate::gateway::{Destination, FunctionOf, Gateway, UnitOf};

static UNNAMED_DESTINATIONS: AtomicU64 = AtomicU64::new(0);

struct BoundTransaction<U> {
    id: u64,
    unit: U,
}

/// A logical connection to one destination.
///
/// Creating the connection registers its configuration with the gateway;
/// `open` resolves the destination. `close` (also run on drop) commits a
/// transaction that is still bound, then unregisters the configuration.
/// Failures while closing are logged, never returned. A closed connection
/// cannot be opened again.
///
/// Not meant to be shared between threads; use one connection per thread.
pub struct Connection<'gw, G: Gateway> {
    gateway: &'gw G,
    config_name: String,
    registered: bool,
    closed: bool,
    destination: Option<G::Destination>,
    transaction: RefCell<Option<BoundTransaction<UnitOf<G>>>>,
    transaction_ids: Cell<u64>,
}

impl<'gw, G: Gateway> Connection<'gw, G> {
    /// Register `config` with the gateway. The registration name is the
    /// config's `NAME`, or a generated `destination-<n>` without one.
    pub fn new(gateway: &'gw G, config: &DestinationConfig) -> Result<Connection<'gw, G>> {
        let config_name = match config.name() {
            Some(name) => name.to_string(),
            None => format!(
                "destination-{}",
                UNNAMED_DESTINATIONS.fetch_add(1, Ordering::Relaxed) + 1
            ),
        };
        gateway
            .register_destination(&config_name, config)
            .map_err(|source| ConnectorError::ConnectionRegistration {
                destination: config_name.clone(),
                source,
            })?;
        log::debug!("registered destination {}", config_name);
        Ok(Connection {
            gateway,
            config_name,
            registered: true,
            closed: false,
            destination: None,
            transaction: RefCell::new(None),
            transaction_ids: Cell::new(0),
        })
    }

    /// Connection for the catalog entry `name`, or its first entry.
    pub fn from_catalog(
        gateway: &'gw G,
        catalog: &DestinationCatalog,
        name: Option<&str>,
    ) -> Result<Connection<'gw, G>> {
        let config = catalog.destination(name)?;
        Connection::new(gateway, config)
    }

    /// Open a connection, run `f` with it and close it again, whatever `f`
    /// returns. Closing commits a transaction `f` left bound.
    pub fn scoped<T, F>(gateway: &'gw G, config: &DestinationConfig, f: F) -> Result<T>
    where
        F: FnOnce(&Connection<'gw, G>) -> Result<T>,
    {
        let mut connection = Connection::new(gateway, config)?;
        connection.open()?;
        let result = f(&connection);
        connection.close();
        result
    }

    pub fn config_name(&self) -> &str {
        &self.config_name
    }

    pub fn is_open(&self) -> bool {
        self.destination.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Resolve the destination. Opening an open connection does nothing.
    pub fn open(&mut self) -> Result<()> {
        if self.closed {
            return Err(ConnectorError::Configuration(format!(
                "connection to '{}' has been closed",
                self.config_name
            )));
        }
        if self.destination.is_some() {
            return Ok(());
        }
        let destination = self
            .gateway
            .get_destination(&self.config_name)
            .map_err(|source| ConnectorError::ConnectionOpen {
                destination: self.config_name.clone(),
                source,
            })?;
        log::debug!("opened destination {}", self.config_name);
        self.destination = Some(destination);
        Ok(())
    }

    /// The live destination; `Configuration` error unless open.
    pub fn destination(&self) -> Result<&G::Destination> {
        self.destination.as_ref().ok_or_else(|| {
            ConnectorError::Configuration(format!(
                "connection to '{}' is not open",
                self.config_name
            ))
        })
    }

    pub(crate) fn gateway(&self) -> &'gw G {
        self.gateway
    }

    /// Start a transaction and make it this connection's current one.
    ///
    /// A connection has at most one current transaction. Starting another
    /// discards the previous unit of work uncommitted; its handle is no
    /// longer bound afterwards.
    pub fn begin_transaction(&self) -> Result<Transaction<'_, 'gw, G>> {
        let destination = self.destination()?;
        let unit = destination
            .begin_unit()
            .map_err(|source| ConnectorError::TransactionBegin {
                destination: self.config_name.clone(),
                source,
            })?;
        let id = self.transaction_ids.get() + 1;
        self.transaction_ids.set(id);
        let displaced = self
            .transaction
            .replace(Some(BoundTransaction { id, unit }));
        if let Some(displaced) = displaced {
            log::warn!(
                "transaction {} on {} replaced by transaction {} before it was committed",
                displaced.id,
                self.config_name,
                id
            );
        }
        log::debug!("began transaction {} on {}", id, self.config_name);
        Ok(Transaction {
            connection: self,
            id,
        })
    }

    /// True while a transaction is bound to this connection.
    pub fn has_transaction(&self) -> bool {
        self.transaction.borrow().is_some()
    }

    fn unbind_transaction(&self, id: u64) -> Option<UnitOf<G>> {
        let mut slot = self.transaction.borrow_mut();
        if slot.as_ref().map_or(false, |bound| bound.id == id) {
            slot.take().map(|bound| bound.unit)
        } else {
            None
        }
    }

    /// Commit a still bound transaction, then unregister the destination
    /// configuration. Safe to call more than once.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(bound) = self.transaction.get_mut().take() {
            let mut unit = bound.unit;
            match self.destination.as_ref() {
                Some(destination) => match destination.commit_unit(&mut unit) {
                    Ok(()) => log::debug!(
                        "committed transaction {} while closing {}",
                        bound.id,
                        self.config_name
                    ),
                    Err(e) => log::warn!(
                        "commit of transaction {} while closing {} failed: {}",
                        bound.id,
                        self.config_name,
                        e
                    ),
                },
                None => log::warn!(
                    "transaction {} on {} has no destination to commit to",
                    bound.id,
                    self.config_name
                ),
            }
        }

        if self.registered {
            self.registered = false;
            if let Err(e) = self.gateway.unregister_destination(&self.config_name) {
                log::warn!(
                    "unable to unregister destination configuration {}: {}",
                    self.config_name,
                    e
                );
            }
        }
        self.destination = None;
        log::debug!("closed connection to {}", self.config_name);
    }
}

impl<'gw, G: Gateway> Drop for Connection<'gw, G> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<'gw, G: Gateway> fmt::Debug for Connection<'gw, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("config_name", &self.config_name)
            .field("open", &self.is_open())
            .field("closed", &self.closed)
            .field("transaction", &self.has_transaction())
            .finish()
    }
}

/// A unit of work on a connection.
///
/// Commands enlisted in it become part of the unit. `commit` and
/// `rollback` consume the handle and unbind it from the connection whether
/// they succeed or not. A transaction dropped while still bound is
/// committed when its connection closes.
pub struct Transaction<'c, 'gw, G: Gateway> {
    connection: &'c Connection<'gw, G>,
    id: u64,
}

impl<'c, 'gw, G: Gateway> Transaction<'c, 'gw, G> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn connection(&self) -> &'c Connection<'gw, G> {
        self.connection
    }

    /// False once committed, rolled back or replaced on the connection.
    pub fn is_bound(&self) -> bool {
        self.connection
            .transaction
            .borrow()
            .as_ref()
            .map_or(false, |bound| bound.id == self.id)
    }

    pub(crate) fn enlist(&self, command: &str, function: &FunctionOf<G>) -> Result<()> {
        let destination = self.connection.destination()?;
        let mut slot = self.connection.transaction.borrow_mut();
        match slot.as_mut() {
            Some(bound) if bound.id == self.id => destination
                .enlist(&mut bound.unit, function)
                .map_err(|source| ConnectorError::TransactionEnlist {
                    command: command.to_string(),
                    message: format!("rejected by transaction {}", self.id),
                    source: Some(source),
                }),
            _ => Err(ConnectorError::TransactionEnlist {
                command: command.to_string(),
                message: format!("transaction {} is no longer bound", self.id),
                source: None,
            }),
        }
    }

    pub fn commit(self) -> Result<()> {
        let mut unit = self.connection.unbind_transaction(self.id).ok_or_else(|| {
            ConnectorError::TransactionCommit {
                message: format!("transaction {} is no longer bound", self.id),
                source: None,
            }
        })?;
        let destination =
            self.connection
                .destination()
                .map_err(|e| ConnectorError::TransactionCommit {
                    message: e.to_string(),
                    source: None,
                })?;
        destination
            .commit_unit(&mut unit)
            .map_err(|source| ConnectorError::TransactionCommit {
                message: format!(
                    "transaction {} on {} was not committed",
                    self.id,
                    self.connection.config_name()
                ),
                source: Some(source),
            })?;
        log::debug!(
            "committed transaction {} on {}",
            self.id,
            self.connection.config_name()
        );
        Ok(())
    }

    /// Unbind and hand the unit to the gateway's commit primitive, the only
    /// completion the RFC layer offers. Failures surface as
    /// `TransactionRollback`.
    pub fn rollback(self) -> Result<()> {
        let mut unit = self.connection.unbind_transaction(self.id).ok_or_else(|| {
            ConnectorError::TransactionRollback {
                message: format!("transaction {} is no longer bound", self.id),
                source: None,
            }
        })?;
        let destination =
            self.connection
                .destination()
                .map_err(|e| ConnectorError::TransactionRollback {
                    message: e.to_string(),
                    source: None,
                })?;
        destination
            .commit_unit(&mut unit)
            .map_err(|source| ConnectorError::TransactionRollback {
                message: format!(
                    "transaction {} on {} was not rolled back",
                    self.id,
                    self.connection.config_name()
                ),
                source: Some(source),
            })?;
        log::debug!(
            "rolled back transaction {} on {}",
            self.id,
            self.connection.config_name()
        );
        Ok(())
    }
}

impl<'c, 'gw, G: Gateway> fmt::Debug for Transaction<'c, 'gw, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("connection", &self.connection.config_name())
            .field("bound", &self.is_bound())
            .finish()
    }
}
