use crate::service::connector::Connector;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy { cause: String },
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

/// Probes the database with a connection of its own, never the shared one.
pub struct HealthReporter<C: Connector> {
    name: &'static str,
    url: String,
    connector: C,
}

impl<C: Connector> HealthReporter<C> {
    pub fn new(name: &'static str, url: String, connector: C) -> Self {
        Self {
            name,
            url,
            connector,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// One attempt: connect, validate, close.
    pub async fn check(&self) -> HealthStatus {
        let mut conn = match self.connector.establish(&self.url).await {
            Ok(conn) => conn,
            Err(e) => return self.unhealthy(format!("cannot connect: {e}")),
        };

        let validated = self.connector.validate(&mut conn).await;
        if let Err(e) = self.connector.close(conn).await {
            debug!(check = self.name, error = %e, "closing probe connection failed");
        }

        match validated {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => self.unhealthy(format!("validation query failed: {e}")),
        }
    }

    fn unhealthy(&self, cause: String) -> HealthStatus {
        warn!(check = self.name, %cause, "health check failed");
        HealthStatus::Unhealthy { cause }
    }
}
