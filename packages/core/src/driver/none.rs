//! The `none` driver
//!
//! Records the endpoint of a node that is managed elsewhere. It never touches
//! infrastructure and cannot be started, stopped or shelled into.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Driver, DriverContext, DriverError, DriverOptions, RunState};

/// Registry tag
pub const DRIVER_NAME: &str = "none";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
struct NoneFields {
    #[serde(rename = "URL", default)]
    url: String,
}

/// Driver for hosts that only have a known URL
#[derive(Debug)]
pub struct NoneDriver {
    ctx: DriverContext,
    fields: NoneFields,
}

impl NoneDriver {
    /// Create an unconfigured driver
    pub fn new(ctx: DriverContext) -> Self {
        Self {
            ctx,
            fields: NoneFields::default(),
        }
    }

    fn unsupported(operation: &'static str) -> DriverError {
        DriverError::NotSupported {
            driver: DRIVER_NAME,
            operation,
        }
    }
}

#[async_trait]
impl Driver for NoneDriver {
    fn driver_name(&self) -> &'static str {
        DRIVER_NAME
    }

    fn set_config_from_flags(&mut self, flags: &DriverOptions) -> Result<(), DriverError> {
        let url = flags.require("url")?;
        if !url.contains("://") {
            return Err(DriverError::InvalidOption {
                key: "url".to_string(),
                reason: format!("{url} is not a URL (expected e.g. tcp://10.0.0.5:2376)"),
            });
        }
        self.fields.url = url.to_string();
        Ok(())
    }

    fn supports_provisioning(&self) -> bool {
        false
    }

    async fn create(&mut self) -> Result<(), DriverError> {
        tracing::debug!(
            "Registering {} at {} (no infrastructure to create)",
            self.ctx.machine_name,
            self.fields.url
        );
        Ok(())
    }

    async fn start(&mut self) -> Result<(), DriverError> {
        Err(Self::unsupported("start"))
    }

    async fn stop(&mut self) -> Result<(), DriverError> {
        Err(Self::unsupported("stop"))
    }

    async fn kill(&mut self) -> Result<(), DriverError> {
        Err(Self::unsupported("kill"))
    }

    async fn remove(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn state(&self) -> Result<RunState, DriverError> {
        // Whatever runs the node elsewhere is assumed to keep it up
        Ok(RunState::Running)
    }

    async fn url(&self) -> Result<String, DriverError> {
        Ok(self.fields.url.clone())
    }

    async fn ssh_hostname(&self) -> Result<String, DriverError> {
        Err(Self::unsupported("ssh"))
    }

    fn ssh_port(&self) -> Result<u16, DriverError> {
        Err(Self::unsupported("ssh"))
    }

    fn ssh_username(&self) -> String {
        String::new()
    }

    fn ssh_key_path(&self) -> Option<PathBuf> {
        None
    }

    fn save_fields(&self) -> Result<serde_json::Value, DriverError> {
        Ok(serde_json::to_value(&self.fields)?)
    }

    fn load_fields(&mut self, raw: serde_json::Value) -> Result<(), DriverError> {
        self.fields = serde_json::from_value(raw)?;
        Ok(())
    }
}
