//! Raspiforce Agent - temperature alarms turned into Salesforce cases
//!
//! The agent polls a DS18B20 sensor on a Raspberry Pi and files a support
//! case when a reading goes above the configured threshold:
//! - Demo configuration lookup and run registration in the setup org
//! - Asset lookup or creation in the demo org
//! - Alarm loop with a fixed cooldown after each case
//! - Optional status narration to a WebSocket chat channel

pub mod agent;
pub mod chat;
pub mod cli;
pub mod config;
pub mod crm;
pub mod error;
pub mod lifecycle;
pub mod sensor;
pub mod session;
pub mod startup;

pub use agent::{bootstrap_session, Agent};
pub use error::{AgentError, Result};
pub use startup::Startup;
