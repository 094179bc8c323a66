mod actor;
mod error;
mod error_log;
mod state;

pub use actor::{BrokerActor, Inbound};
pub use error::{BrokerError, Result};
pub use error_log::ErrorLog;
pub use state::{Broker, Outbound, PeerId, PendingResult, PendingTest};
