//! The per-station session engine: registration state machine, outbound
//! pipeline and inbound dispatcher (spec components D, F, G).

pub mod inbound;
pub mod outbound;
pub mod state;

pub use inbound::{Dispatcher, DispatchOutcome, InboundCommand};
pub use outbound::{MessageBuffer, OutboundPipeline, SendOptions};
pub use state::RegistrationState;
