// Two-stage call chain: optional authenticator, then the target service

mod authenticator;
pub mod path;
mod service;
pub mod template;
mod validation;

pub use authenticator::{AuthenticatorExecutor, injected_headers};
pub use service::{PreparedRequest, ServiceInvoker};
pub use validation::validate_inputs;
