mod events;
mod lifecycle;
mod relay;
mod session;

pub use events::{ClientEvent, ServerEvent};
pub use lifecycle::LifecycleManager;
pub use relay::{identity_topic, RelayHub};
pub use session::{ParticipantRole, SessionDirectory, TimerAnchor};
