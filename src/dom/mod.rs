pub mod document;
pub mod error;
pub mod event_loop;
pub mod events;
pub mod html;
pub mod node;
pub mod selector;

pub use document::{Document, MutationKind, MutationRecord, ObserverId, ValueInterceptor};
pub use error::DomError;
pub use event_loop::{FRAME, Task, TimerId};
pub use events::{Event, Listener, ListenerId};
pub use node::{BoundingBox, ComputedStyle, NodeId};
pub use selector::Selector;
