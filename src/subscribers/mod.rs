//! # Event subscribers.
//!
//! ```text
//! Supervisor / Sequence ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                                    ├──► [queue] ──► Subscribe::on_event
//!                                                                    └──► [queue] ──► Subscribe::on_event
//! ```

mod subscriber;
mod subscriber_set;

pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
