//! User profiles: settings, statistics, communication style

pub mod service;

pub use service::{ProfileOverview, UserProfileService};
