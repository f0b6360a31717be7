//! datastore-ext - Datastore sessions and model forms
//!
//! datastore-ext provides:
//! - Session records in a durable document store with a read-through cache
//! - A maximum session age and flash messages
//! - Form generation from model descriptions through an explicit converter table

// Enforce error handling best practices
#![cfg_attr(
    not(test),
    warn(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
    )
)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used,))]

pub mod cache;
pub mod config;
pub mod error;
pub mod forms;
pub mod logging;
pub mod session;

// Re-export main types for public API
pub use config::AppConfig;
pub use error::{Error, Result};
pub use forms::{
    model_form, DataModel, FieldKind, FieldOverrides, Form, FormErrors, FormField,
    ModelConverter, ModelFormBuilder, ModelSchema, Property, PropertyKind, Validator,
};
pub use session::{
    Clock, DatastoreSessionStore, ManualClock, SessionCookie, SessionData, SessionManager,
    SessionRecord, SessionStoreFactory, SystemClock,
};
