//! Plans — the recurring reminders, their due-date rules, and the daily digest.

pub mod digest;
pub mod due;
pub mod model;
pub mod store;

pub use digest::{Digest, DigestTemplate, build_digest};
pub use due::{evaluate, is_due};
pub use model::{Period, Plan};
pub use store::{JsonPlanStore, PlanStore};
