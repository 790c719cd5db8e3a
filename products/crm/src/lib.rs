//! Lead lifecycle tracking for the CRM: append-only followup logs, latest
//! status resolution, bucket classification and dashboard counts for the
//! marketing and management pipelines.
//!
//! The pure pieces ([`resolver`], [`classifier`], [`aggregate`],
//! [`pipeline`]) work on in-memory events and take the as-of date as an
//! argument. [`store::CrmStore`] wires them to the database.

pub mod aggregate;
pub mod classifier;
pub mod clock;
pub mod error;
pub mod event;
pub mod input;
pub mod legacy;
pub mod meeting;
pub mod notify;
pub mod pipeline;
pub mod resolver;
pub mod status;
pub mod store;
pub mod view;

pub use aggregate::Counts;
pub use classifier::{Bucket, ManagementBucket, MarketingBucket};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{LeadError, LeadResult};
pub use event::{ClientId, EmployeeId, FollowupEvent, LeadRef, ManagementEvent, MarketingEvent};
pub use notify::{LeadChanged, LeadEvents, Pipeline};
pub use pipeline::{FollowupPipeline, ManagementPipeline, MarketingPipeline, PipelineConfig};
pub use status::{ManagementStatus, MarketingStatus, PipelineStatus};
pub use store::CrmStore;
