//! # aps-derivative: translation jobs and viewable metadata
//!
//! ```text
//! SUBMITTED → TRANSLATING → COMPLETE
//!                         → FAILED
//! (unrecognized vendor status) → TRANSLATING
//! ```
//!
//! [`TranslationClient`] submits a job for a stored object and reports its
//! [`NormalizedStatus`] each time it is asked. Once the status is
//! `complete`, [`MetadataClient`] lists the viewables and fetches the object
//! tree or properties of one of them.
//!
//! Both take the raw URN (the `object_id` returned by an upload) and encode it
//! themselves.

pub mod metadata;
pub mod status;
pub mod translation;

pub use metadata::{MetadataClient, ObjectTree, PropertyRecord, TreeNode, ViewMetadata};
pub use status::{parse_progress, Manifest, NormalizedStatus, TranslationState};
pub use translation::{JobInfo, TranslationClient, TranslationOptions};
