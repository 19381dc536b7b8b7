//! Arrowlabel: columnar Arrow codecs for computer-vision annotations.
//!
//! Arrowlabel defines how structured annotation entities — bounding boxes,
//! poses, run-length-encoded masks, images, and composite object
//! annotations — are represented both as rich in-memory value objects and
//! as nested columnar arrays, plus the bidirectional conversion between the
//! two. Objects are immutable values; conversion is pure, stateless, and
//! round-trips exactly.
//!
//! Storage and transport are external collaborators: this crate produces
//! and consumes in-memory arrays and never opens files or connections on
//! its own (image content resolution goes through an injected
//! [`ContentResolver`]).
//!
//! # Modules
//!
//! - [`types`]: annotation value types (Bbox, Image, Pose, CompressedRle,
//!   ObjectAnnotation)
//! - [`codec`]: the [`ArrowCodec`] conversion contract
//! - [`schema`]: the fixed codec registry and schema validation
//! - [`batch`]: list-of-objects to per-attribute columns and back
//! - [`content`]: injected URI content resolution
//! - [`error`]: error types for arrowlabel operations
//!
//! # Example
//!
//! ```
//! use arrowlabel::{ArrowCodec, Bbox, ObjectAnnotation};
//!
//! let annotation = ObjectAnnotation::new("ann-1")
//!     .with_bbox(Bbox::from_xyxy([0.1, 0.2, 0.5, 0.6]))
//!     .with_category(3, "person");
//!
//! let row = annotation.encode()?;
//! let restored = ObjectAnnotation::decode(&row)?;
//! assert_eq!(restored, Some(annotation));
//! # Ok::<(), arrowlabel::ArrowlabelError>(())
//! ```

pub mod batch;
pub mod codec;
pub mod content;
pub mod error;
pub mod schema;
pub mod types;

pub use codec::ArrowCodec;
pub use content::{ContentResolver, FileResolver};
pub use error::ArrowlabelError;
pub use types::{
    xywh_to_xyxy, xyxy_to_xywh, Bbox, BboxFormat, CompressedRle, Image, ObjectAnnotation, Pose,
};
