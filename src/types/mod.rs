//! Annotation value types and their columnar codecs.
//!
//! Each type here is an immutable value object with a fixed physical
//! layout. The leaf types ([`Bbox`], [`Image`], [`Pose`], [`CompressedRle`])
//! have flat layouts; [`ObjectAnnotation`] nests them. Conversion between
//! the value form and the columnar form goes through
//! [`ArrowCodec`](crate::codec::ArrowCodec), which every type implements.

mod annotation;
mod bbox;
mod image;
mod pose;
mod rle;

pub use annotation::ObjectAnnotation;
pub use bbox::{xywh_to_xyxy, xyxy_to_xywh, Bbox, BboxFormat};
pub use image::Image;
pub use pose::Pose;
pub use rle::CompressedRle;
