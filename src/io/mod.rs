//! Low-level reading support for TIFF containers

pub mod byte_order;

use std::io::{Read, Seek};

pub use byte_order::{ByteOrder, ByteOrderHandler};

/// A trait for types that can be both read from and seeked within
pub trait SeekableReader: Read + Seek {}

// Blanket implementation for any type that implements both Read and Seek
impl<T: Read + Seek> SeekableReader for T {}
