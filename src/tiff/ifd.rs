//! Image File Directory (IFD) structures and methods
//!
//! An IFD is the tag table describing one image in a TIFF file. The reader
//! fills it from disk; the patch writer builds fresh ones.

use std::collections::HashMap;
use std::fmt;
use log::trace;

use crate::tiff::constants::{field_types, tags};

/// Represents an Image File Directory (IFD) in a TIFF file
#[derive(Debug, Clone)]
pub struct IFD {
    /// Entries in this IFD, in insertion order
    pub entries: Vec<IFDEntry>,
    /// IFD number (0-based)
    pub number: usize,
    /// Offset to this IFD in the file
    pub offset: u64,
    /// Index into `entries` by tag number
    tag_map: HashMap<u16, usize>,
}

/// Represents an entry in an Image File Directory (IFD)
///
/// For values that fit into the entry itself, `value_offset` holds the first
/// value already decoded in the file's byte order and `inline_bytes` keeps
/// the raw value field. Otherwise `value_offset` is the file offset of the
/// value array.
#[derive(Debug, Clone)]
pub struct IFDEntry {
    /// TIFF tag identifier
    pub tag: u16,
    /// Field type
    pub field_type: u16,
    /// Number of values
    pub count: u64,
    /// Decoded inline value or offset to values
    pub value_offset: u64,
    /// Raw value field as stored in the file (4 or 8 significant bytes)
    pub inline_bytes: [u8; 8],
}

impl IFDEntry {
    /// Creates a new entry whose value is a plain number or an offset
    pub fn new(tag: u16, field_type: u16, count: u64, value_offset: u64) -> Self {
        Self {
            tag,
            field_type,
            count,
            value_offset,
            inline_bytes: value_offset.to_le_bytes(),
        }
    }

    /// Size in bytes of one value of this entry's field type
    pub fn field_type_size(&self) -> usize {
        field_types::size_of(self.field_type).unwrap_or(1)
    }

    /// Total size of the value array in bytes
    pub fn data_size(&self) -> usize {
        self.field_type_size().saturating_mul(self.count as usize)
    }

    /// Determines if the value is stored inline in the entry
    pub fn is_value_inline(&self, is_big_tiff: bool) -> bool {
        let inline_size = if is_big_tiff { 8 } else { 4 };
        self.data_size() <= inline_size
    }

    /// Returns a human-readable description of this entry
    pub fn description(&self) -> String {
        format!("Tag: {} ({}), Type: {}, Count: {}, Value/Offset: {}",
                self.tag, tags::name(self.tag), self.field_type, self.count, self.value_offset)
    }
}

impl IFD {
    /// Creates an empty IFD
    pub fn new(number: usize, offset: u64) -> Self {
        Self {
            entries: Vec::new(),
            number,
            offset,
            tag_map: HashMap::new(),
        }
    }

    /// Adds an entry, replacing any previous entry with the same tag
    pub fn add_entry(&mut self, entry: IFDEntry) {
        trace!("Adding entry to IFD #{}: {}", self.number, entry.description());

        match self.tag_map.get(&entry.tag) {
            Some(&index) => self.entries[index] = entry,
            None => {
                self.tag_map.insert(entry.tag, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Gets a tag value (value_offset) directly
    pub fn get_tag_value(&self, tag: u16) -> Option<u64> {
        self.get_entry(tag).map(|entry| entry.value_offset)
    }

    pub fn has_tag(&self, tag: u16) -> bool {
        self.tag_map.contains_key(&tag)
    }

    pub fn get_entry(&self, tag: u16) -> Option<&IFDEntry> {
        self.tag_map.get(&tag).map(|&index| &self.entries[index])
    }

    /// Gets the dimensions (width, height) of the image described by this IFD
    pub fn get_dimensions(&self) -> Option<(u64, u64)> {
        let width = self.get_tag_value(tags::IMAGE_WIDTH)?;
        let height = self.get_tag_value(tags::IMAGE_LENGTH)?;
        Some((width, height))
    }

    /// Returns number of samples per pixel (default 1 if not specified)
    pub fn get_samples_per_pixel(&self) -> u64 {
        self.get_tag_value(tags::SAMPLES_PER_PIXEL).unwrap_or(1)
    }

    /// Returns true when image data is organised in tiles rather than strips
    pub fn is_tiled(&self) -> bool {
        self.has_tag(tags::TILE_OFFSETS) && self.has_tag(tags::TILE_WIDTH)
    }

    /// Entries sorted by tag with duplicates removed, as a TIFF writer needs them
    pub fn sorted_entries(&self) -> Vec<IFDEntry> {
        let mut entries = self.entries.clone();
        entries.sort_by_key(|entry| entry.tag);
        entries.dedup_by_key(|entry| entry.tag);
        entries
    }
}

impl fmt::Display for IFD {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IFD #{} (offset: {})", self.number, self.offset)?;
        writeln!(f, "  Number of entries: {}", self.entries.len())?;

        if let Some((width, height)) = self.get_dimensions() {
            writeln!(f, "  Dimensions: {}x{}", width, height)?;
        }
        writeln!(f, "  Samples per pixel: {}", self.get_samples_per_pixel())?;

        writeln!(f, "  Tags:")?;
        for entry in self.sorted_entries() {
            writeln!(f, "    {} ({}): {} [type {}, count {}]",
                     entry.tag, tags::name(entry.tag), entry.value_offset,
                     entry.field_type, entry.count)?;
        }

        Ok(())
    }
}
