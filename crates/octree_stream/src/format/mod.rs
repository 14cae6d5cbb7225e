//! Versioned binary node format.
//!
//! A node file is a self-describing columnar byte stream:
//!
//! ```text
//! ┌──────────────────────┬─────────────────────┬──────────────────────────────────┐
//! │ u32 × K group sizes  │ u8 × M presence     │ columns in declared order, each   │
//! │                      │ flags               │ padded to its element alignment   │
//! └──────────────────────┴─────────────────────┴──────────────────────────────────┘
//! ```
//!
//! Every column read takes its element count from one of the K group sizes.
//! Columns whose presence flag is zero are not stored at all and decode to
//! `None`. Nested records (Float3, Double3, AABB, sphere, Float3x3) are runs of
//! parallel scalar columns.
//!
//! Three layouts coexist: [`LtsLayout`], [`PreviousLayout`] and
//! [`CurrentLayout`]. They share most fields but are not byte compatible; the
//! version travels with each node request out of band. Each layout is written
//! once as a visit over a [`ColumnVisitor`], which drives both decoding
//! ([`BufferReader`]) and encoding ([`BufferWriter`]), so the two directions
//! can never disagree on padding or order.

pub mod buffer;
pub mod current;
pub mod lts;
pub mod owned;
pub mod previous;
pub mod reader;
pub mod schema;
pub mod writer;

use std::fmt;
use std::str::FromStr;

use bytemuck::Pod;

pub use buffer::NodeBuffer;
pub use current::CurrentLayout;
pub use lts::LtsLayout;
pub use owned::{ChildRecord, OwnedSchema, SubMeshInput, VertexRecord};
pub use previous::PreviousLayout;
pub use reader::BufferReader;
pub use schema::Schema;
pub use writer::BufferWriter;

/// Sentinel for "no material / no texture / no object" in u32 index columns.
pub const NO_INDEX: u32 = u32::MAX;

/// Number of deviation channel columns carried per vertex when present.
pub const MAX_DEVIATION_CHANNELS: usize = 4;

/// Raw bits of an IEEE 754 half-precision float. Passed through untouched to
/// the renderer, which consumes f16 attributes natively.
pub type F16Bits = u16;

/// Errors raised while decoding (or encoding) a node buffer.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
  #[error("unsupported node format version {0:?}")]
  UnsupportedVersion(String),

  #[error("truncated node buffer: needed {needed} bytes at offset {offset}, {available} available")]
  Truncated {
    offset: usize,
    needed: usize,
    available: usize,
  },

  #[error("column at offset {offset} is not aligned for its element type")]
  Misaligned { offset: usize },

  #[error("decoder consumed {consumed} of {len} bytes")]
  TrailingBytes { consumed: usize, len: usize },

  #[error("column byte length overflows")]
  Overflow,

  #[error("{what} range {begin}..{end} exceeds {limit} entries")]
  InvalidRange {
    what: &'static str,
    begin: u32,
    end: u32,
    limit: usize,
  },

  #[error("column holds {actual} entries, group size is {expected}")]
  ColumnLength { expected: usize, actual: usize },
}

/// Node format version, selected once per scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormatVersion {
  /// Long-term-support layout: 16-bit positions, no textures.
  Lts,
  /// Adds textures, deviation/intensity/classification and topology flags.
  Previous,
  /// Adds content-hash ids, descendant object ids and projected positions.
  Current,
}

impl FormatVersion {
  pub const ALL: [FormatVersion; 3] = [Self::Lts, Self::Previous, Self::Current];

  /// Canonical version string.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Lts => "lts",
      Self::Previous => "previous",
      Self::Current => "current",
    }
  }

  /// Whether node ids are content hashes rather than hierarchical paths.
  pub fn has_hash_ids(&self) -> bool {
    matches!(self, Self::Current)
  }

  /// Whether object ranges carry triangle spans.
  pub fn has_triangle_ranges(&self) -> bool {
    matches!(self, Self::Current)
  }
}

impl fmt::Display for FormatVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for FormatVersion {
  type Err = DecodeError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "lts" | "1" => Ok(Self::Lts),
      "previous" | "2" => Ok(Self::Previous),
      "current" | "3" => Ok(Self::Current),
      _ => Err(DecodeError::UnsupportedVersion(s.to_string())),
    }
  }
}

/// One direction of the column codec.
///
/// The reader fills each slot from the byte stream; the writer serializes the
/// slot's existing contents. Both pad to `align_of::<T>()` before the column.
pub trait ColumnVisitor<'a> {
  /// Header: group sizes then presence flags.
  fn header(&mut self, sizes: &mut [usize], flags: &mut [bool]) -> Result<(), DecodeError>;

  /// One scalar column of `count` elements.
  fn column<T: Pod>(&mut self, count: usize, slot: &mut &'a [T]) -> Result<(), DecodeError>;

  /// `N` parallel columns of `count` elements each.
  fn columns<T: Pod, const N: usize>(
    &mut self,
    count: usize,
    slots: &mut [&'a [T]; N],
  ) -> Result<(), DecodeError> {
    for slot in slots.iter_mut() {
      self.column(count, slot)?;
    }
    Ok(())
  }

  /// Optional parallel columns governed by a presence flag.
  fn optional<T: Pod, const N: usize>(
    &mut self,
    present: bool,
    count: usize,
    slot: &mut Option<[&'a [T]; N]>,
  ) -> Result<(), DecodeError> {
    if !present {
      *slot = None;
      return Ok(());
    }
    let mut columns = slot.unwrap_or([<&'a [T]>::default(); N]);
    self.columns(count, &mut columns)?;
    *slot = Some(columns);
    Ok(())
  }

  /// Optional single column governed by a presence flag.
  fn optional_column<T: Pod>(
    &mut self,
    present: bool,
    count: usize,
    slot: &mut Option<&'a [T]>,
  ) -> Result<(), DecodeError> {
    if !present {
      *slot = None;
      return Ok(());
    }
    let mut column = slot.unwrap_or_default();
    self.column(count, &mut column)?;
    *slot = Some(column);
    Ok(())
  }
}

/// Column order of one format version.
pub trait NodeLayout {
  const VERSION: FormatVersion;

  /// Visit every header entry and column in declared order.
  fn visit<'a, V: ColumnVisitor<'a>>(visitor: &mut V, schema: &mut Schema<'a>)
    -> Result<(), DecodeError>;
}

/// Decoder selected by version string, once per scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaDecoder {
  Lts(LtsLayout),
  Previous(PreviousLayout),
  Current(CurrentLayout),
}

impl SchemaDecoder {
  pub fn new(version: FormatVersion) -> Self {
    match version {
      FormatVersion::Lts => Self::Lts(LtsLayout),
      FormatVersion::Previous => Self::Previous(PreviousLayout),
      FormatVersion::Current => Self::Current(CurrentLayout),
    }
  }

  /// Select a decoder from the out-of-band version string.
  pub fn for_version(version: &str) -> Result<Self, DecodeError> {
    Ok(Self::new(version.parse()?))
  }

  pub fn version(&self) -> FormatVersion {
    match self {
      Self::Lts(_) => LtsLayout::VERSION,
      Self::Previous(_) => PreviousLayout::VERSION,
      Self::Current(_) => CurrentLayout::VERSION,
    }
  }

  /// Decode a node buffer into a borrowed schema.
  ///
  /// Fails unless the layout consumes exactly every byte of the buffer.
  #[cfg_attr(feature = "trace_spans", tracing::instrument(skip_all, name = "format::decode"))]
  pub fn decode<'a>(&self, buffer: &'a NodeBuffer) -> Result<Schema<'a>, DecodeError> {
    match self {
      Self::Lts(_) => decode_with::<LtsLayout>(buffer.as_bytes()),
      Self::Previous(_) => decode_with::<PreviousLayout>(buffer.as_bytes()),
      Self::Current(_) => decode_with::<CurrentLayout>(buffer.as_bytes()),
    }
  }

  /// Encode a schema with this decoder's layout.
  pub fn encode(&self, schema: &Schema<'_>) -> Result<NodeBuffer, DecodeError> {
    match self {
      Self::Lts(_) => encode_with::<LtsLayout>(schema),
      Self::Previous(_) => encode_with::<PreviousLayout>(schema),
      Self::Current(_) => encode_with::<CurrentLayout>(schema),
    }
  }
}

fn decode_with<'a, L: NodeLayout>(bytes: &'a [u8]) -> Result<Schema<'a>, DecodeError> {
  let mut reader = BufferReader::new(bytes);
  let mut schema = Schema::empty(L::VERSION);
  L::visit(&mut reader, &mut schema)?;
  reader.finish()?;
  schema.validate()?;
  Ok(schema)
}

fn encode_with<L: NodeLayout>(schema: &Schema<'_>) -> Result<NodeBuffer, DecodeError> {
  schema.validate()?;
  let mut writer = BufferWriter::new();
  let mut copy = schema.clone();
  copy.version = L::VERSION;
  L::visit(&mut writer, &mut copy)?;
  Ok(writer.finish())
}
