//! Octree node inspector.
//!
//! Decodes one node file the way the streaming worker does and prints what
//! it holds: group sizes, children and the draw groups built from it.
//!
//! ```text
//! node_inspect path/to/node --format current --hide 12,40
//! RUST_LOG=octree_stream=trace node_inspect path/to/node
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use octree_stream::{decode_node, DecodeOptions, NodeBuffer, Schema, SchemaDecoder, StreamConfig};
use tracing_subscriber::{fmt, EnvFilter};
use web_time::Instant;

/// Decode an octree node file and print its contents.
#[derive(Parser, Debug)]
#[command(name = "node_inspect")]
#[command(about = "Prints schema and geometry statistics of an octree node file")]
struct Args {
  /// Node file to decode.
  path: PathBuf,

  /// Format version: lts, previous, current (or 1, 2, 3).
  #[arg(short, long, default_value = "current")]
  format: String,

  /// Node id, used to derive legacy child ids.
  #[arg(long, default_value = "r")]
  id: String,

  /// Object ids to leave out of the build.
  #[arg(long, value_delimiter = ',')]
  hide: Vec<u32>,

  /// Stream config whose decode options to apply.
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// List every child descriptor.
  #[arg(long)]
  children: bool,
}

fn main() -> Result<()> {
  fmt().with_env_filter(EnvFilter::from_default_env()).init();
  let args = Args::parse();

  let decoder = SchemaDecoder::for_version(&args.format)?;
  let bytes = std::fs::read(&args.path).with_context(|| format!("Failed to read: {}", args.path.display()))?;
  let buffer = NodeBuffer::from_bytes(&bytes);

  let mut options = match &args.config {
    Some(path) => {
      StreamConfig::load(path)
        .with_context(|| format!("Failed to load config: {}", path.display()))?
        .decode
    }
    None => DecodeOptions::default(),
  };
  if !args.hide.is_empty() {
    options = DecodeOptions {
      filter_highlighted: options.filter_highlighted,
      ..DecodeOptions::hiding(options.hidden_objects.iter().copied().chain(args.hide.iter().copied()))
    };
  }

  let schema = decoder
    .decode(&buffer)
    .with_context(|| format!("Failed to decode {} as {}", args.path.display(), decoder.version().as_str()))?;
  println!("{} ({} bytes, format {})", args.path.display(), buffer.len(), decoder.version().as_str());
  print_schema(&schema);

  let start = Instant::now();
  let node = decode_node(&buffer, decoder.version(), &args.id, &options, None)?;
  let elapsed = start.elapsed();
  tracing::debug!(?elapsed, "node decoded");

  let geometry = &node.geometry;
  println!("\ngeometry ({:.2} ms)", elapsed.as_secs_f64() * 1000.0);
  println!("  draw groups  {}", geometry.sub_meshes.len());
  println!("  primitives   {}", geometry.primitive_count());
  println!("  gpu bytes    {}", geometry.gpu_bytes());
  println!("  materials    {}", geometry.materials.len());
  println!("  textures     {}", geometry.textures.len());
  for (i, sub_mesh) in geometry.sub_meshes.iter().enumerate() {
    let key = &sub_mesh.key;
    println!(
      "  [{i}] octant {} {:?} {:?}: {} vertices, {} elements, {} objects, stride {}",
      key.child_index,
      key.primitive_type,
      key.attributes,
      sub_mesh.vertex_count,
      sub_mesh.indices.len(),
      sub_mesh.object_ranges.len(),
      sub_mesh.layout.vertex_stride(),
    );
  }

  println!("\nchildren {}", node.children.len());
  if args.children {
    for child in &node.children {
      println!(
        "  {} octant {} mask {:08b} tol {} size {} prims {} ({:+}) gpu {}",
        child.id,
        child.child_index,
        child.child_mask,
        child.tolerance,
        child.byte_size,
        child.primitives,
        child.primitives_delta,
        child.gpu_bytes,
      );
    }
  }

  Ok(())
}

fn print_schema(schema: &Schema<'_>) {
  println!("  children     {}", schema.child_info.len);
  println!("  projections  {}", schema.sub_mesh_projection.len);
  println!("  submeshes    {}", schema.sub_mesh.len);
  println!("  materials    {}", schema.material.len);
  println!("  textures     {} ({} bytes)", schema.texture_info.len, schema.texture_data.len());
  println!("  vertices     {}", schema.vertex.len);
  println!("  indices      {}", schema.vertex_index.len());
  println!("  triangles    {}", schema.triangle.len);
  println!("  descendants  {}", schema.descendant_object_ids.len());
}
