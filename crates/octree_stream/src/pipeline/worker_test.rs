use std::time::Duration;

use super::*;
use crate::download::{DownloadError, MemorySource};
use crate::format::{FormatVersion, SchemaDecoder};
use crate::geometry::{get_children, ParentInfo};
use crate::pipeline::messages::DecodeOptions;
use crate::test_utils::{sample_buffer, single_child_buffer};
use crate::types::OCTANT_COUNT;

const TIMEOUT: Duration = Duration::from_secs(5);

fn node(version: FormatVersion) -> NodeRequest {
  NodeRequest {
    node_id: "r".into(),
    version,
    options: Arc::new(DecodeOptions::default()),
  }
}

fn init(worker: &Worker, source: MemorySource) {
  worker
    .send(WorkerRequest::Init {
      highlights: Arc::new(HighlightTable::new(16)),
      source: Arc::new(source),
    })
    .unwrap();
}

fn load(worker: &Worker, id: u64, url: &str, byte_size: usize, version: FormatVersion) {
  worker
    .send(WorkerRequest::Load {
      id: RequestId(id),
      url: url.into(),
      byte_size: byte_size as u32,
      node: node(version),
    })
    .unwrap();
}

/// Responses up to and including `AbortedAll`.
fn drain_until_aborted_all(worker: &Worker) -> Vec<WorkerResponse> {
  worker.send(WorkerRequest::AbortAll).unwrap();
  let mut out = Vec::new();
  loop {
    let response = worker.recv_timeout(TIMEOUT).expect("worker answers");
    let done = matches!(response, WorkerResponse::AbortedAll);
    out.push(response);
    if done {
      return out;
    }
  }
}

#[test]
fn test_load_ready() {
  let buffer = sample_buffer(FormatVersion::Current);
  let source = MemorySource::new().with_chunk_size(100);
  source.insert("r.bin", buffer.as_bytes());

  let worker = Worker::spawn().unwrap();
  init(&worker, source);
  load(&worker, 1, "r.bin", buffer.len(), FormatVersion::Current);

  match worker.recv_timeout(TIMEOUT).expect("response") {
    WorkerResponse::Ready {
      id,
      children,
      geometry,
      stats,
    } => {
      assert_eq!(id, RequestId(1));
      assert_eq!(children.len(), 2);
      assert_eq!(geometry.sub_meshes.len(), 2);
      assert_eq!(stats.bytes, buffer.len());
    }
    other => panic!("unexpected {other:?}"),
  }
}

#[test]
fn test_parse_held_buffer() {
  let worker = Worker::spawn().unwrap();
  init(&worker, MemorySource::new());
  worker
    .send(WorkerRequest::Parse {
      id: RequestId(4),
      buffer: sample_buffer(FormatVersion::Lts),
      node: node(FormatVersion::Lts),
    })
    .unwrap();

  let response = worker.recv_timeout(TIMEOUT).expect("response");
  assert!(matches!(response, WorkerResponse::Ready { id: RequestId(4), .. }));
}

#[test]
fn test_load_before_init_errors() {
  let worker = Worker::spawn().unwrap();
  load(&worker, 2, "r.bin", 10, FormatVersion::Current);
  match worker.recv_timeout(TIMEOUT).expect("response") {
    WorkerResponse::Error { id, error } => {
      assert_eq!(id, RequestId(2));
      assert_eq!(error, PipelineError::NotInitialized);
    }
    other => panic!("unexpected {other:?}"),
  }
}

#[test]
fn test_download_and_decode_errors() {
  let lts = sample_buffer(FormatVersion::Lts);
  let source = MemorySource::new();
  source.insert("lts.bin", lts.as_bytes());

  let worker = Worker::spawn().unwrap();
  init(&worker, source);
  load(&worker, 1, "missing.bin", 10, FormatVersion::Current);
  load(&worker, 2, "lts.bin", lts.len(), FormatVersion::Current);

  let mut errors = (0..2)
    .map(|_| match worker.recv_timeout(TIMEOUT).expect("response") {
      WorkerResponse::Error { id, error } => (id, error),
      other => panic!("unexpected {other:?}"),
    })
    .collect::<Vec<_>>();
  errors.sort_by_key(|(id, _)| *id);

  assert_eq!(errors.len(), 2);
  assert_eq!(
    errors[0].1,
    PipelineError::Download(DownloadError::NotFound("missing.bin".into()))
  );
  assert!(matches!(errors[1].1, PipelineError::Decode(_)));
}

/// A single-child node: one descriptor comes back, and a load aborted right
/// after it is issued answers `Aborted` exactly once and never `Ready`.
#[test]
fn test_load_then_abort_answers_aborted_once() {
  let buffer = single_child_buffer(FormatVersion::Current);
  let schema = SchemaDecoder::new(FormatVersion::Current).decode(&buffer).unwrap();
  let children = get_children(&schema, &ParentInfo::new("r", [0; OCTANT_COUNT]), None);
  assert_eq!(children.len(), 1);
  assert_eq!(children[0].child_index, 0);
  assert_eq!(children[0].child_mask, 0b1);

  let source = MemorySource::new()
    .with_chunk_size(8)
    .with_chunk_delay(Duration::from_millis(20));
  source.insert("child.bin", buffer.as_bytes());

  let worker = Worker::spawn().unwrap();
  init(&worker, source);
  load(&worker, 9, "child.bin", buffer.len(), FormatVersion::Current);
  worker.send(WorkerRequest::Abort { id: RequestId(9) }).unwrap();

  let responses = drain_until_aborted_all(&worker);
  assert_eq!(responses.len(), 2, "{responses:?}");
  assert!(matches!(responses[0], WorkerResponse::Aborted { id: RequestId(9) }));
  assert!(matches!(responses[1], WorkerResponse::AbortedAll));
}

/// `AbortedAll` comes after every outstanding request has answered.
#[test]
fn test_abort_all_waits_for_active_requests() {
  let buffer = sample_buffer(FormatVersion::Previous);
  let source = MemorySource::new()
    .with_chunk_size(16)
    .with_chunk_delay(Duration::from_millis(10));
  source.insert("a.bin", buffer.as_bytes());
  source.insert("b.bin", buffer.as_bytes());

  let worker = Worker::spawn().unwrap();
  init(&worker, source);
  load(&worker, 1, "a.bin", buffer.len(), FormatVersion::Previous);
  load(&worker, 2, "b.bin", buffer.len(), FormatVersion::Previous);
  std::thread::sleep(Duration::from_millis(30));

  let responses = drain_until_aborted_all(&worker);
  assert_eq!(responses.len(), 3, "{responses:?}");
  let mut aborted: Vec<_> = responses[..2].iter().filter_map(WorkerResponse::id).collect();
  aborted.sort();
  assert_eq!(aborted, vec![RequestId(1), RequestId(2)]);
  assert!(responses[..2]
    .iter()
    .all(|response| matches!(response, WorkerResponse::Aborted { .. })));

  // The same ids can be used again once answered.
  load(&worker, 1, "a.bin", buffer.len(), FormatVersion::Previous);
  let response = worker.recv_timeout(TIMEOUT).expect("response");
  assert!(matches!(response, WorkerResponse::Ready { id: RequestId(1), .. }));
}

#[test]
fn test_abort_unknown_id_is_ignored() {
  let worker = Worker::spawn().unwrap();
  init(&worker, MemorySource::new());
  worker.send(WorkerRequest::Abort { id: RequestId(77) }).unwrap();
  let responses = drain_until_aborted_all(&worker);
  assert!(matches!(responses.as_slice(), [WorkerResponse::AbortedAll]));
}

#[test]
#[should_panic(expected = "reused while outstanding")]
fn test_duplicate_request_id_panics() {
  let (tx, _rx) = crossbeam_channel::unbounded();
  let worker = WorkerLoop::new(tx);
  let _first = worker.accept(RequestId(1), AbortHandle::new());
  let _second = worker.accept(RequestId(1), AbortHandle::new());
}

#[test]
fn test_send_after_shutdown_fails() {
  let mut worker = Worker::spawn().unwrap();
  worker.requests.take();
  assert_eq!(
    worker.send(WorkerRequest::AbortAll),
    Err(PipelineError::Disconnected)
  );
}
