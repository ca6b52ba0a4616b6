//! CSV load-and-probe workflow
//!
//! Turns a CSV file into a fixed sequence of calls against one dataset:
//!
//! 1. create the dataset, sized from the line count
//! 2. bulk-insert every line in batches of `BATCH_SIZE`, keyed by line offset
//! 3. one range query over `RANGE_START..=RANGE_END`
//! 4. delete `DELETE_KEYS` in order
//! 5. search `SEARCH_KEYS` in order
//!
//! The probe keys are fixed and do not depend on the input size.

use std::fmt;
use std::path::Path;
use std::thread;
use std::time::Duration;

use bptload_proto::{DatasetName, Entry, ProtoResult, Reply, Request};
use tracing::{debug, info};

use crate::client::Transport;
use crate::error::{ClientError, ClientResult};

/// Lines per bulk-insert call
pub const BATCH_SIZE: usize = 10;
/// Smallest order ever requested at creation
pub const MIN_ORDER: usize = 2;
pub const RANGE_START: u64 = 5;
pub const RANGE_END: u64 = 15;
pub const DELETE_KEYS: [u64; 3] = [5, 7, 13];
pub const SEARCH_KEYS: [u64; 3] = [6, 7, 8];

/// Order requested for a dataset of `line_count` lines
pub fn order_for(line_count: usize) -> usize {
    (line_count / 4).max(MIN_ORDER)
}

/// ISO-8859-1 decode: every byte is the code point of the same value
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Split into lines, keeping each terminator attached.
///
/// `\n`, `\r\n` and a lone `\r` all end a line. Trailing text without a
/// terminator is a line of its own.
pub fn split_lines(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let end = match bytes[i] {
            b'\n' => i + 1,
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => i + 2,
            b'\r' => i + 1,
            _ => {
                i += 1;
                continue;
            }
        };
        lines.push(text[start..end].to_string());
        start = end;
        i = end;
    }
    if start < bytes.len() {
        lines.push(text[start..].to_string());
    }

    lines
}

/// Dataset name for an input file: its base name without extension
pub fn dataset_name_for(path: &Path) -> ClientResult<DatasetName> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ClientError::InvalidInput(format!("no usable file name in {}", path.display())))?;
    Ok(DatasetName::new(stem)?)
}

// ============================================================================
// Input
// ============================================================================

/// A loaded CSV file
#[derive(Debug, Clone)]
pub struct CsvInput {
    name: DatasetName,
    lines: Vec<String>,
}

impl CsvInput {
    /// Read and split `path`. No CSV structure is validated.
    pub fn load(path: &Path) -> ClientResult<Self> {
        let name = dataset_name_for(path)?;
        let bytes = std::fs::read(path).map_err(|source| ClientError::Input {
            path: path.to_path_buf(),
            source,
        })?;
        let input = CsvInput::from_text(name, &decode_latin1(&bytes));
        debug!("Loaded {} lines from {}", input.line_count(), path.display());
        Ok(input)
    }

    pub fn from_text(name: DatasetName, text: &str) -> Self {
        CsvInput {
            name,
            lines: split_lines(text),
        }
    }

    pub fn dataset_name(&self) -> &DatasetName {
        &self.name
    }

    /// Raw lines, terminators included
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn order(&self) -> usize {
        order_for(self.line_count())
    }

    pub fn batch_count(&self) -> usize {
        self.line_count().div_ceil(BATCH_SIZE)
    }

    /// Consecutive batches of entries, keyed by absolute line offset
    pub fn batches(&self) -> impl Iterator<Item = Vec<Entry>> + '_ {
        self.lines.chunks(BATCH_SIZE).enumerate().map(|(batch, chunk)| {
            let offset = batch * BATCH_SIZE;
            chunk
                .iter()
                .enumerate()
                .map(|(idx, line)| Entry {
                    key: (offset + idx) as u64,
                    line: line.trim().to_string(),
                })
                .collect()
        })
    }
}

// ============================================================================
// Plan
// ============================================================================

/// What a step does, for headings and pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Create { order: usize },
    /// 1-based batch number
    Insert { batch: usize, batches: usize },
    Range { start: u64, end: u64 },
    Delete { key: u64 },
    Search { key: u64 },
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Create { order } => write!(f, "Creating dataset with order {}", order),
            Phase::Insert { batch, batches } => write!(f, "Inserting batch {} of {}", batch, batches),
            Phase::Range { start, end } => write!(f, "Range query from {} to {}", start, end),
            Phase::Delete { key } => write!(f, "Deleting key {}", key),
            Phase::Search { key } => write!(f, "Searching for key {}", key),
        }
    }
}

/// One planned call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub phase: Phase,
    pub request: Request,
}

/// The full call sequence for `input`, in issue order
pub fn plan(input: &CsvInput) -> ProtoResult<Vec<Step>> {
    let name = input.dataset_name();
    let batches = input.batch_count();
    let mut steps = Vec::with_capacity(batches + 2 + DELETE_KEYS.len() + SEARCH_KEYS.len());

    let order = input.order();
    steps.push(Step {
        phase: Phase::Create { order },
        request: Request::create(name, order),
    });

    for (i, entries) in input.batches().enumerate() {
        steps.push(Step {
            phase: Phase::Insert { batch: i + 1, batches },
            request: Request::bulk(name, &entries)?,
        });
    }

    steps.push(Step {
        phase: Phase::Range { start: RANGE_START, end: RANGE_END },
        request: Request::range(name, RANGE_START, RANGE_END),
    });

    for key in DELETE_KEYS {
        steps.push(Step {
            phase: Phase::Delete { key },
            request: Request::delete(name, key),
        });
    }

    for key in SEARCH_KEYS {
        steps.push(Step {
            phase: Phase::Search { key },
            request: Request::search(name, key),
        });
    }

    Ok(steps)
}

// ============================================================================
// Pacing
// ============================================================================

/// Spacing imposed after a step completes
pub trait Pacer {
    fn pause_after(&mut self, phase: &Phase);
}

/// Never waits
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPacer;

impl Pacer for NoPacer {
    fn pause_after(&mut self, _phase: &Phase) {}
}

/// Fixed delays per phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub after_create: Duration,
    pub after_batch: Duration,
    pub after_delete: Duration,
    pub after_search: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing {
            after_create: Duration::from_millis(1000),
            after_batch: Duration::from_millis(1000),
            after_delete: Duration::from_millis(500),
            after_search: Duration::from_millis(500),
        }
    }
}

impl Pacing {
    pub fn none() -> Self {
        Pacing {
            after_create: Duration::ZERO,
            after_batch: Duration::ZERO,
            after_delete: Duration::ZERO,
            after_search: Duration::ZERO,
        }
    }

    pub fn delay_after(&self, phase: &Phase) -> Duration {
        match phase {
            Phase::Create { .. } => self.after_create,
            Phase::Insert { .. } => self.after_batch,
            Phase::Range { .. } => Duration::ZERO,
            Phase::Delete { .. } => self.after_delete,
            Phase::Search { .. } => self.after_search,
        }
    }
}

/// Sleeps the configured delay on the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct SleepPacer {
    pacing: Pacing,
}

impl SleepPacer {
    pub fn new(pacing: Pacing) -> Self {
        SleepPacer { pacing }
    }
}

impl Pacer for SleepPacer {
    fn pause_after(&mut self, phase: &Phase) {
        let delay = self.pacing.delay_after(phase);
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
}

// ============================================================================
// Run
// ============================================================================

/// Counters for a finished run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub requests: usize,
    pub batches: usize,
    pub json_replies: usize,
    pub raw_replies: usize,
}

/// Execute the plan for `input` strictly in order.
///
/// `on_reply` sees every step with its decoded reply. The first transport
/// error aborts the run; replies are never inspected for application errors.
pub fn run<T, P, F>(input: &CsvInput, transport: &mut T, pacer: &mut P, mut on_reply: F) -> ClientResult<RunSummary>
where
    T: Transport + ?Sized,
    P: Pacer + ?Sized,
    F: FnMut(&Step, &Reply),
{
    let steps = plan(input)?;
    info!(
        "Dataset '{}': {} lines, order {}, {} requests planned",
        input.dataset_name(),
        input.line_count(),
        input.order(),
        steps.len()
    );

    let mut summary = RunSummary::default();
    for step in &steps {
        info!("{}", step.phase);
        let reply = transport.send(&step.request)?;

        summary.requests += 1;
        if matches!(step.phase, Phase::Insert { .. }) {
            summary.batches += 1;
        }
        if reply.is_json() {
            summary.json_replies += 1;
        } else {
            summary.raw_replies += 1;
        }

        on_reply(step, &reply);
        pacer.pause_after(&step.phase);
    }

    Ok(summary)
}
