//! JSON-lines record of a solver run: a header, one event per outer iteration and
//! a footer.

use crate::solver::mesh::Mesh;
use crate::solver::options::SolverConfig;
use crate::solver::simple::{IterationRecord, SolveStatus};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

const TRACE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TraceEvent {
    Header(TraceHeader),
    Iteration(IterationRecord),
    Footer(TraceFooter),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceHeader {
    pub format_version: u32,
    pub created_unix_ms: u64,
    pub case: TraceCase,
    pub config: SolverConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceCase {
    pub name: String,
    pub num_cells: usize,
    pub num_faces: usize,
    pub non_orthogonal_correction: bool,
    pub transient: bool,
}

impl TraceCase {
    pub fn from_mesh(name: impl Into<String>, mesh: &Mesh, transient: bool) -> Self {
        Self {
            name: name.into(),
            num_cells: mesh.num_cells(),
            num_faces: mesh.num_faces(),
            non_orthogonal_correction: mesh.use_non_orthogonal_correction,
            transient,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceFooter {
    pub closed_unix_ms: u64,
    pub status: Option<SolveStatus>,
    pub iterations: usize,
    pub wall_time_ms: f64,
    /// Set when the run stopped with an error instead of a status.
    pub error: Option<String>,
}

pub struct TraceWriter {
    path: PathBuf,
    writer: std::io::BufWriter<std::fs::File>,
    events_written: usize,
    flush_every: usize,
}

impl TraceWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref().to_owned();
        let file = std::fs::File::create(&path)
            .map_err(|err| format!("failed to create trace file '{}': {err}", path.display()))?;
        Ok(Self {
            path,
            writer: std::io::BufWriter::new(file),
            events_written: 0,
            flush_every: 25,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn events_written(&self) -> usize {
        self.events_written
    }

    pub fn write_event(&mut self, event: &TraceEvent) -> Result<(), String> {
        serde_json::to_writer(&mut self.writer, event)
            .map_err(|err| format!("failed to serialize trace event: {err}"))?;
        self.writer
            .write_all(b"\n")
            .map_err(|err| format!("failed to write trace event: {err}"))?;
        self.events_written += 1;
        if self.events_written % self.flush_every == 0 {
            let _ = self.writer.flush();
        }
        Ok(())
    }

    pub fn write_iterations(&mut self, records: &[IterationRecord]) -> Result<(), String> {
        for record in records {
            self.write_event(&TraceEvent::Iteration(*record))?;
        }
        Ok(())
    }

    pub fn close(mut self) -> Result<(), String> {
        self.writer
            .flush()
            .map_err(|err| format!("failed to flush trace file: {err}"))?;
        Ok(())
    }
}

/// Reads every event of a trace; blank lines are skipped.
pub fn read_trace(reader: impl BufRead) -> Result<Vec<TraceEvent>, String> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|err| format!("failed to read trace: {err}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let event = serde_json::from_str(&line)
            .map_err(|err| format!("trace line {}: {err}", index + 1))?;
        events.push(event);
    }
    Ok(events)
}

pub fn now_unix_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

pub fn make_header(case: TraceCase, config: &SolverConfig) -> TraceHeader {
    TraceHeader {
        format_version: TRACE_FORMAT_VERSION,
        created_unix_ms: now_unix_ms(),
        case,
        config: config.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::mesh::generate_structured_rect_mesh;

    #[test]
    fn trace_round_trips_through_file() {
        let path = std::env::temp_dir().join(format!("fvflow_trace_{}.jsonl", std::process::id()));
        let mesh = generate_structured_rect_mesh(3, 2, 1.0, 1.0);
        let header = make_header(TraceCase::from_mesh("unit", &mesh, false), &SolverConfig::default());
        let records: Vec<IterationRecord> = (1..=30)
            .map(|i| IterationRecord {
                time_step: 0,
                iteration: i,
                pressure_residual: 0.5f64.powi(i as i32),
                velocity_residual: 0.25f64.powi(i as i32),
                max_mass_imbalance: 1e-3,
            })
            .collect();

        let mut writer = TraceWriter::create(&path).unwrap();
        writer.write_event(&TraceEvent::Header(header.clone())).unwrap();
        writer.write_iterations(&records).unwrap();
        writer
            .write_event(&TraceEvent::Footer(TraceFooter {
                closed_unix_ms: now_unix_ms(),
                status: Some(SolveStatus::MaxIterationsReached),
                iterations: records.len(),
                wall_time_ms: 1.5,
                error: None,
            }))
            .unwrap();
        assert_eq!(writer.events_written(), 32);
        writer.close().unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let events = read_trace(std::io::BufReader::new(file)).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(events.len(), 32);
        assert_eq!(events[0], TraceEvent::Header(header));
        assert_eq!(events[5], TraceEvent::Iteration(records[4]));
        match &events[31] {
            TraceEvent::Footer(footer) => {
                assert_eq!(footer.status, Some(SolveStatus::MaxIterationsReached));
                assert_eq!(footer.iterations, 30);
            }
            other => panic!("expected footer, got {:?}", other),
        }
    }

    #[test]
    fn events_are_tagged_by_type() {
        let line = serde_json::to_string(&TraceEvent::Iteration(IterationRecord {
            time_step: 2,
            iteration: 7,
            pressure_residual: 0.25,
            velocity_residual: 0.5,
            max_mass_imbalance: 0.0,
        }))
        .unwrap();
        assert!(line.starts_with(r#"{"type":"Iteration""#), "{}", line);
        assert!(read_trace("\n\n".as_bytes()).unwrap().is_empty());
        assert!(read_trace("{ nope".as_bytes()).unwrap_err().contains("line 1"));
    }
}
