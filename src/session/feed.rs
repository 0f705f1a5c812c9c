//! NDJSON event feed → sessions grouped by (user, session), plus session-level splitting.

use super::{Event, FramedSession, Session, SessionFramer, SessionKey};
use crate::config::FramingConfig;
use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::io::BufRead;
use std::path::Path;
use walkdir::WalkDir;

/// Framed sessions keyed by identity. Ordered so that seeded sampling is reproducible.
pub type SessionPool = BTreeMap<SessionKey, FramedSession>;

/// Groups records into sessions, preserving first-seen session order and event order.
#[derive(Default)]
struct Grouper {
    sessions: Vec<Session>,
    index: HashMap<SessionKey, usize>,
}

impl Grouper {
    fn push(&mut self, key: SessionKey, event: Event) {
        match self.index.get(&key) {
            Some(&i) => self.sessions[i].events.push(event),
            None => {
                self.index.insert(key.clone(), self.sessions.len());
                self.sessions.push(Session::new(key, vec![event]));
            }
        }
    }

    fn finish(self) -> Vec<Session> {
        self.sessions
    }
}

fn identity_field(obj: &Map<String, Value>, column: &str, where_: &str) -> Result<String> {
    match obj.get(column) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(Error::data(format!(
            "{}: column `{}` must be a string or number, got {}",
            where_, column, other
        ))),
        None => Err(Error::data(format!("{}: missing column `{}`", where_, column))),
    }
}

fn feature_row(obj: &Map<String, Value>, columns: &[String], where_: &str) -> Result<Event> {
    let mut values = Vec::with_capacity(columns.len());
    for col in columns {
        let v = obj
            .get(col)
            .ok_or_else(|| Error::data(format!("{}: missing feature `{}`", where_, col)))?;
        let x = v.as_f64().ok_or_else(|| {
            Error::data(format!("{}: feature `{}` is not numeric ({})", where_, col, v))
        })?;
        values.push(x as f32);
    }
    Ok(Event::new(values))
}

fn parse_into(reader: impl BufRead, config: &FramingConfig, source: &str, g: &mut Grouper) -> Result<()> {
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let where_ = format!("{}:{}", source, lineno + 1);
        let value: Value = serde_json::from_str(trimmed)
            .map_err(|e| Error::data(format!("{}: {}", where_, e)))?;
        let obj = value
            .as_object()
            .ok_or_else(|| Error::data(format!("{}: record is not a JSON object", where_)))?;
        let user = identity_field(obj, &config.user_column, &where_)?;
        let session = identity_field(obj, &config.session_column, &where_)?;
        let event = feature_row(obj, &config.feature_columns, &where_)?;
        g.push(SessionKey::new(user, session), event);
    }
    Ok(())
}

/// Parse an NDJSON event feed (one event object per line).
pub fn parse_feed(reader: impl BufRead, config: &FramingConfig) -> Result<Vec<Session>> {
    let mut g = Grouper::default();
    parse_into(reader, config, "<feed>", &mut g)?;
    Ok(g.finish())
}

/// Load a single NDJSON feed file.
pub fn load_feed(path: &Path, config: &FramingConfig) -> Result<Vec<Session>> {
    let file = std::fs::File::open(path)?;
    let mut g = Grouper::default();
    parse_into(
        std::io::BufReader::new(file),
        config,
        &path.display().to_string(),
        &mut g,
    )?;
    Ok(g.finish())
}

/// Load every `*.ndjson` / `*.jsonl` file under `path` (or `path` itself if it is a file).
/// Files are read in sorted path order; events for the same key across files are concatenated.
pub fn load_feed_dir(path: &Path, config: &FramingConfig) -> Result<Vec<Session>> {
    if path.is_file() {
        return load_feed(path, config);
    }
    let mut g = Grouper::default();
    let mut files = 0usize;
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let p = entry.path();
        let is_feed = p
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == "ndjson" || e == "jsonl")
            .unwrap_or(false);
        if !entry.file_type().is_file() || !is_feed {
            continue;
        }
        let file = std::fs::File::open(p)?;
        parse_into(std::io::BufReader::new(file), config, &p.display().to_string(), &mut g)?;
        files += 1;
    }
    tracing::debug!(dir = %path.display(), files, "loaded feed directory");
    Ok(g.finish())
}

/// Parse a probe session: a JSON array whose rows are numeric arrays or objects keyed by feature column.
pub fn parse_probe(value: &Value, config: &FramingConfig) -> Result<Vec<Event>> {
    let rows = value
        .as_array()
        .ok_or_else(|| Error::data("probe session must be a JSON array of events"))?;
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let where_ = format!("event {}", i);
            match row {
                Value::Array(cells) => cells
                    .iter()
                    .map(|c| {
                        c.as_f64().map(|x| x as f32).ok_or_else(|| {
                            Error::data(format!("{}: non-numeric feature {}", where_, c))
                        })
                    })
                    .collect::<Result<Vec<f32>>>()
                    .map(Event::new),
                Value::Object(obj) => feature_row(obj, &config.feature_columns, &where_),
                other => Err(Error::data(format!(
                    "{}: expected array or object, got {}",
                    where_, other
                ))),
            }
        })
        .collect()
}

/// Frame every session into a pool.
pub fn frame_pool(framer: &SessionFramer, sessions: &[Session]) -> Result<SessionPool> {
    let mut pool = SessionPool::new();
    for s in sessions {
        pool.insert(s.key.clone(), framer.frame(s)?);
    }
    Ok(pool)
}

/// Partition a pool at session granularity into (train, validation).
/// No session appears in both parts; the split is a pure function of `seed`.
pub fn split_sessions(pool: SessionPool, val_fraction: f32, seed: u64) -> (SessionPool, SessionPool) {
    let mut keys: Vec<SessionKey> = pool.keys().cloned().collect();
    let mut rng = StdRng::seed_from_u64(seed);
    keys.shuffle(&mut rng);
    let n_val = ((keys.len() as f32) * val_fraction.clamp(0.0, 1.0)).round() as usize;
    let val_keys: std::collections::BTreeSet<SessionKey> = keys.into_iter().take(n_val).collect();

    let mut train = SessionPool::new();
    let mut val = SessionPool::new();
    for (k, v) in pool {
        if val_keys.contains(&k) {
            val.insert(k, v);
        } else {
            train.insert(k, v);
        }
    }
    (train, val)
}
