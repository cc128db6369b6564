//! CSV-backed [`ResponseStore`].
//!
//! The response table holds `pattern,message,require_mention,react_emoji`
//! rows and the lock table holds `permissions,roles,users` rows, both
//! without a header. Rewrites go through a temporary file in the same
//! directory that is renamed over the live file, so a reader only ever sees a
//! complete table. Each file has its own mutex; one writer at a time.

#[path = "csv_store_tests.rs"]
mod csv_store_tests;

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use reply_types::lock::is_id_list;
use reply_types::{compile_pattern, LockSpec, ResponseRow, COMMAND_COUNT};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::store::{truncate_fields, ListedRow, ResponseStore};

/// Default response table filename.
pub const DEFAULT_RESPONSES_FILE: &str = "replies.csv";

/// Default lock table filename.
pub const DEFAULT_LOCKS_FILE: &str = "locks.csv";

/// Number of fields in a lock table row.
const LOCK_FIELDS: usize = 3;

pub struct CsvStore {
    responses: PathBuf,
    locks: PathBuf,
    responses_guard: Mutex<()>,
    locks_guard: Mutex<()>,
}

impl CsvStore {
    pub fn new(responses: impl Into<PathBuf>, locks: impl Into<PathBuf>) -> Self {
        Self {
            responses: responses.into(),
            locks: locks.into(),
            responses_guard: Mutex::new(()),
            locks_guard: Mutex::new(()),
        }
    }

    pub fn responses_path(&self) -> &Path {
        &self.responses
    }

    pub fn locks_path(&self) -> &Path {
        &self.locks
    }

    fn lock_responses(&self) -> MutexGuard<'_, ()> {
        self.responses_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_locks(&self) -> MutexGuard<'_, ()> {
        self.locks_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Every record of the response table with its 1-based line number.
    fn read_responses(&self) -> Result<Vec<(u64, Vec<String>)>> {
        read_records(&self.responses)
    }

    /// Lock rows as raw fields, exactly `COMMAND_COUNT` of them.
    fn read_lock_rows(&self) -> Result<Vec<Vec<String>>> {
        let records = match read_records(&self.locks) {
            Ok(records) => records,
            Err(e) if e.is_not_found() => {
                debug!(
                    "Lock table {} not found, using defaults",
                    self.locks.display()
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let defaults = default_lock_row();
        let mut rows = Vec::with_capacity(COMMAND_COUNT);
        for (line, mut fields) in records.into_iter().take(COMMAND_COUNT) {
            if fields.len() > LOCK_FIELDS {
                return Err(Error::MalformedRow {
                    path: self.locks.clone(),
                    line,
                });
            }
            while fields.len() < LOCK_FIELDS {
                fields.push(defaults[fields.len()].clone());
            }
            rows.push(fields);
        }
        while rows.len() < COMMAND_COUNT {
            rows.push(default_lock_row());
        }
        Ok(rows)
    }
}

impl ResponseStore for CsvStore {
    fn identifier(&self) -> String {
        self.responses.display().to_string()
    }

    fn list(&self, truncate: bool, index: Option<usize>) -> Result<Vec<ListedRow>> {
        let _guard = self.lock_responses();
        let records = self.read_responses()?;
        Ok(records
            .into_iter()
            .enumerate()
            .filter(|(i, _)| index.map_or(true, |wanted| wanted == *i))
            .map(|(i, (_, fields))| ListedRow {
                index: i,
                fields: if truncate {
                    truncate_fields(&fields)
                } else {
                    fields
                },
            })
            .collect())
    }

    fn rows(&self) -> Result<Vec<ResponseRow>> {
        let _guard = self.lock_responses();
        self.read_responses()?
            .into_iter()
            .map(|(line, fields)| {
                ResponseRow::from_fields(&fields).ok_or_else(|| Error::MalformedRow {
                    path: self.responses.clone(),
                    line,
                })
            })
            .collect()
    }

    fn add(&self, raw: &str) -> Result<bool> {
        let Some(fields) = parse_single_row(raw) else {
            return Ok(false);
        };
        let Some(row) = ResponseRow::from_fields(&fields) else {
            debug!("Rejected response row '{}': bad field count or flag", raw);
            return Ok(false);
        };
        if row.message.trim().is_empty() {
            debug!("Rejected response row '{}': empty message", raw);
            return Ok(false);
        }
        if let Err(e) = compile_pattern(&row.pattern) {
            debug!("Rejected response row '{}': invalid pattern: {}", raw, e);
            return Ok(false);
        }

        let _guard = self.lock_responses();
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.responses)
            .map_err(|e| Error::io(&self.responses, e))?;

        if !ends_with_newline(&mut file).map_err(|e| Error::io(&self.responses, e))? {
            file.write_all(b"\n")
                .map_err(|e| Error::io(&self.responses, e))?;
        }

        let mut writer = csv_writer(&mut file);
        writer
            .write_record(row.to_fields())
            .map_err(|e| Error::csv(&self.responses, e))?;
        writer
            .flush()
            .map_err(|e| Error::io(&self.responses, e))?;

        info!("Added response row to {}", self.responses.display());
        Ok(true)
    }

    fn delete(&self, index: usize) -> Result<bool> {
        let _guard = self.lock_responses();
        let source = File::open(&self.responses).map_err(|e| Error::io(&self.responses, e))?;
        let mut reader = csv_reader(source);

        let mut temp = NamedTempFile::new_in(parent_dir(&self.responses))
            .map_err(|e| Error::io(&self.responses, e))?;
        let mut found = false;
        {
            let mut writer = csv_writer(temp.as_file_mut());
            for (i, record) in reader.records().enumerate() {
                let record = record.map_err(|e| Error::csv(&self.responses, e))?;
                if i == index {
                    found = true;
                    continue;
                }
                writer
                    .write_record(&record)
                    .map_err(|e| Error::csv(&self.responses, e))?;
            }
            writer
                .flush()
                .map_err(|e| Error::io(&self.responses, e))?;
        }

        if !found {
            debug!(
                "Delete index {} not found in {}",
                index,
                self.responses.display()
            );
            return Ok(false);
        }

        replace_with(temp, &self.responses)?;
        info!(
            "Removed index {} from {}",
            index,
            self.responses.display()
        );
        Ok(true)
    }

    fn get_locks(&self) -> Result<Vec<LockSpec>> {
        let _guard = self.lock_locks();
        Ok(self
            .read_lock_rows()?
            .iter()
            .map(|f| LockSpec::from_fields(&f[0], &f[1], &f[2]))
            .collect())
    }

    fn set_locks(&self, raw: &str, reset: bool) -> Result<bool> {
        let fields = if reset {
            default_lock_row()
        } else {
            match parse_lock_row(raw) {
                Some(fields) => fields,
                None => {
                    debug!("Rejected lock row '{}'", raw);
                    return Ok(false);
                }
            }
        };

        let _guard = self.lock_locks();
        let rows = vec![fields; COMMAND_COUNT];
        write_atomic(&self.locks, &rows)?;
        info!("Wrote lock to all {} slots of {}", COMMAND_COUNT, self.locks.display());
        Ok(true)
    }

    fn set_lock(&self, slot: usize, raw: &str) -> Result<bool> {
        if slot >= COMMAND_COUNT {
            warn!("Lock slot {} out of range", slot);
            return Ok(false);
        }
        let Some(fields) = parse_lock_row(raw) else {
            debug!("Rejected lock row '{}'", raw);
            return Ok(false);
        };

        let _guard = self.lock_locks();
        let mut rows = self.read_lock_rows()?;
        rows[slot] = fields;
        write_atomic(&self.locks, &rows)?;
        info!("Wrote lock to slot {} of {}", slot, self.locks.display());
        Ok(true)
    }
}

/// Lock row written by a reset, and used for missing fields.
fn default_lock_row() -> Vec<String> {
    LockSpec::default().to_fields().to_vec()
}

fn csv_reader<R: Read>(source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(source)
}

fn csv_writer<W: Write>(target: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(target)
}

fn read_records(path: &Path) -> Result<Vec<(u64, Vec<String>)>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut reader = csv_reader(file);
    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| Error::csv(path, e))?;
        let line = record.position().map_or(0, |p| p.line());
        records.push((line, record.iter().map(str::to_string).collect()));
    }
    Ok(records)
}

/// Parse `raw` as exactly one CSV row. Input holding a second record is
/// rejected.
fn parse_single_row(raw: &str) -> Option<Vec<String>> {
    let mut reader = csv_reader(raw.as_bytes());
    let mut records = reader.records();
    let record = records.next()?.ok()?;
    if records.next().is_some() {
        return None;
    }
    Some(record.iter().map(str::to_string).collect())
}

/// Three fields, with the role and user fields empty or digit lists.
/// Returned in canonical form: known permission names only, sorted ids.
fn parse_lock_row(raw: &str) -> Option<Vec<String>> {
    let fields = parse_single_row(raw)?;
    if fields.len() == LOCK_FIELDS && is_id_list(&fields[1]) && is_id_list(&fields[2]) {
        Some(
            LockSpec::from_fields(&fields[0], &fields[1], &fields[2])
                .to_fields()
                .to_vec(),
        )
    } else {
        None
    }
}

fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Write `rows` to a temp file beside `path` and rename it over `path`.
fn write_atomic(path: &Path, rows: &[Vec<String>]) -> Result<()> {
    let mut temp = NamedTempFile::new_in(parent_dir(path)).map_err(|e| Error::io(path, e))?;
    {
        let mut writer = csv_writer(temp.as_file_mut());
        for row in rows {
            writer
                .write_record(row)
                .map_err(|e| Error::csv(path, e))?;
        }
        writer.flush().map_err(|e| Error::io(path, e))?;
    }
    replace_with(temp, path)
}

/// Rename `temp` over `path`, keeping the permissions `path` already had.
fn replace_with(temp: NamedTempFile, path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) => temp
            .as_file()
            .set_permissions(meta.permissions())
            .map_err(|e| Error::io(path, e))?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::io(path, e)),
    }
    temp.as_file()
        .sync_all()
        .map_err(|e| Error::io(path, e))?;
    temp.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}
