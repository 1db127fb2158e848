use std::{
    io::{ErrorKind, SeekFrom},
    marker::PhantomData,
    path::{Path, PathBuf},
};

use async_stream::stream;
use serde::de::DeserializeOwned;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncSeekExt, BufReader},
};

use super::{percent_of, OrderedSource, Progressed, ScanStream, SourceError};
use crate::record::LogRecord;

/// Tails a file holding one JSON-encoded record per line.
///
/// The file is opened on the first scan and kept open until
/// [`close`](OrderedSource::close). Every scan resumes after the last line a
/// previous scan handed out and moved past. A malformed line is reported
/// once and skipped. A last line without its newline is still being
/// written and is left for a later scan. If the file shrinks below the
/// resume offset it is assumed to have been truncated and is read again from
/// the start.
#[derive(Debug)]
pub struct JsonLinesSource<R> {
    name: String,
    path: PathBuf,
    reader: Option<BufReader<File>>,
    offset: u64,
    _record: PhantomData<fn() -> R>,
}

impl<R> JsonLinesSource<R> {
    /// Tail the file at `path`, named after its path. The file does not have
    /// to exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: path.display().to_string(),
            path,
            reader: None,
            offset: 0,
            _record: PhantomData,
        }
    }

    /// Override the name the source is registered under.
    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    /// Path of the tailed file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset the next scan resumes from.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether the file handle is currently held.
    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

impl<R> OrderedSource for JsonLinesSource<R>
where
    R: LogRecord + DeserializeOwned + Send,
{
    type Record = R;

    fn name(&self) -> &str {
        &self.name
    }

    fn scan(&mut self) -> ScanStream<'_, R> {
        Box::pin(stream! {
            if self.reader.is_none() {
                match File::open(&self.path).await {
                    Ok(file) => self.reader = Some(BufReader::new(file)),
                    Err(err) if err.kind() == ErrorKind::NotFound => return,
                    Err(err) => {
                        yield Err(SourceError::from(err));
                        return;
                    }
                }
            }
            let reader = match self.reader.as_mut() {
                Some(reader) => reader,
                None => return,
            };
            let total = match reader.get_ref().metadata().await {
                Ok(metadata) => metadata.len(),
                Err(err) => {
                    yield Err(SourceError::from(err));
                    return;
                }
            };
            if total < self.offset {
                self.offset = 0;
            }
            if let Err(err) = reader.seek(SeekFrom::Start(self.offset)).await {
                yield Err(SourceError::from(err));
                return;
            }

            // `start` runs ahead of `self.offset` until the next item is ready
            let mut line = Vec::new();
            let mut start = self.offset;
            loop {
                line.clear();
                let read = match reader.read_until(b'\n', &mut line).await {
                    Ok(read) => read,
                    Err(err) => {
                        self.offset = start;
                        yield Err(SourceError::from(err));
                        return;
                    }
                };
                if read == 0 || line.last() != Some(&b'\n') {
                    break;
                }
                let end = start + read as u64;
                if is_blank(&line) {
                    start = end;
                    continue;
                }
                match serde_json::from_slice::<R>(&line) {
                    Ok(record) => {
                        self.offset = start;
                        yield Ok(Progressed::new(record, percent_of(end, total)));
                    }
                    Err(error) => {
                        self.offset = end;
                        yield Err(SourceError::Decode { offset: start, error });
                        return;
                    }
                }
                start = end;
            }
            self.offset = start;
        })
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        self.reader = None;
        Ok(())
    }
}
