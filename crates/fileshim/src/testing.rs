//! Scriptable backends for unit tests

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use storage::{
    FileOptions, FileSyncer, FileSystem, IoResult, IoStatus, RandomAccessFile, StatusCode,
    WritableFile,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    OpenWrite,
    OpenRead,
    Append,
    Read,
    Sync,
    Close,
}

#[derive(Debug, Default)]
struct FaultState {
    faults: Mutex<Vec<(Fault, StatusCode)>>,
    append_delay: Option<Duration>,
    concurrent_sync: bool,
    writers_opened: AtomicUsize,
    writers_closed: AtomicUsize,
    concurrent_syncs: AtomicUsize,
    appends_after_close: AtomicUsize,
    appending: AtomicBool,
    syncs_during_append: AtomicUsize,
}

impl FaultState {
    fn check(&self, fault: Fault) -> IoResult<()> {
        let faults = self.faults.lock();
        match faults.iter().find(|(f, _)| *f == fault) {
            Some((_, code)) => Err(IoStatus::new(*code, format!("injected {:?}", fault))),
            None => Ok(()),
        }
    }

    fn record_sync(&self) {
        if self.appending.load(Ordering::SeqCst) {
            self.syncs_during_append.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Single-file backend with injectable failures and call counters
#[derive(Debug, Default)]
pub struct FaultyFileSystem {
    state: Arc<FaultState>,
    data: Arc<Mutex<Vec<u8>>>,
}

impl FaultyFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_append_delay(mut self, delay: Duration) -> Self {
        self.state_mut().append_delay = Some(delay);
        self
    }

    pub fn with_concurrent_sync(mut self) -> Self {
        self.state_mut().concurrent_sync = true;
        self
    }

    fn state_mut(&mut self) -> &mut FaultState {
        Arc::get_mut(&mut self.state).expect("configure before sharing")
    }

    pub fn inject(&self, fault: Fault, code: StatusCode) {
        self.state.faults.lock().push((fault, code));
    }

    pub fn clear(&self) {
        self.state.faults.lock().clear();
    }

    pub fn writers_opened(&self) -> usize {
        self.state.writers_opened.load(Ordering::SeqCst)
    }

    pub fn writers_closed(&self) -> usize {
        self.state.writers_closed.load(Ordering::SeqCst)
    }

    pub fn concurrent_syncs(&self) -> usize {
        self.state.concurrent_syncs.load(Ordering::SeqCst)
    }

    pub fn appends_after_close(&self) -> usize {
        self.state.appends_after_close.load(Ordering::SeqCst)
    }

    /// Syncs that ran while an append was sleeping in the backend
    pub fn syncs_during_append(&self) -> usize {
        self.state.syncs_during_append.load(Ordering::SeqCst)
    }
}

impl FileSystem for FaultyFileSystem {
    fn name(&self) -> &str {
        "faulty"
    }

    fn new_writable_file(&self, _path: &str, _opts: &FileOptions) -> IoResult<Box<dyn WritableFile>> {
        self.state.check(Fault::OpenWrite)?;
        self.state.writers_opened.fetch_add(1, Ordering::SeqCst);
        self.data.lock().clear();
        Ok(Box::new(FaultyWritableFile {
            state: Arc::clone(&self.state),
            data: Arc::clone(&self.data),
            closed: Arc::new(AtomicBool::new(false)),
        }))
    }

    fn new_random_access_file(
        &self,
        _path: &str,
        _opts: &FileOptions,
    ) -> IoResult<Box<dyn RandomAccessFile>> {
        self.state.check(Fault::OpenRead)?;
        Ok(Box::new(FaultyRandomAccessFile {
            state: Arc::clone(&self.state),
            data: Arc::clone(&self.data),
        }))
    }
}

struct FaultyWritableFile {
    state: Arc<FaultState>,
    data: Arc<Mutex<Vec<u8>>>,
    closed: Arc<AtomicBool>,
}

impl WritableFile for FaultyWritableFile {
    fn append(&mut self, data: &[u8]) -> IoResult<()> {
        if let Some(delay) = self.state.append_delay {
            self.state.appending.store(true, Ordering::SeqCst);
            thread::sleep(delay);
            self.state.appending.store(false, Ordering::SeqCst);
        }
        if self.closed.load(Ordering::SeqCst) {
            self.state.appends_after_close.fetch_add(1, Ordering::SeqCst);
        }
        self.state.check(Fault::Append)?;
        self.data.lock().extend_from_slice(data);
        Ok(())
    }

    fn sync(&mut self) -> IoResult<()> {
        self.state.record_sync();
        self.state.check(Fault::Sync)
    }

    fn fsync(&mut self) -> IoResult<()> {
        self.state.record_sync();
        self.state.check(Fault::Sync)
    }

    fn close(&mut self) -> IoResult<()> {
        self.state.check(Fault::Close)?;
        self.closed.store(true, Ordering::SeqCst);
        self.state.writers_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn concurrent_syncer(&self) -> Option<Arc<dyn FileSyncer>> {
        if !self.state.concurrent_sync {
            return None;
        }
        Some(Arc::new(FaultySyncer {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FaultySyncer {
    state: Arc<FaultState>,
}

impl FileSyncer for FaultySyncer {
    fn sync(&self) -> IoResult<()> {
        self.state.record_sync();
        self.state.check(Fault::Sync)?;
        self.state.concurrent_syncs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn fsync(&self) -> IoResult<()> {
        self.state.record_sync();
        self.state.check(Fault::Sync)?;
        self.state.concurrent_syncs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FaultyRandomAccessFile {
    state: Arc<FaultState>,
    data: Arc<Mutex<Vec<u8>>>,
}

impl RandomAccessFile for FaultyRandomAccessFile {
    fn read<'a>(&'a self, offset: u64, scratch: &'a mut [u8]) -> IoResult<&'a [u8]> {
        self.state.check(Fault::Read)?;
        let data = self.data.lock();
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let n = scratch.len().min(data.len() - start);
        scratch[..n].copy_from_slice(&data[start..start + n]);
        Ok(&scratch[..n])
    }

    fn invalidate_cache(&self, _offset: u64, _length: u64) -> IoResult<()> {
        self.state.check(Fault::Read)
    }
}

static FOREIGN: [u8; 64] = [0xAB; 64];

/// Read-only backend that answers reads from its own memory
#[derive(Debug)]
pub struct MisplacingFileSystem;

impl FileSystem for MisplacingFileSystem {
    fn name(&self) -> &str {
        "misplace"
    }

    fn new_writable_file(&self, path: &str, _opts: &FileOptions) -> IoResult<Box<dyn WritableFile>> {
        Err(IoStatus::not_supported(format!("{} is read-only", path)))
    }

    fn new_random_access_file(
        &self,
        _path: &str,
        _opts: &FileOptions,
    ) -> IoResult<Box<dyn RandomAccessFile>> {
        Ok(Box::new(MisplacingFile))
    }
}

struct MisplacingFile;

impl RandomAccessFile for MisplacingFile {
    fn read<'a>(&'a self, _offset: u64, scratch: &'a mut [u8]) -> IoResult<&'a [u8]> {
        let n = scratch.len().min(FOREIGN.len());
        Ok(&FOREIGN[..n])
    }

    fn invalidate_cache(&self, _offset: u64, _length: u64) -> IoResult<()> {
        Ok(())
    }
}
