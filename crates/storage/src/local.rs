//! Local filesystem backend
//!
//! Streams are plain `std::fs::File`s. With the `direct_io` feature on Linux,
//! direct-I/O hints open files with `O_DIRECT` and cache invalidation is
//! forwarded to `posix_fadvise`.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::{FileOptions, FileSyncer, FileSystem, IoResult, IoStatus, RandomAccessFile, WritableFile};

/// Local filesystem backend
///
/// Relative paths resolve against `root` when one is set, otherwise against
/// the process working directory.
#[derive(Debug, Clone, Default)]
pub struct PosixFileSystem {
    /// Directory that relative paths resolve against
    root: Option<PathBuf>,
}

impl PosixFileSystem {
    /// Create a backend resolving paths as the process does
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Create a backend rooted at `root`
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: Some(root.as_ref().to_path_buf()),
        }
    }

    /// Get the root directory, if any
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Resolve a backend path to a filesystem path
    fn resolve_path(&self, path: &str) -> PathBuf {
        match &self.root {
            Some(root) if Path::new(path).is_relative() => root.join(path),
            _ => PathBuf::from(path),
        }
    }

    fn open_options(direct: bool) -> OpenOptions {
        #[allow(unused_mut)]
        let mut opts = OpenOptions::new();

        #[cfg(all(target_os = "linux", feature = "direct_io"))]
        if direct {
            use std::os::unix::fs::OpenOptionsExt;
            opts.custom_flags(libc::O_DIRECT);
        }
        #[cfg(not(all(target_os = "linux", feature = "direct_io")))]
        let _ = direct;

        opts
    }
}

impl FileSystem for PosixFileSystem {
    fn name(&self) -> &str {
        "posix"
    }

    #[instrument(skip(self, opts), fields(backend = "posix", direct = opts.use_direct_writes))]
    fn new_writable_file(&self, path: &str, opts: &FileOptions) -> IoResult<Box<dyn WritableFile>> {
        let full_path = self.resolve_path(path);
        debug!(?full_path, "Opening writable file");

        let file = Self::open_options(opts.use_direct_writes)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&full_path)
            .map_err(|e| {
                IoStatus::new(
                    IoStatus::from(e).code(),
                    format!("Failed to create {}", full_path.display()),
                )
            })?;

        Ok(Box::new(PosixWritableFile {
            file: Some(file),
            path: full_path,
        }))
    }

    #[instrument(skip(self, opts), fields(backend = "posix", direct = opts.use_direct_reads))]
    fn new_random_access_file(
        &self,
        path: &str,
        opts: &FileOptions,
    ) -> IoResult<Box<dyn RandomAccessFile>> {
        let full_path = self.resolve_path(path);
        debug!(?full_path, "Opening random access file");

        let file = Self::open_options(opts.use_direct_reads)
            .read(true)
            .open(&full_path)
            .map_err(|e| {
                IoStatus::new(
                    IoStatus::from(e).code(),
                    format!("Failed to open {}", full_path.display()),
                )
            })?;

        Ok(Box::new(PosixRandomAccessFile {
            file,
            path: full_path,
        }))
    }
}

/// Writable stream over a local file
#[derive(Debug)]
pub struct PosixWritableFile {
    file: Option<File>,
    path: PathBuf,
}

impl PosixWritableFile {
    fn file(&mut self) -> IoResult<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| IoStatus::io_error(format!("{} is closed", self.path.display())))
    }
}

impl WritableFile for PosixWritableFile {
    fn append(&mut self, data: &[u8]) -> IoResult<()> {
        self.file()?.write_all(data)?;
        Ok(())
    }

    fn sync(&mut self) -> IoResult<()> {
        self.file()?.sync_data()?;
        Ok(())
    }

    fn fsync(&mut self) -> IoResult<()> {
        self.file()?.sync_all()?;
        Ok(())
    }

    fn close(&mut self) -> IoResult<()> {
        match self.file.take() {
            Some(mut file) => {
                file.flush()?;
                debug!(path = %self.path.display(), "Closed writable file");
                Ok(())
            }
            None => Err(IoStatus::io_error(format!(
                "{} already closed",
                self.path.display()
            ))),
        }
    }

    fn concurrent_syncer(&self) -> Option<Arc<dyn FileSyncer>> {
        // A duplicated descriptor syncs the same open file description.
        let file = self.file.as_ref()?.try_clone().ok()?;
        Some(Arc::new(PosixSyncer { file }))
    }
}

/// Sync capability backed by a duplicated descriptor
#[derive(Debug)]
struct PosixSyncer {
    file: File,
}

impl FileSyncer for PosixSyncer {
    fn sync(&self) -> IoResult<()> {
        self.file.sync_data()?;
        Ok(())
    }

    fn fsync(&self) -> IoResult<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

/// Positioned-read stream over a local file
#[derive(Debug)]
pub struct PosixRandomAccessFile {
    file: File,
    path: PathBuf,
}

impl PosixRandomAccessFile {
    #[cfg(unix)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        use std::os::unix::fs::FileExt;
        self.file.read_at(buf, offset)
    }

    #[cfg(windows)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        use std::os::windows::fs::FileExt;
        self.file.seek_read(buf, offset)
    }
}

impl RandomAccessFile for PosixRandomAccessFile {
    fn read<'a>(&'a self, offset: u64, scratch: &'a mut [u8]) -> IoResult<&'a [u8]> {
        let mut filled = 0;
        while filled < scratch.len() {
            match self.read_at(&mut scratch[filled..], offset + filled as u64) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(IoStatus::new(
                        IoStatus::from(e).code(),
                        format!("Read of {} at {} failed", self.path.display(), offset),
                    ))
                }
            }
        }
        Ok(&scratch[..filled])
    }

    #[cfg(all(target_os = "linux", feature = "direct_io"))]
    fn invalidate_cache(&self, offset: u64, length: u64) -> IoResult<()> {
        use std::os::unix::io::AsRawFd;

        // SAFETY: the descriptor is owned by `self.file` and open for the
        // duration of the call; posix_fadvise does not touch user memory.
        let ret = unsafe {
            libc::posix_fadvise(
                self.file.as_raw_fd(),
                offset as libc::off_t,
                length as libc::off_t,
                libc::POSIX_FADV_DONTNEED,
            )
        };
        if ret != 0 {
            return Err(IoStatus::from(std::io::Error::from_raw_os_error(ret)));
        }
        Ok(())
    }

    #[cfg(not(all(target_os = "linux", feature = "direct_io")))]
    fn invalidate_cache(&self, _offset: u64, _length: u64) -> IoResult<()> {
        Ok(())
    }
}
