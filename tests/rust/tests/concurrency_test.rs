use anyhow::Result;
use fileshim::{BackendRegistry, ErrorKind, OpenOptions, Shim};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

#[test]
fn test_parallel_jobs_on_one_backend() -> Result<()> {
    let dir = TempDir::new()?;
    let shim = Arc::new(Shim::new());
    shim.configure(&format!("posix://{}", dir.path().display()))?;

    let jobs: Vec<_> = (0..8)
        .map(|job| {
            let shim = Arc::clone(&shim);
            thread::spawn(move || -> Result<()> {
                let name = format!("job{}.0.0", job);
                let fd = shim.open(&name, OpenOptions::read_write())?;
                let block = vec![job as u8; 4096];
                for i in 0..32u64 {
                    shim.write(fd, &block, i * 4096)?;
                    if i % 8 == 0 {
                        shim.sync(fd, false)?;
                    }
                }

                let mut buf = vec![0u8; 4096];
                for i in (0..32u64).rev() {
                    assert_eq!(shim.read(fd, &mut buf, i * 4096)?, 4096);
                    assert_eq!(buf, block);
                }
                shim.close(fd)?;
                Ok(())
            })
        })
        .collect();

    for job in jobs {
        job.join().unwrap()?;
    }
    assert_eq!(shim.registry().len(), 1);
    assert_eq!(shim.open_files(), 0);
    Ok(())
}

#[test]
fn test_descriptors_unique_across_threads() -> Result<()> {
    let shim = Arc::new(Shim::new());
    shim.configure("mem://fds")?;
    let barrier = Arc::new(Barrier::new(8));

    let workers: Vec<_> = (0..8)
        .map(|t| {
            let shim = Arc::clone(&shim);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut fds = Vec::new();
                for i in 0..64 {
                    let fd = shim
                        .open(&format!("{}-{}", t, i), OpenOptions::write_only())
                        .unwrap();
                    fds.push(fd);
                    // Close half of them to interleave removals with allocations.
                    if i % 2 == 0 {
                        shim.close(fd).unwrap();
                    }
                }
                fds
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for worker in workers {
        for fd in worker.join().unwrap() {
            assert!(fd.as_raw() >= 42);
            assert!(seen.insert(fd), "descriptor {} handed out twice", fd);
        }
    }
    assert_eq!(seen.len(), 512);
    assert_eq!(shim.open_files(), 256);
    Ok(())
}

#[test]
fn test_concurrent_readers_and_writer() -> Result<()> {
    let shim = Arc::new(Shim::new());
    shim.configure("mem://mixed")?;
    let fd = shim.open("mixed", OpenOptions::read_write())?;
    shim.write(fd, &[9u8; 65536], 0)?;

    let writer = {
        let shim = Arc::clone(&shim);
        thread::spawn(move || -> Result<()> {
            for i in 0..64u64 {
                shim.write(fd, &[9u8; 1024], 65536 + i * 1024)?;
            }
            Ok(())
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|r| {
            let shim = Arc::clone(&shim);
            thread::spawn(move || -> Result<()> {
                let mut buf = [0u8; 4096];
                for i in 0..16u64 {
                    let n = shim.read(fd, &mut buf, (r * 16 + i) % 16 * 4096)?;
                    assert_eq!(n, 4096);
                    assert!(buf.iter().all(|b| *b == 9));
                }
                Ok(())
            })
        })
        .collect();

    writer.join().unwrap()?;
    for reader in readers {
        reader.join().unwrap()?;
    }
    shim.close(fd)?;
    Ok(())
}

#[test]
fn test_close_races_operations() -> Result<()> {
    let shim = Arc::new(Shim::new());
    shim.configure("mem://race")?;
    let fd = shim.open("race", OpenOptions::write_only())?;
    let barrier = Arc::new(Barrier::new(2));

    let writer = {
        let shim = Arc::clone(&shim);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            let mut offset = 0u64;
            loop {
                match shim.write(fd, &[1u8; 512], offset) {
                    Ok(()) => offset += 512,
                    Err(e) => {
                        assert_eq!(e.kind(), ErrorKind::InvalidDescriptor);
                        return offset;
                    }
                }
            }
        })
    };

    barrier.wait();
    thread::sleep(std::time::Duration::from_millis(5));
    shim.close(fd)?;
    let written = writer.join().unwrap();
    assert_eq!(written % 512, 0);
    Ok(())
}

#[test]
fn test_concurrent_configure_converges() -> Result<()> {
    let registry = Arc::new(BackendRegistry::new());
    let barrier = Arc::new(Barrier::new(16));

    let callers: Vec<_> = (0..16)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.get_or_create("mem://converge").unwrap()
            })
        })
        .collect();

    let backends: Vec<_> = callers.into_iter().map(|c| c.join().unwrap()).collect();
    assert!(backends.iter().all(|b| b.same_instance(&backends[0])));
    assert_eq!(registry.identifiers(), vec!["mem://converge".to_string()]);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_posix_round_trip(chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..2048), 1..16)) {
        let dir = TempDir::new().unwrap();
        let shim = Shim::new();
        shim.configure(&format!("posix://{}", dir.path().display())).unwrap();

        let fd = shim.open("prop.bin", OpenOptions::read_write()).unwrap();
        let mut expected = Vec::new();
        for chunk in &chunks {
            shim.write(fd, chunk, expected.len() as u64).unwrap();
            expected.extend_from_slice(chunk);
        }

        let mut buf = vec![0u8; expected.len()];
        prop_assert_eq!(shim.read(fd, &mut buf, 0).unwrap(), expected.len());
        prop_assert_eq!(buf, expected);
        shim.close(fd).unwrap();
    }
}
