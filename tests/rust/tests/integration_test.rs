use anyhow::Result;
use fileshim::{Descriptor, ErrorKind, OpenOptions, Shim, ShimConfig, ShortReadPolicy};
use std::fs;
use tempfile::TempDir;

fn posix_shim(dir: &TempDir) -> Result<Shim> {
    let shim = Shim::new();
    shim.configure(&format!("posix://{}", dir.path().display()))?;
    Ok(shim)
}

#[test]
fn test_full_job_lifecycle() -> Result<()> {
    let dir = TempDir::new()?;
    let shim = posix_shim(&dir)?;

    // 1. Lay out the file sequentially, as a write phase would
    let fd = shim.open("job0.0.0", OpenOptions::write_only())?;
    let block = vec![0x5Au8; 4096];
    for i in 0..16u64 {
        shim.write(fd, &block, i * 4096)?;
    }
    shim.sync(fd, true)?;
    shim.close(fd)?;
    assert_eq!(fs::metadata(dir.path().join("job0.0.0"))?.len(), 16 * 4096);

    // 2. Random reads over the laid out file
    let fd = shim.open("job0.0.0", OpenOptions::read_only())?;
    let mut buf = vec![0u8; 4096];
    for i in [7u64, 0, 15, 3] {
        assert_eq!(shim.read(fd, &mut buf, i * 4096)?, 4096);
        assert!(buf.iter().all(|b| *b == 0x5A));
    }
    shim.invalidate(fd)?;

    // 3. Read past the end is reported, not hidden
    assert_eq!(shim.read(fd, &mut buf, 16 * 4096 - 100)?, 100);
    assert_eq!(shim.read(fd, &mut buf, 1 << 30)?, 0);
    shim.close(fd)?;

    // 4. The descriptor is dead afterwards
    let err = shim.read(fd, &mut buf, 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDescriptor);
    Ok(())
}

#[test]
fn test_sequential_and_capability_scenarios() -> Result<()> {
    let shim = Shim::new();
    shim.configure("mem://scenarios")?;

    let fd = shim.open("seq", OpenOptions::write_only())?;
    shim.write(fd, &[1u8; 4096], 0)?;
    shim.write(fd, &[2u8; 4096], 4096)?;
    let err = shim.write(fd, &[3u8; 100], 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfOrderWrite);
    assert_eq!(err.errno(), -29);
    shim.close(fd)?;

    let ro = shim.open("seq", OpenOptions::read_only())?;
    assert_eq!(
        shim.write(ro, b"x", 0).unwrap_err().kind(),
        ErrorKind::NoWriteCapability
    );
    let mut buf = [0u8; 100];
    assert_eq!(shim.read(ro, &mut buf, 8192 - 100)?, 100);
    assert!(buf.iter().all(|b| *b == 2));
    shim.close(ro)?;
    Ok(())
}

#[test]
fn test_rewrite_truncates() -> Result<()> {
    let dir = TempDir::new()?;
    let shim = posix_shim(&dir)?;

    let fd = shim.open("f", OpenOptions::write_only())?;
    shim.write(fd, &[1u8; 8192], 0)?;
    shim.close(fd)?;

    // Reopening for write starts a fresh sequential stream at offset 0.
    let fd = shim.open("f", OpenOptions::write_only())?;
    shim.write(fd, &[2u8; 10], 0)?;
    shim.close(fd)?;
    assert_eq!(fs::read(dir.path().join("f"))?, vec![2u8; 10]);
    Ok(())
}

#[test]
fn test_reject_short_reads() -> Result<()> {
    let config = ShimConfig {
        short_read: ShortReadPolicy::Reject,
        default_backend: Some("mem://strict".to_string()),
        ..ShimConfig::default()
    };
    let shim = Shim::from_config(config)?;

    let fd = shim.open("f", OpenOptions::read_write())?;
    shim.write(fd, b"0123456789", 0)?;
    let mut buf = [0u8; 8];
    assert_eq!(shim.read(fd, &mut buf, 0)?, 8);
    let err = shim.read(fd, &mut buf, 6).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IoFault);
    Ok(())
}

#[test]
fn test_config_file() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("fileshim.json");
    fs::write(
        &path,
        r#"{ "descriptor_base": 1000, "default_backend": "mem://from-file" }"#,
    )?;

    let shim = Shim::from_config(ShimConfig::load(&path)?)?;
    let fd = shim.open("f", OpenOptions::write_only())?;
    assert_eq!(fd, Descriptor::from_raw(1000));
    Ok(())
}

#[test]
fn test_direct_hint_is_accepted() -> Result<()> {
    let dir = TempDir::new()?;
    let shim = posix_shim(&dir)?;

    // Built without direct_io, the hint is passed through and ignored.
    let opts = OpenOptions::write_only().direct(true);
    let fd = shim.open("direct", opts)?;
    shim.write(fd, &[0u8; 4096], 0)?;
    shim.close(fd)?;
    Ok(())
}
