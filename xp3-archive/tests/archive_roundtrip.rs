//! End-to-end archive tests: build, reparse, extract

use std::fs;

use xp3_archive::{
    Archive, ArchiveBuilder, Entry, Error, Header, Segment, Stream, Table, adler::adler32,
    compress,
};
use xp3_crypto::XorKey;

#[test]
fn test_full_roundtrip_in_memory() {
    let key = XorKey::new(0x9c, 0x2f);
    let script = b"*start\n@bg storage=school.png\nnyaa~\n".repeat(32);
    let pixels: Vec<u8> = (0..2048u32).map(|i| (i * 7 % 251) as u8).collect();

    let mut builder = ArchiveBuilder::new().with_key(key);
    builder
        .add_entry("scenario/01.ks", script.clone(), Some(1_650_000_000_000))
        .unwrap();
    builder.add_entry("image/bg.raw", pixels.clone(), None).unwrap();
    builder.add_entry("empty.txt", Vec::new(), None).unwrap();

    let mut archive = Archive::from_stream(builder.build().unwrap()).unwrap();
    assert_eq!(archive.entries().len(), 3);

    let entry = archive.entry("scenario/01.ks").unwrap().clone();
    assert!(entry.protected);
    assert_eq!(entry.timestamp, Some(1_650_000_000_000));
    assert_eq!(archive.read_entry(&entry, Some(key)).unwrap(), script);

    let entry = archive.entry("image/bg.raw").unwrap().clone();
    assert_eq!(archive.read_entry(&entry, Some(key)).unwrap(), pixels);

    let entry = archive.entry("empty.txt").unwrap().clone();
    assert_eq!(archive.read_entry(&entry, Some(key)).unwrap(), Vec::<u8>::new());

    println!("✓ In-memory build/reparse roundtrip works correctly");
}

#[test]
fn test_file_roundtrip_and_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("game.xp3");

    let mut builder = ArchiveBuilder::new();
    builder
        .add_entry("data/text/intro.ks", b"[cm]Welcome.".to_vec(), None)
        .unwrap();
    builder
        .add_entry("data/sound/click.wav", vec![0x52u8; 300], None)
        .unwrap();
    builder.write_to_file(&path).unwrap();

    let mut archive = Archive::open(&path).unwrap();
    let out = dir.path().join("extracted");
    archive.extract_to(&out, None).unwrap();

    assert_eq!(
        fs::read(out.join("data").join("text").join("intro.ks")).unwrap(),
        b"[cm]Welcome."
    );
    assert_eq!(
        fs::read(out.join("data").join("sound").join("click.wav")).unwrap(),
        vec![0x52u8; 300]
    );

    println!("✓ On-disk build/extract roundtrip works correctly");
}

#[test]
fn test_unicode_entry_names() {
    let mut builder = ArchiveBuilder::new();
    builder
        .add_entry("シナリオ/第01章.ks", b"[r]".to_vec(), None)
        .unwrap();

    let mut archive = Archive::from_stream(builder.build().unwrap()).unwrap();
    let entry = archive.entry("シナリオ/第01章.ks").unwrap().clone();
    assert_eq!(archive.read_entry(&entry, None).unwrap(), b"[r]");
}

#[test]
fn test_empty_archive() {
    let builder = ArchiveBuilder::new();
    let stream = builder.build().unwrap();

    let archive = Archive::from_stream(stream).unwrap();
    assert!(archive.entries().is_empty());
}

#[test]
fn test_wrong_key_is_detected() {
    let key = XorKey::new(0x44, 0x93);
    let mut builder = ArchiveBuilder::new().with_key(key);
    builder
        .add_entry("secret.ks", b"hidden route unlocked".to_vec(), None)
        .unwrap();

    let mut archive = Archive::from_stream(builder.build().unwrap()).unwrap();
    let entry = archive.entry("secret.ks").unwrap().clone();

    let err = archive
        .read_entry(&entry, Some(XorKey::new(0x44, 0x94)))
        .unwrap_err();
    assert!(
        matches!(err, Error::ChecksumMismatch { .. }),
        "actual error: {err:?}"
    );

    assert_eq!(
        archive.read_entry(&entry, Some(key)).unwrap(),
        b"hidden route unlocked"
    );
}

/// An entry split across a stored and a deflated segment, assembled by
/// hand since the builder always packs one segment per file.
#[test]
fn test_multi_segment_entry_reassembly() {
    let part1 = b"stored head / ".to_vec();
    let part2 = vec![0x61u8; 512];
    let mut plain = part1.clone();
    plain.extend_from_slice(&part2);

    let mut archive = Stream::new(0).unwrap();
    let mut header = Header::new();
    header.write_to(&mut archive).unwrap();

    let offset1 = archive.position() as u64;
    archive.write(&part1).unwrap();

    let deflated = compress::deflate(&Stream::from_vec(part2.clone()), part2.len()).unwrap();
    let offset2 = archive.position() as u64;
    archive.write(deflated.as_bytes()).unwrap();

    let table = Table {
        entries: vec![Entry {
            name: "joined.bin".to_string(),
            protected: false,
            original_size: plain.len() as u64,
            archived_size: (part1.len() + deflated.len()) as u64,
            checksum: adler32(&plain),
            timestamp: None,
            segments: vec![
                Segment {
                    compressed: false,
                    offset: offset1,
                    original_size: part1.len() as u64,
                    archived_size: part1.len() as u64,
                },
                Segment {
                    compressed: true,
                    offset: offset2,
                    original_size: part2.len() as u64,
                    archived_size: deflated.len() as u64,
                },
            ],
        }],
    };

    let chunks = table.build().unwrap();
    header.table_offset = archive.position() as u64;
    archive.write_u8(0).unwrap();
    archive.write_u64_le(chunks.len() as u64).unwrap();
    archive.write(chunks.as_bytes()).unwrap();
    header.table_size = archive.position() as u64 - header.table_offset;

    archive.rewind();
    header.write_to(&mut archive).unwrap();
    archive.rewind();

    let mut parsed = Archive::from_stream(archive).unwrap();
    let entry = parsed.entry("joined.bin").unwrap().clone();
    assert_eq!(entry.segments.len(), 2);
    assert_eq!(parsed.read_entry(&entry, None).unwrap(), plain);

    println!("✓ Multi-segment reassembly works correctly");
}

/// The serialized header of an empty default archive, byte for byte.
#[test]
fn test_header_golden_bytes() {
    let mut stream = Stream::new(0).unwrap();
    Header::new().write_to(&mut stream).unwrap();

    let mut expected = Vec::new();
    expected.extend_from_slice(&[
        0x58, 0x50, 0x33, 0x0d, 0x0a, 0x20, 0x0a, 0x1a, 0x8b, 0x67, 0x01,
    ]);
    expected.extend_from_slice(&0x17u64.to_le_bytes());
    expected.extend_from_slice(&1u32.to_le_bytes());
    expected.push(0x80);
    expected.extend_from_slice(&0u64.to_le_bytes());
    expected.extend_from_slice(&0u64.to_le_bytes());

    assert_eq!(stream.as_bytes(), expected.as_slice());
}

#[test]
fn test_truncated_archive_is_rejected() {
    let mut builder = ArchiveBuilder::new();
    builder.add_entry("a.txt", b"payload".to_vec(), None).unwrap();
    let stream = builder.build().unwrap();

    // Drop the tail of the table region.
    let cut = stream.len() - 5;
    let truncated = Stream::from_vec(stream.as_bytes()[..cut].to_vec());

    let err = Archive::from_stream(truncated).unwrap_err();
    assert!(
        matches!(err, Error::OutOfRange { .. } | Error::MalformedTable(_)),
        "actual error: {err:?}"
    );
}
