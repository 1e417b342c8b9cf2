//! Utility to create AFL fuzzing corpus data.
//!
//! Encodes a small set of representative event frames for the decoder fuzz
//! target and writes them into the `fuzz/corpus` directory.
use std::{
    fs::{self, File},
    io::Write,
    path::Path,
};

use evstress::{
    event::{Event, EventId, Priority},
    frame::{EncodingError, encode},
    payload::build_payload,
};

const CORPUS_DIR: &str = "fuzz/corpus";

fn alert_frame() -> Result<Vec<u8>, EncodingError> {
    encode(3, "system/alerts", b"High severity alert").map(|b| b.to_vec())
}

fn empty_topic_frame() -> Result<Vec<u8>, EncodingError> {
    encode(0, "", b"").map(|b| b.to_vec())
}

fn json_frame() -> Result<Vec<u8>, EncodingError> {
    let id = EventId::new(10_001);
    let payload = build_payload(id, Priority::Critical, 128, 1_700_000_000_000);
    Event::new(id, Priority::Critical, "trading/orders", payload)
        .encode()
        .map(|b| b.to_vec())
}

fn sticky_frames() -> Result<Vec<u8>, EncodingError> {
    let mut bytes = encode(1, "analytics/clicks", b"first")?.to_vec();
    bytes.extend_from_slice(&encode(2, "metrics/cpu", b"second")?);
    Ok(bytes)
}

fn save(bytes: &[u8], path: &Path) -> std::io::Result<()> {
    let mut f = File::create(path)?;
    f.write_all(bytes)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    fs::create_dir_all(CORPUS_DIR)?;
    let dir = Path::new(CORPUS_DIR);
    save(&alert_frame()?, &dir.join("alert.bin"))?;
    save(&empty_topic_frame()?, &dir.join("empty_topic.bin"))?;
    save(&json_frame()?, &dir.join("json_payload.bin"))?;
    save(&sticky_frames()?, &dir.join("sticky.bin"))?;
    Ok(())
}
