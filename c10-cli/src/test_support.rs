//! Synthetic recordings and capture buffers shared by unit tests

use c10_decoder::{Arinc429Message, Ms1553Message, PacketBuilder, TimeF1, Timestamp};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub fn ms1553_packet(channel: u16, rtc: u64, messages: Vec<Ms1553Message>) -> Vec<u8> {
    PacketBuilder::ms1553(channel, rtc, &messages).build()
}

pub fn arinc429_packet(channel: u16, rtc: u64, messages: Vec<Arinc429Message>) -> Vec<u8> {
    PacketBuilder::arinc429(channel, rtc, &messages).build()
}

pub fn time_packet(channel: u16, rtc: u64, time: Timestamp) -> Vec<u8> {
    PacketBuilder::time_f1(channel, rtc, &TimeF1::date(time)).build()
}

/// Write the packets back to back into `dir/name`
pub fn write_recording(dir: &Path, name: &str, packets: &[Vec<u8>]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, packets.concat()).unwrap();
    path
}

/// In-memory writer whose contents stay readable after being boxed away
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
