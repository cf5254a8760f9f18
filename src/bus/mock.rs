//! In-memory register bus for tests
//!
//! Serves reads from a 256-byte register file, records every write and lets
//! tests queue per-register responses or inject transfer failures. Clones
//! share state, so a test can keep a handle after moving the bus into a
//! driver.

use super::RegisterBus;
use crate::errors::BusError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// One recorded write transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusWrite {
    pub address: u8,
    pub reg: u8,
    pub data: Vec<u8>,
}

#[derive(Debug)]
struct MockState {
    registers: [u8; 256],
    queued: HashMap<u8, VecDeque<Vec<u8>>>,
    writes: Vec<BusWrite>,
    reads: Vec<(u8, usize)>,
    failing_reads: usize,
    failing_writes: usize,
    failing_write_regs: HashMap<u8, usize>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            registers: [0; 256],
            queued: HashMap::new(),
            writes: Vec::new(),
            reads: Vec::new(),
            failing_reads: 0,
            failing_writes: 0,
            failing_write_regs: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockBus {
    state: Arc<Mutex<MockState>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_register(&self, reg: u8, value: u8) {
        self.state().registers[reg as usize] = value;
    }

    pub fn set_registers(&self, start: u8, values: &[u8]) {
        let mut state = self.state();
        let start = start as usize;
        state.registers[start..start + values.len()].copy_from_slice(values);
    }

    pub fn register(&self, reg: u8) -> u8 {
        self.state().registers[reg as usize]
    }

    /// Queue a response for the next read starting at `reg`. Once the queue
    /// for a register is drained, reads fall back to the register file.
    pub fn queue_read(&self, reg: u8, bytes: Vec<u8>) {
        self.state().queued.entry(reg).or_default().push_back(bytes);
    }

    pub fn queue_reads<I>(&self, reg: u8, responses: I)
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        let mut state = self.state();
        state.queued.entry(reg).or_default().extend(responses);
    }

    pub fn fail_next_reads(&self, count: usize) {
        self.state().failing_reads = count;
    }

    pub fn fail_next_writes(&self, count: usize) {
        self.state().failing_writes = count;
    }

    /// Fail the next `count` writes that start at `reg`; other registers
    /// keep accepting writes.
    pub fn fail_writes_to(&self, reg: u8, count: usize) {
        self.state().failing_write_regs.insert(reg, count);
    }

    pub fn writes(&self) -> Vec<BusWrite> {
        self.state().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }

    /// Number of reads that started at `reg`
    pub fn read_count(&self, reg: u8) -> usize {
        self.state().reads.iter().filter(|(r, _)| *r == reg).count()
    }
}

#[async_trait]
impl RegisterBus for MockBus {
    async fn read_bytes(&mut self, address: u8, reg: u8, buf: &mut [u8]) -> Result<(), BusError> {
        let mut state = self.state();
        state.reads.push((reg, buf.len()));

        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(BusError::NoResponse { address, reg });
        }

        if let Some(bytes) = state.queued.get_mut(&reg).and_then(VecDeque::pop_front) {
            if bytes.len() < buf.len() {
                return Err(BusError::ShortRead {
                    reg,
                    expected: buf.len(),
                    actual: bytes.len(),
                });
            }
            buf.copy_from_slice(&bytes[..buf.len()]);
            return Ok(());
        }

        let start = reg as usize;
        let end = start + buf.len();
        if end > state.registers.len() {
            return Err(BusError::ShortRead {
                reg,
                expected: buf.len(),
                actual: state.registers.len() - start,
            });
        }
        buf.copy_from_slice(&state.registers[start..end]);
        Ok(())
    }

    async fn write_bytes(&mut self, address: u8, reg: u8, data: &[u8]) -> Result<(), BusError> {
        let mut state = self.state();

        if state.failing_writes > 0 {
            state.failing_writes -= 1;
            return Err(BusError::NoResponse { address, reg });
        }
        if let Some(remaining) = state.failing_write_regs.get_mut(&reg) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(BusError::NoResponse { address, reg });
            }
        }

        let start = reg as usize;
        let end = (start + data.len()).min(state.registers.len());
        state.registers[start..end].copy_from_slice(&data[..end - start]);
        state.writes.push(BusWrite {
            address,
            reg,
            data: data.to_vec(),
        });
        Ok(())
    }
}
