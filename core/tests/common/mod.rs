//! Software accelerator used by the integration tests.
//!
//! It dereferences the request address it is handed exactly like the real
//! device does, so it needs `unsafe`; the library itself never does. Jobs are
//! processed on a worker thread fed by a crossbeam channel. The built-in model
//! understands stored deflate blocks (plus the empty fixed block), including
//! suspend and resume inside them. Scripts can replace the model for single
//! jobs to reproduce device behaviour the model does not cover.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam::channel::{unbounded, Sender};

use nxgzip_core::blocks::{CompletionExtension, CompletionStatus, FunctionCode, JobRegion};
use nxgzip_core::constants::{cc_ids, sfbt_ids, LZCOUNT_LEN};
use nxgzip_core::dde::{Dde, DdeSlot};
use nxgzip_core::error::EnqueueError;
use nxgzip_core::job::Platform;
use nxgzip_core::utils::bits_to_bytes;

/// Replaces the model for one job: gets the region, the gathered source
/// (history included) and the target capacity; fills the output parameter
/// block itself and returns the target bytes and the status to post.
pub type Script = Box<dyn FnMut(&JobRegion, &[u8], usize) -> (Vec<u8>, CompletionStatus) + Send>;

/// Input side of a request, as the device saw it.
#[derive(Debug, Clone)]
pub struct Seen {
    pub function: u8,
    pub in_crc: u32,
    pub in_adler: u32,
    pub histlen: u32,
    pub in_subc: u8,
    pub in_sfbt: u8,
    pub in_rembytecnt: u32,
    pub in_dhtlen: u32,
    pub in_dht: Vec<u8>,
    pub source: Vec<u8>,
    pub source_entries: u8,
    pub target_len: usize,
    pub notify: bool,
}

const AUTO: u8 = 0;
const MANUAL: u8 = 1;
const HUNG: u8 = 2;

#[derive(Default)]
struct Shared {
    scripts: Mutex<VecDeque<Script>>,
    seen: Mutex<Vec<Seen>>,
    pending: Mutex<Vec<u64>>,
    busy: AtomicU32,
    mode: AtomicU8,
    timebase_base: AtomicU64,
}

pub struct SimDevice {
    tx: Option<Sender<u64>>,
    worker: Option<JoinHandle<()>>,
    shared: Arc<Shared>,
    epoch: Instant,
}

impl SimDevice {
    pub fn new() -> Self {
        let shared = Arc::new(Shared::default());
        let (tx, rx) = unbounded::<u64>();
        let worker_shared = shared.clone();
        let worker = std::thread::spawn(move || {
            for addr in rx.iter() {
                process(&worker_shared, addr);
            }
        });
        Self { tx: Some(tx), worker: Some(worker), shared, epoch: Instant::now() }
    }

    /// Jobs queue up until `complete_pending_reversed` is called.
    pub fn manual() -> Self {
        let dev = Self::new();
        dev.shared.mode.store(MANUAL, Ordering::SeqCst);
        dev
    }

    /// Jobs are accepted and never completed.
    pub fn hung() -> Self {
        let dev = Self::new();
        dev.shared.mode.store(HUNG, Ordering::SeqCst);
        dev
    }

    /// Start the timebase at `base` ticks so tests can cross the wrap.
    pub fn set_timebase(&self, base: u64) {
        self.shared.timebase_base.store(base, Ordering::SeqCst);
    }

    /// Reject the next `n` enqueues as busy.
    pub fn busy_for(&self, n: u32) {
        self.shared.busy.store(n, Ordering::SeqCst);
    }

    pub fn push_script(&self, script: Script) {
        self.shared.scripts.lock().unwrap().push_back(script);
    }

    /// Complete the next job with `status` and no output.
    pub fn inject(&self, status: CompletionStatus) {
        self.push_script(Box::new(move |_: &JobRegion, _: &[u8], _: usize| (Vec::new(), status)));
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.shared.seen.lock().unwrap().clone()
    }

    pub fn pending(&self) -> usize {
        self.shared.pending.lock().unwrap().len()
    }

    /// Process queued jobs newest first, on the calling thread.
    pub fn complete_pending_reversed(&self) {
        let mut pending = std::mem::take(&mut *self.shared.pending.lock().unwrap());
        while let Some(addr) = pending.pop() {
            process(&self.shared, addr);
        }
    }
}

impl Drop for SimDevice {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(w) = self.worker.take() {
            let _ = w.join();
        }
    }
}

impl Platform for SimDevice {
    fn enqueue(&self, request_address: u64) -> Result<(), EnqueueError> {
        if self
            .shared
            .busy
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(EnqueueError::Busy);
        }
        match self.shared.mode.load(Ordering::SeqCst) {
            MANUAL => self.shared.pending.lock().unwrap().push(request_address),
            HUNG => {}
            _ => {
                let tx = self.tx.as_ref().ok_or_else(|| EnqueueError::Rejected("device closed".into()))?;
                tx.send(request_address).map_err(|e| EnqueueError::Rejected(e.to_string()))?;
            }
        }
        Ok(())
    }

    fn read_timebase(&self) -> u64 {
        let base = self.shared.timebase_base.load(Ordering::SeqCst);
        base.wrapping_add(self.epoch.elapsed().as_nanos() as u64)
    }

    fn timebase_frequency(&self) -> u64 {
        1_000_000_000
    }
}

// ---------------------------------------------------------------------------
// Memory access, as the device sees it
// ---------------------------------------------------------------------------

fn leaves(head: Dde) -> Vec<Dde> {
    if head.count == 0 {
        return vec![head];
    }
    (0..head.count as u64)
        .map(|i| {
            // SAFETY: an indirect DDE points at `count` live 16-byte slots owned
            // by the in-flight job.
            let slot = unsafe { &*((head.address + i * 16) as *const DdeSlot) };
            slot.view().read()
        })
        .collect()
}

fn gather(list: &[Dde]) -> Vec<u8> {
    let mut out = Vec::new();
    for l in list.iter().filter(|l| l.byte_count > 0) {
        // SAFETY: the job keeps its source buffers pinned while in flight, and
        // they are arrays of atomic bytes.
        let s = unsafe { std::slice::from_raw_parts(l.address as *const AtomicU8, l.byte_count as usize) };
        out.extend(s.iter().map(|b| b.load(Ordering::Relaxed)));
    }
    out
}

fn scatter(list: &[Dde], mut bytes: &[u8]) {
    for l in list.iter().filter(|l| l.byte_count > 0) {
        if bytes.is_empty() {
            break;
        }
        let n = bytes.len().min(l.byte_count as usize);
        // SAFETY: the job keeps its target buffers pinned while in flight, and
        // they are arrays of atomic bytes, so shared access is sound.
        let t = unsafe { std::slice::from_raw_parts(l.address as *const AtomicU8, n) };
        for (cell, &b) in t.iter().zip(&bytes[..n]) {
            cell.store(b, Ordering::Relaxed);
        }
        bytes = &bytes[n..];
    }
}

fn process(shared: &Shared, addr: u64) {
    // SAFETY: the address came from `Job::submit`, which keeps the region
    // alive until its valid bit is observed.
    let region = unsafe { &*(addr as *const JobRegion) };
    let src_head = region.crb.source_dde().read();
    let src = leaves(src_head);
    let dst = leaves(region.crb.target_dde().read());
    let source = gather(&src);
    let capacity: usize = dst.iter().map(|l| l.byte_count as usize).sum();

    let cpb = &region.cpb;
    shared.seen.lock().unwrap().push(Seen {
        function: region.crb.function_raw(),
        in_crc: cpb.in_crc(),
        in_adler: cpb.in_adler(),
        histlen: cpb.history_len(),
        in_subc: cpb.in_subc(),
        in_sfbt: cpb.in_sfbt(),
        in_rembytecnt: cpb.in_rembytecnt(),
        in_dhtlen: cpb.in_dhtlen(),
        in_dht: cpb.in_dht(bits_to_bytes(cpb.in_dhtlen())),
        source: source.clone(),
        source_entries: src_head.count,
        target_len: capacity,
        notify: region.crb.notify(),
    });

    let script = shared.scripts.lock().unwrap().pop_front();
    let (output, status) = match script {
        Some(mut s) => s(region, &source, capacity),
        None => model(region, &source, capacity),
    };
    scatter(&dst, &output);
    region.csb.post(&status);
}

// ---------------------------------------------------------------------------
// Behaviour model
// ---------------------------------------------------------------------------

pub fn adler32(seed: u32, data: &[u8]) -> u32 {
    let mut a = seed & 0xffff;
    let mut b = seed >> 16;
    for &x in data {
        a = (a + x as u32) % 65521;
        b = (b + a) % 65521;
    }
    (b << 16) | a
}

pub fn crc32(seed: u32, data: &[u8]) -> u32 {
    let mut h = crc32fast::Hasher::new_with_initial(seed);
    h.update(data);
    h.finalize()
}

fn ext(flags: CompletionExtension) -> u8 {
    flags.bits()
}

fn fail(code: u8) -> (Vec<u8>, CompletionStatus) {
    let status = CompletionStatus {
        valid: true,
        code,
        extension: ext(CompletionExtension::TERMINATED),
        ..Default::default()
    };
    (Vec::new(), status)
}

fn done(code: u8, flags: CompletionExtension, tpbc: usize) -> CompletionStatus {
    CompletionStatus { valid: true, code, extension: ext(flags), tpbc: tpbc as u32, ..Default::default() }
}

fn suspended() -> CompletionExtension {
    CompletionExtension::PARTIAL | CompletionExtension::COUNTS_VALID
}

fn model(region: &JobRegion, source: &[u8], capacity: usize) -> (Vec<u8>, CompletionStatus) {
    let cpb = &region.cpb;
    let Some(fc) = region.crb.function() else {
        return fail(cc_ids::INVALID_OP);
    };
    let hist = if fc.is_resume() { cpb.history_len() as usize * 16 } else { 0 };
    if hist > source.len() {
        return fail(cc_ids::INVALID_DDE);
    }
    let data = &source[hist..];

    if fc.is_wrap() {
        wrap(region, fc, data, capacity)
    } else if fc.is_compress() {
        compress(region, fc, data, capacity)
    } else {
        decompress(region, fc, data, capacity)
    }
}

fn wrap(region: &JobRegion, fc: FunctionCode, data: &[u8], capacity: usize) -> (Vec<u8>, CompletionStatus) {
    let cpb = &region.cpb;
    let n = data.len().min(capacity);
    let out = data[..n].to_vec();
    cpb.set_out_checksums(crc32(cpb.in_crc(), &out), adler32(cpb.in_adler(), &out));
    cpb.set_spbc(fc, n as u32);
    let status = if n < data.len() {
        done(cc_ids::TARGET_SPACE, suspended(), n)
    } else {
        done(cc_ids::OK, CompletionExtension::COUNTS_VALID, n)
    };
    (out, status)
}

/// Stored-block "compression": one non-final stored block per invocation.
/// Like the hardware, it never sets BFINAL.
fn compress(region: &JobRegion, fc: FunctionCode, data: &[u8], capacity: usize) -> (Vec<u8>, CompletionStatus) {
    let cpb = &region.cpb;
    if data.is_empty() {
        if capacity < 2 {
            return (Vec::new(), done(cc_ids::TARGET_SPACE, CompletionExtension::TERMINATED, 0));
        }
        cpb.set_out_checksums(cpb.in_crc(), cpb.in_adler());
        cpb.set_out_tebc(2).unwrap();
        cpb.set_spbc(fc, 0);
        if fc.has_count() {
            let mut counts = vec![0u32; LZCOUNT_LEN];
            counts[256] = 1;
            cpb.set_lzcounts(&counts);
        }
        return (vec![0x02, 0x00], done(cc_ids::OK, CompletionExtension::COUNTS_VALID, 2));
    }

    let room = capacity.saturating_sub(5);
    let n = data.len().min(room).min(u16::MAX as usize);
    let consumed = &data[..n];
    cpb.set_out_checksums(crc32(cpb.in_crc(), consumed), adler32(cpb.in_adler(), consumed));
    cpb.set_spbc(fc, n as u32);
    if n == 0 {
        return (Vec::new(), done(cc_ids::TARGET_SPACE, suspended(), 0));
    }

    let last = n == data.len();
    let len = n as u16;
    let mut out = vec![0u8];
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&(!len).to_le_bytes());
    out.extend_from_slice(consumed);
    cpb.set_out_tebc(0).unwrap();

    if fc.has_count() {
        let mut counts = vec![0u32; LZCOUNT_LEN];
        for &b in consumed {
            counts[b as usize] += 1;
        }
        counts[256] += 1;
        cpb.set_lzcounts(&counts);
    }

    let tpbc = out.len();
    let status = if !last {
        done(cc_ids::TARGET_SPACE, suspended(), tpbc)
    } else if tpbc > n {
        done(cc_ids::TPBC_GT_SPBC, CompletionExtension::COUNTS_VALID, tpbc)
    } else {
        done(cc_ids::OK, CompletionExtension::COUNTS_VALID, tpbc)
    };
    (out, status)
}

#[derive(Clone, Copy)]
enum Inflate {
    Header,
    Literal { rem: usize, bfinal: bool },
}

fn decompress(region: &JobRegion, fc: FunctionCode, data: &[u8], capacity: usize) -> (Vec<u8>, CompletionStatus) {
    let cpb = &region.cpb;
    let single_block = fc == FunctionCode::DecompressSingleBlock || fc == FunctionCode::DecompressResumeSingleBlock;

    let mut state = Inflate::Header;
    if fc.is_resume() {
        if cpb.in_subc() != 0 {
            return fail(cc_ids::INVALID_OP);
        }
        let sfbt = cpb.in_sfbt();
        match sfbt & !sfbt_ids::BFINAL {
            sfbt_ids::LITERAL => {
                state = Inflate::Literal {
                    rem: cpb.in_rembytecnt() as usize,
                    bfinal: sfbt & sfbt_ids::BFINAL != 0,
                }
            }
            sfbt_ids::HEADER => {}
            _ => return fail(cc_ids::INVALID_DHT),
        }
    }

    let mut out: Vec<u8> = Vec::new();
    let mut pos = 0usize;

    let finish = |out: Vec<u8>, spbc: usize, subc: usize, sfbt: u8, rem: usize, code: u8, flags: CompletionExtension| {
        cpb.set_out_checksums(crc32(cpb.in_crc(), &out), adler32(cpb.in_adler(), &out));
        cpb.set_out_sfbt(sfbt).unwrap();
        cpb.set_out_rembytecnt(rem as u32).unwrap();
        cpb.set_out_subc(subc as u32).unwrap();
        cpb.set_spbc(fc, spbc as u32);
        let tpbc = out.len();
        (out, done(code, flags, tpbc))
    };

    loop {
        match state {
            Inflate::Header => {
                let avail = data.len() - pos;
                if avail == 0 {
                    return finish(out, data.len(), 0, sfbt_ids::HEADER, 0, cc_ids::DATA_LENGTH, suspended());
                }
                let b = data[pos];
                let bfinal = b & 1 != 0;
                match (b >> 1) & 3 {
                    0 => {
                        if avail < 5 {
                            return finish(out, data.len(), avail * 8, sfbt_ids::HEADER, 0, cc_ids::DATA_LENGTH, suspended());
                        }
                        let len = u16::from_le_bytes([data[pos + 1], data[pos + 2]]);
                        let nlen = u16::from_le_bytes([data[pos + 3], data[pos + 4]]);
                        if len != !nlen {
                            return fail(cc_ids::INVALID_DHT);
                        }
                        pos += 5;
                        state = Inflate::Literal { rem: len as usize, bfinal };
                    }
                    1 if b >> 3 == 0 => {
                        if avail < 2 {
                            return finish(out, data.len(), avail * 8, sfbt_ids::HEADER, 0, cc_ids::DATA_LENGTH, suspended());
                        }
                        if data[pos + 1] != 0 {
                            return fail(cc_ids::MISSING_CODE);
                        }
                        pos += 2;
                        if bfinal {
                            return finish(out, data.len(), (data.len() - pos) * 8, sfbt_ids::END_OF_STREAM, 0, cc_ids::OK, CompletionExtension::COUNTS_VALID);
                        }
                    }
                    _ => return fail(cc_ids::INVALID_DHT),
                }
            }
            Inflate::Literal { rem, bfinal } => {
                if rem == 0 {
                    if bfinal {
                        return finish(out, data.len(), (data.len() - pos) * 8, sfbt_ids::END_OF_STREAM, 0, cc_ids::OK, CompletionExtension::COUNTS_VALID);
                    }
                    if single_block {
                        return finish(out, pos, 0, sfbt_ids::HEADER, 0, cc_ids::OK, suspended());
                    }
                    state = Inflate::Header;
                    continue;
                }
                let n = rem.min(data.len() - pos).min(capacity - out.len());
                out.extend_from_slice(&data[pos..pos + n]);
                pos += n;
                let rem = rem - n;
                if rem > 0 {
                    let sfbt = sfbt_ids::LITERAL | bfinal as u8;
                    let code = if out.len() == capacity { cc_ids::TARGET_SPACE } else { cc_ids::DATA_LENGTH };
                    return finish(out, pos, 0, sfbt, rem, code, suspended());
                }
                state = Inflate::Literal { rem, bfinal };
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Deterministic, mildly compressible bytes.
pub fn sample(len: usize) -> Vec<u8> {
    let mut x: u32 = 0x1234_5678;
    (0..len)
        .map(|i| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            if i % 3 == 0 { b'a' + (i % 26) as u8 } else { x as u8 }
        })
        .collect()
}

/// Raw deflate made only of stored blocks of at most `block` bytes.
pub fn stored_deflate(data: &[u8], block: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let chunks: Vec<&[u8]> = if data.is_empty() { vec![&[][..]] } else { data.chunks(block).collect() };
    let last = chunks.len() - 1;
    for (i, c) in chunks.iter().enumerate() {
        let len = c.len() as u16;
        out.push((i == last) as u8);
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&(!len).to_le_bytes());
        out.extend_from_slice(c);
    }
    out
}
