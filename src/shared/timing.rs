//! Per-phase timing capture for a single request execution.

use crate::proxy::types::TimingInfo;
use std::time::Instant;

/// A start/end pair of monotonic samples for one network phase.
#[derive(Debug, Default, Clone, Copy)]
struct PhaseSpan {
    start: Option<Instant>,
    end: Option<Instant>,
}

impl PhaseSpan {
    fn begin(&mut self) {
        self.start = Some(Instant::now());
    }

    fn finish(&mut self) {
        self.end = Some(Instant::now());
    }

    /// Elapsed milliseconds, present only when both samples were taken.
    fn millis(&self) -> Option<u64> {
        match (self.start, self.end) {
            (Some(s), Some(e)) => Some(e.duration_since(s).as_millis() as u64),
            _ => None,
        }
    }
}

/// Monotonic timing samples for the phases of an HTTP request.
///
/// The executor frames DNS, TCP, TLS, request send, TTFB and download around
/// the first hop only; redirect hops contribute solely to the total. A phase
/// whose samples were never taken renders as an absent field.
#[derive(Debug)]
pub struct DetailedTiming {
    total_start: Instant,
    total_end: Option<Instant>,
    dns: PhaseSpan,
    tcp: PhaseSpan,
    tls: PhaseSpan,
    request_start: Option<Instant>,
    first_byte: Option<Instant>,
    download: PhaseSpan,
}

impl DetailedTiming {
    /// Starts the total timer.
    pub fn new() -> Self {
        Self {
            total_start: Instant::now(),
            total_end: None,
            dns: PhaseSpan::default(),
            tcp: PhaseSpan::default(),
            tls: PhaseSpan::default(),
            request_start: None,
            first_byte: None,
            download: PhaseSpan::default(),
        }
    }

    pub fn start_dns(&mut self) {
        self.dns.begin();
    }

    pub fn end_dns(&mut self) {
        self.dns.finish();
    }

    pub fn start_tcp(&mut self) {
        self.tcp.begin();
    }

    pub fn end_tcp(&mut self) {
        self.tcp.finish();
    }

    pub fn start_tls(&mut self) {
        self.tls.begin();
    }

    pub fn end_tls(&mut self) {
        self.tls.finish();
    }

    /// Marks the start of request transmission; TTFB is measured from here.
    pub fn start_request(&mut self) {
        self.request_start = Some(Instant::now());
    }

    /// Marks receipt of the first response byte.
    pub fn mark_ttfb(&mut self) {
        self.first_byte = Some(Instant::now());
    }

    pub fn start_download(&mut self) {
        self.download.begin();
    }

    pub fn end_download(&mut self) {
        self.download.finish();
    }

    /// Closes the total timer once the terminal response has been read.
    pub fn finish(&mut self) {
        self.total_end = Some(Instant::now());
    }

    /// Renders the captured samples into the wire-format record.
    ///
    /// `total` runs up to `finish()`; if the execution never finished it falls
    /// back to the end of the first download, then to now. `blocked` is not
    /// measured and reports 0.
    pub fn to_timing_info(&self) -> TimingInfo {
        let total_end = self
            .total_end
            .or(self.download.end)
            .unwrap_or_else(Instant::now);

        let ttfb = match (self.request_start, self.first_byte) {
            (Some(s), Some(e)) => Some(e.duration_since(s).as_millis() as u64),
            _ => None,
        };

        TimingInfo {
            total: total_end.duration_since(self.total_start).as_millis() as u64,
            dns: self.dns.millis(),
            tcp: self.tcp.millis(),
            tls: self.tls.millis(),
            ttfb,
            download: self.download.millis(),
            blocked: Some(0),
        }
    }
}

impl Default for DetailedTiming {
    fn default() -> Self {
        Self::new()
    }
}
