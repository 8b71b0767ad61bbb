//! Inspect command: walk an Ogg/Opus file page by page and check its
//! framing.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use webmopus_audio::codec::ogg::{GRANULE_UNSET, OggSync, Page};
use webmopus_audio::codec::opus::{OpusHead, OpusTags};

use super::{format_bytes, format_duration, output_result, print_error, print_success};
use crate::Cli;

/// Walk and verify the pages of an Ogg/Opus file.
#[derive(Args)]
pub struct InspectCommand {
    /// Input Ogg file
    pub input: PathBuf,
}

#[derive(Debug, Default, Serialize)]
struct InspectReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    serial: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    head: Option<HeadInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vendor: Option<String>,
    comments: Vec<String>,
    /// Audio packets, header packets excluded.
    packets: u64,
    bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    final_granule: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_seconds: Option<f64>,
    pages: Vec<PageInfo>,
    problems: Vec<String>,
}

#[derive(Debug, Serialize)]
struct HeadInfo {
    channels: u8,
    pre_skip: u16,
    input_sample_rate: u32,
    output_gain: i16,
}

#[derive(Debug, Serialize)]
struct PageInfo {
    offset: u64,
    sequence: u32,
    /// `None` when no packet ends on the page.
    granule_position: Option<u64>,
    flags: String,
    segments: usize,
    packets: usize,
    body_bytes: usize,
    crc_ok: bool,
}

impl PageInfo {
    fn new(offset: u64, page: &Page) -> Self {
        let mut flags = Vec::new();
        if page.is_continuation() {
            flags.push("cont");
        }
        if page.is_bos() {
            flags.push("bos");
        }
        if page.is_eos() {
            flags.push("eos");
        }
        Self {
            offset,
            sequence: page.sequence,
            granule_position: (page.granule_position != GRANULE_UNSET)
                .then_some(page.granule_position),
            flags: flags.join(","),
            segments: page.segment_table.len(),
            packets: page.packets_completed(),
            body_bytes: page.body.len(),
            crc_ok: page.verify_crc(),
        }
    }
}

impl InspectCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let file = File::open(&self.input)
            .with_context(|| format!("failed to open {}", self.input.display()))?;
        let report = inspect(BufReader::new(file));

        if cli.json {
            output_result(&report, true)?;
        } else {
            print_report(&report);
        }

        if !report.problems.is_empty() {
            anyhow::bail!(
                "{}: {} problem(s) found",
                self.input.display(),
                report.problems.len()
            );
        }
        print_success(&format!("{}: stream is well formed", self.input.display()));
        Ok(())
    }
}

fn print_report(report: &InspectReport) {
    println!(
        "{:>10} {:>6} {:>12} {:<12} {:>5} {:>4} {:>6}  CRC",
        "OFFSET", "SEQ", "GRANULE", "FLAGS", "SEGS", "PKTS", "BYTES"
    );
    for p in &report.pages {
        println!(
            "{:>10} {:>6} {:>12} {:<12} {:>5} {:>4} {:>6}  {}",
            p.offset,
            p.sequence,
            p.granule_position.map(|g| g.to_string()).unwrap_or_else(|| "-".into()),
            p.flags,
            p.segments,
            p.packets,
            p.body_bytes,
            if p.crc_ok { "ok" } else { "BAD" },
        );
    }
    println!();
    if let Some(serial) = report.serial {
        println!("serial:   {serial:#010x}");
    }
    if let Some(head) = &report.head {
        println!(
            "opus:     {} channel(s), pre-skip {}, input rate {} Hz, gain {}",
            head.channels, head.pre_skip, head.input_sample_rate, head.output_gain
        );
    }
    if let Some(vendor) = &report.vendor {
        println!("vendor:   {vendor:?}");
    }
    for comment in &report.comments {
        println!("comment:  {comment}");
    }
    println!("packets:  {}", report.packets);
    println!("size:     {}", format_bytes(report.bytes));
    if let (Some(granule), Some(head)) = (report.final_granule, &report.head) {
        println!(
            "duration: {}",
            format_duration(granule.saturating_sub(u64::from(head.pre_skip)))
        );
    }
    for problem in &report.problems {
        print_error(problem);
    }
}

/// Reads every page of `reader` and records framing problems.
///
/// Reading stops at the first page that cannot be decoded.
fn inspect<R: Read>(reader: R) -> InspectReport {
    let mut report = InspectReport::default();
    let mut sync = OggSync::new(reader);
    let mut partial: Vec<u8> = Vec::new();
    let mut headers: Vec<Vec<u8>> = Vec::new();
    let mut last_granule = 0u64;
    let mut saw_eos = false;

    loop {
        let offset = sync.offset();
        let page = match sync.read_page() {
            Ok(Some(page)) => page,
            Ok(None) => break,
            Err(e) => {
                report.problems.push(e.to_string());
                break;
            }
        };
        let index = report.pages.len();
        let info = PageInfo::new(offset, &page);

        if !info.crc_ok {
            report.problems.push(format!("page {index}: CRC mismatch"));
        }
        if page.sequence != index as u32 {
            report
                .problems
                .push(format!("page {index}: sequence {} (expected {index})", page.sequence));
        }
        match report.serial {
            None => report.serial = Some(page.serial),
            Some(serial) if serial != page.serial => report
                .problems
                .push(format!("page {index}: serial {:#x} differs from {serial:#x}", page.serial)),
            Some(_) => {}
        }
        if page.is_bos() != (index == 0) {
            report.problems.push(format!("page {index}: misplaced BOS flag"));
        }
        if saw_eos {
            report.problems.push(format!("page {index}: page after EOS"));
        }
        saw_eos |= page.is_eos();
        if page.is_continuation() != !partial.is_empty() {
            report
                .problems
                .push(format!("page {index}: continuation flag does not match previous page"));
        }
        if let Some(granule) = info.granule_position {
            if granule < last_granule {
                report
                    .problems
                    .push(format!("page {index}: granule {granule} goes back from {last_granule}"));
            }
            last_granule = granule;
            report.final_granule = Some(granule);
        }

        let mut pos = 0;
        for &lacing in &page.segment_table {
            let len = lacing as usize;
            partial.extend_from_slice(&page.body[pos..pos + len]);
            pos += len;
            if lacing < 255 {
                let packet = std::mem::take(&mut partial);
                if headers.len() < 2 {
                    headers.push(packet);
                } else {
                    report.packets += 1;
                }
            }
        }

        report.bytes += page.encoded_len() as u64;
        report.pages.push(info);
    }

    if report.pages.is_empty() && report.problems.is_empty() {
        report.problems.push("no Ogg pages found".into());
    } else if !saw_eos && !report.pages.is_empty() {
        report.problems.push("stream has no EOS page".into());
    }
    if !partial.is_empty() {
        report.problems.push("stream ends inside a packet".into());
    }

    match headers.first().map(|p| OpusHead::parse(p)) {
        Some(Ok(head)) => {
            report.head = Some(HeadInfo {
                channels: head.channels,
                pre_skip: head.pre_skip,
                input_sample_rate: head.input_sample_rate,
                output_gain: head.output_gain,
            })
        }
        Some(Err(e)) => report.problems.push(format!("first packet: {e}")),
        None => {}
    }
    match headers.get(1).map(|p| OpusTags::parse(p)) {
        Some(Ok(tags)) => {
            report.vendor = Some(tags.vendor);
            report.comments = tags.comments;
        }
        Some(Err(e)) => report.problems.push(format!("second packet: {e}")),
        None => {}
    }
    if let (Some(granule), Some(head)) = (report.final_granule, &report.head) {
        let samples = granule.saturating_sub(u64::from(head.pre_skip));
        report.duration_seconds = Some(samples as f64 / 48_000.0);
    }

    report
}
