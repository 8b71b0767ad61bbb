//! Matroska/WebM to Ogg/Opus remuxing.
//!
//! [`remux`] runs the whole pipeline: decode the document, select the Opus
//! track, build the identification header, then stream every frame of the
//! track through an [`OpusMuxer`]. Everything that can fail on the input
//! alone is checked before the first byte is written.

use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::codec::mkv::{Document, TrackEntry};
use crate::codec::ogg::{
    DEFAULT_MAX_PAGE_BYTES, DEFAULT_MAX_PAGE_SAMPLES, MuxStats, OpusMuxer, PageLimits,
};
use crate::codec::opus::{OPUS_HEAD_MAGIC, OpusHead, OpusTags, Packet};
use crate::error::{Error, Result};

/// Which track of the input to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackSelector {
    /// The first track whose CodecID is `A_OPUS`.
    #[default]
    FirstOpus,
    /// The track with this TrackNumber; it must be Opus.
    Number(u64),
}

impl From<Option<u64>> for TrackSelector {
    fn from(track: Option<u64>) -> Self {
        track.map_or(TrackSelector::FirstOpus, TrackSelector::Number)
    }
}

/// Remux tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemuxOptions {
    /// Track number to extract; the first Opus track when unset.
    pub track: Option<u64>,
    /// Soft limit on the payload of one audio page.
    pub max_page_bytes: usize,
    /// Soft limit on the audio in one page, in 48 kHz samples.
    pub max_page_samples: u64,
    /// Ogg stream serial number; random when unset.
    pub serial: Option<u32>,
    /// OpusTags vendor string.
    pub vendor: String,
    /// OpusTags `KEY=value` comments.
    pub comments: Vec<String>,
}

impl Default for RemuxOptions {
    fn default() -> Self {
        Self {
            track: None,
            max_page_bytes: DEFAULT_MAX_PAGE_BYTES,
            max_page_samples: DEFAULT_MAX_PAGE_SAMPLES,
            serial: None,
            vendor: String::new(),
            comments: Vec::new(),
        }
    }
}

impl RemuxOptions {
    pub fn selector(&self) -> TrackSelector {
        self.track.into()
    }

    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            max_page_bytes: self.max_page_bytes,
            max_page_samples: self.max_page_samples,
        }
    }

    pub fn tags(&self) -> OpusTags {
        OpusTags {
            vendor: self.vendor.clone(),
            comments: self.comments.clone(),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemuxSummary {
    pub track: u64,
    pub channels: u8,
    pub pre_skip: u16,
    pub serial: u32,
    /// Opus packets written.
    pub packets: u64,
    pub pages: u32,
    /// Granule position of the last page, in 48 kHz samples.
    pub granule_position: u64,
    pub bytes: u64,
}

/// Extracts the selected Opus track of `input` into `output` as Ogg/Opus.
///
/// Errors raised before the first page is written leave `output`
/// untouched. Later errors are wrapped in [`Error::Aborted`] with the
/// number of whole pages already handed to `output`.
pub fn remux<W: Write>(input: &[u8], output: W, options: &RemuxOptions) -> Result<RemuxSummary> {
    let doc = Document::parse(input)?;
    let tracks = doc.tracks()?;
    let track = select_track(&tracks, options.selector())?;
    let head = opus_head(track)?;
    let timecode_scale = doc.timecode_scale()?;
    let serial = match options.serial {
        Some(serial) => serial,
        None => random_serial()?,
    };

    info!(
        track = track.number,
        channels = head.channels,
        pre_skip = head.pre_skip,
        serial,
        "selected Opus track"
    );

    let mut muxer = OpusMuxer::new(output, serial, &head, &options.tags(), options.page_limits())
        .map_err(|e| aborted(0, e))?;

    let stats = match emit(&doc, track.number, head.channels, timecode_scale, &mut muxer) {
        Ok(stats) => stats,
        Err(e) => return Err(aborted(muxer.pages_written(), e)),
    };

    if stats.packets == 0 {
        warn!(track = track.number, "track has no frames");
    }
    info!(
        packets = stats.packets,
        pages = stats.pages,
        granule = stats.granule_position,
        bytes = stats.bytes,
        "remux complete"
    );

    Ok(RemuxSummary {
        track: track.number,
        channels: head.channels,
        pre_skip: head.pre_skip,
        serial,
        packets: stats.packets,
        pages: stats.pages,
        granule_position: stats.granule_position,
        bytes: stats.bytes,
    })
}

/// Feeds every frame of `track` to the muxer, then finishes the stream.
fn emit<W: Write>(
    doc: &Document<'_>,
    track: u64,
    channels: u8,
    timecode_scale: u64,
    muxer: &mut OpusMuxer<W>,
) -> Result<MuxStats> {
    let mut first = true;
    for cluster in doc.clusters() {
        let cluster = cluster?;
        for frame in cluster.frames(track) {
            let packet = Packet::new(frame.payload);
            let Some(toc) = packet.toc() else {
                warn!(timecode = frame.timecode, "skipping empty frame");
                continue;
            };
            if first {
                debug!(toc = %toc, "first packet");
                if toc.is_stereo() != (channels == 2) {
                    warn!(channels, toc = %toc, "packet stereo flag disagrees with OpusHead");
                }
                first = false;
            }
            muxer.write_packet(packet.as_bytes(), packet.samples_48k())?;
        }
        debug!(
            offset = cluster.offset,
            timecode = cluster.timecode,
            time_ms = cluster.timecode.saturating_mul(timecode_scale) / 1_000_000,
            granule = muxer.granule_position(),
            "cluster done"
        );
    }
    muxer.finish()
}

fn aborted(pages_written: u32, source: Error) -> Error {
    Error::Aborted {
        pages_written,
        source: Box::new(source),
    }
}

/// Picks the track to extract.
pub fn select_track<'t, 'a>(
    tracks: &'t [TrackEntry<'a>],
    selector: TrackSelector,
) -> Result<&'t TrackEntry<'a>> {
    match selector {
        TrackSelector::FirstOpus => tracks.iter().find(|t| t.is_opus()).ok_or_else(|| {
            let codecs: Vec<&str> = tracks.iter().map(|t| t.codec_id).collect();
            Error::UnsupportedCodec(format!("no A_OPUS track (found: [{}])", codecs.join(", ")))
        }),
        TrackSelector::Number(number) => {
            let track = tracks
                .iter()
                .find(|t| t.number == number)
                .ok_or_else(|| Error::UnsupportedCodec(format!("no track number {number}")))?;
            if !track.is_opus() {
                return Err(Error::UnsupportedCodec(format!(
                    "track {number} has codec {}",
                    track.codec_id
                )));
            }
            Ok(track)
        }
    }
}

/// Builds the OpusHead for `track`.
///
/// A CodecPrivate holding an OpusHead is used as is (after validation).
/// Otherwise a family 0 header is synthesized from the Audio settings,
/// with the pre-skip derived from CodecDelay.
pub fn opus_head(track: &TrackEntry<'_>) -> Result<OpusHead> {
    if let Some(private) = track.codec_private {
        if private.starts_with(OPUS_HEAD_MAGIC) {
            return OpusHead::parse(private);
        }
        warn!(
            track = track.number,
            len = private.len(),
            "CodecPrivate is not an OpusHead, ignoring"
        );
    }

    let audio = track.audio.unwrap_or_default();
    let channels = match audio.channels {
        1 => 1,
        2 => 2,
        n => {
            return Err(Error::InvalidHeader(format!(
                "cannot build a family 0 OpusHead for {n} channels"
            )));
        }
    };
    // CodecDelay is in nanoseconds; pre-skip counts 48 kHz samples.
    let pre_skip = u16::try_from(u128::from(track.codec_delay) * 48_000 / 1_000_000_000)
        .unwrap_or(u16::MAX);
    let rate = if audio.sampling_frequency.is_finite() && audio.sampling_frequency > 0.0 {
        audio.sampling_frequency.round() as u32
    } else {
        0
    };

    warn!(track = track.number, channels, pre_skip, "no OpusHead in CodecPrivate, synthesizing");
    Ok(OpusHead::new(channels, pre_skip, rate))
}

fn random_serial() -> Result<u32> {
    getrandom::u32().map_err(|e| Error::SerialNumber(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::mkv::AudioSettings;

    fn track(number: u64, codec_id: &'static str) -> TrackEntry<'static> {
        TrackEntry {
            number,
            uid: None,
            track_type: 2,
            name: None,
            language: None,
            codec_id,
            codec_private: None,
            codec_delay: 0,
            seek_pre_roll: 0,
            audio: None,
        }
    }

    #[test]
    fn test_select_first_opus() {
        let tracks = [track(1, "A_VORBIS"), track(2, "A_OPUS"), track(3, "A_OPUS")];
        assert_eq!(select_track(&tracks, TrackSelector::FirstOpus).unwrap().number, 2);
        assert_eq!(select_track(&tracks, TrackSelector::Number(3)).unwrap().number, 3);
    }

    #[test]
    fn test_select_rejects_non_opus() {
        let tracks = [track(1, "A_VORBIS")];
        assert!(matches!(
            select_track(&tracks, TrackSelector::FirstOpus),
            Err(Error::UnsupportedCodec(_))
        ));
        assert!(matches!(
            select_track(&tracks, TrackSelector::Number(1)),
            Err(Error::UnsupportedCodec(_))
        ));
        assert!(matches!(
            select_track(&tracks, TrackSelector::Number(9)),
            Err(Error::UnsupportedCodec(_))
        ));
    }

    #[test]
    fn test_opus_head_from_codec_private() {
        let head = OpusHead::new(2, 312, 44_100);
        let bytes = head.to_bytes().unwrap();
        let mut t = track(1, "A_OPUS");
        t.codec_private = Some(&bytes);
        assert_eq!(opus_head(&t).unwrap(), head);
    }

    #[test]
    fn test_opus_head_rejects_mapping_family() {
        let mut bytes = OpusHead::new(2, 312, 48_000).to_bytes().unwrap();
        bytes[18] = 255;
        let mut t = track(1, "A_OPUS");
        t.codec_private = Some(&bytes);
        assert!(matches!(opus_head(&t), Err(Error::UnsupportedChannelMapping(255))));
    }

    #[test]
    fn test_opus_head_synthesized() {
        let mut t = track(1, "A_OPUS");
        t.codec_delay = 6_500_000;
        t.audio = Some(AudioSettings {
            sampling_frequency: 48_000.0,
            channels: 2,
        });
        let head = opus_head(&t).unwrap();
        assert_eq!(head, OpusHead::new(2, 312, 48_000));
    }

    #[test]
    fn test_opus_head_too_many_channels() {
        let mut t = track(1, "A_OPUS");
        t.audio = Some(AudioSettings {
            sampling_frequency: 48_000.0,
            channels: 6,
        });
        assert!(matches!(opus_head(&t), Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn test_options_yaml() {
        let opts: RemuxOptions = serde_yaml::from_str("track: 2\nmax_page_samples: 960\n").unwrap();
        assert_eq!(opts.selector(), TrackSelector::Number(2));
        assert_eq!(opts.max_page_samples, 960);
        assert_eq!(opts.max_page_bytes, DEFAULT_MAX_PAGE_BYTES);
        assert_eq!(opts.serial, None);

        let defaults: RemuxOptions = serde_yaml::from_str("{}").unwrap();
        assert_eq!(defaults, RemuxOptions::default());
        assert_eq!(defaults.selector(), TrackSelector::FirstOpus);
        assert_eq!(defaults.tags(), OpusTags::default());
    }
}
