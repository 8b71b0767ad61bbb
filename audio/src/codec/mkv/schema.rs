//! Static Matroska element registry.
//!
//! Identifiers are written in their conventional marker-bearing hex form
//! (`0x1A45DFA3`) and stored as decoded VInt values with the length
//! marker cleared, which is what [`webmopus_buffer::vint::decode`]
//! yields when reading an element header.

/// Converts a marker-bearing element id to its decoded value.
pub const fn id(encoded: u64) -> u64 {
    let bytes = 8 - encoded.leading_zeros() / 8;
    encoded & !(1u64 << (7 * bytes))
}

/// Element identifiers.
pub mod ids {
    use super::id;

    // EBML header
    pub const EBML: u64 = id(0x1A45_DFA3);
    pub const EBML_VERSION: u64 = id(0x4286);
    pub const EBML_READ_VERSION: u64 = id(0x42F7);
    pub const EBML_MAX_ID_LENGTH: u64 = id(0x42F2);
    pub const EBML_MAX_SIZE_LENGTH: u64 = id(0x42F3);
    pub const DOC_TYPE: u64 = id(0x4282);
    pub const DOC_TYPE_VERSION: u64 = id(0x4287);
    pub const DOC_TYPE_READ_VERSION: u64 = id(0x4285);

    // Global
    pub const VOID: u64 = id(0xEC);
    pub const CRC32: u64 = id(0xBF);

    // Segment
    pub const SEGMENT: u64 = id(0x1853_8067);
    pub const SEEK_HEAD: u64 = id(0x114D_9B74);
    pub const CUES: u64 = id(0x1C53_BB6B);
    pub const TAGS: u64 = id(0x1254_C367);
    pub const CHAPTERS: u64 = id(0x1043_A770);
    pub const ATTACHMENTS: u64 = id(0x1941_A469);

    // Info
    pub const INFO: u64 = id(0x1549_A966);
    pub const TIMECODE_SCALE: u64 = id(0x2A_D7B1);
    pub const DURATION: u64 = id(0x4489);
    pub const TITLE: u64 = id(0x7BA9);
    pub const MUXING_APP: u64 = id(0x4D80);
    pub const WRITING_APP: u64 = id(0x5741);

    // Tracks
    pub const TRACKS: u64 = id(0x1654_AE6B);
    pub const TRACK_ENTRY: u64 = id(0xAE);
    pub const TRACK_NUMBER: u64 = id(0xD7);
    pub const TRACK_UID: u64 = id(0x73C5);
    pub const TRACK_TYPE: u64 = id(0x83);
    pub const NAME: u64 = id(0x536E);
    pub const LANGUAGE: u64 = id(0x22_B59C);
    pub const CODEC_ID: u64 = id(0x86);
    pub const CODEC_PRIVATE: u64 = id(0x63A2);
    pub const CODEC_NAME: u64 = id(0x25_8688);
    pub const CODEC_DELAY: u64 = id(0x56AA);
    pub const SEEK_PRE_ROLL: u64 = id(0x56BB);
    pub const AUDIO: u64 = id(0xE1);
    pub const SAMPLING_FREQUENCY: u64 = id(0xB5);
    pub const OUTPUT_SAMPLING_FREQUENCY: u64 = id(0x78B5);
    pub const CHANNELS: u64 = id(0x9F);
    pub const BIT_DEPTH: u64 = id(0x6264);

    // Cluster
    pub const CLUSTER: u64 = id(0x1F43_B675);
    pub const TIMECODE: u64 = id(0xE7);
    pub const POSITION: u64 = id(0xA7);
    pub const PREV_SIZE: u64 = id(0xAB);
    pub const SIMPLE_BLOCK: u64 = id(0xA3);
    pub const BLOCK_GROUP: u64 = id(0xA0);
    pub const BLOCK: u64 = id(0xA1);
    pub const BLOCK_DURATION: u64 = id(0x9B);
    pub const REFERENCE_BLOCK: u64 = id(0xFB);
    pub const DISCARD_PADDING: u64 = id(0x75A2);
}

use ids::*;

/// Storage class of an element's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Master,
    Unsigned,
    Signed,
    Float,
    String,
    Binary,
}

impl Kind {
    /// Returns true if a payload of `len` bytes is valid for this kind.
    pub fn accepts_len(self, len: usize) -> bool {
        match self {
            Kind::Unsigned | Kind::Signed => len <= 8,
            Kind::Float => matches!(len, 0 | 4 | 8),
            Kind::Master | Kind::String | Kind::Binary => true,
        }
    }
}

/// Structured type an element binds to in the document view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    EbmlHeader,
    Segment,
    Info,
    Tracks,
    TrackEntry,
    Audio,
    Cluster,
    BlockGroup,
    Block,
}

/// Registry entry for one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementDescriptor {
    pub id: u64,
    pub name: &'static str,
    pub kind: Kind,
    /// `None` for leaves and for containers kept opaque.
    pub model: Option<Model>,
    /// Permitted child ids, besides the global Void and CRC-32.
    pub children: &'static [u64],
}

impl ElementDescriptor {
    /// Returns true if the tree decoder descends into this element.
    pub fn is_container(&self) -> bool {
        self.kind == Kind::Master && self.model.is_some()
    }
}

/// Elements allowed at the top level of a document.
pub const ROOT_CHILDREN: &[u64] = &[EBML, SEGMENT];

macro_rules! leaf {
    ($id:expr, $name:literal, $kind:ident) => {
        ElementDescriptor {
            id: $id,
            name: $name,
            kind: Kind::$kind,
            model: None,
            children: &[],
        }
    };
}

macro_rules! master {
    ($id:expr, $name:literal, $model:ident, [$($child:expr),* $(,)?]) => {
        ElementDescriptor {
            id: $id,
            name: $name,
            kind: Kind::Master,
            model: Some(Model::$model),
            children: &[$($child),*],
        }
    };
    ($id:expr, $name:literal) => {
        ElementDescriptor {
            id: $id,
            name: $name,
            kind: Kind::Master,
            model: None,
            children: &[],
        }
    };
}

/// Every element the decoder recognises.
pub static ELEMENTS: &[ElementDescriptor] = &[
    master!(EBML, "EBML", EbmlHeader, [
        EBML_VERSION, EBML_READ_VERSION, EBML_MAX_ID_LENGTH, EBML_MAX_SIZE_LENGTH,
        DOC_TYPE, DOC_TYPE_VERSION, DOC_TYPE_READ_VERSION,
    ]),
    leaf!(EBML_VERSION, "EBMLVersion", Unsigned),
    leaf!(EBML_READ_VERSION, "EBMLReadVersion", Unsigned),
    leaf!(EBML_MAX_ID_LENGTH, "EBMLMaxIDLength", Unsigned),
    leaf!(EBML_MAX_SIZE_LENGTH, "EBMLMaxSizeLength", Unsigned),
    leaf!(DOC_TYPE, "DocType", String),
    leaf!(DOC_TYPE_VERSION, "DocTypeVersion", Unsigned),
    leaf!(DOC_TYPE_READ_VERSION, "DocTypeReadVersion", Unsigned),
    leaf!(VOID, "Void", Binary),
    leaf!(CRC32, "CRC-32", Binary),
    master!(SEGMENT, "Segment", Segment, [
        SEEK_HEAD, INFO, TRACKS, CLUSTER, CUES, TAGS, CHAPTERS, ATTACHMENTS,
    ]),
    master!(SEEK_HEAD, "SeekHead"),
    master!(CUES, "Cues"),
    master!(TAGS, "Tags"),
    master!(CHAPTERS, "Chapters"),
    master!(ATTACHMENTS, "Attachments"),
    master!(INFO, "Info", Info, [
        TIMECODE_SCALE, DURATION, TITLE, MUXING_APP, WRITING_APP,
    ]),
    leaf!(TIMECODE_SCALE, "TimecodeScale", Unsigned),
    leaf!(DURATION, "Duration", Float),
    leaf!(TITLE, "Title", String),
    leaf!(MUXING_APP, "MuxingApp", String),
    leaf!(WRITING_APP, "WritingApp", String),
    master!(TRACKS, "Tracks", Tracks, [TRACK_ENTRY]),
    master!(TRACK_ENTRY, "TrackEntry", TrackEntry, [
        TRACK_NUMBER, TRACK_UID, TRACK_TYPE, NAME, LANGUAGE, CODEC_ID, CODEC_PRIVATE,
        CODEC_NAME, CODEC_DELAY, SEEK_PRE_ROLL, AUDIO,
    ]),
    leaf!(TRACK_NUMBER, "TrackNumber", Unsigned),
    leaf!(TRACK_UID, "TrackUID", Unsigned),
    leaf!(TRACK_TYPE, "TrackType", Unsigned),
    leaf!(NAME, "Name", String),
    leaf!(LANGUAGE, "Language", String),
    leaf!(CODEC_ID, "CodecID", String),
    leaf!(CODEC_PRIVATE, "CodecPrivate", Binary),
    leaf!(CODEC_NAME, "CodecName", String),
    leaf!(CODEC_DELAY, "CodecDelay", Unsigned),
    leaf!(SEEK_PRE_ROLL, "SeekPreRoll", Unsigned),
    master!(AUDIO, "Audio", Audio, [
        SAMPLING_FREQUENCY, OUTPUT_SAMPLING_FREQUENCY, CHANNELS, BIT_DEPTH,
    ]),
    leaf!(SAMPLING_FREQUENCY, "SamplingFrequency", Float),
    leaf!(OUTPUT_SAMPLING_FREQUENCY, "OutputSamplingFrequency", Float),
    leaf!(CHANNELS, "Channels", Unsigned),
    leaf!(BIT_DEPTH, "BitDepth", Unsigned),
    master!(CLUSTER, "Cluster", Cluster, [
        TIMECODE, POSITION, PREV_SIZE, SIMPLE_BLOCK, BLOCK_GROUP,
    ]),
    leaf!(TIMECODE, "Timecode", Unsigned),
    leaf!(POSITION, "Position", Unsigned),
    leaf!(PREV_SIZE, "PrevSize", Unsigned),
    leaf!(SIMPLE_BLOCK, "SimpleBlock", Binary),
    master!(BLOCK_GROUP, "BlockGroup", BlockGroup, [
        BLOCK, BLOCK_DURATION, REFERENCE_BLOCK, DISCARD_PADDING,
    ]),
    leaf!(BLOCK, "Block", Binary),
    leaf!(BLOCK_DURATION, "BlockDuration", Unsigned),
    leaf!(REFERENCE_BLOCK, "ReferenceBlock", Signed),
    leaf!(DISCARD_PADDING, "DiscardPadding", Signed),
];

/// Looks up the descriptor for a decoded element id.
pub fn lookup(id: u64) -> Option<&'static ElementDescriptor> {
    ELEMENTS.iter().find(|d| d.id == id)
}

/// Returns true if `child` may appear directly inside `parent`.
///
/// Void and CRC-32 are permitted in every container.
pub fn is_child_of(child: u64, parent: u64) -> bool {
    match lookup(parent) {
        Some(d) if d.kind == Kind::Master => {
            child == VOID || child == CRC32 || d.children.contains(&child)
        }
        _ => false,
    }
}

/// Returns the element's name, or `"Unknown"`.
pub fn name_of(id: u64) -> &'static str {
    lookup(id).map_or("Unknown", |d| d.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_strips_marker() {
        assert_eq!(id(0x1A45_DFA3), 0x0A45_DFA3);
        assert_eq!(id(0x1853_8067), 0x0853_8067);
        assert_eq!(id(0x2A_D7B1), 0x0A_D7B1);
        assert_eq!(id(0x4286), 0x0286);
        assert_eq!(id(0xAE), 0x2E);
        assert_eq!(id(0xEC), 0x6C);
    }

    #[test]
    fn test_id_matches_vint_decode() {
        for encoded in [0x1A45_DFA3u64, 0x2A_D7B1, 0x63A2, 0xA3] {
            let len = 8 - encoded.leading_zeros() as usize / 8;
            let bytes = &encoded.to_be_bytes()[8 - len..];
            let v = webmopus_buffer::vint::decode(bytes, 4).unwrap();
            assert_eq!(v.value(), id(encoded));
            assert_eq!(v.encoded_value(), encoded);
        }
    }

    #[test]
    fn test_lookup() {
        let d = lookup(ids::CODEC_PRIVATE).unwrap();
        assert_eq!(d.name, "CodecPrivate");
        assert_eq!(d.kind, Kind::Binary);
        assert!(d.model.is_none());
        assert!(lookup(id(0x4DBB)).is_none());
        assert_eq!(name_of(ids::CLUSTER), "Cluster");
        assert_eq!(name_of(1), "Unknown");
    }

    #[test]
    fn test_kind_accepts_len() {
        assert!(Kind::Unsigned.accepts_len(0));
        assert!(Kind::Signed.accepts_len(8));
        assert!(!Kind::Signed.accepts_len(9));
        assert!(Kind::Float.accepts_len(4));
        assert!(!Kind::Float.accepts_len(2));
        assert!(Kind::Binary.accepts_len(1 << 20));
    }

    #[test]
    fn test_ids_unique() {
        for (i, a) in ELEMENTS.iter().enumerate() {
            for b in &ELEMENTS[i + 1..] {
                assert_ne!(a.id, b.id, "{} and {}", a.name, b.name);
            }
        }
    }

    #[test]
    fn test_children_registered() {
        for d in ELEMENTS {
            for &child in d.children {
                assert!(lookup(child).is_some(), "{} child {child:#x}", d.name);
            }
        }
    }

    #[test]
    fn test_is_child_of() {
        assert!(is_child_of(ids::TRACK_ENTRY, ids::TRACKS));
        assert!(is_child_of(ids::SIMPLE_BLOCK, ids::CLUSTER));
        assert!(is_child_of(ids::VOID, ids::CLUSTER));
        assert!(is_child_of(ids::CRC32, ids::SEGMENT));
        assert!(!is_child_of(ids::CLUSTER, ids::CLUSTER));
        assert!(!is_child_of(ids::TRACK_NUMBER, ids::CLUSTER));
        assert!(!is_child_of(ids::VOID, ids::CODEC_ID));
    }

    #[test]
    fn test_opaque_containers() {
        assert!(lookup(ids::SEGMENT).unwrap().is_container());
        assert!(!lookup(ids::CUES).unwrap().is_container());
        assert!(!lookup(ids::SIMPLE_BLOCK).unwrap().is_container());
    }
}
