//! Movie fragment box model and serialization.
//!
//! Each box follows the standard layout: 4-byte size (big-endian u32),
//! 4-byte type (ASCII), then box-specific content. Every box here can report
//! its encoded length before it is written, which lets the fragment writer
//! fill in data offsets ahead of serialization.

use bytes::{BufMut, BytesMut};

/// Size of the `mdat` box header that follows the `moof` box.
pub const MDAT_HEADER_LEN: usize = 8;

// tfhd flags
pub const TFHD_DEFAULT_DURATION: u32 = 0x000008;
pub const TFHD_DEFAULT_SIZE: u32 = 0x000010;
pub const TFHD_DEFAULT_FLAGS: u32 = 0x000020;
pub const TFHD_DEFAULT_BASE_IS_MOOF: u32 = 0x020000;

// trun flags
pub const TRUN_DATA_OFFSET: u32 = 0x000001;
pub const TRUN_FIRST_SAMPLE_FLAGS: u32 = 0x000004;
pub const TRUN_SAMPLE_DURATION: u32 = 0x000100;
pub const TRUN_SAMPLE_SIZE: u32 = 0x000200;
pub const TRUN_SAMPLE_FLAGS: u32 = 0x000400;
pub const TRUN_SAMPLE_CTS: u32 = 0x000800;

/// Sample flags: depends on no other sample (sync sample).
pub const SAMPLE_NO_DEPENDENCIES: u32 = 0x02000000;
/// Sample flags: depends on others and is not a sync sample.
pub const SAMPLE_NON_KEYFRAME: u32 = 0x01010000;

/// Write a box header: size (u32 BE) + type.
fn put_header(buf: &mut BytesMut, size: usize, box_type: &[u8; 4]) {
    buf.put_u32(size as u32);
    buf.put_slice(box_type);
}

/// Write a full box version and flags word.
fn put_fullbox(buf: &mut BytesMut, version: u8, flags: u32) {
    buf.put_u32(((version as u32) << 24) | (flags & 0x00FFFFFF));
}

/// `moof`: one fragment header plus one `traf` per track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieFragment {
    pub sequence_number: u32,
    pub tracks: Vec<TrackFragment>,
}

impl MovieFragment {
    /// Encoded size of the whole `moof` box.
    pub fn encoded_len(&self) -> usize {
        // moof header + mfhd
        8 + 16 + self.tracks.iter().map(TrackFragment::encoded_len).sum::<usize>()
    }

    /// Serialize the `moof` box into `buf`.
    pub fn write(&self, buf: &mut BytesMut) {
        put_header(buf, self.encoded_len(), b"moof");

        // mfhd
        put_header(buf, 16, b"mfhd");
        put_fullbox(buf, 0, 0);
        buf.put_u32(self.sequence_number);

        for track in &self.tracks {
            track.write(buf);
        }
    }
}

/// `traf`: header, decode time and a single sample run for one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackFragment {
    pub header: TrackFragmentHeader,
    /// Base media decode time, always written as a 64-bit `tfdt`.
    pub decode_time: u64,
    pub run: TrackRun,
}

impl TrackFragment {
    pub fn encoded_len(&self) -> usize {
        // traf header + tfdt (version 1)
        8 + self.header.encoded_len() + 20 + self.run.encoded_len()
    }

    pub fn write(&self, buf: &mut BytesMut) {
        put_header(buf, self.encoded_len(), b"traf");
        self.header.write(buf);

        // tfdt
        put_header(buf, 20, b"tfdt");
        put_fullbox(buf, 1, 0);
        buf.put_u64(self.decode_time);

        self.run.write(buf);
    }
}

/// `tfhd`: track id and the optional per-fragment sample defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackFragmentHeader {
    pub flags: u32,
    pub track_id: u32,
    pub default_duration: u32,
    pub default_size: u32,
    pub default_flags: u32,
}

impl TrackFragmentHeader {
    pub fn encoded_len(&self) -> usize {
        let optional = [TFHD_DEFAULT_DURATION, TFHD_DEFAULT_SIZE, TFHD_DEFAULT_FLAGS]
            .iter()
            .filter(|&&f| self.flags & f != 0)
            .count();
        16 + optional * 4
    }

    pub fn write(&self, buf: &mut BytesMut) {
        put_header(buf, self.encoded_len(), b"tfhd");
        put_fullbox(buf, 0, self.flags);
        buf.put_u32(self.track_id);
        if self.flags & TFHD_DEFAULT_DURATION != 0 {
            buf.put_u32(self.default_duration);
        }
        if self.flags & TFHD_DEFAULT_SIZE != 0 {
            buf.put_u32(self.default_size);
        }
        if self.flags & TFHD_DEFAULT_FLAGS != 0 {
            buf.put_u32(self.default_flags);
        }
    }
}

/// One sample in a `trun`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunEntry {
    pub duration: u32,
    pub size: u32,
    pub flags: u32,
    pub composition_offset: i32,
}

/// `trun`: the sample run of a track fragment.
///
/// Which per-sample fields are present is controlled by `flags`. Version 1
/// makes the composition offsets signed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackRun {
    pub version: u8,
    pub flags: u32,
    /// Offset of the first sample's data from the start of the `moof`.
    pub data_offset: i32,
    pub first_sample_flags: u32,
    pub entries: Vec<RunEntry>,
}

impl TrackRun {
    fn entry_len(&self) -> usize {
        let fields = [
            TRUN_SAMPLE_DURATION,
            TRUN_SAMPLE_SIZE,
            TRUN_SAMPLE_FLAGS,
            TRUN_SAMPLE_CTS,
        ]
        .iter()
        .filter(|&&f| self.flags & f != 0)
        .count();
        fields * 4
    }

    pub fn encoded_len(&self) -> usize {
        let mut size = 16; // header + version/flags + sample count
        if self.flags & TRUN_DATA_OFFSET != 0 {
            size += 4;
        }
        if self.flags & TRUN_FIRST_SAMPLE_FLAGS != 0 {
            size += 4;
        }
        size + self.entries.len() * self.entry_len()
    }

    pub fn write(&self, buf: &mut BytesMut) {
        put_header(buf, self.encoded_len(), b"trun");
        put_fullbox(buf, self.version, self.flags);
        buf.put_u32(self.entries.len() as u32);
        if self.flags & TRUN_DATA_OFFSET != 0 {
            buf.put_i32(self.data_offset);
        }
        if self.flags & TRUN_FIRST_SAMPLE_FLAGS != 0 {
            buf.put_u32(self.first_sample_flags);
        }
        for entry in &self.entries {
            if self.flags & TRUN_SAMPLE_DURATION != 0 {
                buf.put_u32(entry.duration);
            }
            if self.flags & TRUN_SAMPLE_SIZE != 0 {
                buf.put_u32(entry.size);
            }
            if self.flags & TRUN_SAMPLE_FLAGS != 0 {
                buf.put_u32(entry.flags);
            }
            if self.flags & TRUN_SAMPLE_CTS != 0 {
                // Same bits for the unsigned version 0 field.
                buf.put_i32(entry.composition_offset);
            }
        }
    }
}
