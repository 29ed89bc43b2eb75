//! Movie fragment writer.
//!
//! Combines one track fragment per track into a single `moof`, followed by an
//! `mdat` holding every track's payload in the same order.

use super::boxes::{MovieFragment, MDAT_HEADER_LEN};
use super::fragmenter::Fragment;
use crate::{Error, Result};
use bytes::{BufMut, BytesMut};
use std::io::Write;

/// Write `moof` + `mdat` for the given track fragments to `w`.
///
/// Track order defines both the `traf` order and the payload order. Data
/// offsets are relative to the start of the `moof`. Returns the number of
/// bytes written.
///
/// Nothing reaches `w` if the fragment cannot be described by 32-bit offsets.
/// A failing write aborts immediately; the caller must treat the stream as
/// broken after that.
pub fn write_fragment<W: Write + ?Sized>(
    w: &mut W,
    fragments: Vec<Fragment>,
    sequence_number: u32,
) -> Result<u64> {
    let (tracks, payloads): (Vec<_>, Vec<_>) =
        fragments.into_iter().map(|f| (f.track, f.packets)).unzip();
    let mut moof = MovieFragment {
        sequence_number,
        tracks,
    };

    // calculate track data offsets relative to the start of the moof
    let data_base = (moof.encoded_len() + MDAT_HEADER_LEN) as u64;
    let mut data_offset = data_base;
    for (track, packets) in moof.tracks.iter_mut().zip(&payloads) {
        track.run.data_offset =
            i32::try_from(data_offset).map_err(|_| Error::FragmentTooLarge(data_offset))?;
        data_offset += packets.iter().map(|p| p.data.len() as u64).sum::<u64>();
    }
    let mdat_size = data_offset - data_base + MDAT_HEADER_LEN as u64;
    let mdat_size = u32::try_from(mdat_size).map_err(|_| Error::FragmentTooLarge(mdat_size))?;

    // marshal moof and mdat header
    let mut buf = BytesMut::with_capacity(data_base as usize);
    moof.write(&mut buf);
    buf.put_u32(mdat_size);
    buf.put_slice(b"mdat");
    debug_assert_eq!(buf.len() as u64, data_base);
    w.write_all(&buf)?;

    for packets in &payloads {
        for packet in packets {
            w.write_all(&packet.data)?;
        }
    }
    Ok(data_offset)
}
