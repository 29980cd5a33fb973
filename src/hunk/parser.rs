//! Hunk container record walker.
//!
//! One pass over the container: the header fixes every segment address, then
//! the records are streamed in order. See [`crate::hunk`] for the two-phase
//! loading model.

use crate::{
    file::Parser,
    hunk::{
        BinaryImage, Relocation, Segment, SegmentKind, HUNK_BSS, HUNK_CODE, HUNK_DATA, HUNK_END,
        HUNK_HEADER, HUNK_RELOC32, HUNK_SIZE_MASK,
    },
    memory::MemoryLayout,
    Result,
};

/// Declared size and placement of one segment, fixed before records are read.
struct PlacedSegment {
    address: u32,
    size: u32,
}

pub(crate) fn parse_at(data: &[u8], load_base: u32) -> Result<BinaryImage> {
    if data.is_empty() {
        return Err(crate::Error::Empty);
    }

    let mut parser = Parser::new(data);

    let tag = parser
        .read_be::<u32>()
        .map_err(|_| malformed_error!("container too short for a header tag"))?;
    if tag != HUNK_HEADER {
        return Err(malformed_error!(
            "expected HUNK_HEADER ({HUNK_HEADER:#x}), found {tag:#x}"
        ));
    }

    // Resident-library names: a zero-terminated list of longword-counted
    // strings. The names themselves are irrelevant to loading and skipped.
    loop {
        let name_longs = parser
            .read_be::<u32>()
            .map_err(|_| malformed_error!("truncated resident-library name table"))?;
        if name_longs == 0 {
            break;
        }
        parser
            .advance_by(name_longs as usize * 4)
            .map_err(|_| malformed_error!("resident-library name overruns the container"))?;
    }

    let table_size = parser
        .read_be::<u32>()
        .map_err(|_| malformed_error!("truncated header: missing segment table size"))?;
    let first = parser
        .read_be::<u32>()
        .map_err(|_| malformed_error!("truncated header: missing first segment index"))?;
    let last = parser
        .read_be::<u32>()
        .map_err(|_| malformed_error!("truncated header: missing last segment index"))?;
    if last < first {
        return Err(malformed_error!(
            "last segment index {last} precedes first {first}"
        ));
    }

    let count = (last - first + 1) as usize;
    if count as u64 > table_size as u64 {
        return Err(malformed_error!(
            "segment range {first}..={last} exceeds declared table size {table_size}"
        ));
    }
    // Each declared segment needs at least its size word.
    if count * 4 > parser.data_remaining() {
        return Err(malformed_error!(
            "{count} declared segments but only {} bytes remain",
            parser.data_remaining()
        ));
    }

    // Fix every segment address now; record bodies never move them.
    let mut placed = Vec::with_capacity(count);
    let mut cursor = MemoryLayout::align_segment(load_base);
    for _ in 0..count {
        let size_word = parser
            .read_be::<u32>()
            .map_err(|_| malformed_error!("truncated segment size table"))?;
        let size = (size_word & HUNK_SIZE_MASK) * 4;
        if u64::from(cursor) + u64::from(size) > u64::from(crate::memory::ADDRESS_MASK) + 1 {
            return Err(malformed_error!(
                "declared segment sizes exceed the 24-bit address space"
            ));
        }
        placed.push(PlacedSegment {
            address: cursor,
            size,
        });
        cursor = MemoryLayout::align_segment(cursor + size);
    }

    let mut segments: Vec<Option<Segment>> = (0..count).map(|_| None).collect();
    let mut relocations = Vec::new();
    let mut current = 0_usize;

    while parser.has_more_data() {
        let record = parser.read_be::<u32>()? & HUNK_SIZE_MASK;
        match record {
            HUNK_CODE | HUNK_DATA => {
                let slot = placed
                    .get(current)
                    .ok_or_else(|| malformed_error!("more records than declared segments"))?;
                let size_longs = parser
                    .read_be::<u32>()
                    .map_err(|_| malformed_error!("truncated code/data record"))?
                    & HUNK_SIZE_MASK;
                let byte_len = size_longs as usize * 4;
                let payload = parser
                    .read_bytes(byte_len)
                    .map_err(|_| malformed_error!("code/data payload overruns the container"))?;
                let kind = if record == HUNK_CODE {
                    SegmentKind::Code
                } else {
                    SegmentKind::Data
                };
                segments[current] = Some(Segment {
                    kind,
                    address: slot.address,
                    size: slot.size.max(byte_len as u32),
                    bytes: payload.to_vec(),
                });
            }
            HUNK_BSS => {
                let slot = placed
                    .get(current)
                    .ok_or_else(|| malformed_error!("more records than declared segments"))?;
                let size_longs = parser
                    .read_be::<u32>()
                    .map_err(|_| malformed_error!("truncated bss record"))?
                    & HUNK_SIZE_MASK;
                segments[current] = Some(Segment {
                    kind: SegmentKind::Bss,
                    address: slot.address,
                    size: slot.size.max(size_longs * 4),
                    bytes: Vec::new(),
                });
            }
            HUNK_RELOC32 => {
                let slot = placed.get(current).ok_or_else(|| {
                    malformed_error!("relocations after the last declared segment")
                })?;
                loop {
                    let run = parser
                        .read_be::<u32>()
                        .map_err(|_| malformed_error!("truncated relocation table"))?;
                    if run == 0 {
                        break;
                    }
                    let target = parser
                        .read_be::<u32>()
                        .map_err(|_| malformed_error!("truncated relocation group"))?
                        as usize;
                    if target >= count {
                        return Err(malformed_error!(
                            "relocation targets segment {target} of {count}"
                        ));
                    }
                    for _ in 0..run {
                        let offset = parser
                            .read_be::<u32>()
                            .map_err(|_| malformed_error!("truncated relocation offsets"))?;
                        // The patch site is a full longword inside the segment.
                        if u64::from(offset) + 4 > u64::from(slot.size) {
                            return Err(malformed_error!(
                                "relocation offset {offset:#x} outside its {:#x}-byte segment",
                                slot.size
                            ));
                        }
                        relocations.push(Relocation {
                            segment: current,
                            offset,
                            target,
                        });
                    }
                }
            }
            HUNK_END => {
                current += 1;
            }
            other => {
                // Symbols, debug info, future record kinds: skip words until
                // the end-of-segment marker. Unknown auxiliary data must not
                // break loading.
                log::debug!("skipping unrecognized hunk record {other:#x}");
                while parser.has_more_data() {
                    if parser.peek_be::<u32>()? & HUNK_SIZE_MASK == HUNK_END {
                        break;
                    }
                    parser.advance_by(4)?;
                }
            }
        }
    }

    // A declared segment with no record behaves as bss of the declared size.
    let segments: Vec<Segment> = segments
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| Segment {
                kind: SegmentKind::Bss,
                address: placed[index].address,
                size: placed[index].size,
                bytes: Vec::new(),
            })
        })
        .collect();

    let entry_point = segments
        .iter()
        .find(|segment| segment.kind == SegmentKind::Code)
        .map_or(MemoryLayout::align_segment(load_base), |segment| {
            segment.address
        });

    Ok(BinaryImage {
        segments,
        relocations,
        entry_point,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|value| value.to_be_bytes()).collect()
    }

    #[test]
    fn minimal_code_only_container() {
        let data = words(&[
            HUNK_HEADER,
            0, // no resident libraries
            1, // table size
            0, // first
            0, // last
            1, // one longword of code
            HUNK_CODE,
            1,
            0x4E71_4E71, // nop; nop
            HUNK_END,
        ]);
        let image = parse_at(&data, 0x400).unwrap();
        assert_eq!(image.segments.len(), 1);
        assert_eq!(image.segments[0].kind, SegmentKind::Code);
        assert_eq!(image.segments[0].address, 0x400);
        assert_eq!(image.entry_point, 0x400);
    }

    #[test]
    fn bad_header_tag_is_malformed() {
        let data = words(&[0x3E9, 0, 1, 0, 0, 1]);
        assert!(matches!(
            parse_at(&data, 0x400),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn empty_input() {
        assert!(matches!(parse_at(&[], 0x400), Err(crate::Error::Empty)));
    }

    #[test]
    fn segments_are_aligned_and_increasing() {
        let data = words(&[
            HUNK_HEADER,
            0,
            3,
            0,
            2,
            0x41,       // 0x104 bytes of code
            2,          // 8 bytes of data
            0x10,       // 0x40 bytes of bss
            HUNK_CODE,
            0x41,
        ]
        .into_iter()
        .chain(std::iter::repeat(0u32).take(0x41))
        .chain([HUNK_END, HUNK_DATA, 2, 1, 2, HUNK_END, HUNK_BSS, 0x10, HUNK_END])
        .collect::<Vec<_>>());
        let image = parse_at(&data, 0x400).unwrap();
        assert_eq!(image.segments[0].address, 0x400);
        // 0x400 + 0x104 rounds up to 0x600
        assert_eq!(image.segments[1].address, 0x600);
        assert_eq!(image.segments[2].address, 0x700);
        assert_eq!(image.segments[2].kind, SegmentKind::Bss);
    }

    #[test]
    fn size_flag_bits_are_masked() {
        let data = words(&[
            HUNK_HEADER,
            0,
            1,
            0,
            0,
            0xC000_0001, // chip+fast flags set, 1 longword
            HUNK_BSS,
            1,
            HUNK_END,
        ]);
        let image = parse_at(&data, 0x400).unwrap();
        assert_eq!(image.segments[0].size, 4);
    }

    #[test]
    fn resident_library_names_are_skipped() {
        let data = words(&[
            HUNK_HEADER,
            2, // two longwords of name
            0x646F_732E, // "dos."
            0x6C69_6200, // "lib\0"
            0, // terminator
            1,
            0,
            0,
            1,
            HUNK_CODE,
            1,
            0x4E71_4E71,
            HUNK_END,
        ]);
        let image = parse_at(&data, 0x400).unwrap();
        assert_eq!(image.segments.len(), 1);
    }

    #[test]
    fn unknown_records_are_skipped_to_end_marker() {
        let data = words(&[
            HUNK_HEADER,
            0,
            1,
            0,
            0,
            1,
            HUNK_CODE,
            1,
            0x4E71_4E71,
            0x3F1, // HUNK_DEBUG between the code record and its END
            0x1234,
            0x5678,
            HUNK_END,
        ]);
        let image = parse_at(&data, 0x400).unwrap();
        assert_eq!(image.segments.len(), 1);
        assert_eq!(image.segments[0].kind, SegmentKind::Code);
    }

    #[test]
    fn relocation_groups_parse() {
        let data = words(&[
            HUNK_HEADER,
            0,
            2,
            0,
            1,
            2,
            1,
            HUNK_CODE,
            2,
            0x0000_0010,
            0x0000_0020,
            HUNK_RELOC32,
            2, // two offsets
            1, // targeting segment 1
            0,
            4,
            0, // terminator
            HUNK_END,
            HUNK_DATA,
            1,
            0xAABB_CCDD,
            HUNK_END,
        ]);
        let image = parse_at(&data, 0x400).unwrap();
        assert_eq!(image.relocations.len(), 2);
        assert_eq!(
            image.relocations[0],
            Relocation {
                segment: 0,
                offset: 0,
                target: 1
            }
        );
        assert_eq!(image.relocations[1].offset, 4);
    }

    #[test]
    fn relocation_target_out_of_range() {
        let data = words(&[
            HUNK_HEADER,
            0,
            1,
            0,
            0,
            1,
            HUNK_CODE,
            1,
            0,
            HUNK_RELOC32,
            1,
            5, // no such segment
            0,
            0,
            HUNK_END,
        ]);
        assert!(matches!(
            parse_at(&data, 0x400),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn relocation_offset_outside_its_segment() {
        let data = words(&[
            HUNK_HEADER,
            0,
            1,
            0,
            0,
            1, // one longword segment: offsets 0..=0 are patchable
            HUNK_CODE,
            1,
            0,
            HUNK_RELOC32,
            1,
            0,
            0xFFFF_FFF0, // far outside the 4-byte segment
            0,
            HUNK_END,
        ]);
        assert!(matches!(
            parse_at(&data, 0x400),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn relocation_offset_clipping_the_segment_end() {
        let data = words(&[
            HUNK_HEADER,
            0,
            1,
            0,
            0,
            2, // 8-byte segment
            HUNK_CODE,
            2,
            0,
            0,
            HUNK_RELOC32,
            1,
            0,
            6, // longword at 6 would spill past byte 8
            0,
            HUNK_END,
        ]);
        assert!(matches!(
            parse_at(&data, 0x400),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn declared_sizes_past_the_address_space_are_malformed() {
        let data = words(&[
            HUNK_HEADER,
            0,
            1,
            0,
            0,
            0x3FFF_FFFF, // ~4 GiB of bss in a 16 MiB space
            HUNK_BSS,
            0x3FFF_FFFF,
            HUNK_END,
        ]);
        assert!(matches!(
            parse_at(&data, 0x400),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn truncated_payload_is_malformed() {
        let data = words(&[HUNK_HEADER, 0, 1, 0, 0, 4, HUNK_CODE, 4, 0x11]);
        assert!(matches!(
            parse_at(&data, 0x400),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn entry_point_without_code_is_load_base() {
        let data = words(&[HUNK_HEADER, 0, 1, 0, 0, 2, HUNK_BSS, 2, HUNK_END]);
        let image = parse_at(&data, 0x400).unwrap();
        assert_eq!(image.entry_point, 0x400);
    }
}
