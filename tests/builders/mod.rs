//! Shared test fixture: an in-memory hunk container builder.

use amidoor::hunk::{HUNK_BSS, HUNK_CODE, HUNK_DATA, HUNK_END, HUNK_HEADER, HUNK_RELOC32};

struct HunkSpec {
    kind: u32,
    payload: Vec<u8>,
    alloc_words: u32,
    relocs: Vec<(u32, Vec<u32>)>,
}

/// Assembles syntactically valid hunk containers for tests.
///
/// Hunks are emitted in the order they are added; `reloc` attaches a
/// relocation group to the most recently added hunk.
pub struct ContainerBuilder {
    hunks: Vec<HunkSpec>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        ContainerBuilder { hunks: Vec::new() }
    }

    /// Add a code hunk assembled from opcode words, zero-padded to a
    /// longword boundary.
    pub fn code(mut self, words: &[u16]) -> Self {
        let mut payload = Vec::with_capacity(words.len() * 2);
        for &word in words {
            payload.extend_from_slice(&word.to_be_bytes());
        }
        self.push(HUNK_CODE, payload);
        self
    }

    /// Add a data hunk with the given raw bytes.
    #[allow(dead_code)]
    pub fn data(mut self, bytes: &[u8]) -> Self {
        self.push(HUNK_DATA, bytes.to_vec());
        self
    }

    /// Add a bss hunk of `size_words` longwords.
    #[allow(dead_code)]
    pub fn bss(mut self, size_words: u32) -> Self {
        self.hunks.push(HunkSpec {
            kind: HUNK_BSS,
            payload: Vec::new(),
            alloc_words: size_words,
            relocs: Vec::new(),
        });
        self
    }

    /// Attach a relocation group (offsets referencing `target`) to the most
    /// recently added hunk.
    #[allow(dead_code)]
    pub fn reloc(mut self, target: u32, offsets: &[u32]) -> Self {
        let hunk = self.hunks.last_mut().unwrap();
        hunk.relocs.push((target, offsets.to_vec()));
        self
    }

    /// Serialize to container bytes.
    pub fn build(self) -> Vec<u8> {
        let mut words: Vec<u32> = vec![
            HUNK_HEADER,
            0,
            self.hunks.len() as u32,
            0,
            self.hunks.len() as u32 - 1,
        ];
        for hunk in &self.hunks {
            words.push(hunk.alloc_words);
        }
        for hunk in &self.hunks {
            words.push(hunk.kind);
            if hunk.kind == HUNK_BSS {
                words.push(hunk.alloc_words);
            } else {
                words.push(hunk.payload.len() as u32 / 4);
                for chunk in hunk.payload.chunks(4) {
                    let mut bytes = [0u8; 4];
                    bytes[..chunk.len()].copy_from_slice(chunk);
                    words.push(u32::from_be_bytes(bytes));
                }
            }
            if !hunk.relocs.is_empty() {
                words.push(HUNK_RELOC32);
                for (target, offsets) in &hunk.relocs {
                    words.push(offsets.len() as u32);
                    words.push(*target);
                    words.extend_from_slice(offsets);
                }
                words.push(0);
            }
            words.push(HUNK_END);
        }

        let mut data = Vec::with_capacity(words.len() * 4);
        for word in words {
            data.extend_from_slice(&word.to_be_bytes());
        }
        data
    }

    fn push(&mut self, kind: u32, mut payload: Vec<u8>) {
        while payload.len() % 4 != 0 {
            payload.push(0);
        }
        self.hunks.push(HunkSpec {
            kind,
            alloc_words: payload.len() as u32 / 4,
            payload,
            relocs: Vec::new(),
        });
    }
}
