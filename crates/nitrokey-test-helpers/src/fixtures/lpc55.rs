//! LPC55 SB2.1 image fixtures.

use nitrokey_crypto::sha256;
use nitrokey_firmware_update::image::lpc55::{
    CERTIFICATE_BLOCK_OFFSET, CERTIFICATE_HEADER_SIZE, FLAG_SHA_PRESENT, HEADER_MAC_SIZE,
    KEY_BLOB_SIZE, RKHT_SIZE,
};
use nitrokey_version::Version;

use crate::certificates::{CertificateChainFixture, CertificateSpec};

const DEFAULT_CHAIN_DEPTH: usize = 2;

fn bcd(value: u32) -> u16 {
    assert!(value <= 9999, "{value} does not fit four BCD digits");
    let mut out = 0u16;
    for shift in [12, 8, 4, 0] {
        let digit = (value / 10u32.pow(shift / 4)) % 10;
        out |= (digit as u16) << shift;
    }
    out
}

fn push_u16(data: &mut Vec<u8>, value: u16) {
    data.extend_from_slice(&value.to_le_bytes());
}

fn push_u32(data: &mut Vec<u8>, value: usize) {
    let value = u32::try_from(value).expect("value fits u32");
    data.extend_from_slice(&value.to_le_bytes());
}

/// Builds a signed SB2.1 image.
///
/// The boot sections are opaque bytes; only their hash is checked by the
/// parser.
#[derive(Debug, Clone)]
pub struct Sb2ImageBuilder {
    version: Version,
    chain: CertificateChainFixture,
    sections: Vec<u8>,
    section_hash: bool,
    corrupt_section_hash: bool,
    foreign_signature: bool,
    rkht: Option<[u8; RKHT_SIZE]>,
    offset: usize,
}

impl Sb2ImageBuilder {
    /// An image for `version`, signed by the default fixture chain.
    pub fn new(version: Version) -> Self {
        Self {
            version,
            chain: CertificateChainFixture::new(DEFAULT_CHAIN_DEPTH),
            sections: vec![0xA5; 64],
            section_hash: true,
            corrupt_section_hash: false,
            foreign_signature: false,
            rkht: None,
            offset: CERTIFICATE_BLOCK_OFFSET,
        }
    }

    /// RKTH of images built with the default chain.
    pub fn default_rkth() -> [u8; 32] {
        Self::new(Version::new(0, 0, 0)).rkth()
    }

    /// Use another certificate chain.
    pub fn chain(mut self, chain: CertificateChainFixture) -> Self {
        self.chain = chain;
        self
    }

    /// Use a chain built from explicit certificate specs.
    pub fn chain_specs(self, specs: &[CertificateSpec]) -> Self {
        self.chain(CertificateChainFixture::from_specs(specs))
    }

    /// Replace the boot section payload.
    pub fn sections(mut self, sections: impl Into<Vec<u8>>) -> Self {
        self.sections = sections.into();
        self
    }

    /// Clear the section hash flag.
    pub fn without_section_hash(mut self) -> Self {
        self.section_hash = false;
        self
    }

    /// Store a section hash that does not match the sections.
    pub fn corrupt_section_hash(mut self) -> Self {
        self.corrupt_section_hash = true;
        self
    }

    /// Sign with a key outside the certificate chain.
    pub fn foreign_signature(mut self) -> Self {
        self.foreign_signature = true;
        self
    }

    /// Replace the root key hash table.
    pub fn rkht(mut self, rkht: [u8; RKHT_SIZE]) -> Self {
        self.rkht = Some(rkht);
        self
    }

    /// Write a different certificate block offset into the header.
    pub fn certificate_block_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    fn root_key_table(&self) -> [u8; RKHT_SIZE] {
        self.rkht.unwrap_or_else(|| {
            let mut rkht = [0u8; RKHT_SIZE];
            rkht[..32].copy_from_slice(&self.chain.root_hash());
            rkht
        })
    }

    /// SHA-256 of the root key hash table.
    pub fn rkth(&self) -> [u8; 32] {
        sha256(&self.root_key_table())
    }

    fn certificate_block(&self, image_length: usize) -> Vec<u8> {
        let ders = self.chain.certificate_ders();
        let table_length: usize = ders.iter().map(|der| 4 + der.len()).sum();

        let mut block = b"cert".to_vec();
        push_u16(&mut block, 1);
        push_u16(&mut block, 0);
        push_u32(&mut block, CERTIFICATE_HEADER_SIZE);
        push_u32(&mut block, 0);
        push_u32(&mut block, 1);
        push_u32(&mut block, image_length);
        push_u32(&mut block, ders.len());
        push_u32(&mut block, table_length);
        for der in ders {
            push_u32(&mut block, der.len());
            block.extend_from_slice(der);
        }
        block.extend_from_slice(&self.root_key_table());
        block.resize(block.len().next_multiple_of(16), 0);
        block
    }

    fn header(&self, image_length: usize) -> Vec<u8> {
        let mut header = vec![0u8; 16];
        header.extend_from_slice(&[0u8; 4]);
        header.extend_from_slice(b"STMP");
        header.extend_from_slice(&[2, 1]);
        push_u16(
            &mut header,
            if self.section_hash { FLAG_SHA_PRESENT } else { 0 },
        );
        push_u32(&mut header, image_length.div_ceil(16));
        push_u32(&mut header, 0);
        push_u32(&mut header, 0);
        push_u32(&mut header, self.offset);
        for value in [6u16, 8, 5, 0] {
            push_u16(&mut header, value);
        }
        header.extend_from_slice(b"sgtl");
        header.extend_from_slice(&0u64.to_le_bytes());
        for _ in 0..2 {
            for component in [self.version.major(), self.version.minor(), self.version.patch()] {
                push_u16(&mut header, bcd(component));
                header.extend_from_slice(&[0u8; 2]);
            }
        }
        push_u32(&mut header, 1);
        header.extend_from_slice(&[0u8; 4]);
        header
    }

    /// Build the image.
    pub fn build(&self) -> Vec<u8> {
        let block_len = self.certificate_block(0).len();
        let hash_len = if self.section_hash { 32 } else { 0 };
        let image_length = CERTIFICATE_BLOCK_OFFSET
            + block_len
            + hash_len
            + self.chain.signature_len()
            + self.sections.len();

        let mut data = self.header(image_length);
        data.extend_from_slice(&[0u8; HEADER_MAC_SIZE]);
        data.extend_from_slice(&[0u8; KEY_BLOB_SIZE]);
        data.extend_from_slice(&self.certificate_block(image_length));
        if self.section_hash {
            let mut digest = sha256(&self.sections);
            if self.corrupt_section_hash {
                digest[0] ^= 0xFF;
            }
            data.extend_from_slice(&digest);
        }
        let signature = if self.foreign_signature {
            self.chain.sign_foreign(&data)
        } else {
            self.chain.sign(&data)
        };
        data.extend_from_slice(&signature);
        data.extend_from_slice(&self.sections);
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bcd() {
        assert_eq!(bcd(0), 0);
        assert_eq!(bcd(10), 0x0010);
        assert_eq!(bcd(1234), 0x1234);
    }
}
