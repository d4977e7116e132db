//! NXP SB2.1 secure boot images for the LPC55 variant
//!
//! Layout of the signed part of an image:
//!
//! | offset | size | content |
//! |---|---|---|
//! | 0 | 96 | image header (`STMP` / `sgtl`) |
//! | 96 | 32 | header HMAC |
//! | 128 | 80 | key blob |
//! | 208 | variable | certificate block v1, aligned to 16 bytes |
//! | .. | 32 | SHA-256 of the boot sections (flag `0x8000`) |
//! | .. | root signature length | RSA signature over everything before it |
//!
//! The boot sections themselves are encrypted and are only covered by the
//! hash; they are never decrypted here.

use nitrokey_crypto::{CertificateChain, ct_eq, sha256, to_hex};
use nitrokey_version::Version;
use tracing::debug;

use super::FirmwareMetadata;
use crate::error::ParseError;
use crate::reader::ByteReader;

/// Size of the image header.
pub const HEADER_SIZE: usize = 96;
/// Size of the header HMAC following the header.
pub const HEADER_MAC_SIZE: usize = 32;
/// Size of the wrapped key blob following the HMAC.
pub const KEY_BLOB_SIZE: usize = 80;
/// Offset of the certificate block.
pub const CERTIFICATE_BLOCK_OFFSET: usize = HEADER_SIZE + HEADER_MAC_SIZE + KEY_BLOB_SIZE;
/// Size of the certificate block header.
pub const CERTIFICATE_HEADER_SIZE: usize = 32;
/// Size of the root key hash table (four SHA-256 hashes).
pub const RKHT_SIZE: usize = 4 * 32;
/// Header flag: a SHA-256 of the boot sections precedes the signature.
pub const FLAG_SHA_PRESENT: u16 = 0x8000;
/// Signer name reported for images matching the trusted RKTH.
pub const NITROKEY_SIGNER: &str = "Nitrokey";

const SIGNATURE_1: &[u8; 4] = b"STMP";
const SIGNATURE_2: &[u8; 4] = b"sgtl";
const CERTIFICATE_SIGNATURE: &[u8; 4] = b"cert";
const CERTIFICATE_BLOCK_ALIGNMENT: usize = 16;
const SHA256_SIZE: usize = 32;

/// A version as stored in the header: three BCD components, each padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BcdVersion {
    /// Major component
    pub major: u16,
    /// Minor component
    pub minor: u16,
    /// Patch component
    pub patch: u16,
}

impl BcdVersion {
    fn read(reader: &mut ByteReader<'_>) -> Result<Self, ParseError> {
        let major = reader.read_u16_le()?;
        reader.skip(2)?;
        let minor = reader.read_u16_le()?;
        reader.skip(2)?;
        let patch = reader.read_u16_le()?;
        reader.skip(2)?;
        Ok(Self {
            major,
            minor,
            patch,
        })
    }

    /// Decode into a [`Version`].
    ///
    /// # Errors
    ///
    /// Returns an error if a component is not valid BCD.
    pub fn to_version(self) -> Result<Version, ParseError> {
        Ok(Version::from_bcd(self.major, self.minor, self.patch)?)
    }
}

/// SB2.1 image header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sb2Header {
    /// Counter nonce for the boot section encryption
    pub nonce: [u8; 16],
    /// Format version, `(major, minor)`
    pub format_version: (u8, u8),
    /// Image flags
    pub flags: u16,
    /// Image size in 16-byte blocks
    pub image_blocks: u32,
    /// Block of the first boot tag
    pub first_boot_tag_block: u32,
    /// Id of the first boot section
    pub first_boot_section_id: u32,
    /// Byte offset of the certificate block
    pub offset_to_certificate_block: u32,
    /// Header size in blocks
    pub header_blocks: u16,
    /// Block of the key blob
    pub key_blob_block: u16,
    /// Key blob size in blocks
    pub key_blob_block_count: u16,
    /// Maximum number of section MACs
    pub max_section_mac_count: u16,
    /// Build timestamp, microseconds since 2000-01-01
    pub timestamp: u64,
    /// Product version
    pub product_version: BcdVersion,
    /// Component version
    pub component_version: BcdVersion,
    /// Build number
    pub build_number: u32,
}

impl Sb2Header {
    /// Parse the 96-byte header.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is too short or a signature is wrong.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let mut reader = ByteReader::new(data);
        let nonce = reader.read_array::<16>()?;
        reader.skip(4)?;
        if reader.read_bytes(4)? != SIGNATURE_1 {
            return Err(ParseError::InvalidHeader("Invalid signature".to_string()));
        }
        let format_version = (reader.read_u8()?, reader.read_u8()?);
        let flags = reader.read_u16_le()?;
        let image_blocks = reader.read_u32_le()?;
        let first_boot_tag_block = reader.read_u32_le()?;
        let first_boot_section_id = reader.read_u32_le()?;
        let offset_to_certificate_block = reader.read_u32_le()?;
        let header_blocks = reader.read_u16_le()?;
        let key_blob_block = reader.read_u16_le()?;
        let key_blob_block_count = reader.read_u16_le()?;
        let max_section_mac_count = reader.read_u16_le()?;
        if reader.read_bytes(4)? != SIGNATURE_2 {
            return Err(ParseError::InvalidHeader("Invalid signature".to_string()));
        }
        let timestamp = reader.read_u64_le()?;
        let product_version = BcdVersion::read(&mut reader)?;
        let component_version = BcdVersion::read(&mut reader)?;
        let build_number = reader.read_u32_le()?;
        reader.skip(4)?;

        Ok(Self {
            nonce,
            format_version,
            flags,
            image_blocks,
            first_boot_tag_block,
            first_boot_section_id,
            offset_to_certificate_block,
            header_blocks,
            key_blob_block,
            key_blob_block_count,
            max_section_mac_count,
            timestamp,
            product_version,
            component_version,
            build_number,
        })
    }

    /// Whether the boot section hash precedes the signature.
    pub fn has_section_hash(&self) -> bool {
        self.flags & FLAG_SHA_PRESENT != 0
    }
}

/// Certificate block v1.
#[derive(Debug, Clone)]
pub struct CertificateBlock {
    /// Format version, `(major, minor)`
    pub format_version: (u16, u16),
    /// Block flags
    pub flags: u32,
    /// Build number
    pub build_number: u32,
    /// Total image length
    pub image_length: u32,
    /// Length of the certificate table in bytes
    pub cert_table_length: u32,
    /// Certificate chain, root first
    pub chain: CertificateChain,
    /// Root key hash table
    pub rkht: [u8; RKHT_SIZE],
    /// Entry of the table holding the root certificate's key hash
    pub rkh_index: usize,
}

impl CertificateBlock {
    /// Parse a certificate block from the start of `data` and verify its chain.
    ///
    /// The root certificate's key hash must be one of the entries of the root
    /// key hash table.
    ///
    /// # Errors
    ///
    /// Returns an error if the block header is invalid, the data is too short,
    /// the certificate chain does not verify or its root key is not listed in
    /// the table.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        if data.len() < CERTIFICATE_HEADER_SIZE {
            return Err(ParseError::InvalidCertificateBlock("Incorrect size".to_string()));
        }
        let mut reader = ByteReader::new(data);
        if reader.read_bytes(4)? != CERTIFICATE_SIGNATURE {
            return Err(ParseError::InvalidCertificateBlock(
                "Incorrect signature".to_string(),
            ));
        }
        let format_version = (reader.read_u16_le()?, reader.read_u16_le()?);
        let header_length = reader.read_u32_le()?;
        if usize::try_from(header_length).ok() != Some(CERTIFICATE_HEADER_SIZE) {
            return Err(ParseError::InvalidCertificateBlock(
                "Incorrect length".to_string(),
            ));
        }
        let flags = reader.read_u32_le()?;
        let build_number = reader.read_u32_le()?;
        let image_length = reader.read_u32_le()?;
        let cert_count = reader.read_u32_le()?;
        let cert_table_length = reader.read_u32_le()?;

        let minimum = usize::try_from(cert_table_length)
            .ok()
            .and_then(|len| len.checked_add(RKHT_SIZE));
        if minimum.is_none_or(|minimum| data.len() < minimum) {
            return Err(ParseError::InvalidCertificateBlock(
                "Length of the data doesn't match Certificate Block length".to_string(),
            ));
        }

        let mut certificates = Vec::new();
        for _ in 0..cert_count {
            let offset = reader.position();
            let len = usize::try_from(reader.read_u32_le()?)
                .ok()
                .ok_or(ParseError::Truncated {
                    offset,
                    needed: usize::MAX,
                })?;
            certificates.push(reader.read_bytes(len)?);
        }
        let chain = CertificateChain::from_der(certificates)?;
        chain.verify()?;
        let rkht = reader.read_array::<RKHT_SIZE>()?;
        let root_key_hash = chain.root_key_hash()?;
        let rkh_index = rkht
            .chunks_exact(SHA256_SIZE)
            .position(|entry| ct_eq(entry, &root_key_hash))
            .ok_or_else(|| {
                ParseError::InvalidCertificateBlock(
                    "Root certificate key is not in the root key hash table".to_string(),
                )
            })?;
        debug!(rkh_index, "root key hash found");

        Ok(Self {
            format_version,
            flags,
            build_number,
            image_length,
            cert_table_length,
            chain,
            rkht,
            rkh_index,
        })
    }

    /// Size of the block including padding.
    pub fn raw_size(&self) -> Option<usize> {
        let table = usize::try_from(self.cert_table_length).ok()?;
        CERTIFICATE_HEADER_SIZE
            .checked_add(table)?
            .checked_add(RKHT_SIZE)?
            .checked_next_multiple_of(CERTIFICATE_BLOCK_ALIGNMENT)
    }

    /// Length of image signatures made with this chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain is empty.
    pub fn signature_size(&self) -> Result<usize, ParseError> {
        Ok(self.chain.root_signature_len()?)
    }

    /// SHA-256 over the root key hash table.
    pub fn rkth(&self) -> [u8; 32] {
        sha256(&self.rkht)
    }
}

/// A verified SB2.1 image.
#[derive(Debug, Clone)]
pub struct Sb2Image {
    /// Image header
    pub header: Sb2Header,
    /// Certificate block
    pub certificate_block: CertificateBlock,
}

impl Sb2Image {
    /// Parse an image, verify its signature and the boot section hash.
    ///
    /// # Errors
    ///
    /// Returns an error if any structure is invalid, the signature does not
    /// verify with the certificate chain or the boot section hash differs.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let header = Sb2Header::parse(data)?;
        if usize::try_from(header.offset_to_certificate_block).ok()
            != Some(CERTIFICATE_BLOCK_OFFSET)
        {
            return Err(ParseError::InvalidHeader("Invalid offset".to_string()));
        }

        let mut reader = ByteReader::new(data);
        reader.skip(CERTIFICATE_BLOCK_OFFSET)?;
        let certificate_block =
            CertificateBlock::parse(data.get(CERTIFICATE_BLOCK_OFFSET..).unwrap_or_default())?;
        let raw_size = certificate_block.raw_size().ok_or_else(|| {
            ParseError::InvalidCertificateBlock("Certificate table too large".to_string())
        })?;
        reader.skip(raw_size)?;

        let section_hash = if header.has_section_hash() {
            Some(reader.read_array::<SHA256_SIZE>()?)
        } else {
            None
        };
        let signed_len = reader.position();
        let signature = reader.read_bytes(certificate_block.signature_size()?)?;
        let signed = data.get(..signed_len).unwrap_or_default();
        if !certificate_block.chain.verify_data(signed, signature)? {
            return Err(ParseError::VerificationFailed);
        }

        if let Some(expected) = section_hash {
            let sections = data.get(reader.position()..).unwrap_or_default();
            if !ct_eq(&expected, &sha256(sections)) {
                return Err(ParseError::InvalidBootableSectionHash);
            }
        }

        Ok(Self {
            header,
            certificate_block,
        })
    }

    /// Product version of the image.
    ///
    /// # Errors
    ///
    /// Returns an error if the version is not valid BCD.
    pub fn version(&self) -> Result<Version, ParseError> {
        self.header.product_version.to_version()
    }

    /// RKTH of the certificate block.
    pub fn rkth(&self) -> [u8; 32] {
        self.certificate_block.rkth()
    }
}

/// Parse an SB2.1 image and determine its version and signer.
///
/// # Errors
///
/// Returns an error if the image is invalid.
pub fn parse(data: &[u8], trusted_rkth: Option<&[u8; 32]>) -> Result<FirmwareMetadata, ParseError> {
    let image = Sb2Image::parse(data)?;
    let mut metadata = FirmwareMetadata::unsigned(image.version()?);

    let rkth = image.rkth();
    let trusted = trusted_rkth.is_some_and(|trusted| ct_eq(trusted, &rkth));
    metadata.signed_by = Some(if trusted {
        NITROKEY_SIGNER.to_string()
    } else {
        format!("unknown issuer (RKTH: {})", to_hex(&rkth))
    });
    metadata.signed_by_nitrokey = trusted;

    debug!(
        version = %metadata.version,
        rkth = %to_hex(&rkth),
        trusted,
        "Parsed LPC55 firmware image"
    );
    Ok(metadata)
}
