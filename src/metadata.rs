//! PNG metadata injection.
//!
//! The final pipeline stage plants a fabricated provenance record in the
//! encoded PNG: an `iTXt` chunk carrying an XMP packet with the tool
//! tag, the request seed, and decoy capture details meant to mislead
//! automated scrapers. The chunk goes immediately after IHDR, CRC'd with
//! the standard reversed-polynomial table, so any spec-conforming parser
//! still walks the file without error.
//!
//! Everything here is deterministic in the seed; the decoy fields draw
//! from the seeded RNG, never from a wall clock.

use crate::error::{Error, Result};
use crate::rng::SeedRng;

/// The 8-byte PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Keyword under which XMP packets live in `iTXt` chunks.
const XMP_KEYWORD: &[u8] = b"XML:com.adobe.xmp";

/// CRC-32 lookup table for the reversed polynomial 0xEDB88320.
const CRC_TABLE: [u32; 256] = build_crc_table();

const fn build_crc_table() -> [u32; 256] {
    let mut table = [0_u32; 256];
    let mut n = 0;
    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 == 1 {
                0xedb8_8320 ^ (c >> 1)
            } else {
                c >> 1
            };
            k += 1;
        }
        table[n] = c;
        n += 1;
    }
    table
}

/// CRC-32 over a byte slice, as used by PNG chunks.
#[must_use]
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xffff_ffff_u32;
    for &byte in data {
        crc = CRC_TABLE[((crc ^ u32::from(byte)) & 0xff) as usize] ^ (crc >> 8);
    }
    crc ^ 0xffff_ffff
}

/// Decoy provenance values, drawn deterministically from the seed.
#[derive(Debug, Clone)]
pub struct DecoyMetadata {
    /// Claimed capture device.
    pub camera: String,
    /// Claimed editing software.
    pub software: String,
    /// Claimed author.
    pub artist: String,
    /// Claimed rights statement.
    pub copyright: String,
    /// Claimed capture timestamp, EXIF formatted.
    pub date_time: String,
    /// Claimed capture latitude.
    pub latitude: f64,
    /// Claimed capture longitude.
    pub longitude: f64,
}

const DECOY_CAMERAS: [&str; 8] = [
    "Nokia 3310",
    "Sony FDR-AX1 4K Camcorder",
    "Kodak Brownie",
    "Polaroid SX-70",
    "Game Boy Camera",
    "Nintendo DSi",
    "Apple Newton",
    "Palm Pilot",
];

const DECOY_SOFTWARE: [&str; 6] = [
    "MS Paint 3.11",
    "Photoshop 1.0",
    "GIMP 0.54",
    "Corel Photo-Paint 3",
    "MacPaint",
    "Deluxe Paint II",
];

const DECOY_ARTISTS: [&str; 6] = [
    "Unknown Artist",
    "Anonymous",
    "Stock Photo",
    "Public Domain",
    "Creative Commons",
    "Royalty Free",
];

const DECOY_COPYRIGHTS: [&str; 5] = [
    "(c) 1901 Public Domain",
    "CC0 - No Rights Reserved",
    "Copyleft - Share Freely",
    "(c) Unknown",
    "No Copyright - Free Use",
];

const DECOY_LOCATIONS: [(f64, f64); 6] = [
    (0.0, 0.0),
    (90.0, 0.0),
    (-90.0, 0.0),
    (27.9881, 86.925),
    (36.0544, -112.1401),
    (-23.5505, -46.6333),
];

/// Draw a full set of decoy fields from the given generator.
#[must_use]
pub fn decoy_metadata(rng: &mut SeedRng) -> DecoyMetadata {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn draw(rng: &mut SeedRng, bound: usize) -> usize {
        #[allow(clippy::cast_precision_loss)]
        {
            (rng.next_f64() * bound as f64) as usize
        }
    }

    let camera = DECOY_CAMERAS[draw(rng, DECOY_CAMERAS.len())].to_string();
    let software = DECOY_SOFTWARE[draw(rng, DECOY_SOFTWARE.len())].to_string();
    let artist = DECOY_ARTISTS[draw(rng, DECOY_ARTISTS.len())].to_string();
    let copyright = DECOY_COPYRIGHTS[draw(rng, DECOY_COPYRIGHTS.len())].to_string();

    // A plausible timestamp from the pre-scraping era.
    let year = 1990 + draw(rng, 20);
    let month = 1 + draw(rng, 12);
    let day = 1 + draw(rng, 28);
    let hour = draw(rng, 24);
    let minute = draw(rng, 60);
    let second = draw(rng, 60);
    let date_time = format!("{year}:{month:02}:{day:02} {hour:02}:{minute:02}:{second:02}");

    let (latitude, longitude) = DECOY_LOCATIONS[draw(rng, DECOY_LOCATIONS.len())];

    DecoyMetadata {
        camera,
        software,
        artist,
        copyright,
        date_time,
        latitude,
        longitude,
    }
}

/// Build the deterministic XMP packet for a seed.
#[must_use]
pub fn xmp_packet(seed: &str) -> String {
    let mut rng = SeedRng::new(seed);
    let decoy = decoy_metadata(&mut rng);
    let make = decoy.camera.split(' ').next().unwrap_or_default();
    let create_date = decoy.date_time.replacen(' ', "T", 1);

    format!(
        "<?xpacket begin=\"\u{feff}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>\n\
<x:xmpmeta xmlns:x=\"adobe:ns:meta/\">\n\
  <rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\n\
    <rdf:Description rdf:about=\"\"\n\
      xmlns:dc=\"http://purl.org/dc/elements/1.1/\"\n\
      xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\"\n\
      xmlns:exif=\"http://ns.adobe.com/exif/1.0/\"\n\
      xmlns:pv=\"https://pixelveil.dev/ns/\">\n\
      <dc:format>image/png</dc:format>\n\
      <dc:creator><rdf:Seq><rdf:li>{artist}</rdf:li></rdf:Seq></dc:creator>\n\
      <dc:rights><rdf:Alt><rdf:li xml:lang=\"x-default\">{copyright}</rdf:li></rdf:Alt></dc:rights>\n\
      <xmp:CreatorTool>PixelVeil {version}</xmp:CreatorTool>\n\
      <xmp:CreateDate>{create_date}</xmp:CreateDate>\n\
      <xmp:Label>Protected</xmp:Label>\n\
      <exif:Make>{make}</exif:Make>\n\
      <exif:Model>{camera}</exif:Model>\n\
      <exif:GPSLatitude>{latitude}</exif:GPSLatitude>\n\
      <exif:GPSLongitude>{longitude}</exif:GPSLongitude>\n\
      <pv:Seed>{seed}</pv:Seed>\n\
      <pv:Software>{software}</pv:Software>\n\
    </rdf:Description>\n\
  </rdf:RDF>\n\
</x:xmpmeta>\n\
<?xpacket end=\"w\"?>",
        artist = decoy.artist,
        copyright = decoy.copyright,
        version = env!("CARGO_PKG_VERSION"),
        camera = decoy.camera,
        latitude = decoy.latitude,
        longitude = decoy.longitude,
        software = decoy.software,
    )
}

/// Wrap keyword and text into a complete `iTXt` chunk.
///
/// Layout: keyword, NUL, compression flag 0, compression method 0, empty
/// language tag, empty translated keyword, then the text body.
fn build_itxt_chunk(keyword: &[u8], text: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(keyword.len() + 5 + text.len());
    body.extend_from_slice(keyword);
    body.push(0);
    body.push(0);
    body.push(0);
    body.push(0);
    body.push(0);
    body.extend_from_slice(text);

    let mut chunk = Vec::with_capacity(12 + body.len());
    #[allow(clippy::cast_possible_truncation)]
    chunk.extend_from_slice(&(body.len() as u32).to_be_bytes());
    chunk.extend_from_slice(b"iTXt");
    chunk.extend_from_slice(&body);
    let crc = crc32(&chunk[4..]);
    chunk.extend_from_slice(&crc.to_be_bytes());
    chunk
}

/// Insert the seed's metadata chunk into encoded PNG bytes.
///
/// The chunk lands immediately after IHDR, found by reading IHDR's
/// declared length. The original bytes are never modified; the result is
/// prefix + new chunk + remainder.
///
/// # Errors
///
/// Returns [`Error::InvalidContainer`] when the signature check fails or
/// the buffer ends before IHDR does.
pub fn inject_metadata(png: &[u8], seed: &str) -> Result<Vec<u8>> {
    if png.len() < PNG_SIGNATURE.len() + 12 || png[..8] != PNG_SIGNATURE {
        return Err(Error::InvalidContainer(
            "missing PNG signature".to_string(),
        ));
    }

    let ihdr_len = u32::from_be_bytes([png[8], png[9], png[10], png[11]]) as usize;
    let insert_at = 8 + 4 + 4 + ihdr_len + 4;
    if insert_at > png.len() {
        return Err(Error::InvalidContainer(
            "IHDR length exceeds buffer".to_string(),
        ));
    }

    let chunk = build_itxt_chunk(XMP_KEYWORD, xmp_packet(seed).as_bytes());

    let mut out = Vec::with_capacity(png.len() + chunk.len());
    out.extend_from_slice(&png[..insert_at]);
    out.extend_from_slice(&chunk);
    out.extend_from_slice(&png[insert_at..]);
    Ok(out)
}

/// One chunk seen while walking a PNG buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkInfo {
    /// Four-byte chunk type tag.
    pub chunk_type: [u8; 4],
    /// Offset of the chunk's length field in the buffer.
    pub offset: usize,
    /// Declared payload length.
    pub length: usize,
}

/// Walk every chunk in a PNG buffer, verifying structure and CRCs.
///
/// This is the self-consistency check injected output must keep passing.
///
/// # Errors
///
/// Returns [`Error::InvalidContainer`] on a bad signature, a truncated
/// chunk, or a CRC mismatch.
pub fn walk_chunks(png: &[u8]) -> Result<Vec<ChunkInfo>> {
    if png.len() < PNG_SIGNATURE.len() || png[..8] != PNG_SIGNATURE {
        return Err(Error::InvalidContainer(
            "missing PNG signature".to_string(),
        ));
    }

    let mut chunks = Vec::new();
    let mut offset = 8;
    while offset < png.len() {
        if offset + 12 > png.len() {
            return Err(Error::InvalidContainer(format!(
                "truncated chunk header at offset {offset}"
            )));
        }
        let length =
            u32::from_be_bytes([png[offset], png[offset + 1], png[offset + 2], png[offset + 3]])
                as usize;
        let end = offset + 12 + length;
        if end > png.len() {
            return Err(Error::InvalidContainer(format!(
                "chunk at offset {offset} overruns buffer"
            )));
        }

        let chunk_type = [
            png[offset + 4],
            png[offset + 5],
            png[offset + 6],
            png[offset + 7],
        ];
        let declared = u32::from_be_bytes([
            png[end - 4],
            png[end - 3],
            png[end - 2],
            png[end - 1],
        ]);
        let actual = crc32(&png[offset + 4..end - 4]);
        if declared != actual {
            return Err(Error::InvalidContainer(format!(
                "CRC mismatch in {} chunk",
                String::from_utf8_lossy(&chunk_type)
            )));
        }

        chunks.push(ChunkInfo {
            chunk_type,
            offset,
            length,
        });
        offset = end;
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal well-formed PNG: signature, IHDR, one IDAT, IEND.
    fn tiny_png() -> Vec<u8> {
        let mut png = PNG_SIGNATURE.to_vec();
        for (tag, payload) in [
            (b"IHDR", vec![0, 0, 0, 1, 0, 0, 0, 1, 8, 6, 0, 0, 0]),
            (b"IDAT", vec![0u8; 10]),
            (b"IEND", Vec::new()),
        ] {
            #[allow(clippy::cast_possible_truncation)]
            png.extend_from_slice(&(payload.len() as u32).to_be_bytes());
            png.extend_from_slice(tag);
            png.extend_from_slice(&payload);
            let mut crc_input = tag.to_vec();
            crc_input.extend_from_slice(&payload);
            png.extend_from_slice(&crc32(&crc_input).to_be_bytes());
        }
        png
    }

    #[test]
    fn crc32_matches_known_vector() {
        // Standard check value for "123456789".
        assert_eq!(crc32(b"123456789"), 0xcbf4_3926);
    }

    #[test]
    fn crc32_of_empty_input() {
        assert_eq!(crc32(b""), 0);
    }

    #[test]
    fn injected_output_still_walks_cleanly() {
        let png = tiny_png();
        let injected = inject_metadata(&png, "test-seed").unwrap();
        let chunks = walk_chunks(&injected).unwrap();

        let tags: Vec<&[u8; 4]> = chunks.iter().map(|c| &c.chunk_type).collect();
        assert_eq!(
            tags,
            vec![b"IHDR", b"iTXt", b"IDAT", b"IEND"],
            "chunk must land immediately after IHDR"
        );
    }

    #[test]
    fn injection_preserves_original_bytes_around_chunk() {
        let png = tiny_png();
        let injected = inject_metadata(&png, "test-seed").unwrap();
        let ihdr_end = 8 + 12 + 13;
        assert_eq!(&injected[..ihdr_end], &png[..ihdr_end]);
        assert_eq!(
            &injected[injected.len() - (png.len() - ihdr_end)..],
            &png[ihdr_end..]
        );
    }

    #[test]
    fn payload_carries_seed_and_tool_tag() {
        let png = tiny_png();
        let injected = inject_metadata(&png, "my-seed-123").unwrap();
        let text = String::from_utf8_lossy(&injected);
        assert!(text.contains("my-seed-123"));
        assert!(text.contains("PixelVeil"));
        assert!(text.contains("XML:com.adobe.xmp"));
    }

    #[test]
    fn injection_is_deterministic_per_seed() {
        let png = tiny_png();
        let a = inject_metadata(&png, "seed-a").unwrap();
        let b = inject_metadata(&png, "seed-a").unwrap();
        let c = inject_metadata(&png, "seed-b").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn bad_signature_is_rejected() {
        let err = inject_metadata(b"JFIF not a png at all....", "seed");
        assert!(matches!(err, Err(Error::InvalidContainer(_))));
    }

    #[test]
    fn truncated_ihdr_is_rejected() {
        let mut png = PNG_SIGNATURE.to_vec();
        png.extend_from_slice(&9999_u32.to_be_bytes());
        png.extend_from_slice(b"IHDR");
        let err = inject_metadata(&png, "seed");
        assert!(matches!(err, Err(Error::InvalidContainer(_))));
    }

    #[test]
    fn walk_rejects_corrupted_crc() {
        let mut png = tiny_png();
        let last = png.len() - 1;
        png[last] ^= 0xff; // corrupt IEND's CRC
        assert!(matches!(
            walk_chunks(&png),
            Err(Error::InvalidContainer(_))
        ));
    }

    #[test]
    fn decoy_fields_come_from_the_pools() {
        let mut rng = SeedRng::new("decoy");
        let decoy = decoy_metadata(&mut rng);
        assert!(DECOY_CAMERAS.contains(&decoy.camera.as_str()));
        assert!(DECOY_SOFTWARE.contains(&decoy.software.as_str()));
        assert!(DECOY_ARTISTS.contains(&decoy.artist.as_str()));
        assert!(DECOY_COPYRIGHTS.contains(&decoy.copyright.as_str()));
        // EXIF timestamp shape: "YYYY:MM:DD HH:MM:SS".
        assert_eq!(decoy.date_time.len(), 19);
        assert_eq!(&decoy.date_time[4..5], ":");
        assert_eq!(&decoy.date_time[10..11], " ");
    }
}
