//! MetadataTagger - embeds the latest sensor reading into a photo copy
//!
//! The JPEG container is handled with `img-parts` (APP1 segment in/out) and
//! the EXIF block itself with `kamadak-exif`. Existing fields and the
//! thumbnail are carried over; only the custom Exif IFD field is replaced.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use contracts::{tagged_file_name, PhotoCapture, TaggedPhoto, TaggingConfig};
use exif::experimental::Writer;
use exif::{Context, Exif, Field, In, Reader, Tag, Value};
use img_parts::jpeg::Jpeg;
use img_parts::ImageEXIF;
use ingestion::SensorChannel;
use observability::record_tag;
use tracing::{debug, info, instrument, warn};

use crate::capturer::unique_path;
use crate::error::{Result, TagError};

/// Tags the writer synthesizes itself
const SYNTHESIZED_TAGS: [Tag; 9] = [
    Tag::ExifIFDPointer,
    Tag::GPSInfoIFDPointer,
    Tag::InteropIFDPointer,
    Tag::StripOffsets,
    Tag::StripByteCounts,
    Tag::TileOffsets,
    Tag::TileByteCounts,
    Tag::JPEGInterchangeFormat,
    Tag::JPEGInterchangeFormatLength,
];

/// Exif IFD tag holding the reading
pub fn reading_tag(tag_id: u16) -> Tag {
    Tag(Context::Exif, tag_id)
}

pub struct MetadataTagger {
    channel: Arc<SensorChannel>,
    prefix: String,
    tag: Tag,
}

impl MetadataTagger {
    pub fn new(channel: Arc<SensorChannel>, prefix: impl Into<String>, tag_id: u16) -> Self {
        Self {
            channel,
            prefix: prefix.into(),
            tag: reading_tag(tag_id),
        }
    }

    pub fn from_config(channel: Arc<SensorChannel>, config: &TaggingConfig) -> Self {
        Self::new(channel, &config.prefix, config.tag_id)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Write `<prefix>_<name>` next to the photo, carrying the current reading
    ///
    /// The original is never modified. With no reading yet the copy is
    /// written without the custom field.
    #[instrument(
        name = "tagger_embed",
        skip(self, photo),
        fields(photo = %photo.file_name())
    )]
    pub async fn embed(&self, photo: &PhotoCapture) -> Result<TaggedPhoto> {
        let reading = self.channel.current_payload();
        let result = self.embed_reading(photo, reading.as_deref()).await;
        record_tag(result.is_ok());

        let path = result?;
        info!(
            tagged = %path.display(),
            has_reading = reading.is_some(),
            "Photo tagged"
        );
        Ok(TaggedPhoto {
            path,
            original: photo.path.clone(),
            reading,
        })
    }

    async fn embed_reading(&self, photo: &PhotoCapture, reading: Option<&str>) -> Result<PathBuf> {
        let source = tokio::fs::read(&photo.path).await?;
        let mut jpeg = Jpeg::from_bytes(Bytes::from(source))
            .map_err(|e| TagError::container(&photo.path, e.to_string()))?;

        let exif_block = self.rebuild_exif(&photo.path, jpeg.exif(), reading)?;
        jpeg.set_exif(exif_block);

        let mut out = Vec::new();
        jpeg.encoder().write_to(&mut out)?;

        let dir = photo.path.parent().unwrap_or(Path::new("."));
        let target = unique_path(dir, &tagged_file_name(&self.prefix, photo.file_name()));
        tokio::fs::write(&target, out).await?;
        Ok(target)
    }

    /// Existing EXIF fields plus the reading, serialized as a TIFF block
    fn rebuild_exif(
        &self,
        path: &Path,
        existing: Option<Bytes>,
        reading: Option<&str>,
    ) -> Result<Option<Bytes>> {
        let existing = existing.and_then(|raw| match Reader::new().read_raw(raw.to_vec()) {
            Ok(exif) => Some(exif),
            Err(e) => {
                warn!(error = %e, "Existing exif unreadable, starting empty");
                None
            }
        });

        let mut fields: Vec<Field> = existing
            .as_ref()
            .map(|exif| {
                exif.fields()
                    .filter(|f| self.keep_field(f))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(text) = reading {
            fields.push(Field {
                tag: self.tag,
                ifd_num: In::PRIMARY,
                value: Value::Ascii(vec![text.as_bytes().to_vec()]),
            });
        }

        let thumbnail = existing.as_ref().and_then(thumbnail_of);
        if fields.is_empty() && thumbnail.is_none() {
            return Ok(None);
        }

        let little_endian = existing.as_ref().map(Exif::little_endian).unwrap_or(false);
        let mut writer = Writer::new();
        for field in &fields {
            writer.push_field(field);
        }
        if let Some(thumb) = thumbnail {
            writer.set_jpeg(thumb, In::THUMBNAIL);
        }

        let mut buf = Cursor::new(Vec::new());
        writer
            .write(&mut buf, little_endian)
            .map_err(|source| TagError::ExifWrite {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(fields = fields.len(), "Exif block rebuilt");
        Ok(Some(Bytes::from(buf.into_inner())))
    }

    fn keep_field(&self, field: &Field) -> bool {
        if field.tag == self.tag && field.ifd_num == In::PRIMARY {
            return false;
        }
        if SYNTHESIZED_TAGS.contains(&field.tag) {
            return false;
        }
        !matches!(field.value, Value::Unknown(..))
    }

    /// Reading embedded in a tagged photo, if any
    pub async fn read_embedded(&self, path: &Path) -> Result<Option<String>> {
        read_embedded_tag(path, self.tag.number()).await
    }
}

/// Embedded thumbnail bytes inside the raw EXIF buffer
fn thumbnail_of(exif: &Exif) -> Option<&[u8]> {
    let offset = exif
        .get_field(Tag::JPEGInterchangeFormat, In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;
    let len = exif
        .get_field(Tag::JPEGInterchangeFormatLength, In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;
    exif.buf().get(offset..offset.checked_add(len)?)
}

/// Read the ASCII field `tag_id` of the Exif IFD from a JPEG file
///
/// Returns `Ok(None)` when the file has no EXIF block or no such field.
pub async fn read_embedded_tag(path: &Path, tag_id: u16) -> Result<Option<String>> {
    let source = tokio::fs::read(path).await?;
    let jpeg = Jpeg::from_bytes(Bytes::from(source))
        .map_err(|e| TagError::container(path, e.to_string()))?;

    let Some(raw) = jpeg.exif() else {
        return Ok(None);
    };
    let exif = Reader::new()
        .read_raw(raw.to_vec())
        .map_err(|e| TagError::container(path, format!("unreadable exif: {e}")))?;

    let value = exif
        .get_field(reading_tag(tag_id), In::PRIMARY)
        .and_then(|field| match &field.value {
            Value::Ascii(parts) => Some(
                parts
                    .iter()
                    .map(|p| String::from_utf8_lossy(p).into_owned())
                    .collect::<Vec<_>>()
                    .join(""),
            ),
            _ => None,
        });
    Ok(value)
}
