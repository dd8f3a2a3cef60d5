use crate::codec::{str_len, Decode, DecodeError, Encode, Reader, Writer};

/// Release tags written into exported files. Empty strings are unset tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectMetadata {
    pub title: String,
    pub artist: String,
    pub album_artist: String,
    pub album: String,
    pub year: Option<u32>,
}

impl ProjectMetadata {
    /// Field names of tags that differ between `self` and `other`.
    pub fn changed_fields(&self, other: &ProjectMetadata) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.title != other.title {
            fields.push("title");
        }
        if self.artist != other.artist {
            fields.push("artist");
        }
        if self.album_artist != other.album_artist {
            fields.push("album artist");
        }
        if self.album != other.album {
            fields.push("album");
        }
        if self.year != other.year {
            fields.push("year");
        }
        fields
    }
}

impl Encode for ProjectMetadata {
    fn encode(&self, w: &mut Writer) {
        w.str(&self.title);
        w.str(&self.artist);
        w.str(&self.album_artist);
        w.str(&self.album);
        w.bool(self.year.is_some());
        if let Some(year) = self.year {
            w.u32(year);
        }
    }

    fn encoded_len(&self) -> usize {
        str_len(&self.title)
            + str_len(&self.artist)
            + str_len(&self.album_artist)
            + str_len(&self.album)
            + 1
            + if self.year.is_some() { 4 } else { 0 }
    }
}

impl Decode for ProjectMetadata {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            title: r.string()?,
            artist: r.string()?,
            album_artist: r.string()?,
            album: r.string()?,
            year: if r.bool()? { Some(r.u32()?) } else { None },
        })
    }
}
