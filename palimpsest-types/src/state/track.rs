use crate::codec::{str_len, Decode, DecodeError, Encode, Reader, Writer};
use crate::{Entity, SortKey, WideId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: WideId,
    pub name: String,
    pub sort_key: SortKey,
}

impl Entity for Track {
    const KIND: &'static str = "track";

    fn id(&self) -> WideId {
        self.id
    }
}

impl Encode for Track {
    fn encode(&self, w: &mut Writer) {
        w.id(&self.id);
        w.str(&self.name);
        self.sort_key.encode(w);
    }

    fn encoded_len(&self) -> usize {
        WideId::LEN + str_len(&self.name) + self.sort_key.encoded_len()
    }
}

impl Decode for Track {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            id: r.id()?,
            name: r.string()?,
            sort_key: SortKey::decode(r)?,
        })
    }
}
