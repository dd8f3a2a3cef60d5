use crate::codec::{str_len, Decode, DecodeError, Encode, Reader, Writer};
use crate::{Entity, WideId};

/// A person editing the project. Commands record their author by user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: WideId,
    pub name: String,
}

impl User {
    pub fn new(id: WideId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Entity for User {
    const KIND: &'static str = "user";

    fn id(&self) -> WideId {
        self.id
    }
}

impl Encode for User {
    fn encode(&self, w: &mut Writer) {
        w.id(&self.id);
        w.str(&self.name);
    }

    fn encoded_len(&self) -> usize {
        WideId::LEN + str_len(&self.name)
    }
}

impl Decode for User {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            id: r.id()?,
            name: r.string()?,
        })
    }
}
