use std::fmt;

use serde::Serialize;
use sigforge::Forgery;

#[derive(Debug, Serialize)]
pub struct Report {
    pub backend: &'static str,
    pub public_key: String,
    pub public_key_uncompressed: String,
    pub header: u8,
    pub signature: String,
    pub redraws: u64,
}

impl Report {
    pub fn new(backend: &'static str, forgery: &Forgery) -> Self {
        Self {
            backend,
            public_key: hex::encode(forgery.public_key.serialize()),
            public_key_uncompressed: hex::encode(forgery.public_key.serialize_uncompressed()),
            header: forgery.header,
            signature: hex::encode(forgery.signature()),
            redraws: forgery.redraws,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "public key: {}", self.public_key)?;
        writeln!(f, "header:     {}", self.header)?;
        writeln!(f, "signature:  {}", self.signature)?;
        write!(f, "redraws:    {}", self.redraws)
    }
}
