/// Hash algorithm identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgId {
    Sm3,
}

impl HashAlgId {
    /// Digest length in bytes.
    pub fn output_size(self) -> usize {
        match self {
            HashAlgId::Sm3 => 32,
        }
    }
}

/// Symmetric cipher algorithm identifiers (algorithm + mode combination).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherAlgId {
    Sm4Ecb,
    Sm4Gcm,
}

impl CipherAlgId {
    /// Canonical lowercase name, as accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            CipherAlgId::Sm4Ecb => "sm4-ecb",
            CipherAlgId::Sm4Gcm => "sm4-gcm",
        }
    }

    /// Parse a canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sm4-ecb" | "sm4" => Some(CipherAlgId::Sm4Ecb),
            "sm4-gcm" => Some(CipherAlgId::Sm4Gcm),
            _ => None,
        }
    }
}
