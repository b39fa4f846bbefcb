// SPDX-License-Identifier: MIT

//! Stable 16-hex-character identifiers for jobs, nodes, and edges.

use rand::RngCore;
use std::borrow::Borrow;
use std::fmt;

/// Length in ASCII characters of every generated id.
pub const HEX_ID_LEN: usize = 16;

/// Fixed-size 16-hex-character id buffer, `Copy`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HexId([u8; HEX_ID_LEN]);

impl HexId {
    /// Generate a new random 16-hex-character id.
    pub fn generate() -> Self {
        let mut raw = [0u8; HEX_ID_LEN / 2];
        rand::thread_rng().fill_bytes(&mut raw);
        let mut buf = [0u8; HEX_ID_LEN];
        const HEX: &[u8; 16] = b"0123456789abcdef";
        for (i, byte) in raw.iter().enumerate() {
            buf[i * 2] = HEX[(byte >> 4) as usize];
            buf[i * 2 + 1] = HEX[(byte & 0x0f) as usize];
        }
        Self(buf)
    }

    /// Parse an existing 16-hex-character id (e.g. from storage or a test fixture).
    ///
    /// Accepts any string whose bytes we copy verbatim and pad/truncate to
    /// [`HEX_ID_LEN`] — this is lenient on purpose so fixtures can use short,
    /// readable ids like `"job1"` without needing real hex digits.
    pub fn from_str_lossy(s: &str) -> Self {
        let mut buf = [b'0'; HEX_ID_LEN];
        let bytes = s.as_bytes();
        let n = bytes.len().min(HEX_ID_LEN);
        buf[..n].copy_from_slice(&bytes[..n]);
        Self(buf)
    }

    pub fn as_str(&self) -> &str {
        // Invariant: only ever constructed from ASCII bytes.
        match std::str::from_utf8(&self.0) {
            Ok(s) => s,
            Err(_) => unreachable!("HexId constructed from non-ASCII bytes"),
        }
    }
}

impl fmt::Debug for HexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for HexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Borrow<str> for HexId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl serde::Serialize for HexId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for HexId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <&str>::deserialize(deserializer)?;
        Ok(HexId::from_str_lossy(s))
    }
}

/// Define a newtype id wrapper around [`HexId`].
///
/// Generates `new()` (random), `from_string()` (parse), `as_str()`,
/// `Display`, `From<&str>`, `From<String>`, `Borrow<str>`, and `Deref`.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $crate::id::HexId);

        impl $name {
            /// Generate a new random id.
            pub fn new() -> Self {
                Self($crate::id::HexId::generate())
            }

            /// Parse an id from an existing string (storage round-trip, fixtures).
            pub fn from_string(id: impl AsRef<str>) -> Self {
                Self($crate::id::HexId::from_str_lossy(id.as_ref()))
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({:?})", stringify!($name), self.0.as_str())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0.as_str())
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::from_string(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::from_string(s)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.0.as_str()
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                self.0.as_str()
            }
        }
    };
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
