// Address = payload hash + network. Derivable only from scripts with a
// recognized shape; text form is base58check.

use crate::base58::{self, Base58Error};
use crate::network::Network;
use crate::script::Script;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    PubkeyHash([u8; 20]),
    ScriptHash([u8; 20]),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    Base58(Base58Error),
    BadLength(usize),
    UnknownVersion(u8),
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::Base58(e) => write!(f, "{}", e),
            AddressError::BadLength(n) => write!(f, "address payload has {} bytes, want 21", n),
            AddressError::UnknownVersion(v) => write!(f, "unknown address version 0x{:02x}", v),
        }
    }
}

impl std::error::Error for AddressError {}

impl From<Base58Error> for AddressError {
    fn from(e: Base58Error) -> Self {
        AddressError::Base58(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    pub payload: Payload,
    pub network: Network,
}

impl Address {
    /// None when the script has no address form; absence is not an error.
    pub fn from_script(script: &Script, network: Network) -> Option<Self> {
        if let Some(h) = script.p2pkh_hash() {
            Some(Address {
                payload: Payload::PubkeyHash(h),
                network,
            })
        } else if let Some(h) = script.p2sh_hash() {
            Some(Address {
                payload: Payload::ScriptHash(h),
                network,
            })
        } else {
            None
        }
    }

    /// Rebuild the canonical script for this address.
    pub fn script_pubkey(&self) -> Script {
        match self.payload {
            Payload::PubkeyHash(h) => {
                let mut b = Vec::with_capacity(25);
                b.extend_from_slice(&[0x76, 0xa9, 0x14]);
                b.extend_from_slice(&h);
                b.extend_from_slice(&[0x88, 0xac]);
                Script::new(b)
            }
            Payload::ScriptHash(h) => {
                let mut b = Vec::with_capacity(23);
                b.extend_from_slice(&[0xa9, 0x14]);
                b.extend_from_slice(&h);
                b.push(0x87);
                Script::new(b)
            }
        }
    }

    fn version_byte(&self) -> u8 {
        match self.payload {
            Payload::PubkeyHash(_) => self.network.p2pkh_version(),
            Payload::ScriptHash(_) => self.network.p2sh_version(),
        }
    }
}

impl FromStr for Address {
    type Err = AddressError;

    /// Testnet and regtest share version bytes; parsed addresses resolve to
    /// `Network::Testnet`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = base58::decode_check(s)?;
        if bytes.len() != 21 {
            return Err(AddressError::BadLength(bytes.len()));
        }
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&bytes[1..]);

        let (network, payload) = match bytes[0] {
            0x00 => (Network::Bitcoin, Payload::PubkeyHash(hash)),
            0x05 => (Network::Bitcoin, Payload::ScriptHash(hash)),
            0x6f => (Network::Testnet, Payload::PubkeyHash(hash)),
            0xc4 => (Network::Testnet, Payload::ScriptHash(hash)),
            v => return Err(AddressError::UnknownVersion(v)),
        };
        Ok(Address { payload, network })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hash = match self.payload {
            Payload::PubkeyHash(h) | Payload::ScriptHash(h) => h,
        };
        let mut buf = [0u8; 21];
        buf[0] = self.version_byte();
        buf[1..].copy_from_slice(&hash);
        write!(f, "{}", base58::encode_check(&buf))
    }
}
