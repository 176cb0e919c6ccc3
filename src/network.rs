// Network selector and the address version bytes that hang off it.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Bitcoin,
    Testnet,
    Regtest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNetworkError {
    pub input: String,
}

impl fmt::Display for ParseNetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown network: {}", self.input)
    }
}

impl std::error::Error for ParseNetworkError {}

impl Network {
    /// Version byte prefixed to a pubkey hash in base58check addresses.
    pub fn p2pkh_version(&self) -> u8 {
        match self {
            Network::Bitcoin => 0x00,
            Network::Testnet | Network::Regtest => 0x6f,
        }
    }

    /// Version byte prefixed to a script hash in base58check addresses.
    pub fn p2sh_version(&self) -> u8 {
        match self {
            Network::Bitcoin => 0x05,
            Network::Testnet | Network::Regtest => 0xc4,
        }
    }
}

impl FromStr for Network {
    type Err = ParseNetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bitcoin" => Ok(Network::Bitcoin),
            "testnet" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            _ => Err(ParseNetworkError { input: s.into() }),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Network::Bitcoin => "bitcoin",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_render_round_trip() {
        for n in [Network::Bitcoin, Network::Testnet, Network::Regtest] {
            let text = n.to_string();
            assert_eq!(text.parse::<Network>().expect("round trip"), n);
        }
    }

    #[test]
    fn unknown_network_is_rejected() {
        let err = "mainnet".parse::<Network>().unwrap_err();
        assert_eq!(err.input, "mainnet");
    }

    #[test]
    fn version_bytes() {
        assert_eq!(Network::Bitcoin.p2pkh_version(), 0x00);
        assert_eq!(Network::Bitcoin.p2sh_version(), 0x05);
        assert_eq!(Network::Testnet.p2sh_version(), 0xc4);
        assert_eq!(Network::Regtest.p2pkh_version(), 0x6f);
    }
}
