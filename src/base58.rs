// Base58 / base58check, enough for address text. Checksum is the first
// four bytes of double SHA-256 over the payload.

use sha2::{Digest, Sha256};
use std::fmt;

const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base58Error {
    InvalidCharacter(char),
    BadChecksum,
    TooShort(usize),
}

impl fmt::Display for Base58Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Base58Error::InvalidCharacter(c) => write!(f, "invalid base58 character: {:?}", c),
            Base58Error::BadChecksum => write!(f, "base58check checksum mismatch"),
            Base58Error::TooShort(n) => write!(f, "base58check payload too short: {} bytes", n),
        }
    }
}

impl std::error::Error for Base58Error {}

fn digit_value(c: u8) -> Option<u8> {
    ALPHABET.iter().position(|&a| a == c).map(|p| p as u8)
}

pub fn encode(data: &[u8]) -> String {
    let zeros = data.iter().take_while(|&&b| b == 0).count();

    // Base-256 to base-58, least significant digit first.
    let mut digits: Vec<u8> = Vec::with_capacity(data.len() * 138 / 100 + 1);
    for &byte in &data[zeros..] {
        let mut carry = byte as u32;
        for d in digits.iter_mut() {
            carry += (*d as u32) << 8;
            *d = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }

    let mut out = String::with_capacity(zeros + digits.len());
    for _ in 0..zeros {
        out.push('1');
    }
    for &d in digits.iter().rev() {
        out.push(ALPHABET[d as usize] as char);
    }
    out
}

pub fn decode(s: &str) -> Result<Vec<u8>, Base58Error> {
    let zeros = s.bytes().take_while(|&c| c == b'1').count();

    let mut bytes: Vec<u8> = Vec::with_capacity(s.len() * 733 / 1000 + 1);
    for c in s.bytes() {
        let val = match digit_value(c) {
            Some(v) => v,
            None => return Err(Base58Error::InvalidCharacter(c as char)),
        };
        let mut carry = val as u32;
        for b in bytes.iter_mut() {
            carry += (*b as u32) * 58;
            *b = (carry & 0xff) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push((carry & 0xff) as u8);
            carry >>= 8;
        }
    }

    // Strip the zeros the big-number pass may have produced for leading '1's,
    // then restore exactly that many.
    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    bytes.extend(std::iter::repeat(0).take(zeros));
    bytes.reverse();
    Ok(bytes)
}

fn checksum(payload: &[u8]) -> [u8; 4] {
    let first = Sha256::digest(payload);
    let second = Sha256::digest(first);
    let mut out = [0u8; 4];
    out.copy_from_slice(&second[..4]);
    out
}

pub fn encode_check(payload: &[u8]) -> String {
    let mut buf = Vec::with_capacity(payload.len() + 4);
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&checksum(payload));
    encode(&buf)
}

pub fn decode_check(s: &str) -> Result<Vec<u8>, Base58Error> {
    let mut bytes = decode(s)?;
    if bytes.len() < 4 {
        return Err(Base58Error::TooShort(bytes.len()));
    }
    let split = bytes.len() - 4;
    let expected = checksum(&bytes[..split]);
    if bytes[split..] != expected {
        return Err(Base58Error::BadChecksum);
    }
    bytes.truncate(split);
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        assert_eq!(encode(b""), "");
        assert_eq!(encode(&[0]), "1");
        assert_eq!(encode(b"hello world"), "StV1DL6CwTryKyV");
        assert_eq!(decode("StV1DL6CwTryKyV").unwrap(), b"hello world");
    }

    #[test]
    fn leading_zeros_survive() {
        let data = [0u8, 0, 1, 2, 3];
        let text = encode(&data);
        assert!(text.starts_with("11"));
        assert_eq!(decode(&text).unwrap(), data);
    }

    #[test]
    fn check_round_trip() {
        let payload = [0x05u8, 0x57, 0xd6, 0xb4, 0xde, 0xd3, 0x81, 0x93];
        let text = encode_check(&payload);
        assert_eq!(decode_check(&text).unwrap(), payload);
    }

    #[test]
    fn corrupt_checksum_is_rejected() {
        let text = encode_check(&[0x00u8; 21]);
        // Swap the final character for a different alphabet member.
        let mut corrupted: Vec<u8> = text.clone().into_bytes();
        let last = *corrupted.last().unwrap();
        *corrupted.last_mut().unwrap() = if last == b'2' { b'3' } else { b'2' };
        let corrupted = String::from_utf8(corrupted).unwrap();
        assert_eq!(decode_check(&corrupted).unwrap_err(), Base58Error::BadChecksum);
    }

    #[test]
    fn invalid_character_is_rejected() {
        assert_eq!(
            decode("0OIl").unwrap_err(),
            Base58Error::InvalidCharacter('0')
        );
    }

    #[test]
    fn short_check_payload_is_rejected() {
        assert_eq!(decode_check("1").unwrap_err(), Base58Error::TooShort(1));
    }
}
