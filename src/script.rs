// Script bytes plus on-demand textual views (hex, asm).
// Views are rendered fresh on every call; nothing is cached.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptError {
    InvalidHex,
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::InvalidHex => write!(f, "invalid hex script"),
        }
    }
}

impl std::error::Error for ScriptError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    bytes: Vec<u8>,
}

impl Script {
    pub fn new(bytes: Vec<u8>) -> Self {
        Script { bytes }
    }

    pub fn empty() -> Self {
        Script { bytes: Vec::new() }
    }

    pub fn from_hex(s: &str) -> Result<Self, ScriptError> {
        let bytes = hex::decode(s).map_err(|_| ScriptError::InvalidHex)?;
        Ok(Script { bytes })
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Hash160 payload iff this is the canonical p2pkh shape:
    /// OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG.
    pub fn p2pkh_hash(&self) -> Option<[u8; 20]> {
        let b = &self.bytes;
        if b.len() == 25
            && b[0] == 0x76
            && b[1] == 0xa9
            && b[2] == 0x14
            && b[23] == 0x88
            && b[24] == 0xac
        {
            let mut h = [0u8; 20];
            h.copy_from_slice(&b[3..23]);
            Some(h)
        } else {
            None
        }
    }

    /// Hash160 payload iff this is the canonical p2sh shape:
    /// OP_HASH160 <20 bytes> OP_EQUAL.
    pub fn p2sh_hash(&self) -> Option<[u8; 20]> {
        let b = &self.bytes;
        if b.len() == 23 && b[0] == 0xa9 && b[1] == 0x14 && b[22] == 0x87 {
            let mut h = [0u8; 20];
            h.copy_from_slice(&b[2..22]);
            Some(h)
        } else {
            None
        }
    }

    /// Symbolic rendering, one token per opcode, push payloads as hex.
    pub fn asm(&self) -> String {
        let mut out = String::new();
        let b = &self.bytes;
        let mut i = 0usize;

        while i < b.len() {
            if !out.is_empty() {
                out.push(' ');
            }
            let op = b[i];
            i += 1;

            let push_len = match op {
                0x01..=0x4b => Some(op as usize),
                0x4c => {
                    // OP_PUSHDATA1: one length byte follows
                    out.push_str("OP_PUSHDATA1");
                    if i >= b.len() {
                        out.push_str(" <push past end>");
                        break;
                    }
                    let n = b[i] as usize;
                    i += 1;
                    out.push(' ');
                    Some(n)
                }
                0x4d => {
                    out.push_str("OP_PUSHDATA2");
                    if i + 1 >= b.len() {
                        out.push_str(" <push past end>");
                        break;
                    }
                    let n = u16::from_le_bytes([b[i], b[i + 1]]) as usize;
                    i += 2;
                    out.push(' ');
                    Some(n)
                }
                0x4e => {
                    out.push_str("OP_PUSHDATA4");
                    if i + 3 >= b.len() {
                        out.push_str(" <push past end>");
                        break;
                    }
                    let n = u32::from_le_bytes([b[i], b[i + 1], b[i + 2], b[i + 3]]) as usize;
                    i += 4;
                    out.push(' ');
                    Some(n)
                }
                _ => None,
            };

            match push_len {
                Some(n) => {
                    if (0x01..=0x4b).contains(&op) {
                        out.push_str(&format!("OP_PUSHBYTES_{} ", n));
                    }
                    if i + n > b.len() {
                        out.push_str("<push past end>");
                        break;
                    }
                    out.push_str(&hex::encode(&b[i..i + n]));
                    i += n;
                }
                None => match opcode_name(op) {
                    Some(name) => out.push_str(name),
                    None => out.push_str(&format!("OP_UNKNOWN_0x{:02x}", op)),
                },
            }
        }

        out
    }
}

/// Names for the non-push opcodes we render symbolically.
fn opcode_name(op: u8) -> Option<&'static str> {
    Some(match op {
        0x00 => "OP_0",
        0x4f => "OP_PUSHNUM_NEG1",
        0x51 => "OP_PUSHNUM_1",
        0x52 => "OP_PUSHNUM_2",
        0x53 => "OP_PUSHNUM_3",
        0x54 => "OP_PUSHNUM_4",
        0x55 => "OP_PUSHNUM_5",
        0x56 => "OP_PUSHNUM_6",
        0x57 => "OP_PUSHNUM_7",
        0x58 => "OP_PUSHNUM_8",
        0x59 => "OP_PUSHNUM_9",
        0x5a => "OP_PUSHNUM_10",
        0x5b => "OP_PUSHNUM_11",
        0x5c => "OP_PUSHNUM_12",
        0x5d => "OP_PUSHNUM_13",
        0x5e => "OP_PUSHNUM_14",
        0x5f => "OP_PUSHNUM_15",
        0x60 => "OP_PUSHNUM_16",
        0x61 => "OP_NOP",
        0x63 => "OP_IF",
        0x64 => "OP_NOTIF",
        0x67 => "OP_ELSE",
        0x68 => "OP_ENDIF",
        0x69 => "OP_VERIFY",
        0x6a => "OP_RETURN",
        0x75 => "OP_DROP",
        0x76 => "OP_DUP",
        0x7c => "OP_SWAP",
        0x87 => "OP_EQUAL",
        0x88 => "OP_EQUALVERIFY",
        0x93 => "OP_ADD",
        0x94 => "OP_SUB",
        0xa8 => "OP_SHA256",
        0xa9 => "OP_HASH160",
        0xaa => "OP_HASH256",
        0xac => "OP_CHECKSIG",
        0xad => "OP_CHECKSIGVERIFY",
        0xae => "OP_CHECKMULTISIG",
        0xaf => "OP_CHECKMULTISIGVERIFY",
        0xb1 => "OP_CLTV",
        0xb2 => "OP_CSV",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip_is_idempotent() {
        let s = Script::from_hex("76a914000102030405060708090a0b0c0d0e0f1011121388ac")
            .expect("valid hex");
        let rendered = s.to_hex();
        let reparsed = Script::from_hex(&rendered).expect("round trip");
        assert_eq!(reparsed.to_hex(), rendered, "hex view must be stable");
    }

    #[test]
    fn bad_hex_is_rejected() {
        assert_eq!(Script::from_hex("88a").unwrap_err(), ScriptError::InvalidHex);
        assert_eq!(Script::from_hex("zz").unwrap_err(), ScriptError::InvalidHex);
    }

    #[test]
    fn asm_renders_operator_sequence() {
        let s = Script::new(vec![0x88, 0xac]);
        assert_eq!(s.asm(), "OP_EQUALVERIFY OP_CHECKSIG");
    }

    #[test]
    fn asm_renders_pushes_as_hex() {
        let s = Script::from_hex("a91457d6b4ded38193013643b03b4472e15f80bc465787")
            .expect("valid hex");
        assert_eq!(
            s.asm(),
            "OP_HASH160 OP_PUSHBYTES_20 57d6b4ded38193013643b03b4472e15f80bc4657 OP_EQUAL"
        );
    }

    #[test]
    fn asm_flags_truncated_push() {
        let s = Script::new(vec![0x05, 0xaa, 0xbb]);
        assert_eq!(s.asm(), "OP_PUSHBYTES_5 <push past end>");
    }

    #[test]
    fn shape_probes() {
        let p2sh = Script::from_hex("a91457d6b4ded38193013643b03b4472e15f80bc465787").unwrap();
        assert!(p2sh.p2sh_hash().is_some());
        assert!(p2sh.p2pkh_hash().is_none());

        let p2pkh =
            Script::from_hex("76a914000102030405060708090a0b0c0d0e0f1011121388ac").unwrap();
        assert!(p2pkh.p2pkh_hash().is_some());
        assert!(p2pkh.p2sh_hash().is_none());

        assert!(Script::new(vec![0x88, 0xac]).p2sh_hash().is_none());
        assert!(Script::empty().p2pkh_hash().is_none());
    }
}
