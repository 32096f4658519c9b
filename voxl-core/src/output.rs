//! Target formats for a finished emission log.
//!
//! Two concrete targets: an editor script that carries the whole graph
//! as a length-prefixed binary payload, base64-wrapped inside a fixed
//! decoder snippet, and an in-memory game-file structure for hosts that
//! write the save format themselves.

use crate::blocks::{Block, BlockId, Vector3I};
use crate::builder::{Command, SettingValue};
use crate::terminal::WireEnd;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildTarget {
    EditorScript,
    GameFile,
}

/// Optional operations a target supports. Callers check the flags and
/// treat a cleared flag as "operation unavailable", never as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildPlatformInfo {
    /// Whether existing placed blocks can be read back from the target.
    pub can_read_back: bool,
    /// Whether the target can define reusable custom sub-blocks.
    pub can_define_custom_blocks: bool,
}

impl BuildPlatformInfo {
    pub fn for_target(target: BuildTarget) -> BuildPlatformInfo {
        match target {
            BuildTarget::EditorScript => BuildPlatformInfo {
                can_read_back: false,
                can_define_custom_blocks: false,
            },
            BuildTarget::GameFile => BuildPlatformInfo {
                can_read_back: true,
                can_define_custom_blocks: true,
            },
        }
    }
}

/// One compiled program in a form the caller serializes itself.
#[derive(Debug, Clone, PartialEq)]
pub struct GameFile {
    pub blocks: Vec<GameFileBlock>,
    pub settings: Vec<GameFileSetting>,
    pub connections: Vec<GameFileConnection>,
    pub highlighted: Vec<BlockId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameFileBlock {
    pub def_id: u16,
    pub name: &'static str,
    pub position: Vector3I,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameFileSetting {
    pub block: BlockId,
    pub value: SettingValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameFileConnection {
    pub from: WireEnd,
    pub to: WireEnd,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuildArtifact {
    Script(String),
    GameFile(GameFile),
}

pub(crate) fn encode_artifact(
    target: BuildTarget,
    blocks: &[Block],
    highlighted: &[BlockId],
    commands: &[Command],
) -> BuildArtifact {
    match target {
        BuildTarget::EditorScript => {
            let payload = encode_payload(blocks, highlighted, commands);
            BuildArtifact::Script(wrap_script(&payload))
        }
        BuildTarget::GameFile => {
            let mut settings = Vec::new();
            let mut connections = Vec::new();
            for command in commands {
                match command {
                    Command::Place(_) => {}
                    Command::SetSetting { block, value } => settings.push(GameFileSetting {
                        block: *block,
                        value: value.clone(),
                    }),
                    Command::Connect { from, to } => connections.push(GameFileConnection {
                        from: *from,
                        to: *to,
                    }),
                }
            }
            BuildArtifact::GameFile(GameFile {
                blocks: blocks
                    .iter()
                    .map(|b| GameFileBlock {
                        def_id: b.def.id,
                        name: b.def.name,
                        position: b.position,
                    })
                    .collect(),
                settings,
                connections,
                highlighted: highlighted.to_vec(),
            })
        }
    }
}

// --- binary payload ---------------------------------------------------

const PAYLOAD_VERSION: u8 = 1;

/// Payload layout, all little-endian: `u32` byte length of everything
/// after the prefix, `u8` version, then length-prefixed block, setting,
/// connection and highlight lists.
pub(crate) fn encode_payload(
    blocks: &[Block],
    highlighted: &[BlockId],
    commands: &[Command],
) -> Vec<u8> {
    let mut body = Vec::new();
    body.push(PAYLOAD_VERSION);

    write_u16(&mut body, blocks.len() as u16);
    for block in blocks {
        write_u16(&mut body, block.def.id);
        write_i16(&mut body, block.position.x as i16);
        write_i16(&mut body, block.position.y as i16);
        write_i16(&mut body, block.position.z as i16);
    }

    let settings: Vec<(BlockId, &SettingValue)> = commands
        .iter()
        .filter_map(|c| match c {
            Command::SetSetting { block, value } => Some((*block, value)),
            _ => None,
        })
        .collect();
    write_u16(&mut body, settings.len() as u16);
    for (block, value) in settings {
        write_u16(&mut body, block as u16);
        match value {
            SettingValue::Number(n) => {
                body.push(0);
                body.extend_from_slice(&n.to_le_bytes());
            }
            SettingValue::Bool(b) => {
                body.push(1);
                body.push(u8::from(*b));
            }
            SettingValue::Vector(v) => {
                body.push(2);
                for component in v {
                    body.extend_from_slice(&component.to_le_bytes());
                }
            }
            SettingValue::Rotation(r) => {
                body.push(3);
                for component in r {
                    body.extend_from_slice(&component.to_le_bytes());
                }
            }
            SettingValue::Name(name) => {
                body.push(4);
                write_u16(&mut body, name.len() as u16);
                body.extend_from_slice(name.as_bytes());
            }
        }
    }

    let connections: Vec<(WireEnd, WireEnd)> = commands
        .iter()
        .filter_map(|c| match c {
            Command::Connect { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect();
    write_u16(&mut body, connections.len() as u16);
    for (from, to) in connections {
        write_u16(&mut body, from.block as u16);
        body.push(from.terminal as u8);
        write_u16(&mut body, to.block as u16);
        body.push(to.terminal as u8);
    }

    write_u16(&mut body, highlighted.len() as u16);
    for &id in highlighted {
        write_u16(&mut body, id as u16);
    }

    let mut payload = Vec::with_capacity(4 + body.len());
    payload.extend_from_slice(&(body.len() as u32).to_le_bytes());
    payload.extend_from_slice(&body);
    payload
}

fn write_u16(buffer: &mut Vec<u8>, value: u16) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

fn write_i16(buffer: &mut Vec<u8>, value: i16) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

// --- editor script wrapper --------------------------------------------

const SCRIPT_HEADER: &str = "-- generated block graph, do not edit\nlocal payload = \"";
const SCRIPT_FOOTER: &str = "\"\nplace_graph(decode_base64(payload))\n";

fn wrap_script(payload: &[u8]) -> String {
    let mut script = String::with_capacity(
        SCRIPT_HEADER.len() + SCRIPT_FOOTER.len() + payload.len() * 4 / 3 + 4,
    );
    script.push_str(SCRIPT_HEADER);
    script.push_str(&encode_base64(payload));
    script.push_str(SCRIPT_FOOTER);
    script
}

const BASE64_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Standard padded base64. The target platform has no library support,
/// so the encoder is spelled out.
pub(crate) fn encode_base64(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        let b0 = chunk[0] as u32;
        let b1 = chunk.get(1).copied().unwrap_or(0) as u32;
        let b2 = chunk.get(2).copied().unwrap_or(0) as u32;
        let triple = (b0 << 16) | (b1 << 8) | b2;
        out.push(BASE64_ALPHABET[(triple >> 18) as usize & 0x3f] as char);
        out.push(BASE64_ALPHABET[(triple >> 12) as usize & 0x3f] as char);
        if chunk.len() > 1 {
            out.push(BASE64_ALPHABET[(triple >> 6) as usize & 0x3f] as char);
        } else {
            out.push('=');
        }
        if chunk.len() > 2 {
            out.push(BASE64_ALPHABET[triple as usize & 0x3f] as char);
        } else {
            out.push('=');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{NUMBER_VALUE, SET_NUMBER_VARIABLE, WIN};

    #[test]
    fn base64_reference_vectors() {
        assert_eq!(encode_base64(b""), "");
        assert_eq!(encode_base64(b"f"), "Zg==");
        assert_eq!(encode_base64(b"fo"), "Zm8=");
        assert_eq!(encode_base64(b"foo"), "Zm9v");
        assert_eq!(encode_base64(b"foob"), "Zm9vYg==");
        assert_eq!(encode_base64(b"fooba"), "Zm9vYmE=");
        assert_eq!(encode_base64(b"foobar"), "Zm9vYmFy");
    }

    fn sample_blocks() -> Vec<Block> {
        vec![
            Block {
                id: 0,
                def: &NUMBER_VALUE,
                position: Vector3I::new(-3, 0, 0),
            },
            Block {
                id: 1,
                def: &SET_NUMBER_VARIABLE,
                position: Vector3I::new(0, 0, 0),
            },
        ]
    }

    fn sample_commands() -> Vec<Command> {
        vec![
            Command::Place(0),
            Command::SetSetting {
                block: 0,
                value: SettingValue::Number(4.0),
            },
            Command::Place(1),
            Command::SetSetting {
                block: 1,
                value: SettingValue::Name("x".to_string()),
            },
            Command::Connect {
                from: WireEnd::new(0, 0),
                to: WireEnd::new(1, 1),
            },
        ]
    }

    #[test]
    fn payload_length_prefix_covers_the_body() {
        let payload = encode_payload(&sample_blocks(), &[], &sample_commands());
        let declared = u32::from_le_bytes(payload[..4].try_into().expect("prefix")) as usize;
        assert_eq!(declared, payload.len() - 4);
        assert_eq!(payload[4], PAYLOAD_VERSION);
        // Block count immediately follows the version.
        assert_eq!(u16::from_le_bytes([payload[5], payload[6]]), 2);
    }

    #[test]
    fn script_wraps_payload_in_the_decoder_snippet() {
        let artifact = encode_artifact(
            BuildTarget::EditorScript,
            &sample_blocks(),
            &[],
            &sample_commands(),
        );
        let BuildArtifact::Script(script) = artifact else {
            panic!("expected script artifact");
        };
        assert!(script.starts_with(SCRIPT_HEADER));
        assert!(script.ends_with(SCRIPT_FOOTER));
        let encoded = &script[SCRIPT_HEADER.len()..script.len() - SCRIPT_FOOTER.len()];
        assert!(!encoded.is_empty());
        assert!(
            encoded
                .bytes()
                .all(|b| BASE64_ALPHABET.contains(&b) || b == b'=')
        );
    }

    #[test]
    fn game_file_carries_the_full_log() {
        let artifact = encode_artifact(
            BuildTarget::GameFile,
            &sample_blocks(),
            &[1],
            &sample_commands(),
        );
        let BuildArtifact::GameFile(file) = artifact else {
            panic!("expected game file artifact");
        };
        assert_eq!(file.blocks.len(), 2);
        assert_eq!(file.blocks[0].def_id, NUMBER_VALUE.id);
        assert_eq!(file.blocks[0].position, Vector3I::new(-3, 0, 0));
        assert_eq!(file.settings.len(), 2);
        assert_eq!(file.connections.len(), 1);
        assert_eq!(file.highlighted, vec![1]);
    }

    #[test]
    fn capability_flags_differ_per_target() {
        let script = BuildPlatformInfo::for_target(BuildTarget::EditorScript);
        assert!(!script.can_read_back);
        let game = BuildPlatformInfo::for_target(BuildTarget::GameFile);
        assert!(game.can_read_back);
        assert!(game.can_define_custom_blocks);
    }

    #[test]
    fn highlight_list_is_serialized_at_the_tail() {
        let without = encode_payload(&sample_blocks(), &[], &sample_commands());
        let with = encode_payload(&sample_blocks(), &[0, 1], &sample_commands());
        assert_eq!(with.len(), without.len() + 4);
    }

    #[test]
    fn unused_win_block_is_still_encoded() {
        let blocks = vec![Block {
            id: 0,
            def: &WIN,
            position: Vector3I::ZERO,
        }];
        let payload = encode_payload(&blocks, &[], &[Command::Place(0)]);
        assert_eq!(
            u16::from_le_bytes([payload[7], payload[8]]),
            WIN.id,
            "block def id follows the count"
        );
    }
}
