/// Symbolic address resolution for the S7-200 Smart memory map.
///
/// Translation happens in two stages, both pure:
/// 1. Alias rewriting: the legacy shorthands `M<b>.<bit>`, `VD<n>` and
///    `VW<n>` used throughout the chamber address sheets are rewritten to
///    their canonical forms (`VX<b>.<bit>`, `DB1.DBD<n>`, `DB1.DBW<n>`).
/// 2. Area + type classification: the canonical string determines the
///    memory area, byte/bit offsets and the value type that reads decode
///    to and writes encode from.
///
/// No parsed form is cached between calls; every transaction re-resolves
/// its address string.
use serde::Serialize;
use std::fmt;
use strum::EnumIter;

use crate::protocol::error::PlcError;

/// Memory zones of the controller address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Area {
    DataBlock,
    ProcessInput,
    ProcessOutput,
    Marker,
}

impl Area {
    /// S7comm area code used on the wire.
    pub fn code(self) -> u8 {
        match self {
            Area::ProcessInput => 0x81,
            Area::ProcessOutput => 0x82,
            Area::Marker => 0x83,
            Area::DataBlock => 0x84,
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Area::DataBlock => write!(f, "data_block"),
            Area::ProcessInput => write!(f, "process_input"),
            Area::ProcessOutput => write!(f, "process_output"),
            Area::Marker => write!(f, "marker"),
        }
    }
}

/// Value type inferred from the address, not declared by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Single bit within a byte.
    Bit,
    /// One byte, decoded as a (non-negative) 16-bit integer.
    Byte,
    /// Big-endian 16-bit integer.
    Word,
    /// Big-endian IEEE-754 32-bit float.
    Real,
    /// Big-endian unsigned 32-bit word.
    DWord,
}

impl ValueKind {
    /// Width of the addressable unit in bytes.
    pub fn width(self) -> usize {
        match self {
            ValueKind::Bit | ValueKind::Byte => 1,
            ValueKind::Word => 2,
            ValueKind::Real | ValueKind::DWord => 4,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Bit => write!(f, "bool"),
            ValueKind::Byte => write!(f, "byte"),
            ValueKind::Word => write!(f, "int"),
            ValueKind::Real => write!(f, "real"),
            ValueKind::DWord => write!(f, "dword"),
        }
    }
}

/// Fully classified address, derived fresh for each transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    pub area: Area,
    /// Data block number; 0 outside the DataBlock area.
    pub db_number: u16,
    pub byte_offset: u32,
    /// 0..=7, meaningful only for `ValueKind::Bit`.
    pub bit_offset: u8,
    pub kind: ValueKind,
}

/// Rewrite legacy shorthand forms to their canonical addresses.
///
/// Idempotent on its own output: translating an already-canonical address
/// returns it unchanged apart from case folding.
pub fn translate_alias(address: &str) -> String {
    let upper = address.trim().to_ascii_uppercase();

    if let Some(rest) = upper.strip_prefix('M') {
        if rest.contains('.') && !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return format!("VX{rest}");
        }
    }
    if let Some(rest) = upper.strip_prefix("VD") {
        return format!("DB1.DBD{rest}");
    }
    if let Some(rest) = upper.strip_prefix("VW") {
        return format!("DB1.DBW{rest}");
    }

    upper
}

/// Resolve a symbolic address into its area, offsets and value type.
///
/// Any string matching none of the supported patterns fails with
/// [`PlcError::Classification`]; this is a configuration/mapping bug
/// upstream, never a transient condition, and no device I/O happens for it.
pub fn resolve(address: &str) -> Result<ResolvedAddress, PlcError> {
    let canonical = translate_alias(address);

    if canonical.starts_with("DB") {
        resolve_data_block(address, &canonical)
    } else {
        resolve_direct(address, &canonical)
    }
}

fn parse_num<T: std::str::FromStr>(original: &str, digits: &str) -> Result<T, PlcError> {
    digits
        .parse::<T>()
        .map_err(|_| PlcError::classification(original))
}

/// `DB<n>.DB{X|B|W|D}<offset>[.<bit>]`
fn resolve_data_block(original: &str, canonical: &str) -> Result<ResolvedAddress, PlcError> {
    let (head, sub) = canonical
        .split_once('.')
        .ok_or_else(|| PlcError::classification(original))?;
    let db_number: u16 = parse_num(original, &head[2..])?;

    let (kind, rest) = if let Some(rest) = sub.strip_prefix("DBX") {
        (ValueKind::Bit, rest)
    } else if let Some(rest) = sub.strip_prefix("DBB") {
        (ValueKind::Byte, rest)
    } else if let Some(rest) = sub.strip_prefix("DBW") {
        (ValueKind::Word, rest)
    } else if let Some(rest) = sub.strip_prefix("DBD") {
        (ValueKind::Real, rest)
    } else {
        return Err(PlcError::classification(original));
    };

    let (byte_offset, bit_offset) = parse_offsets(original, rest, kind)?;

    Ok(ResolvedAddress {
        area: Area::DataBlock,
        db_number,
        byte_offset,
        bit_offset,
        kind,
    })
}

/// Non-DB forms: `V`/`M`/`I`/`Q`/`AI`/`AQ` prefixes with an `X`/`B`/`W`/`D`
/// sub-selector, plus the word-style aliases `AIW`/`AQW`/`IW`/`QW`.
fn resolve_direct(original: &str, canonical: &str) -> Result<ResolvedAddress, PlcError> {
    let area = resolve_area(original, canonical)?;

    let mut chars = canonical.chars();
    let _prefix = chars.next().ok_or_else(|| PlcError::classification(original))?;
    let selector = chars.next();

    let (kind, rest) = match selector {
        Some('X') => (ValueKind::Bit, &canonical[2..]),
        Some('B') => (ValueKind::Byte, &canonical[2..]),
        Some('W') => (ValueKind::Word, &canonical[2..]),
        Some('D') => {
            // `VD` never reaches this path (it is aliased to DB1.DBD), so a
            // bare `D` selector is an unsigned 32-bit word.
            let kind = if canonical.starts_with("VD") {
                ValueKind::Real
            } else {
                ValueKind::DWord
            };
            (kind, &canonical[2..])
        }
        _ if canonical.starts_with("AIW") || canonical.starts_with("AQW") => {
            (ValueKind::Word, &canonical[3..])
        }
        _ => return Err(PlcError::classification(original)),
    };

    let (byte_offset, bit_offset) = parse_offsets(original, rest, kind)?;

    Ok(ResolvedAddress {
        area,
        db_number: 0,
        byte_offset,
        bit_offset,
        kind,
    })
}

fn resolve_area(original: &str, canonical: &str) -> Result<Area, PlcError> {
    if canonical.starts_with("AI") && !canonical.starts_with("AIW") {
        // Analog inputs are only addressable as words.
        return Err(PlcError::classification(original));
    }
    if canonical.starts_with("AQ") && !canonical.starts_with("AQW") {
        return Err(PlcError::classification(original));
    }

    if canonical.starts_with("AI") || canonical.starts_with("IW") || canonical.starts_with('I') {
        Ok(Area::ProcessInput)
    } else if canonical.starts_with("AQ")
        || canonical.starts_with("QW")
        || canonical.starts_with('Q')
    {
        Ok(Area::ProcessOutput)
    } else if canonical.starts_with('V') || canonical.starts_with('M') {
        Ok(Area::Marker)
    } else {
        Err(PlcError::classification(original))
    }
}

/// Parse `<byte>[.<bit>]`. The bit part is required for bit access and
/// rejected for everything else.
fn parse_offsets(original: &str, rest: &str, kind: ValueKind) -> Result<(u32, u8), PlcError> {
    if kind == ValueKind::Bit {
        let (byte, bit) = rest
            .split_once('.')
            .ok_or_else(|| PlcError::classification(original))?;
        let byte_offset: u32 = parse_num(original, byte)?;
        let bit_offset: u8 = parse_num(original, bit)?;
        if bit_offset > 7 {
            return Err(PlcError::classification(original));
        }
        Ok((byte_offset, bit_offset))
    } else {
        if rest.contains('.') {
            return Err(PlcError::classification(original));
        }
        Ok((parse_num(original, rest)?, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_translation_rewrites_legacy_forms() {
        assert_eq!(translate_alias("M1.0"), "VX1.0");
        assert_eq!(translate_alias("m1.4"), "VX1.4");
        assert_eq!(translate_alias("VD100"), "DB1.DBD100");
        assert_eq!(translate_alias("vd504"), "DB1.DBD504");
        assert_eq!(translate_alias("VW20"), "DB1.DBW20");
    }

    #[test]
    fn alias_translation_is_idempotent_on_canonical_forms() {
        for addr in ["VX1.0", "DB1.DBD100", "DB1.DBW20", "DB2.DBX0.3", "QW4", "AIW2"] {
            assert_eq!(translate_alias(addr), addr);
            assert_eq!(translate_alias(&translate_alias(addr)), addr);
        }
        // Case folding is the only change for already-canonical input.
        assert_eq!(translate_alias("db1.dbd100"), "DB1.DBD100");
    }

    #[test]
    fn marker_bit_scenario() {
        let resolved = resolve("M1.0").unwrap();
        assert_eq!(resolved.area, Area::Marker);
        assert_eq!(resolved.kind, ValueKind::Bit);
        assert_eq!(resolved.byte_offset, 1);
        assert_eq!(resolved.bit_offset, 0);
        assert_eq!(resolved.kind.width(), 1);
    }

    #[test]
    fn legacy_float_scenario() {
        let resolved = resolve("VD100").unwrap();
        assert_eq!(resolved.area, Area::DataBlock);
        assert_eq!(resolved.db_number, 1);
        assert_eq!(resolved.byte_offset, 100);
        assert_eq!(resolved.kind, ValueKind::Real);
        assert_eq!(resolved.kind.width(), 4);
    }

    #[test]
    fn data_block_sub_types() {
        let bit = resolve("DB2.DBX10.7").unwrap();
        assert_eq!(bit.db_number, 2);
        assert_eq!(bit.byte_offset, 10);
        assert_eq!(bit.bit_offset, 7);
        assert_eq!(bit.kind, ValueKind::Bit);

        let byte = resolve("DB1.DBB5").unwrap();
        assert_eq!(byte.kind, ValueKind::Byte);
        assert_eq!(byte.byte_offset, 5);

        let word = resolve("DB1.DBW50").unwrap();
        assert_eq!(word.kind, ValueKind::Word);
        assert_eq!(word.byte_offset, 50);

        let real = resolve("DB1.DBD0").unwrap();
        assert_eq!(real.kind, ValueKind::Real);
    }

    #[test]
    fn process_io_forms() {
        let ix = resolve("IX0.1").unwrap();
        assert_eq!(ix.area, Area::ProcessInput);
        assert_eq!(ix.kind, ValueKind::Bit);
        assert_eq!(ix.bit_offset, 1);

        let qx = resolve("QX0.0").unwrap();
        assert_eq!(qx.area, Area::ProcessOutput);
        assert_eq!(qx.kind, ValueKind::Bit);

        let qw = resolve("QW4").unwrap();
        assert_eq!(qw.area, Area::ProcessOutput);
        assert_eq!(qw.kind, ValueKind::Word);
        assert_eq!(qw.byte_offset, 4);

        let aiw = resolve("AIW2").unwrap();
        assert_eq!(aiw.area, Area::ProcessInput);
        assert_eq!(aiw.kind, ValueKind::Word);
        assert_eq!(aiw.byte_offset, 2);

        let aqw = resolve("aqw8").unwrap();
        assert_eq!(aqw.area, Area::ProcessOutput);
        assert_eq!(aqw.byte_offset, 8);

        let id = resolve("ID4").unwrap();
        assert_eq!(id.kind, ValueKind::DWord);
        assert_eq!(id.byte_offset, 4);
    }

    #[test]
    fn marker_double_word_is_unsigned() {
        let md = resolve("MD8").unwrap();
        assert_eq!(md.area, Area::Marker);
        assert_eq!(md.kind, ValueKind::DWord);
    }

    #[test]
    fn unknown_patterns_are_classification_errors() {
        for addr in ["unknown", "xyz123", "", "DB1", "DB1.FOO0", "X1.0", "VX1", "VX1.8"] {
            match resolve(addr) {
                Err(PlcError::Classification { address }) => assert_eq!(address, addr),
                other => panic!("expected classification error for {addr:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn area_wire_codes_are_distinct() {
        use strum::IntoEnumIterator;
        let codes: std::collections::HashSet<u8> = Area::iter().map(Area::code).collect();
        assert_eq!(codes.len(), Area::iter().count());
    }

    #[test]
    fn widths_match_the_addressable_unit() {
        use strum::IntoEnumIterator;
        for kind in ValueKind::iter() {
            assert!(matches!(kind.width(), 1 | 2 | 4));
        }
    }

    #[test]
    fn case_insensitivity() {
        assert_eq!(resolve("db1.dbw50").unwrap(), resolve("DB1.DBW50").unwrap());
        assert_eq!(resolve("vx0.0").unwrap(), resolve("VX0.0").unwrap());
    }
}
