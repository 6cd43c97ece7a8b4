//! Column metadata of text-protocol result sets.

use crate::protocol::PacketReader;

/// MySQL field type codes (`MYSQL_TYPE_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FieldType {
    Decimal = 0x00,
    Tiny = 0x01,
    Short = 0x02,
    Long = 0x03,
    Float = 0x04,
    Double = 0x05,
    Null = 0x06,
    Timestamp = 0x07,
    LongLong = 0x08,
    Int24 = 0x09,
    Date = 0x0A,
    Time = 0x0B,
    DateTime = 0x0C,
    Year = 0x0D,
    NewDate = 0x0E,
    VarChar = 0x0F,
    Bit = 0x10,
    Timestamp2 = 0x11,
    DateTime2 = 0x12,
    Time2 = 0x13,
    Json = 0xF5,
    NewDecimal = 0xF6,
    Enum = 0xF7,
    Set = 0xF8,
    TinyBlob = 0xF9,
    MediumBlob = 0xFA,
    LongBlob = 0xFB,
    Blob = 0xFC,
    VarString = 0xFD,
    String = 0xFE,
    Geometry = 0xFF,
}

impl FieldType {
    /// Parse a field type from a byte; unknown codes read as `String`.
    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => FieldType::Decimal,
            0x01 => FieldType::Tiny,
            0x02 => FieldType::Short,
            0x03 => FieldType::Long,
            0x04 => FieldType::Float,
            0x05 => FieldType::Double,
            0x06 => FieldType::Null,
            0x07 => FieldType::Timestamp,
            0x08 => FieldType::LongLong,
            0x09 => FieldType::Int24,
            0x0A => FieldType::Date,
            0x0B => FieldType::Time,
            0x0C => FieldType::DateTime,
            0x0D => FieldType::Year,
            0x0E => FieldType::NewDate,
            0x0F => FieldType::VarChar,
            0x10 => FieldType::Bit,
            0x11 => FieldType::Timestamp2,
            0x12 => FieldType::DateTime2,
            0x13 => FieldType::Time2,
            0xF5 => FieldType::Json,
            0xF6 => FieldType::NewDecimal,
            0xF7 => FieldType::Enum,
            0xF8 => FieldType::Set,
            0xF9 => FieldType::TinyBlob,
            0xFA => FieldType::MediumBlob,
            0xFB => FieldType::LongBlob,
            0xFC => FieldType::Blob,
            0xFD => FieldType::VarString,
            0xFF => FieldType::Geometry,
            _ => FieldType::String,
        }
    }

    /// Numeric types (the `IS_NUM` test of the C client).
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            FieldType::Decimal
                | FieldType::Tiny
                | FieldType::Short
                | FieldType::Long
                | FieldType::Float
                | FieldType::Double
                | FieldType::LongLong
                | FieldType::Int24
                | FieldType::Year
                | FieldType::NewDecimal
        )
    }
}

/// Column flag bits.
pub mod column_flags {
    pub const NOT_NULL: u16 = 1;
    pub const PRIMARY_KEY: u16 = 2;
    pub const UNSIGNED: u16 = 32;
}

/// One column definition packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub catalog: String,
    pub schema: String,
    /// Table alias as written in the query
    pub table: String,
    pub org_table: String,
    /// Column alias as written in the query
    pub name: String,
    pub org_name: String,
    pub charset: u16,
    pub column_length: u32,
    pub column_type: FieldType,
    pub flags: u16,
    pub decimals: u8,
}

impl ColumnDef {
    /// A column with just a name; everything else empty.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            catalog: "def".to_string(),
            schema: String::new(),
            table: String::new(),
            org_table: String::new(),
            name: name.into(),
            org_name: String::new(),
            charset: 33,
            column_length: 0,
            column_type: FieldType::VarString,
            flags: 0,
            decimals: 0,
        }
    }

    /// Builder for the table alias.
    #[must_use]
    pub fn in_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Parse a Protocol::ColumnDefinition41 payload.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut reader = PacketReader::new(data);

        let catalog = reader.read_lenenc_string()?;
        let schema = reader.read_lenenc_string()?;
        let table = reader.read_lenenc_string()?;
        let org_table = reader.read_lenenc_string()?;
        let name = reader.read_lenenc_string()?;
        let org_name = reader.read_lenenc_string()?;

        // Length of the fixed-size fields, always 0x0c
        reader.read_lenenc_int()?;

        let charset = reader.read_u16_le()?;
        let column_length = reader.read_u32_le()?;
        let column_type = FieldType::from_u8(reader.read_u8()?);
        let flags = reader.read_u16_le()?;
        let decimals = reader.read_u8()?;

        Some(Self {
            catalog,
            schema,
            table,
            org_table,
            name,
            org_name,
            charset,
            column_length,
            column_type,
            flags,
            decimals,
        })
    }

    /// Label published to callers: `table.name` when qualification is on
    /// and the column comes from a table, the bare name otherwise.
    pub fn label(&self, include_table: bool) -> String {
        if include_table && !self.table.is_empty() {
            format!("{}.{}", self.table, self.name)
        } else {
            self.name.clone()
        }
    }

    pub const fn is_not_null(&self) -> bool {
        self.flags & column_flags::NOT_NULL != 0
    }

    pub const fn is_primary_key(&self) -> bool {
        self.flags & column_flags::PRIMARY_KEY != 0
    }

    pub const fn is_unsigned(&self) -> bool {
        self.flags & column_flags::UNSIGNED != 0
    }
}

/// Escape a `LIKE` pattern for embedding inside single quotes.
///
/// `%` and `_` are left alone so they keep their wildcard meaning.
pub fn escape_wild(wild: &str) -> String {
    let mut out = String::with_capacity(wild.len() + 2);
    for c in wild.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x1a' => out.push_str("\\Z"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PacketWriter;

    fn column_packet(table: &str, name: &str, column_type: u8, flags: u16) -> Vec<u8> {
        let mut w = PacketWriter::new();
        w.write_lenenc_string("def");
        w.write_lenenc_string("sales");
        w.write_lenenc_string(table);
        w.write_lenenc_string(table);
        w.write_lenenc_string(name);
        w.write_lenenc_string(name);
        w.write_lenenc_int(0x0c);
        w.write_u16_le(45);
        w.write_u32_le(11);
        w.write_u8(column_type);
        w.write_u16_le(flags);
        w.write_u8(0);
        w.write_zeros(2);
        w.into_bytes()
    }

    #[test]
    fn test_parse_column_def() {
        let data = column_packet("customers", "id", 0x03, column_flags::NOT_NULL | column_flags::PRIMARY_KEY);
        let col = ColumnDef::parse(&data).unwrap();
        assert_eq!(col.schema, "sales");
        assert_eq!(col.table, "customers");
        assert_eq!(col.name, "id");
        assert_eq!(col.column_type, FieldType::Long);
        assert!(col.column_type.is_numeric());
        assert!(col.is_not_null());
        assert!(col.is_primary_key());
        assert!(!col.is_unsigned());
    }

    #[test]
    fn test_parse_truncated_column_def() {
        let data = column_packet("t", "c", 0xFD, 0);
        assert!(ColumnDef::parse(&data[..10]).is_none());
    }

    #[test]
    fn test_label() {
        let col = ColumnDef::named("name").in_table("customers");
        assert_eq!(col.label(false), "name");
        assert_eq!(col.label(true), "customers.name");

        // Expressions have no table
        let expr = ColumnDef::named("COUNT(*)");
        assert_eq!(expr.label(true), "COUNT(*)");
    }

    #[test]
    fn test_field_type_unknown_is_string() {
        assert_eq!(FieldType::from_u8(0x42), FieldType::String);
        assert_eq!(FieldType::from_u8(0xF6), FieldType::NewDecimal);
        assert!(!FieldType::VarString.is_numeric());
    }

    #[test]
    fn test_escape_wild() {
        assert_eq!(escape_wild("cust%"), "cust%");
        assert_eq!(escape_wild("o'brien"), "o\\'brien");
        assert_eq!(escape_wild("a\\b"), "a\\\\b");
    }
}
